//! Integration tests for wh-sim: end-to-end scenarios over the full
//! controller, driven through the same handlers the executor uses.

#[cfg(test)]
mod helpers {
    use serde_json::{json, Value};

    use wh_core::ItemId;
    use wh_order::OrderStatus;
    use wh_proto::{StartMsg, UpdateMsg};

    use crate::{TickOutcome, Warehouse};

    /// Wire code for each action, for terse assertions.
    pub const MOVE: u8 = 1;
    pub const RETREAT: u8 = 4;
    pub const BIND: u8 = 7;
    pub const UNBIND: u8 = 8;

    /// Build a config from a sketch: each cell entry is a JSON objects
    /// array.  `items` is `[(id, weight)]`.
    pub fn config(rows: Vec<Vec<Value>>, items: &[(u32, u32)]) -> Value {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let grid: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(|objs| json!({ "objects": objs })).collect())
            .collect();
        json!({
            "map": { "height": height, "width": width, "grid": grid },
            "items": items
                .iter()
                .map(|&(id, weight)| json!({ "id": id, "weight": weight }))
                .collect::<Vec<_>>(),
        })
    }

    pub fn agent(id: u32, load_cap: u32, direction: u8) -> Value {
        json!([{ "type": 1, "id": id, "load_cap": load_cap, "direction": direction }])
    }

    pub fn rack(id: u32, capacity: u32, weight: u32, items: &[(u32, u32)]) -> Value {
        json!([{ "type": 2, "id": id, "capacity": capacity, "weight": weight,
                 "items": items
                     .iter()
                     .map(|&(iid, q)| json!({ "id": iid, "quantity": q }))
                     .collect::<Vec<_>>() }])
    }

    pub fn gate(id: u32) -> Value {
        json!([{ "type": 0, "id": id }])
    }

    pub fn empty() -> Value {
        json!([])
    }

    /// The scenario staple: 1×5 corridor `A . R . G` with one item kind
    /// (weight 1) and one unit of it on the rack.
    pub fn corridor_config() -> Value {
        config(
            vec![vec![
                agent(0, 100, 1),
                empty(),
                rack(0, 10, 2, &[(0, 1)]),
                empty(),
                gate(0),
            ]],
            &[(0, 1)],
        )
    }

    pub fn start(w: &mut Warehouse, cfg: Value) {
        let msg: StartMsg =
            serde_json::from_value(json!({ "mode": 0, "state": cfg })).expect("valid start msg");
        w.handle_start(&msg).expect("start accepted");
    }

    pub fn send_order(w: &mut Warehouse, raw: Value) -> wh_proto::ProtoResult<()> {
        let msg: wh_proto::OrderMsg = serde_json::from_value(raw).expect("valid order shape");
        w.handle_order(&msg)
    }

    pub fn collect_order(id: u32, gate: u32, items: &[(u32, u32)]) -> Value {
        json!({ "id": id, "type": 0, "gate_id": gate,
                "items": items.iter().map(|&(iid, q)| json!({ "id": iid, "quantity": q }))
                    .collect::<Vec<_>>() })
    }

    pub fn refill_order(id: u32, gate: u32, rack: u32, items: &[(u32, u32)]) -> Value {
        json!({ "id": id, "type": 1, "gate_id": gate, "rack_id": rack,
                "items": items.iter().map(|&(iid, q)| json!({ "id": iid, "quantity": q }))
                    .collect::<Vec<_>>() })
    }

    pub fn control(w: &mut Warehouse, agent: u32, kind: u8) -> wh_proto::ProtoResult<()> {
        let msg: wh_proto::ControlMsg =
            serde_json::from_value(json!({ "id": agent, "type": kind })).expect("valid control");
        w.handle_control(&msg)
    }

    /// Run one tick, acknowledge its update (if any), and return it.
    pub fn tick(w: &mut Warehouse) -> Option<UpdateMsg> {
        let result = w.run_tick().expect("tick");
        assert_eq!(result.outcome, TickOutcome::Advanced);
        assert_invariants(w);
        if result.update.is_some() {
            w.handle_ack_update().expect("ack accepted");
        }
        result.update
    }

    /// Action wire codes of one update, in emission order.
    pub fn action_codes(update: &UpdateMsg) -> Vec<(u8, u32)> {
        update.actions.iter().map(|a| (a.kind, a.id)).collect()
    }

    pub fn has_log(update: &UpdateMsg, kind: u8) -> bool {
        update.logs.iter().any(|l| l.kind == kind)
    }

    /// Run ticks (acknowledging each) until the warehouse is quiescent,
    /// collecting every update.  Panics after `limit` ticks.
    pub fn run_to_quiescence(w: &mut Warehouse, limit: usize) -> Vec<UpdateMsg> {
        let mut updates = Vec::new();
        for _ in 0..limit {
            if w.is_quiescent() {
                return updates;
            }
            if let Some(u) = tick(w) {
                updates.push(u);
            }
        }
        panic!("not quiescent after {limit} ticks");
    }

    /// The §-testable-properties invariants, asserted at tick boundaries.
    pub fn assert_invariants(w: &Warehouse) {
        // Agent ↔ cell coherence.
        for agent in w.agents.iter() {
            assert_eq!(
                w.grid.agent_at(agent.pose.pos),
                Some(agent.id),
                "agent {} not on its cell",
                agent.id
            );
        }
        for pos in w.grid.positions().collect::<Vec<_>>() {
            if let Some(id) = w.grid.agent_at(pos) {
                let agent = w.agents.get(id).expect("registered agent");
                assert_eq!(agent.pose.pos, pos, "cell points at displaced agent {id}");
            }
        }

        // Reservation ledger: reserved == Σ pending over active collect
        // orders.
        let mut pending_by_item: std::collections::BTreeMap<ItemId, u32> = Default::default();
        for order in w.orders.iter() {
            if order.status == OrderStatus::Active
                && order.kind == wh_order::OrderKind::Collect
            {
                for (&item, &qty) in order.pending() {
                    *pending_by_item.entry(item).or_insert(0) += qty;
                }
            }
        }
        for (&item, &total_pending) in &pending_by_item {
            let reserved = w.items.get(item).expect("item").reserved_units;
            assert_eq!(reserved, total_pending, "reservation drift for {item}");
        }

        // Rack weight bounds.
        for rack in w.racks.iter() {
            assert!(
                rack.stored_weight(&w.items) <= rack.capacity,
                "rack {} over capacity",
                rack.id
            );
        }

        // Task/order link count agreement.
        let links: u32 = w.tasks.iter().map(|t| t.running_orders()).sum();
        let order_links: u32 = w.orders.iter().map(|o| o.open_tasks()).sum();
        assert_eq!(links, order_links, "task/order link drift");
    }
}

// ── Scenario 1: straight fetch-and-deliver ────────────────────────────────────

#[cfg(test)]
mod fetch_and_deliver {
    use wh_proto::msg::log_types;

    use crate::Warehouse;

    use super::helpers::*;

    #[test]
    fn full_action_trace() {
        let mut w = Warehouse::new();
        start(&mut w, corridor_config());
        send_order(&mut w, collect_order(0, 0, &[(0, 1)])).unwrap();

        // T1: task assigned, first move.
        let u1 = tick(&mut w).expect("update");
        assert_eq!(u1.timestep, 1);
        assert_eq!(action_codes(&u1), vec![(MOVE, 0)]);
        assert!(has_log(&u1, log_types::TASK_ASSIGNED));

        // T2..T5: move, bind rack, move, move.
        assert_eq!(action_codes(&tick(&mut w).unwrap()), vec![(MOVE, 0)]);
        assert_eq!(action_codes(&tick(&mut w).unwrap()), vec![(BIND, 0)]);
        assert_eq!(action_codes(&tick(&mut w).unwrap()), vec![(MOVE, 0)]);
        assert_eq!(action_codes(&tick(&mut w).unwrap()), vec![(MOVE, 0)]);

        // T6: gate bind fulfills the order.
        let u6 = tick(&mut w).expect("update");
        assert_eq!(u6.timestep, 6);
        assert_eq!(action_codes(&u6), vec![(BIND, 0)]);
        assert!(has_log(&u6, log_types::ORDER_FULFILLED));
        // Statistics ride along as passthrough counters.
        let fulfilled_stat = u6
            .statistics
            .iter()
            .find(|s| s.key == wh_proto::msg::stat_keys::ORDERS_FULFILLED)
            .expect("fulfilled counter");
        assert_eq!(fulfilled_stat.value, 1);

        // T7: gate unbind; T8: retreat; T9..T10: return; T11: rack unbind.
        assert_eq!(action_codes(&tick(&mut w).unwrap()), vec![(UNBIND, 0)]);
        assert_eq!(action_codes(&tick(&mut w).unwrap()), vec![(RETREAT, 0)]);
        assert_eq!(action_codes(&tick(&mut w).unwrap()), vec![(MOVE, 0)]);
        assert_eq!(action_codes(&tick(&mut w).unwrap()), vec![(MOVE, 0)]);
        let u11 = tick(&mut w).expect("update");
        assert_eq!(action_codes(&u11), vec![(UNBIND, 0)]);
        assert!(has_log(&u11, log_types::TASK_COMPLETED));

        // Items left the warehouse; the world is quiet again.
        assert_eq!(w.items.get(wh_core::ItemId(0)).unwrap().total_units, 0);
        assert!(w.is_quiescent());
        assert!(tick(&mut w).is_none()); // empty tick emits no UPDATE
    }

    #[test]
    fn one_update_per_tick_and_ack_gating() {
        let mut w = Warehouse::new();
        start(&mut w, corridor_config());
        send_order(&mut w, collect_order(0, 0, &[(0, 1)])).unwrap();

        let result = w.run_tick().unwrap();
        assert!(result.update.is_some());
        assert!(w.ack_gate_armed());

        // Unacknowledged: the next tick refuses to run.
        let gated = w.run_tick().unwrap();
        assert_eq!(gated.outcome, crate::TickOutcome::Idle);
        assert!(gated.update.is_none());

        w.handle_ack_update().unwrap();
        assert!(!w.ack_gate_armed());

        // A duplicate ACK is an error.
        assert!(w.handle_ack_update().is_err());
    }
}

// ── Scenario 2: conflict resolved by sliding ──────────────────────────────────

#[cfg(test)]
mod slide_conflict {
    use wh_proto::msg::log_types;

    use crate::Warehouse;

    use super::helpers::*;

    /// 2×5 map, top row `A B . R G`, bottom row empty.  B is idle and too
    /// weak to carry the rack, so the order tasks A — which must push
    /// through B.
    fn conflict_config() -> serde_json::Value {
        config(
            vec![
                vec![
                    agent(0, 100, 1),
                    agent(1, 1, 1),
                    empty(),
                    rack(0, 10, 2, &[(0, 1)]),
                    gate(0),
                ],
                vec![empty(), empty(), empty(), empty(), empty()],
            ],
            &[(0, 1)],
        )
    }

    #[test]
    fn tick_one_emits_both_moves_in_slide_order() {
        let mut w = Warehouse::new();
        start(&mut w, conflict_config());
        send_order(&mut w, collect_order(0, 0, &[(0, 1)])).unwrap();

        let u1 = tick(&mut w).expect("update");
        let codes: Vec<(u8, u32)> = action_codes(&u1)
            .into_iter()
            .filter(|&(kind, _)| kind == MOVE)
            .collect();
        // B (slid) first, then A.
        assert_eq!(codes, vec![(MOVE, 1), (MOVE, 0)]);
    }

    #[test]
    fn order_still_fulfilled_after_conflicts() {
        let mut w = Warehouse::new();
        start(&mut w, conflict_config());
        send_order(&mut w, collect_order(0, 0, &[(0, 1)])).unwrap();

        let updates = run_to_quiescence(&mut w, 64);
        assert!(updates
            .iter()
            .any(|u| u.logs.iter().any(|l| l.kind == log_types::ORDER_FULFILLED)));

        // At most one action per agent per tick, throughout.
        for u in &updates {
            let mut seen = std::collections::BTreeSet::new();
            for a in &u.actions {
                assert!(seen.insert(a.id), "agent {} acted twice at T{}", a.id, u.timestep);
            }
        }
    }
}

// ── Scenario 3: deadlocked idle agents stay put ───────────────────────────────

#[cfg(test)]
mod deadlock_yield {
    use crate::Warehouse;

    use super::helpers::*;

    #[test]
    fn facing_idle_agents_produce_no_update() {
        // 1×2 corridor, A faces east, B faces west, no orders.
        let cfg = config(vec![vec![agent(0, 10, 1), agent(1, 10, 3)]], &[(0, 1)]);
        let mut w = Warehouse::new();
        start(&mut w, cfg);

        assert!(w.is_quiescent());
        for _ in 0..3 {
            assert!(tick(&mut w).is_none());
        }
    }
}

// ── Scenario 4: deactivation undoes an unacknowledged move ────────────────────

#[cfg(test)]
mod deactivation {
    use wh_core::{AgentId, CellPos};

    use crate::Warehouse;

    use super::helpers::*;

    const DEACTIVATE: u8 = 1;
    const ACTIVATE: u8 = 0;

    #[test]
    fn mid_move_deactivation_locks_and_undoes() {
        let mut w = Warehouse::new();
        start(&mut w, corridor_config());
        send_order(&mut w, collect_order(0, 0, &[(0, 1)])).unwrap();

        // T1: A moves (0,0) → (0,1); UPDATE not yet acknowledged.
        let result = w.run_tick().unwrap();
        assert!(result.update.is_some());
        assert_eq!(w.agents.get(AgentId(0)).unwrap().pose.pos, CellPos::new(0, 1));

        // Deactivation arrives before the ACK.
        control(&mut w, 0, DEACTIVATE).unwrap();
        let agent = w.agents.get(AgentId(0)).unwrap();
        assert!(agent.deactivated && agent.blocked);
        assert_eq!(agent.pose.pos, CellPos::new(0, 0)); // move undone
        assert!(w.grid.cell(CellPos::new(0, 1)).unwrap().is_locked());
        assert_eq!(w.grid.agent_at(CellPos::new(0, 1)), None);
        assert_eq!(w.grid.agent_at(CellPos::new(0, 0)), Some(AgentId(0)));

        w.handle_ack_update().unwrap();

        // Next tick: A contributes nothing; no UPDATE at all.
        assert!(tick(&mut w).is_none());

        // Re-activation unlocks the cell; the following tick replays the
        // move in the recover phase.
        control(&mut w, 0, ACTIVATE).unwrap();
        assert!(!w.grid.cell(CellPos::new(0, 1)).unwrap().is_locked());

        let u = tick(&mut w).expect("recovery update");
        assert_eq!(action_codes(&u)[0], (MOVE, 0));
        assert_eq!(w.agents.get(AgentId(0)).unwrap().pose.pos, CellPos::new(0, 1));
        assert!(!w.agents.get(AgentId(0)).unwrap().blocked);

        // The interrupted task still completes.
        let updates = run_to_quiescence(&mut w, 64);
        assert!(updates.iter().any(|u| {
            u.logs
                .iter()
                .any(|l| l.kind == wh_proto::msg::log_types::ORDER_FULFILLED)
        }));
    }
}

// ── Scenarios 5 & 6: boundary rejections ──────────────────────────────────────

#[cfg(test)]
mod rejections {
    use wh_proto::{codes, ProtoError};

    use crate::{Warehouse, WarehouseState};

    use super::helpers::*;

    #[test]
    fn infeasible_collect_rejected_without_state_change() {
        // All three units reserved by the first order.
        let cfg = config(
            vec![vec![
                agent(0, 100, 1),
                empty(),
                rack(0, 10, 2, &[(0, 3)]),
                empty(),
                gate(0),
            ]],
            &[(0, 1)],
        );
        let mut w = Warehouse::new();
        start(&mut w, cfg);
        send_order(&mut w, collect_order(0, 0, &[(0, 3)])).unwrap();

        let err = send_order(&mut w, collect_order(1, 0, &[(0, 1)])).unwrap_err();
        match err {
            ProtoError::InfeasibleCollect { order, short } => {
                assert_eq!(order, 1);
                assert_eq!(short, vec![0]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Rejected order left nothing behind.
        assert!(w.orders.get(wh_core::OrderId(1)).is_none());
        assert_eq!(w.pending_orders.len(), 1);
    }

    #[test]
    fn refill_capacity_breach_reports_excess() {
        // Capacity 10, stored weight 7 (7 × weight 1); refill of 2 units of
        // weight 2 (4 total) overflows by 1.
        let cfg = config(
            vec![vec![
                agent(0, 100, 1),
                empty(),
                rack(0, 10, 2, &[(0, 7)]),
                empty(),
                gate(0),
            ]],
            &[(0, 1), (1, 2)],
        );
        let mut w = Warehouse::new();
        start(&mut w, cfg);

        let err = send_order(&mut w, refill_order(4, 0, 0, &[(1, 2)])).unwrap_err();
        match err {
            ProtoError::InfeasibleRefill { order, rack, excess } => {
                assert_eq!(order, 4);
                assert_eq!(rack, 0);
                assert_eq!(excess, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.wire_code(), codes::ORDER_INFEASIBLE_REFILL);
        assert_eq!(w.state(), WarehouseState::Running);
        assert!(w.pending_orders.is_empty());
    }
}

// ── Refill end-to-end ─────────────────────────────────────────────────────────

#[cfg(test)]
mod refill_flow {
    use wh_core::{ItemId, RackId};
    use wh_proto::msg::log_types;

    use crate::Warehouse;

    use super::helpers::*;

    #[test]
    fn refill_adds_units_at_the_gate() {
        let mut w = Warehouse::new();
        start(&mut w, corridor_config()); // rack stores 1 unit of item 0
        send_order(&mut w, refill_order(0, 0, 0, &[(0, 4)])).unwrap();

        let updates = run_to_quiescence(&mut w, 64);
        assert!(updates
            .iter()
            .any(|u| u.logs.iter().any(|l| l.kind == log_types::ORDER_FULFILLED)));

        let rack = w.racks.get(RackId(0)).unwrap();
        assert_eq!(rack.quantity(ItemId(0)), 5);
        assert_eq!(rack.reserved_incoming_weight(), 0);
        assert_eq!(w.items.get(ItemId(0)).unwrap().total_units, 5);
    }
}

// ── Dispatcher policy ─────────────────────────────────────────────────────────

#[cfg(test)]
mod dispatch_policy {
    use wh_core::{AgentId, TaskId};

    use crate::Warehouse;

    use super::helpers::*;

    #[test]
    fn highest_capacity_agent_wins() {
        // Agent 0 (cap 10) sits right next to the rack; agent 1 (cap 100)
        // is farther away but stronger.  Strength beats distance.
        let cfg = config(
            vec![vec![
                agent(1, 100, 1),
                agent(0, 10, 1),
                rack(0, 10, 2, &[(0, 1)]),
                empty(),
                gate(0),
            ]],
            &[(0, 1)],
        );
        let mut w = Warehouse::new();
        start(&mut w, cfg);
        send_order(&mut w, collect_order(0, 0, &[(0, 1)])).unwrap();

        tick(&mut w);
        assert_eq!(
            w.agents.get(AgentId(1)).unwrap().task,
            Some(TaskId(0)),
            "stronger agent should take the task"
        );
        assert!(w.agents.get(AgentId(0)).unwrap().task.is_none());
    }

    #[test]
    fn capacity_tie_broken_by_distance() {
        let cfg = config(
            vec![vec![
                agent(1, 100, 1),
                agent(0, 100, 1),
                rack(0, 10, 2, &[(0, 1)]),
                empty(),
                gate(0),
            ]],
            &[(0, 1)],
        );
        let mut w = Warehouse::new();
        start(&mut w, cfg);
        send_order(&mut w, collect_order(0, 0, &[(0, 1)])).unwrap();

        tick(&mut w);
        // Agent 0 is one move away, agent 1 two: agent 0 wins the tie.
        assert_eq!(w.agents.get(AgentId(0)).unwrap().task, Some(TaskId(0)));
        assert!(w.agents.get(AgentId(1)).unwrap().task.is_none());
    }

    #[test]
    fn compatible_order_folds_into_same_task() {
        // Two orders against the same rack, both at the same gate, arriving
        // together: one task serves both.
        let cfg = config(
            vec![vec![
                agent(0, 100, 1),
                empty(),
                rack(0, 10, 1, &[(0, 4)]),
                empty(),
                gate(0),
            ]],
            &[(0, 1)],
        );
        let mut w = Warehouse::new();
        start(&mut w, cfg);
        send_order(&mut w, collect_order(0, 0, &[(0, 1)])).unwrap();
        send_order(&mut w, collect_order(1, 0, &[(0, 2)])).unwrap();

        let updates = run_to_quiescence(&mut w, 64);
        let fulfilled: usize = updates
            .iter()
            .flat_map(|u| &u.logs)
            .filter(|l| l.kind == wh_proto::msg::log_types::ORDER_FULFILLED)
            .count();
        let completed: usize = updates
            .iter()
            .flat_map(|u| &u.logs)
            .filter(|l| l.kind == wh_proto::msg::log_types::TASK_COMPLETED)
            .count();
        assert_eq!(fulfilled, 2);
        assert_eq!(completed, 1, "both orders should ride one task");
    }

    #[test]
    fn split_stock_spawns_tasks_in_sequence() {
        // 3 units spread over two racks (1 + 2), one agent, order wants 3.
        // The first task covers 1 unit; the remainder keeps the order
        // pending until the agent frees up and a second task takes it.
        let cfg = config(
            vec![vec![
                agent(0, 100, 1),
                empty(),
                rack(0, 10, 2, &[(0, 1)]),
                rack(1, 10, 2, &[(0, 2)]),
                gate(0),
            ]],
            &[(0, 1)],
        );
        let mut w = Warehouse::new();
        start(&mut w, cfg);
        send_order(&mut w, collect_order(0, 0, &[(0, 3)])).unwrap();

        tick(&mut w);
        // Partially covered: the order stays in the dispatch pool.
        assert_eq!(w.pending_orders.len(), 1);
        let order = w.orders.get(wh_core::OrderId(0)).unwrap();
        assert_eq!(order.unassigned().get(&wh_core::ItemId(0)), Some(&2));
        assert_eq!(order.pending().get(&wh_core::ItemId(0)), Some(&3));

        // Both trips eventually run and the order fulfills.
        let updates = run_to_quiescence(&mut w, 128);
        let fulfilled = updates
            .iter()
            .flat_map(|u| &u.logs)
            .filter(|l| l.kind == wh_proto::msg::log_types::ORDER_FULFILLED)
            .count();
        let completed = updates
            .iter()
            .flat_map(|u| &u.logs)
            .filter(|l| l.kind == wh_proto::msg::log_types::TASK_COMPLETED)
            .count();
        assert_eq!(fulfilled, 1);
        assert_eq!(completed, 2, "two trips for the split stock");
        assert!(w.orders.get(wh_core::OrderId(0)).unwrap().is_fulfilled());
    }
}

// ── Gate selection ────────────────────────────────────────────────────────────

#[cfg(test)]
mod gate_selection {
    use serde_json::Value;

    use wh_proto::msg::log_types;

    use crate::Warehouse;

    use super::helpers::*;

    /// 1×7 corridor `A . R . G0 . G1`: from the rack, gate 0 is two cells
    /// away and gate 1 four.
    fn two_gate_config() -> Value {
        config(
            vec![vec![
                agent(0, 100, 1),
                empty(),
                rack(0, 10, 2, &[(0, 2)]),
                empty(),
                gate(0),
                empty(),
                gate(1),
            ]],
            &[(0, 1)],
        )
    }

    #[test]
    fn nearest_pending_gate_is_served_first() {
        let mut w = Warehouse::new();
        start(&mut w, two_gate_config());
        // The farther gate's order arrives first; distance still wins.
        send_order(&mut w, collect_order(0, 1, &[(0, 1)])).unwrap();
        send_order(&mut w, collect_order(1, 0, &[(0, 1)])).unwrap();

        let updates = run_to_quiescence(&mut w, 64);
        let fulfilled: Vec<u64> = updates
            .iter()
            .flat_map(|u| &u.logs)
            .filter(|l| l.kind == log_types::ORDER_FULFILLED)
            .filter_map(|l| l.data["order_id"].as_u64())
            .collect();
        // Order 1 (gate 0, nearer) completes before order 0 (gate 1).
        assert_eq!(fulfilled, vec![1, 0]);

        // One task carried both orders through both gates.
        let completed = updates
            .iter()
            .flat_map(|u| &u.logs)
            .filter(|l| l.kind == log_types::TASK_COMPLETED)
            .count();
        assert_eq!(completed, 1);
    }
}

// ── Task cancellation on unreachable goals ────────────────────────────────────

#[cfg(test)]
mod task_cancellation {
    use wh_core::{AgentId, OrderId, RackId};

    use crate::Warehouse;

    use super::helpers::*;

    const STOP: u8 = 0;
    const DEACTIVATE: u8 = 1;

    #[test]
    fn unreachable_goal_cancels_task_and_requeues_order() {
        // 1×6 corridor `A . B . R G`; B is too weak to serve orders.  Once
        // B is deactivated its cell is locked and A can never reach the
        // rack.
        let cfg = config(
            vec![vec![
                agent(0, 100, 1),
                empty(),
                agent(1, 1, 1),
                empty(),
                rack(0, 10, 2, &[(0, 1)]),
                gate(0),
            ]],
            &[(0, 1)],
        );
        let mut w = Warehouse::new();
        start(&mut w, cfg);
        send_order(&mut w, collect_order(0, 0, &[(0, 1)])).unwrap();

        // T1: task assigned; A moves to (0,1).  (B idles: its own slide
        // would only trigger when A reaches it.)
        tick(&mut w).expect("update");
        control(&mut w, 1, DEACTIVATE).unwrap(); // locks (0,2)

        // T2: the stale plan hits the lock and is dropped — no action.
        assert!(tick(&mut w).is_none());

        // T3: replanning finds no path; the task is cancelled and the
        // observer is told to halt the agent.
        let u3 = tick(&mut w).expect("update");
        assert_eq!(action_codes(&u3), vec![(STOP, 0)]);
        assert!(w.tasks.is_empty());
        assert!(w.agents.get(AgentId(0)).unwrap().blocked);
        assert!(w.agents.get(AgentId(0)).unwrap().task.is_none());

        // The order's claim returned to the dispatch pool…
        let order = w.orders.get(OrderId(0)).unwrap();
        assert_eq!(order.unassigned().get(&wh_core::ItemId(0)), Some(&1));
        assert!(w.pending_orders.contains(&OrderId(0)));
        // …and the rack is free again.
        assert!(!w.racks.get(RackId(0)).unwrap().is_allocated());

        // T4: the cancellation undid A's tick-1 move, so recovery replays
        // it (the cell ahead is free again).  The order stays pending
        // because no agent can reach the rack.
        let u4 = tick(&mut w).expect("update");
        assert_eq!(action_codes(&u4), vec![(MOVE, 0)]);
        assert!(!w.agents.get(AgentId(0)).unwrap().blocked);
        assert_eq!(
            w.agents.get(AgentId(0)).unwrap().pose.pos,
            wh_core::CellPos::new(0, 1)
        );
        assert!(w.pending_orders.contains(&OrderId(0)));
    }
}

// ── Lifecycle & state machine ─────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle {
    use wh_proto::ProtoError;

    use crate::{TickOutcome, Warehouse, WarehouseState};

    use super::helpers::*;

    #[test]
    fn pause_resume_cycle() {
        let mut w = Warehouse::new();
        start(&mut w, corridor_config());
        send_order(&mut w, collect_order(0, 0, &[(0, 1)])).unwrap();

        w.handle_pause().unwrap();
        assert_eq!(w.state(), WarehouseState::Paused);
        let r = w.run_tick().unwrap();
        assert_eq!(r.outcome, TickOutcome::Idle);

        w.handle_resume().unwrap();
        assert_eq!(w.state(), WarehouseState::Running);
        assert!(tick(&mut w).is_some());

        // Wrong-state transitions are rejected.
        assert!(matches!(w.handle_resume(), Err(ProtoError::Unexpected(_))));
    }

    #[test]
    fn stop_clears_session_state() {
        let mut w = Warehouse::new();
        start(&mut w, corridor_config());
        send_order(&mut w, collect_order(0, 0, &[(0, 1)])).unwrap();
        tick(&mut w);

        w.handle_stop();
        assert_eq!(w.state(), WarehouseState::Idle);
        assert!(w.pending_orders.is_empty());
        assert!(w.agents.is_empty());
        assert_eq!(w.time(), wh_core::Tick::ZERO);

        // A fresh START fully rebuilds.
        start(&mut w, corridor_config());
        assert_eq!(w.agents.len(), 1);
        assert_eq!(w.state(), WarehouseState::Running);
    }

    #[test]
    fn out_of_state_messages_are_unexpected() {
        let mut w = Warehouse::new();
        assert!(matches!(
            send_order(&mut w, collect_order(0, 0, &[(0, 1)])),
            Err(ProtoError::Unexpected(_))
        ));
        assert!(matches!(w.handle_pause(), Err(ProtoError::Unexpected(_))));
        assert!(matches!(w.handle_ack_update(), Err(ProtoError::Unexpected(_))));

        start(&mut w, corridor_config());
        let msg: wh_proto::StartMsg = serde_json::from_value(
            serde_json::json!({ "mode": 0, "state": corridor_config() }),
        )
        .unwrap();
        assert!(matches!(
            w.handle_start(&msg),
            Err(ProtoError::Unexpected(_))
        ));
    }
}

// ── Executor round trip ───────────────────────────────────────────────────────

#[cfg(test)]
mod executor {
    use std::sync::mpsc;
    use std::thread;

    use serde_json::Value;

    use wh_proto::msg::{log_types, outbound_types};
    use wh_proto::{Inbound, StartMsg};

    use crate::{Executor, UpdateSink, Warehouse};

    use super::helpers::*;

    struct ChannelSink(mpsc::Sender<Value>);

    impl UpdateSink for ChannelSink {
        fn send(&mut self, msg: &Value) -> std::io::Result<()> {
            self.0
                .send(msg.clone())
                .map_err(|_| std::io::Error::other("observer gone"))
        }
    }

    #[test]
    fn full_session_over_the_command_queue() {
        let (tx, rx) = mpsc::channel::<Inbound>();
        let (out_tx, out_rx) = mpsc::channel::<Value>();

        let mut exec = Executor::new(Warehouse::new(), rx, ChannelSink(out_tx));
        let worker = thread::spawn(move || {
            exec.run();
            exec.into_parts()
        });

        let start_msg: StartMsg = serde_json::from_value(
            serde_json::json!({ "mode": 0, "state": corridor_config() }),
        )
        .unwrap();
        tx.send(Inbound::Start(start_msg)).unwrap();

        let order: wh_proto::OrderMsg =
            serde_json::from_value(collect_order(0, 0, &[(0, 1)])).unwrap();
        tx.send(Inbound::Order(order)).unwrap();

        let mut acked_start = false;
        let mut acked_order = false;
        let mut updates = 0usize;
        let mut task_done = false;

        for msg in out_rx.iter() {
            match msg["type"].as_u64().map(|t| t as u8) {
                Some(outbound_types::ACK_START) => {
                    assert_eq!(msg["data"]["status"], 0);
                    acked_start = true;
                }
                Some(outbound_types::ACK_ORDER) => {
                    assert_eq!(msg["data"]["status"], 0);
                    acked_order = true;
                }
                Some(outbound_types::UPDATE) => {
                    updates += 1;
                    // The observer acknowledges every update.
                    tx.send(Inbound::AckUpdate).unwrap();
                    let logs = msg["data"]["logs"].as_array().cloned().unwrap_or_default();
                    if logs
                        .iter()
                        .any(|l| l["type"] == serde_json::json!(log_types::TASK_COMPLETED))
                    {
                        task_done = true;
                        break;
                    }
                }
                other => panic!("unexpected outbound type {other:?}"),
            }
        }
        drop(tx); // disconnect: the executor loop exits

        let (warehouse, _sink) = worker.join().expect("executor thread");
        assert!(acked_start && acked_order && task_done);
        assert_eq!(updates, 11, "one UPDATE per eventful tick");
        assert!(warehouse.is_quiescent());
        assert_eq!(warehouse.time().0, 11);
    }
}
