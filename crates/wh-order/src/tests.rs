//! Unit tests for wh-order.

#[cfg(test)]
mod helpers {
    use wh_core::{CellPos, GateId, ItemId, RackId};
    use wh_entity::{Gate, GateStore, Item, ItemStore, Rack, RackStore};

    use crate::ItemMultiset;

    /// Item 0 weighs 2 with 3 units stocked; item 1 weighs 5, none stocked.
    /// One rack (capacity 10, container 4) holds the item-0 stock; one gate.
    pub fn world() -> (ItemStore, RackStore, GateStore) {
        let mut items = ItemStore::new();
        items.insert(Item::new(ItemId(0), 2));
        items.insert(Item::new(ItemId(1), 5));

        let mut rack = Rack::new(RackId(0), CellPos::new(1, 1), 10, 4);
        rack.store(ItemId(0), 3);
        items.deliver_in(ItemId(0), 3).unwrap();
        let mut racks = RackStore::new();
        racks.insert(rack);

        let mut gates = GateStore::new();
        gates.insert(Gate::new(GateId(0), CellPos::new(0, 3)));

        (items, racks, gates)
    }

    pub fn multiset(entries: &[(u32, u32)]) -> ItemMultiset {
        entries.iter().map(|&(id, qty)| (ItemId(id), qty)).collect()
    }
}

#[cfg(test)]
mod admission {
    use wh_core::{GateId, ItemId, OrderId, RackId};

    use crate::{Order, OrderError, OrderStatus, OrderStore};

    use super::helpers::{multiset, world};

    #[test]
    fn collect_reserves_on_admit() {
        let (mut items, mut racks, gates) = world();
        let mut orders = OrderStore::new();

        let order = Order::collect(OrderId(0), GateId(0), multiset(&[(0, 2)]));
        orders.admit(order, &mut items, &mut racks, &gates).unwrap();

        assert_eq!(items.get(ItemId(0)).unwrap().reserved_units, 2);
        assert_eq!(orders.get(OrderId(0)).unwrap().status, OrderStatus::Active);
    }

    #[test]
    fn collect_rejects_short_items_without_mutation() {
        let (mut items, mut racks, gates) = world();
        let mut orders = OrderStore::new();

        // 3 units exist; ask for 4 of item 0 and 1 of the unstocked item 1.
        let order = Order::collect(OrderId(1), GateId(0), multiset(&[(0, 4), (1, 1)]));
        let err = orders.admit(order, &mut items, &mut racks, &gates).unwrap_err();

        match err {
            OrderError::InfeasibleCollect { order, short } => {
                assert_eq!(order, OrderId(1));
                assert_eq!(short, vec![ItemId(0), ItemId(1)]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(items.get(ItemId(0)).unwrap().reserved_units, 0);
        assert!(orders.is_empty());
    }

    #[test]
    fn collect_counts_other_active_orders() {
        let (mut items, mut racks, gates) = world();
        let mut orders = OrderStore::new();

        let first = Order::collect(OrderId(0), GateId(0), multiset(&[(0, 3)]));
        orders.admit(first, &mut items, &mut racks, &gates).unwrap();

        // All three units reserved — one more unit is infeasible.
        let second = Order::collect(OrderId(1), GateId(0), multiset(&[(0, 1)]));
        let err = orders.admit(second, &mut items, &mut racks, &gates).unwrap_err();
        assert!(matches!(err, OrderError::InfeasibleCollect { .. }));
    }

    #[test]
    fn refill_reserves_capacity_weight() {
        let (mut items, mut racks, gates) = world();
        let mut orders = OrderStore::new();

        // Stored weight 6, capacity 10: two more units of weight 2 fit.
        let order = Order::refill(OrderId(2), GateId(0), RackId(0), multiset(&[(0, 2)]));
        orders.admit(order, &mut items, &mut racks, &gates).unwrap();
        assert_eq!(racks.get(RackId(0)).unwrap().projected_weight(&items), 10);
    }

    #[test]
    fn refill_capacity_breach_reports_excess() {
        let (mut items, mut racks, gates) = world();
        let mut orders = OrderStore::new();

        // Stored weight 6 + 3 × 2 = 12 > 10 → excess 2.
        let order = Order::refill(OrderId(3), GateId(0), RackId(0), multiset(&[(0, 3)]));
        let err = orders.admit(order, &mut items, &mut racks, &gates).unwrap_err();
        match err {
            OrderError::InfeasibleRefill { order, rack, excess } => {
                assert_eq!(order, OrderId(3));
                assert_eq!(rack, RackId(0));
                assert_eq!(excess, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(racks.get(RackId(0)).unwrap().projected_weight(&items), 6);
    }

    #[test]
    fn structural_rejections() {
        let (mut items, mut racks, gates) = world();
        let mut orders = OrderStore::new();

        let order = Order::collect(OrderId(0), GateId(9), multiset(&[(0, 1)]));
        assert!(matches!(
            orders.admit(order, &mut items, &mut racks, &gates),
            Err(OrderError::UnknownGate { .. })
        ));

        let order = Order::collect(OrderId(0), GateId(0), multiset(&[(7, 1)]));
        assert!(matches!(
            orders.admit(order, &mut items, &mut racks, &gates),
            Err(OrderError::UnknownItem { .. })
        ));

        let order = Order::collect(OrderId(0), GateId(0), multiset(&[]));
        assert!(matches!(
            orders.admit(order, &mut items, &mut racks, &gates),
            Err(OrderError::EmptyOrder(_))
        ));

        let good = Order::collect(OrderId(0), GateId(0), multiset(&[(0, 1)]));
        orders.admit(good, &mut items, &mut racks, &gates).unwrap();
        let dup = Order::collect(OrderId(0), GateId(0), multiset(&[(0, 1)]));
        assert!(matches!(
            orders.admit(dup, &mut items, &mut racks, &gates),
            Err(OrderError::DuplicateOrder(_))
        ));
    }
}

#[cfg(test)]
mod order_lifecycle {
    use wh_core::{GateId, ItemId, OrderId, TaskId};

    use crate::Order;

    use super::helpers::multiset;

    #[test]
    fn assignment_then_delivery_fulfills() {
        let mut order = Order::collect(OrderId(0), GateId(0), multiset(&[(0, 2)]));
        let share = multiset(&[(0, 2)]);

        order.on_task_assigned(TaskId(0), &share);
        assert!(!order.has_unassigned());
        assert_eq!(order.pending().get(&ItemId(0)), Some(&2));

        let fulfilled = order.on_task_complete(&share);
        assert!(fulfilled);
        assert!(order.is_fulfilled());
        assert!(order.pending().is_empty());
    }

    #[test]
    fn partial_assignment_keeps_order_pending() {
        let mut order = Order::collect(OrderId(0), GateId(0), multiset(&[(0, 5)]));
        let share = multiset(&[(0, 2)]);

        order.on_task_assigned(TaskId(0), &share);
        assert_eq!(order.unassigned().get(&ItemId(0)), Some(&3));

        assert!(!order.on_task_complete(&share));
        assert_eq!(order.pending().get(&ItemId(0)), Some(&3));
        assert!(!order.is_fulfilled());
    }

    #[test]
    fn cancellation_returns_share_to_unassigned() {
        let mut order = Order::collect(OrderId(0), GateId(0), multiset(&[(0, 2)]));
        let share = multiset(&[(0, 2)]);

        order.on_task_assigned(TaskId(0), &share);
        order.on_task_cancelled(&share);
        assert_eq!(order.unassigned().get(&ItemId(0)), Some(&2));
        assert_eq!(order.open_tasks(), 0);
        assert!(!order.is_fulfilled());
    }
}

#[cfg(test)]
mod task {
    use wh_core::{AgentId, FacilityId, GateId, OrderId, RackId};

    use crate::{TaskStep, TaskStore};

    use super::helpers::multiset;

    #[test]
    fn fresh_task_has_canonical_steps_after_first_order() {
        let mut tasks = TaskStore::new();
        let id = tasks.create(AgentId(0), RackId(0));
        let task = tasks.get_mut(id).unwrap();

        task.add_order(OrderId(0), GateId(0), multiset(&[(0, 1)]));

        assert_eq!(task.peek_step(), Some(&TaskStep::Bind(FacilityId::Rack(RackId(0)))));
        assert_eq!(task.steps_remaining(), 3);
        assert_eq!(task.running_orders(), 1);
    }

    #[test]
    fn added_orders_insert_before_trailing_unbind() {
        let mut tasks = TaskStore::new();
        let id = tasks.create(AgentId(0), RackId(0));
        let task = tasks.get_mut(id).unwrap();

        task.add_order(OrderId(0), GateId(0), multiset(&[(0, 1)]));
        task.add_order(OrderId(1), GateId(1), multiset(&[(0, 1)]));
        assert_eq!(task.steps_remaining(), 4);

        // Consume: bind rack, then two SelectGates, then unbind rack.
        assert_eq!(task.pop_step(), Some(TaskStep::Bind(FacilityId::Rack(RackId(0)))));
        assert_eq!(task.pop_step(), Some(TaskStep::SelectGate));
        assert_eq!(task.pop_step(), Some(TaskStep::SelectGate));
        assert_eq!(task.pop_step(), Some(TaskStep::Unbind(FacilityId::Rack(RackId(0)))));
        assert!(task.is_done());
    }

    #[test]
    fn select_gate_resolution_and_gate_queue() {
        let mut tasks = TaskStore::new();
        let id = tasks.create(AgentId(0), RackId(0));
        let task = tasks.get_mut(id).unwrap();

        task.add_order(OrderId(0), GateId(2), multiset(&[(0, 1)]));
        task.add_order(OrderId(1), GateId(2), multiset(&[(0, 1)]));
        assert_eq!(task.pending_gates(), vec![GateId(2)]);

        task.pop_step(); // Bind(rack)
        task.resolve_select_gate(GateId(2));
        assert_eq!(task.peek_step(), Some(&TaskStep::Bind(FacilityId::Gate(GateId(2)))));

        assert_eq!(task.pop_gate_order(GateId(2)), Some(OrderId(0)));
        assert!(task.has_orders_at(GateId(2)));
        assert_eq!(task.pop_gate_order(GateId(2)), Some(OrderId(1)));
        assert!(!task.has_orders_at(GateId(2)));
        assert_eq!(task.running_orders(), 0);
    }

    #[test]
    fn accepting_orders_until_rack_unbind_consumed() {
        let mut tasks = TaskStore::new();
        let id = tasks.create(AgentId(3), RackId(1));
        let task = tasks.get_mut(id).unwrap();
        task.add_order(OrderId(0), GateId(0), multiset(&[(0, 1)]));
        assert!(task.accepting_orders());

        task.pop_step(); // Bind(rack)
        task.pop_step(); // SelectGate
        assert!(task.accepting_orders()); // trailing unbind still queued

        task.pop_step(); // Unbind(rack)
        assert!(!task.accepting_orders());
    }

    #[test]
    fn task_ids_are_sequential_priorities() {
        let mut tasks = TaskStore::new();
        let a = tasks.create(AgentId(0), RackId(0));
        let b = tasks.create(AgentId(1), RackId(1));
        assert!(tasks.get(a).unwrap().priority() < tasks.get(b).unwrap().priority());
    }
}
