//! The dispatch phase: pairing pending orders with racks and idle agents.
//!
//! Policy, in order:
//!
//! 1. For each pending order (FIFO), create new tasks while an eligible
//!    unallocated rack and an eligible idle agent exist.  Rack choice is
//!    the smallest-id rack with unreserved overlap (collect) or the
//!    designated rack (refill).  Agent choice is the idle agent with the
//!    highest load capacity that can carry the rack, ties broken by
//!    shortest plan distance to the rack, then by smaller id.
//! 2. Right after creating a task, other compatible pending orders (same
//!    rack, any gate) fold into it.
//! 3. Demand still uncovered tries to fold into already-running tasks that
//!    are still accepting orders.
//! 4. An order keeps its queue slot while any demand remains unassigned.

use std::cmp::Reverse;

use tracing::{debug, info};

use wh_core::{AgentId, OrderId, RackId, TaskId, Tick};
use wh_order::{ItemMultiset, OrderKind, TaskStatus};
use wh_plan::{PlanGoal, Planner};
use wh_proto::LogMsg;

use crate::error::{SimError, SimResult};
use crate::warehouse::Warehouse;

impl<P: Planner> Warehouse<P> {
    /// Run one dispatch phase.
    ///
    /// Every order currently pending is considered exactly once; orders
    /// that keep unassigned demand return to the back of the queue.
    pub(crate) fn dispatch(&mut self, now: Tick) -> SimResult<()> {
        let mut remaining = self.pending_orders.len();
        while remaining > 0 {
            remaining -= 1;
            let Some(order_id) = self.pending_orders.pop_front() else {
                break;
            };
            let Some(order) = self.orders.get(order_id) else {
                continue;
            };
            // Fully assigned (possibly by an earlier fold this very phase):
            // the queue slot is consumed.
            if order.is_fulfilled() || !order.has_unassigned() {
                continue;
            }

            self.dispatch_order(order_id, now)?;

            if self.orders.get(order_id).is_some_and(|o| o.has_unassigned()) {
                self.pending_orders.push_back(order_id);
            }
        }
        Ok(())
    }

    /// Try to cover one order's unassigned demand.
    fn dispatch_order(&mut self, order_id: OrderId, now: Tick) -> SimResult<()> {
        // New tasks while rack + agent pairs exist.
        loop {
            if !self.orders.get(order_id).is_some_and(|o| o.has_unassigned()) {
                return Ok(());
            }
            let Some(rack_id) = self.select_rack(order_id)? else {
                break;
            };
            let Some(agent_id) = self.select_agent(rack_id)? else {
                break;
            };
            let task_id = self.create_task(agent_id, rack_id, order_id, now)?;
            self.fold_pending_orders(task_id)?;
        }

        // Remainder: fold into running tasks that still accept orders.
        if self.orders.get(order_id).is_some_and(|o| o.has_unassigned()) {
            for task_id in self.tasks.sorted_ids() {
                let accepting = self
                    .tasks
                    .get(task_id)
                    .is_some_and(|t| t.status == TaskStatus::Active && t.accepting_orders());
                if accepting && self.attach_order(task_id, order_id)? {
                    debug!(order = %order_id, task = %task_id, "order folded into running task");
                    if !self.orders.get(order_id).is_some_and(|o| o.has_unassigned()) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    // ── Selection ─────────────────────────────────────────────────────────

    /// The rack a *new* task for `order_id` would use, or `None`.
    fn select_rack(&self, order_id: OrderId) -> SimResult<Option<RackId>> {
        let order = self
            .orders
            .get(order_id)
            .ok_or(SimError::OrderNotFound(order_id))?;

        match order.kind {
            OrderKind::Refill => {
                let rack_id = order.rack.ok_or(SimError::OrderNotFound(order_id))?;
                let rack = self.racks.get(rack_id)?;
                Ok((!rack.is_allocated()).then_some(rack_id))
            }
            OrderKind::Collect => {
                for rack_id in self.racks.sorted_ids() {
                    let rack = self.racks.get(rack_id)?;
                    if rack.is_allocated() {
                        continue;
                    }
                    let overlap = order
                        .unassigned()
                        .keys()
                        .any(|&item| rack.available(item) > 0);
                    if overlap {
                        return Ok(Some(rack_id));
                    }
                }
                Ok(None)
            }
        }
    }

    /// The idle agent a new task on `rack_id` would use, or `None`.
    ///
    /// Highest load capacity that can carry the rack; ties by shortest
    /// plan distance to the rack, then by smaller id.
    fn select_agent(&self, rack_id: RackId) -> SimResult<Option<AgentId>> {
        let rack = self.racks.get(rack_id)?;
        let needed = rack.carry_weight(&self.items);
        let goal = PlanGoal::coincident(rack.pos);

        let mut best: Option<(Reverse<u32>, usize, AgentId)> = None;
        for id in self.agents.idle_ids() {
            let agent = self.agents.get(id)?;
            if agent.capacity < needed {
                continue;
            }
            let Some(distance) = self.motion.planner().distance(&self.grid, agent.pose, goal)
            else {
                continue; // cannot reach the rack at all
            };
            let key = (Reverse(agent.capacity), distance, id);
            if best.is_none_or(|b| key < b) {
                best = Some(key);
            }
        }
        Ok(best.map(|(_, _, id)| id))
    }

    // ── Task construction ─────────────────────────────────────────────────

    /// Create and activate a task for `(agent, rack)` seeded with
    /// `order_id`.
    fn create_task(
        &mut self,
        agent_id: AgentId,
        rack_id: RackId,
        order_id: OrderId,
        _now: Tick,
    ) -> SimResult<TaskId> {
        let task_id = self.tasks.create(agent_id, rack_id);
        self.racks.get_mut(rack_id)?.allocate(agent_id)?;

        let priority = self
            .tasks
            .get(task_id)
            .ok_or(SimError::TaskNotFound(task_id))?
            .priority();
        {
            let agent = self.agents.get_mut(agent_id)?;
            agent.task = Some(task_id);
            agent.priority = priority;
        }
        self.tasks
            .get_mut(task_id)
            .ok_or(SimError::TaskNotFound(task_id))?
            .activate();

        let attached = self.attach_order(task_id, order_id)?;
        debug_assert!(attached, "selected rack must serve the seeding order");
        info!(task = %task_id, agent = %agent_id, rack = %rack_id, "task activated");
        Ok(task_id)
    }

    /// Attach as much of `order_id`'s unassigned demand to `task_id` as the
    /// task's rack can serve.  Reservation is atomic: the share is computed
    /// from unreserved stock first, then booked in full.
    ///
    /// Returns `false` (and changes nothing) when the task cannot
    /// contribute.
    pub(crate) fn attach_order(&mut self, task_id: TaskId, order_id: OrderId) -> SimResult<bool> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or(SimError::TaskNotFound(task_id))?;
        let rack_id = task.rack;
        let agent_id = task.agent;

        let order = self
            .orders
            .get(order_id)
            .ok_or(SimError::OrderNotFound(order_id))?;
        let gate = order.gate;
        let kind = order.kind;

        let share: ItemMultiset = match kind {
            OrderKind::Collect => {
                let rack = self.racks.get(rack_id)?;
                order
                    .unassigned()
                    .iter()
                    .filter_map(|(&item, &qty)| {
                        let available = rack.available(item).min(qty);
                        (available > 0).then_some((item, available))
                    })
                    .collect()
            }
            OrderKind::Refill => {
                // Capacity was reserved at admission; the whole remainder
                // rides along, but only on the designated rack.
                if order.rack != Some(rack_id) {
                    return Ok(false);
                }
                order.unassigned().clone()
            }
        };
        if share.is_empty() {
            return Ok(false);
        }

        if kind == OrderKind::Collect {
            let rack = self.racks.get_mut(rack_id)?;
            for (&item, &qty) in &share {
                rack.reserve_outgoing(item, qty)?;
            }
        }

        self.orders
            .get_mut(order_id)
            .ok_or(SimError::OrderNotFound(order_id))?
            .on_task_assigned(task_id, &share);
        self.tasks
            .get_mut(task_id)
            .ok_or(SimError::TaskNotFound(task_id))?
            .add_order(order_id, gate, share);

        self.logs.push(LogMsg::task_assigned(
            task_id.0, order_id.0, agent_id.0, rack_id.0,
        ));
        Ok(true)
    }

    /// Fold every compatible pending order into a freshly created task.
    fn fold_pending_orders(&mut self, task_id: TaskId) -> SimResult<()> {
        let queue: Vec<OrderId> = self.pending_orders.iter().copied().collect();
        for order_id in queue {
            let accepting = self
                .tasks
                .get(task_id)
                .is_some_and(|t| t.accepting_orders());
            if !accepting {
                break;
            }
            if self.orders.get(order_id).is_some_and(|o| o.has_unassigned()) {
                self.attach_order(task_id, order_id)?;
            }
        }
        Ok(())
    }
}
