//! Dispatcher tasks and the step deque.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use wh_core::{AgentId, FacilityId, GateId, OrderId, RackId, TaskId};

use crate::order::ItemMultiset;

// ── TaskStep ──────────────────────────────────────────────────────────────────

/// One stage of a task's lifetime.
///
/// `SelectGate` is a placeholder: it resolves — at execution time, against
/// the agent's current pose — into `Bind` of the nearest gate that still has
/// queued orders.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TaskStep {
    Bind(FacilityId),
    Unbind(FacilityId),
    SelectGate,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TaskStatus {
    Inactive,
    Active,
    Fulfilled,
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// One agent, one rack, one or more orders.
///
/// The step deque of a fresh task is `[Bind(rack), Unbind(rack)]`; every
/// accepted order inserts a `SelectGate` ahead of the trailing unbind, so
/// the first order yields the canonical
/// `[Bind(rack), SelectGate, Unbind(rack)]` shape.
#[derive(Clone, Debug)]
pub struct Task {
    pub id: TaskId,
    pub agent: AgentId,
    pub rack: RackId,
    pub status: TaskStatus,

    steps: VecDeque<TaskStep>,
    /// Per-gate FIFO of orders awaiting delivery.
    gate_queues: FxHashMap<GateId, VecDeque<OrderId>>,
    /// This task's planned contribution per order.
    planned: FxHashMap<OrderId, ItemMultiset>,
    running_orders: u32,
}

impl Task {
    pub fn new(id: TaskId, agent: AgentId, rack: RackId) -> Self {
        let mut steps = VecDeque::with_capacity(4);
        steps.push_back(TaskStep::Bind(FacilityId::Rack(rack)));
        steps.push_back(TaskStep::Unbind(FacilityId::Rack(rack)));
        Self {
            id,
            agent,
            rack,
            status: TaskStatus::Inactive,
            steps,
            gate_queues: FxHashMap::default(),
            planned: FxHashMap::default(),
            running_orders: 0,
        }
    }

    /// The task's scheduling priority — smaller runs earlier.  Creation
    /// order (the task id) is the priority.
    #[inline]
    pub fn priority(&self) -> u32 {
        self.id.0
    }

    pub fn activate(&mut self) {
        self.status = TaskStatus::Active;
    }

    // ── Orders ────────────────────────────────────────────────────────────

    /// `true` while new orders may still be folded in: the task has not yet
    /// begun returning the rack.
    pub fn accepting_orders(&self) -> bool {
        self.status != TaskStatus::Fulfilled
            && self.steps.back() == Some(&TaskStep::Unbind(FacilityId::Rack(self.rack)))
    }

    /// Fold an order in: queue it at its gate, record the planned share,
    /// and insert a `SelectGate` ahead of the trailing rack unbind.
    ///
    /// Call only while [`accepting_orders`](Self::accepting_orders).
    pub fn add_order(&mut self, order: OrderId, gate: GateId, share: ItemMultiset) {
        debug_assert!(self.accepting_orders());
        self.gate_queues.entry(gate).or_default().push_back(order);
        self.planned.insert(order, share);
        self.running_orders += 1;
        let at = self.steps.len().saturating_sub(1);
        self.steps.insert(at, TaskStep::SelectGate);
    }

    /// Gates that still have queued orders, in ascending id order.
    pub fn pending_gates(&self) -> Vec<GateId> {
        let mut gates: Vec<GateId> = self
            .gate_queues
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|(&g, _)| g)
            .collect();
        gates.sort_unstable();
        gates
    }

    /// Pop the next order queued at `gate`.
    pub fn pop_gate_order(&mut self, gate: GateId) -> Option<OrderId> {
        let order = self.gate_queues.get_mut(&gate)?.pop_front();
        if order.is_some() {
            self.running_orders = self.running_orders.saturating_sub(1);
        }
        order
    }

    /// `true` if more orders are queued at `gate`.
    pub fn has_orders_at(&self, gate: GateId) -> bool {
        self.gate_queues.get(&gate).is_some_and(|q| !q.is_empty())
    }

    /// This task's planned contribution to `order`.
    pub fn planned_share(&self, order: OrderId) -> Option<&ItemMultiset> {
        self.planned.get(&order)
    }

    /// Orders queued but not yet delivered, with their planned shares.
    /// Used when a task is cancelled and its claims must be rolled back.
    pub fn undelivered(&self) -> Vec<(OrderId, ItemMultiset)> {
        let mut out: Vec<(OrderId, ItemMultiset)> = self
            .gate_queues
            .values()
            .flatten()
            .filter_map(|&o| self.planned.get(&o).map(|s| (o, s.clone())))
            .collect();
        out.sort_unstable_by_key(|&(o, _)| o);
        out
    }

    pub fn running_orders(&self) -> u32 {
        self.running_orders
    }

    // ── Steps ─────────────────────────────────────────────────────────────

    pub fn peek_step(&self) -> Option<&TaskStep> {
        self.steps.front()
    }

    pub fn pop_step(&mut self) -> Option<TaskStep> {
        self.steps.pop_front()
    }

    /// Replace the front `SelectGate` with `Bind(gate)`.
    pub fn resolve_select_gate(&mut self, gate: GateId) {
        debug_assert_eq!(self.steps.front(), Some(&TaskStep::SelectGate));
        self.steps.pop_front();
        self.steps.push_front(TaskStep::Bind(FacilityId::Gate(gate)));
    }

    /// Push a step to run next (another gate bind, or the gate unbind).
    pub fn push_next_step(&mut self, step: TaskStep) {
        self.steps.push_front(step);
    }

    pub fn steps_remaining(&self) -> usize {
        self.steps.len()
    }

    pub fn is_done(&self) -> bool {
        self.steps.is_empty()
    }
}

// ── TaskStore ─────────────────────────────────────────────────────────────────

/// Task registry; ids are sequential so they double as priorities.
#[derive(Default)]
pub struct TaskStore {
    inner: FxHashMap<TaskId, Task>,
    next_id: u32,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh task for `(agent, rack)` and return its id.
    pub fn create(&mut self, agent: AgentId, rack: RackId) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.inner.insert(id, Task::new(id, agent, rack));
        id
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.inner.get(&id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.inner.get_mut(&id)
    }

    /// Remove a finished task from the registry.
    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        self.inner.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.inner.values()
    }

    /// Ids in ascending (creation/priority) order, for deterministic scans.
    pub fn sorted_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.inner.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
