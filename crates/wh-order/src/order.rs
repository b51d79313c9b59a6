//! Orders and the order registry with admission feasibility.

use rustc_hash::FxHashMap;

use wh_core::{GateId, ItemId, OrderId, RackId, TaskId};
use wh_entity::{GateStore, ItemStore, RackStore};

use crate::error::{OrderError, OrderResult};

/// An `item → quantity` multiset.  Zero-quantity entries are never stored.
pub type ItemMultiset = FxHashMap<ItemId, u32>;

// ── Order ─────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OrderKind {
    /// Remove items from racks and hand them over at the gate.
    Collect,
    /// Receive items at the gate and add them to one designated rack.
    Refill,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OrderStatus {
    Inactive,
    Active,
    Fulfilled,
}

/// A customer order against one gate.
#[derive(Clone, Debug)]
pub struct Order {
    pub id: OrderId,
    pub kind: OrderKind,
    pub gate: GateId,
    /// The designated rack of a refill order; `None` for collect orders.
    pub rack: Option<RackId>,
    pub status: OrderStatus,

    pending: ItemMultiset,
    unassigned: ItemMultiset,
    tasks: Vec<TaskId>,
    open_tasks: u32,
}

impl Order {
    pub fn collect(id: OrderId, gate: GateId, items: ItemMultiset) -> Self {
        Self::new(id, OrderKind::Collect, gate, None, items)
    }

    pub fn refill(id: OrderId, gate: GateId, rack: RackId, items: ItemMultiset) -> Self {
        Self::new(id, OrderKind::Refill, gate, Some(rack), items)
    }

    fn new(
        id: OrderId,
        kind: OrderKind,
        gate: GateId,
        rack: Option<RackId>,
        items: ItemMultiset,
    ) -> Self {
        let items: ItemMultiset = items.into_iter().filter(|&(_, q)| q > 0).collect();
        Self {
            id,
            kind,
            gate,
            rack,
            status: OrderStatus::Inactive,
            pending: items.clone(),
            unassigned: items,
            tasks: Vec::new(),
            open_tasks: 0,
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Undelivered units per item.
    pub fn pending(&self) -> &ItemMultiset {
        &self.pending
    }

    /// Units not yet covered by any task.
    pub fn unassigned(&self) -> &ItemMultiset {
        &self.unassigned
    }

    pub fn has_unassigned(&self) -> bool {
        !self.unassigned.is_empty()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.status == OrderStatus::Fulfilled
    }

    pub fn tasks(&self) -> &[TaskId] {
        &self.tasks
    }

    pub fn open_tasks(&self) -> u32 {
        self.open_tasks
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// A task takes responsibility for `share` of the unassigned units.
    pub fn on_task_assigned(&mut self, task: TaskId, share: &ItemMultiset) {
        for (&item, &qty) in share {
            if let Some(q) = self.unassigned.get_mut(&item) {
                *q = q.saturating_sub(qty);
                if *q == 0 {
                    self.unassigned.remove(&item);
                }
            }
        }
        self.tasks.push(task);
        self.open_tasks += 1;
    }

    /// A task delivered `share` of this order at the gate.
    ///
    /// Returns `true` if the order just became fulfilled.
    pub fn on_task_complete(&mut self, share: &ItemMultiset) -> bool {
        for (&item, &qty) in share {
            if let Some(q) = self.pending.get_mut(&item) {
                *q = q.saturating_sub(qty);
                if *q == 0 {
                    self.pending.remove(&item);
                }
            }
        }
        self.open_tasks = self.open_tasks.saturating_sub(1);
        if self.pending.is_empty() && self.open_tasks == 0 {
            self.status = OrderStatus::Fulfilled;
            true
        } else {
            false
        }
    }

    /// A task was cancelled before delivering: its share returns to the
    /// unassigned pool so the dispatcher can reassign it.
    pub fn on_task_cancelled(&mut self, share: &ItemMultiset) {
        for (&item, &qty) in share {
            *self.unassigned.entry(item).or_insert(0) += qty;
        }
        self.open_tasks = self.open_tasks.saturating_sub(1);
    }
}

// ── OrderStore ────────────────────────────────────────────────────────────────

/// Order registry plus the admission check.
///
/// Admission is atomic: a rejected order leaves the catalog and racks
/// untouched; an accepted order has its full demand reserved (item units for
/// collect, rack capacity weight for refill) before it is queued.
#[derive(Default)]
pub struct OrderStore {
    inner: FxHashMap<OrderId, Order>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.inner.get(&id)
    }

    pub fn get_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.inner.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.inner.values()
    }

    /// Validate and admit `order`, reserving its demand.
    ///
    /// On success the order is stored with status `Active` and its id is
    /// returned for the caller to enqueue.
    pub fn admit(
        &mut self,
        mut order: Order,
        items: &mut ItemStore,
        racks: &mut RackStore,
        gates: &GateStore,
    ) -> OrderResult<OrderId> {
        if self.inner.contains_key(&order.id) {
            return Err(OrderError::DuplicateOrder(order.id));
        }
        if order.pending.is_empty() {
            return Err(OrderError::EmptyOrder(order.id));
        }
        if !gates.contains(order.gate) {
            return Err(OrderError::UnknownGate { order: order.id, gate: order.gate });
        }
        for &item in order.pending.keys() {
            if !items.contains(item) {
                return Err(OrderError::UnknownItem { order: order.id, item });
            }
        }

        match order.kind {
            OrderKind::Collect => Self::admit_collect(&order, items)?,
            OrderKind::Refill  => Self::admit_refill(&order, items, racks)?,
        }

        order.status = OrderStatus::Active;
        let id = order.id;
        self.inner.insert(id, order);
        Ok(id)
    }

    /// Feasibility + reservation for a collect order.
    ///
    /// Checks every item first so a failure reserves nothing.
    fn admit_collect(order: &Order, items: &mut ItemStore) -> OrderResult<()> {
        let mut short: Vec<ItemId> = order
            .pending
            .iter()
            .filter(|&(&item, &qty)| {
                items.get(item).map(|i| i.available_units()).unwrap_or(0) < qty
            })
            .map(|(&item, _)| item)
            .collect();
        if !short.is_empty() {
            short.sort_unstable();
            return Err(OrderError::InfeasibleCollect { order: order.id, short });
        }
        for (&item, &qty) in &order.pending {
            items.reserve(item, qty)?;
        }
        Ok(())
    }

    /// Feasibility + reservation for a refill order.
    fn admit_refill(
        order: &Order,
        items: &ItemStore,
        racks: &mut RackStore,
    ) -> OrderResult<()> {
        let rack_id = order.rack.ok_or(OrderError::MissingRack(order.id))?;
        let Ok(rack) = racks.get_mut(rack_id) else {
            return Err(OrderError::UnknownRack { order: order.id, rack: rack_id });
        };

        let weight: u32 = order
            .pending
            .iter()
            .map(|(&item, &qty)| items.get(item).map(|i| i.unit_weight).unwrap_or(0) * qty)
            .sum();

        let projected = rack.projected_weight(items) + weight;
        if projected > rack.capacity {
            return Err(OrderError::InfeasibleRefill {
                order: order.id,
                rack: rack_id,
                excess: projected - rack.capacity,
            });
        }
        rack.reserve_incoming(weight);
        Ok(())
    }
}
