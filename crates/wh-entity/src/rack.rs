//! Movable storage racks.

use rustc_hash::FxHashMap;

use wh_core::{AgentId, CellPos, ItemId, Pose, RackId};

use crate::error::{EntityError, EntityResult};
use crate::items::ItemStore;

/// A weight-bounded, movable storage rack.
///
/// `pos` is the rack's home cell.  While an agent carries the rack the
/// position does not change — a task always ends by returning the rack, so
/// the home cell stays reserved for it (its cell keeps `CellKind::Rack`).
#[derive(Clone, Debug)]
pub struct Rack {
    pub id: RackId,
    pub pos: CellPos,
    /// Maximum stored weight (items only, excluding the container itself).
    pub capacity: u32,
    /// Weight of the empty rack, counted against the carrying agent's load
    /// capacity.
    pub container_weight: u32,

    stored: FxHashMap<ItemId, u32>,
    reserved_outgoing: FxHashMap<ItemId, u32>,
    reserved_incoming_weight: u32,

    bound_to: Option<AgentId>,
    allocated_to: Option<AgentId>,
}

impl Rack {
    pub fn new(id: RackId, pos: CellPos, capacity: u32, container_weight: u32) -> Self {
        Self {
            id,
            pos,
            capacity,
            container_weight,
            stored: FxHashMap::default(),
            reserved_outgoing: FxHashMap::default(),
            reserved_incoming_weight: 0,
            bound_to: None,
            allocated_to: None,
        }
    }

    // ── Stock queries ─────────────────────────────────────────────────────

    /// Physical units of `item` on this rack.
    pub fn quantity(&self, item: ItemId) -> u32 {
        self.stored.get(&item).copied().unwrap_or(0)
    }

    /// Units of `item` not yet promised to a task.
    pub fn available(&self, item: ItemId) -> u32 {
        self.quantity(item) - self.reserved_outgoing.get(&item).copied().unwrap_or(0)
    }

    /// Iterator over `(item, physical units)` pairs.
    pub fn stored_items(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.stored.iter().map(|(&id, &qty)| (id, qty))
    }

    /// Current stored weight: Σ quantity × unit weight.
    pub fn stored_weight(&self, items: &ItemStore) -> u32 {
        self.stored
            .iter()
            .map(|(&id, &qty)| {
                let w = items.get(id).map(|i| i.unit_weight).unwrap_or(0);
                qty * w
            })
            .sum()
    }

    /// Capacity weight currently promised to admitted refill orders.
    pub fn reserved_incoming_weight(&self) -> u32 {
        self.reserved_incoming_weight
    }

    /// Stored weight plus capacity already promised to refill orders.
    /// A new refill order must fit under `capacity` with this included.
    pub fn projected_weight(&self, items: &ItemStore) -> u32 {
        self.stored_weight(items) + self.reserved_incoming_weight
    }

    /// What an agent must be able to carry to move this rack.
    pub fn carry_weight(&self, items: &ItemStore) -> u32 {
        self.container_weight + self.stored_weight(items)
    }

    // ── Stock mutation ────────────────────────────────────────────────────

    /// Put `qty` units of `item` onto the rack (initial stocking or refill
    /// delivery).
    pub fn store(&mut self, item: ItemId, qty: u32) {
        *self.stored.entry(item).or_insert(0) += qty;
    }

    /// Promise `qty` units of `item` to a task.  Fails without mutating when
    /// the unreserved stock is short.
    pub fn reserve_outgoing(&mut self, item: ItemId, qty: u32) -> EntityResult<()> {
        let have = self.available(item);
        if qty > have {
            return Err(EntityError::InsufficientStock { rack: self.id, item, want: qty, have });
        }
        *self.reserved_outgoing.entry(item).or_insert(0) += qty;
        Ok(())
    }

    /// Undo [`reserve_outgoing`](Self::reserve_outgoing) (task cancelled).
    pub fn unreserve_outgoing(&mut self, item: ItemId, qty: u32) {
        if let Some(q) = self.reserved_outgoing.get_mut(&item) {
            *q = q.saturating_sub(qty);
            if *q == 0 {
                self.reserved_outgoing.remove(&item);
            }
        }
    }

    /// Hand promised units over at a gate: stock and promise both shrink.
    pub fn deliver_outgoing(&mut self, item: ItemId, qty: u32) {
        self.unreserve_outgoing(item, qty);
        if let Some(q) = self.stored.get_mut(&item) {
            *q = q.saturating_sub(qty);
            if *q == 0 {
                self.stored.remove(&item);
            }
        }
    }

    /// Promise `weight` of capacity to a refill order.
    pub fn reserve_incoming(&mut self, weight: u32) {
        self.reserved_incoming_weight += weight;
    }

    /// Undo [`reserve_incoming`](Self::reserve_incoming).
    pub fn unreserve_incoming(&mut self, weight: u32) {
        self.reserved_incoming_weight = self.reserved_incoming_weight.saturating_sub(weight);
    }

    /// Receive refill units at the gate: stock grows, the capacity promise
    /// is consumed.
    pub fn deliver_incoming(&mut self, item: ItemId, qty: u32, weight: u32) {
        self.store(item, qty);
        self.unreserve_incoming(weight);
    }

    // ── Allocation (dispatcher level) ─────────────────────────────────────

    pub fn allocated_to(&self) -> Option<AgentId> {
        self.allocated_to
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated_to.is_some()
    }

    /// Claim the rack for `agent`'s task.
    pub fn allocate(&mut self, agent: AgentId) -> EntityResult<()> {
        if let Some(holder) = self.allocated_to {
            return Err(EntityError::AlreadyAllocated { rack: self.id, agent: holder });
        }
        self.allocated_to = Some(agent);
        Ok(())
    }

    pub fn deallocate(&mut self) {
        self.allocated_to = None;
    }

    // ── Binding (execution level) ─────────────────────────────────────────

    pub fn bound_to(&self) -> Option<AgentId> {
        self.bound_to
    }

    /// Racks bind coincident: the agent must stand on the rack cell.
    #[inline]
    pub fn is_coincident(&self, pose: Pose) -> bool {
        pose.pos == self.pos
    }

    /// Bindable by `agent`: coincident, allocated to `agent`, not bound.
    pub fn can_bind(&self, agent: AgentId, pose: Pose) -> bool {
        self.is_coincident(pose) && self.allocated_to == Some(agent) && self.bound_to.is_none()
    }

    pub fn bind(&mut self, agent: AgentId) -> EntityResult<()> {
        if let Some(holder) = self.bound_to {
            return Err(EntityError::AlreadyBound(holder));
        }
        self.bound_to = Some(agent);
        Ok(())
    }

    /// Releasable: bound, and the carrier has returned to the home cell.
    pub fn can_unbind(&self, pose: Pose) -> bool {
        self.bound_to.is_some() && self.is_coincident(pose)
    }

    pub fn unbind(&mut self) -> EntityResult<()> {
        if self.bound_to.is_none() {
            return Err(EntityError::NotBound);
        }
        self.bound_to = None;
        Ok(())
    }
}
