//! The item catalog.
//!
//! Weights and quantities are integers.  An item's `total_units` counts the
//! physical units present across all racks; `reserved_units` counts the
//! units admitted collect orders have claimed but not yet received.  The
//! difference is what a new collect order may claim.

use rustc_hash::FxHashMap;

use wh_core::ItemId;

use crate::error::{EntityError, EntityResult};

// ── Item ──────────────────────────────────────────────────────────────────────

/// One item kind.
#[derive(Clone, Debug)]
pub struct Item {
    pub id: ItemId,
    /// Weight of a single unit.
    pub unit_weight: u32,
    /// Physical units present across all racks.
    pub total_units: u32,
    /// Units claimed by admitted, undelivered collect orders.
    pub reserved_units: u32,
}

impl Item {
    pub fn new(id: ItemId, unit_weight: u32) -> Self {
        Self { id, unit_weight, total_units: 0, reserved_units: 0 }
    }

    /// Units a new collect order may still claim.
    #[inline]
    pub fn available_units(&self) -> u32 {
        self.total_units - self.reserved_units
    }
}

// ── ItemStore ─────────────────────────────────────────────────────────────────

/// The catalog, keyed by client-assigned `ItemId`.
#[derive(Default)]
pub struct ItemStore {
    inner: FxHashMap<ItemId, Item>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item kind from the START configuration.
    pub fn insert(&mut self, item: Item) {
        self.inner.insert(item.id, item);
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.inner.contains_key(&id)
    }

    pub fn get(&self, id: ItemId) -> EntityResult<&Item> {
        self.inner.get(&id).ok_or(EntityError::ItemNotFound(id))
    }

    pub fn get_mut(&mut self, id: ItemId) -> EntityResult<&mut Item> {
        self.inner.get_mut(&id).ok_or(EntityError::ItemNotFound(id))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    // ── Reservation ledger ────────────────────────────────────────────────

    /// Claim `qty` units for an admitted collect order.
    ///
    /// Fails without mutating when fewer than `qty` unreserved units exist.
    pub fn reserve(&mut self, id: ItemId, qty: u32) -> EntityResult<()> {
        let item = self.get_mut(id)?;
        let have = item.available_units();
        if qty > have {
            return Err(EntityError::InsufficientUnits { item: id, want: qty, have });
        }
        item.reserved_units += qty;
        Ok(())
    }

    /// Release a claim made by [`reserve`](Self::reserve) (order rolled back).
    pub fn unreserve(&mut self, id: ItemId, qty: u32) -> EntityResult<()> {
        let item = self.get_mut(id)?;
        debug_assert!(item.reserved_units >= qty);
        item.reserved_units = item.reserved_units.saturating_sub(qty);
        Ok(())
    }

    /// Units leave the warehouse at a gate: drop both the physical count and
    /// the reservation that covered them.
    pub fn deliver_out(&mut self, id: ItemId, qty: u32) -> EntityResult<()> {
        let item = self.get_mut(id)?;
        debug_assert!(item.total_units >= qty && item.reserved_units >= qty);
        item.total_units = item.total_units.saturating_sub(qty);
        item.reserved_units = item.reserved_units.saturating_sub(qty);
        Ok(())
    }

    /// Units enter the warehouse: initial rack stocking or refill delivery.
    pub fn deliver_in(&mut self, id: ItemId, qty: u32) -> EntityResult<()> {
        self.get_mut(id)?.total_units += qty;
        Ok(())
    }
}
