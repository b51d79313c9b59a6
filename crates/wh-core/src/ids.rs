//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  Unlike dense array indices, these
//! values come from the client's warehouse configuration and may be sparse —
//! registries key on them with hash maps rather than `Vec` indexing.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID" — equivalent to `u32::MAX`.
            pub const INVALID: $name = $name(<$inner>::MAX);
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

typed_id! {
    /// Identifier of a mobile robot agent.
    pub struct AgentId(u32);
}

typed_id! {
    /// Identifier of a movable storage rack.
    pub struct RackId(u32);
}

typed_id! {
    /// Identifier of a delivery gate.
    pub struct GateId(u32);
}

typed_id! {
    /// Identifier of a charging station.
    pub struct StationId(u32);
}

typed_id! {
    /// Identifier of an item kind in the catalog.
    pub struct ItemId(u32);
}

typed_id! {
    /// Identifier of a customer order.  Assigned by the client.
    pub struct OrderId(u32);
}

typed_id! {
    /// Identifier of a dispatcher-created task.  Sequential from 0; doubles
    /// as the task's priority (earlier tasks run first).
    pub struct TaskId(u32);
}

// ── FacilityId ────────────────────────────────────────────────────────────────

/// A reference to any facility kind.  Cells and task steps hold this instead
/// of an owning reference; the warehouse registries resolve it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FacilityId {
    Rack(RackId),
    Gate(GateId),
    Station(StationId),
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacilityId::Rack(id)    => write!(f, "{id}"),
            FacilityId::Gate(id)    => write!(f, "{id}"),
            FacilityId::Station(id) => write!(f, "{id}"),
        }
    }
}
