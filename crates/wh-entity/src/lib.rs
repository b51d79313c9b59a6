//! `wh-entity` — the item catalog and the facility objects.
//!
//! # Reservation ledger
//!
//! Three counters keep promised goods from being promised twice:
//!
//! | Counter                          | Covers                                    | Reserved at     | Released at      |
//! |----------------------------------|-------------------------------------------|-----------------|------------------|
//! | `Item::reserved_units`           | admitted, undelivered collect demand      | order admission | gate delivery    |
//! | `Rack::reserved_outgoing`        | stock promised to a running task          | task activation | gate delivery    |
//! | `Rack::reserved_incoming_weight` | capacity promised to a refill order       | order admission | gate delivery    |
//!
//! # Binding vs. allocation
//!
//! *Allocation* is the dispatcher-level claim: a rack is allocated to the
//! task's agent for the task's whole lifetime.  *Binding* is the physical
//! claim: the agent is on the facility's cell and exclusively controls it.
//! A rack can be allocated but not (yet) bound; it is never bound without
//! being allocated.

pub mod error;
pub mod gate;
pub mod items;
pub mod rack;
pub mod station;
pub mod stores;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{EntityError, EntityResult};
pub use gate::Gate;
pub use items::{Item, ItemStore};
pub use rack::Rack;
pub use station::Station;
pub use stores::{GateStore, RackStore, StationStore};
