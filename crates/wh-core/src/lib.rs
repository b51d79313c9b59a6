//! `wh-core` — foundational types for the warehouse fleet simulator.
//!
//! This crate is a dependency of every other `wh-*` crate.  It intentionally
//! has no `wh-*` dependencies and no external ones.
//!
//! # What lives here
//!
//! | Module      | Contents                                                |
//! |-------------|---------------------------------------------------------|
//! | [`ids`]     | `AgentId`, `RackId`, `GateId`, `StationId`, `ItemId`,   |
//! |             | `OrderId`, `TaskId`, `FacilityId`                       |
//! | [`pose`]    | `Direction`, `CellPos`, `Pose`, pose/action arithmetic  |
//! | [`time`]    | `Tick`                                                  |
//! | [`action`]  | `Action` — the primitive agent actions + wire codes     |

pub mod action;
pub mod ids;
pub mod pose;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use action::Action;
pub use ids::{AgentId, FacilityId, GateId, ItemId, OrderId, RackId, StationId, TaskId};
pub use pose::{CellPos, Direction, Pose};
pub use time::Tick;
