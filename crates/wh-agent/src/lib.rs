//! `wh-agent` — agent runtime state and the movement coordinator.
//!
//! # The coordination core
//!
//! All agents move on one shared grid, one action per tick.  Three
//! mechanisms keep that safe:
//!
//! - **Next-cell resolution** — a `Move` commits only if the target cell is
//!   free *right now*; planning treats other agents as traversable and the
//!   conflict is resolved here, live.
//! - **Slide** — a lower-priority agent in the way is asked to vacate: along
//!   its own planned direction first, else by turning, recursing through
//!   chains of agents.  A per-tick sliding mark bounds the recursion.
//! - **Block / recover** — when an agent's last (not yet acknowledged)
//!   action must be taken back — deactivation, or a downstream failure —
//!   the action is undone geometrically, recursively displacing whoever
//!   moved into the vacated cell; `recover` later replays it forward.
//!
//! Every pose-changing or flag-changing primitive is recorded in the
//! [`ActionRecorder`]; the controller drains it into the per-tick UPDATE.

pub mod agent;
pub mod error;
pub mod motion;
pub mod recorder;
pub mod store;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use agent::{Agent, IDLE_PRIORITY};
pub use error::{AgentError, AgentResult};
pub use motion::{MotionCtx, MotionEngine, ReachStatus};
pub use recorder::{ActionRecord, ActionRecorder};
pub use store::AgentStore;
