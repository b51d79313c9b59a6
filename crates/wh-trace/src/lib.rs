//! `wh-trace` — offline recording of the per-tick UPDATE stream.
//!
//! Two backends behind Cargo features:
//!
//! | Feature  | Backend | Files created               |
//! |----------|---------|-----------------------------|
//! | *(none)* | CSV     | `actions.csv`, `logs.csv`   |
//! | `sqlite` | SQLite  | `trace.db`                  |
//!
//! Both implement [`TraceWriter`] and are driven by [`TraceSink`], which
//! implements `wh_sim::UpdateSink` and can therefore stand in for (or wrap)
//! the real transport — useful for replaying and inspecting sessions
//! without a connected observer.

pub mod csv;
pub mod error;
pub mod row;
pub mod sink;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use self::csv::CsvTraceWriter;
pub use error::{TraceError, TraceResult};
pub use row::{ActionRow, LogRow};
pub use sink::TraceSink;
pub use writer::TraceWriter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTraceWriter;
