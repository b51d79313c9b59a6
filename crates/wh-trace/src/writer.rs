//! The `TraceWriter` trait implemented by all backend writers.

use crate::{ActionRow, LogRow, TraceResult};

/// Trait implemented by the CSV and SQLite trace writers.
pub trait TraceWriter {
    /// Write a batch of action rows (one tick's worth).
    fn write_actions(&mut self, rows: &[ActionRow]) -> TraceResult<()>;

    /// Write a batch of log rows (one tick's worth).
    fn write_logs(&mut self, rows: &[LogRow]) -> TraceResult<()>;

    /// Flush and close all underlying handles.
    ///
    /// Idempotent — safe to call more than once.
    fn finish(&mut self) -> TraceResult<()>;
}
