//! CSV trace backend.
//!
//! Creates two files in the configured output directory:
//! - `actions.csv`
//! - `logs.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::TraceWriter;
use crate::{ActionRow, LogRow, TraceResult};

/// Writes the UPDATE stream to two CSV files.
pub struct CsvTraceWriter {
    actions: Writer<File>,
    logs: Writer<File>,
    finished: bool,
}

impl CsvTraceWriter {
    /// Open (or create) the two CSV files in `dir` and write header rows.
    pub fn new(dir: &Path) -> TraceResult<Self> {
        let mut actions = Writer::from_path(dir.join("actions.csv"))?;
        actions.write_record(["timestep", "seq", "agent_id", "action"])?;

        let mut logs = Writer::from_path(dir.join("logs.csv"))?;
        logs.write_record(["timestep", "seq", "kind", "data"])?;

        Ok(Self { actions, logs, finished: false })
    }
}

impl TraceWriter for CsvTraceWriter {
    fn write_actions(&mut self, rows: &[ActionRow]) -> TraceResult<()> {
        for row in rows {
            self.actions.write_record(&[
                row.timestep.to_string(),
                row.seq.to_string(),
                row.agent_id.to_string(),
                row.action.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_logs(&mut self, rows: &[LogRow]) -> TraceResult<()> {
        for row in rows {
            self.logs.write_record(&[
                row.timestep.to_string(),
                row.seq.to_string(),
                row.kind.to_string(),
                row.data.clone(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> TraceResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.actions.flush()?;
        self.logs.flush()?;
        Ok(())
    }
}
