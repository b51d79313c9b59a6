//! SQLite trace backend (feature `sqlite`).
//!
//! Creates a single `trace.db` in the configured output directory with two
//! tables: `actions` and `logs`.

use std::path::Path;

use rusqlite::Connection;

use crate::writer::TraceWriter;
use crate::{ActionRow, LogRow, TraceResult};

/// Writes the UPDATE stream to an SQLite database.
pub struct SqliteTraceWriter {
    conn: Connection,
    finished: bool,
}

impl SqliteTraceWriter {
    /// Open (or create) `trace.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> TraceResult<Self> {
        let conn = Connection::open(dir.join("trace.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS actions (
                 timestep INTEGER NOT NULL,
                 seq      INTEGER NOT NULL,
                 agent_id INTEGER NOT NULL,
                 action   INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS logs (
                 timestep INTEGER NOT NULL,
                 seq      INTEGER NOT NULL,
                 kind     INTEGER NOT NULL,
                 data     TEXT    NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl TraceWriter for SqliteTraceWriter {
    fn write_actions(&mut self, rows: &[ActionRow]) -> TraceResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO actions (timestep, seq, agent_id, action) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.timestep,
                    row.seq,
                    row.agent_id,
                    row.action,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_logs(&mut self, rows: &[LogRow]) -> TraceResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO logs (timestep, seq, kind, data) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![row.timestep, row.seq, row.kind, row.data])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn finish(&mut self) -> TraceResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
