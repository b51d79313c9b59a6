//! `TraceSink<W>` — bridges `wh_sim::UpdateSink` to a [`TraceWriter`].

use serde_json::Value;

use wh_proto::msg::outbound_types;
use wh_proto::UpdateMsg;
use wh_sim::UpdateSink;

use crate::row::flatten;
use crate::writer::TraceWriter;
use crate::TraceError;

/// An [`UpdateSink`] that records every UPDATE envelope through a trace
/// writer.  Non-UPDATE messages (ACKs, MSG) pass through untouched.
///
/// Writer errors do not fail the session: the first one is stored and
/// retrieved with [`take_error`][Self::take_error] after the run.
pub struct TraceSink<W: TraceWriter> {
    writer: W,
    last_error: Option<TraceError>,
}

impl<W: TraceWriter> TraceSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, last_error: None }
    }

    /// Take the stored write error (if any) after the session ends.
    pub fn take_error(&mut self) -> Option<TraceError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files afterwards).
    pub fn into_writer(mut self) -> W {
        let _ = self.writer.finish();
        self.writer
    }

    fn store_err(&mut self, result: crate::TraceResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }

    fn record(&mut self, update: &UpdateMsg) {
        let (actions, logs) = flatten(update);
        if !actions.is_empty() {
            let result = self.writer.write_actions(&actions);
            self.store_err(result);
        }
        if !logs.is_empty() {
            let result = self.writer.write_logs(&logs);
            self.store_err(result);
        }
    }
}

impl<W: TraceWriter> UpdateSink for TraceSink<W> {
    fn send(&mut self, msg: &Value) -> std::io::Result<()> {
        if msg["type"] == serde_json::json!(outbound_types::UPDATE) {
            match serde_json::from_value::<UpdateMsg>(msg["data"].clone()) {
                Ok(update) => self.record(&update),
                Err(e) => self.store_err(Err(TraceError::Io(std::io::Error::other(e)))),
            }
        }
        Ok(())
    }
}
