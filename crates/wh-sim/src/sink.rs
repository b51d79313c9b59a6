//! The outbound message sink.

use serde_json::Value;

/// Consumer of outbound JSON messages (UPDATEs, ACKs, MSGs).
///
/// The transport implements this; tests use [`VecSink`].  A send failure is
/// fatal for the session: the executor transitions the warehouse to IDLE.
pub trait UpdateSink {
    fn send(&mut self, msg: &Value) -> std::io::Result<()>;
}

/// An [`UpdateSink`] that buffers every message, for tests and tooling.
#[derive(Default)]
pub struct VecSink {
    pub messages: Vec<Value>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of the given envelope `type` code, in send order.
    pub fn of_type(&self, kind: u8) -> Vec<&Value> {
        self.messages
            .iter()
            .filter(|m| m["type"] == serde_json::json!(kind))
            .collect()
    }
}

impl UpdateSink for VecSink {
    fn send(&mut self, msg: &Value) -> std::io::Result<()> {
        self.messages.push(msg.clone());
        Ok(())
    }
}
