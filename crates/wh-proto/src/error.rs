//! The stable wire error taxonomy.

use serde_json::{json, Value};
use thiserror::Error;

/// Stable numeric codes carried in ACK/MSG error payloads.  Never renumber.
pub mod codes {
    pub const MSG_FORMAT: u8 = 1;
    pub const MSG_UNEXPECTED: u8 = 2;
    pub const INVALID_ARGS: u8 = 3;
    pub const RACK_CAP_EXCEEDED: u8 = 4;
    pub const ORDER_INFEASIBLE_COLLECT: u8 = 5;
    pub const ORDER_INFEASIBLE_REFILL: u8 = 6;
    pub const SERVER: u8 = 7;
}

/// Machine-readable args attached to an error ACK: `{ reason, id, args }`.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorArgs {
    pub reason: u8,
    pub id: Option<u32>,
    pub args: Value,
}

/// Every way an inbound message can be rejected or a session can fail.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// The payload is not a well-formed envelope or its data does not
    /// decode.
    #[error("malformed message: {0}")]
    Format(String),

    /// A structurally valid message arrived in a state that cannot accept
    /// it (e.g. ACK_UPDATE with no armed gate, ORDER while idle).
    #[error("unexpected message: {0}")]
    Unexpected(String),

    /// Decoded fine but names unknown entities or inconsistent values.
    #[error("invalid arguments: {reason}")]
    InvalidArgs { reason: String, id: Option<u32> },

    /// A rack in the START config is stocked past its capacity.
    #[error("rack {rack} over capacity by {excess}")]
    RackCapExceeded { rack: u32, excess: u32 },

    /// A collect order asks for more than the unreserved stock of the
    /// listed items.
    #[error("collect order {order} infeasible")]
    InfeasibleCollect { order: u32, short: Vec<u32> },

    /// A refill order would overflow the designated rack by `excess`.
    #[error("refill order {order} infeasible for rack {rack}")]
    InfeasibleRefill { order: u32, rack: u32, excess: u32 },

    /// Fatal: unexpected internal failure or transport I/O failure.
    #[error("server error: {0}")]
    Server(String),
}

impl ProtoError {
    /// The stable wire code for this error.
    pub fn wire_code(&self) -> u8 {
        match self {
            ProtoError::Format(_)              => codes::MSG_FORMAT,
            ProtoError::Unexpected(_)          => codes::MSG_UNEXPECTED,
            ProtoError::InvalidArgs { .. }     => codes::INVALID_ARGS,
            ProtoError::RackCapExceeded { .. } => codes::RACK_CAP_EXCEEDED,
            ProtoError::InfeasibleCollect { .. } => codes::ORDER_INFEASIBLE_COLLECT,
            ProtoError::InfeasibleRefill { .. }  => codes::ORDER_INFEASIBLE_REFILL,
            ProtoError::Server(_)              => codes::SERVER,
        }
    }

    /// The `{ reason, id, args }` triple for the ACK payload.
    pub fn error_args(&self) -> ErrorArgs {
        match self {
            ProtoError::Format(_) | ProtoError::Unexpected(_) | ProtoError::Server(_) => {
                ErrorArgs { reason: self.wire_code(), id: None, args: json!([]) }
            }
            ProtoError::InvalidArgs { id, .. } => {
                ErrorArgs { reason: self.wire_code(), id: *id, args: json!([]) }
            }
            ProtoError::RackCapExceeded { rack, excess } => ErrorArgs {
                reason: self.wire_code(),
                id: Some(*rack),
                args: json!([excess]),
            },
            ProtoError::InfeasibleCollect { order, short } => ErrorArgs {
                reason: self.wire_code(),
                id: Some(*order),
                args: json!([short]),
            },
            ProtoError::InfeasibleRefill { order, rack, excess } => ErrorArgs {
                reason: self.wire_code(),
                id: Some(*order),
                args: json!([rack, excess]),
            },
        }
    }
}

pub type ProtoResult<T> = Result<T, ProtoError>;
