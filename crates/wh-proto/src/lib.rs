//! `wh-proto` — the thin boundary between the JSON channel and the core.
//!
//! Every message on the channel is an envelope `{ "type": int, "data":
//! object }`.  This crate decodes inbound envelopes into typed values the
//! controller consumes, validates the START configuration structurally, and
//! encodes the controller's replies and per-tick UPDATE batches.
//!
//! Exceptions never cross this boundary: malformed input becomes
//! [`ProtoError::Format`], out-of-state input becomes
//! [`ProtoError::Unexpected`], and every error carries a stable wire code
//! plus machine-readable args for the typed ACK it produces.
//!
//! # Wire codes
//!
//! | Direction | Message      | `type` |
//! |-----------|--------------|--------|
//! | inbound   | START        | 1      |
//! | inbound   | STOP         | 2      |
//! | inbound   | PAUSE        | 3      |
//! | inbound   | RESUME       | 4      |
//! | inbound   | ORDER        | 5      |
//! | inbound   | CONTROL      | 6      |
//! | inbound   | ACK_UPDATE   | 7      |
//! | outbound  | ACK_START    | 100    |
//! | outbound  | ACK_RESUME   | 101    |
//! | outbound  | ACK_ORDER    | 102    |
//! | outbound  | UPDATE       | 103    |
//! | outbound  | MSG          | 104    |

pub mod codec;
pub mod config;
pub mod error;
pub mod msg;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use codec::{decode_inbound, decode_inbound_value, encode_ack, encode_msg, encode_update};
pub use config::{CellConfig, ItemConfig, MapConfig, ObjectConfig, WarehouseConfig};
pub use error::{codes, ErrorArgs, ProtoError, ProtoResult};
pub use msg::{
    ActionMsg, ControlKind, ControlMsg, Inbound, ItemQty, LogMsg, OrderKindCode, OrderMsg,
    StartMsg, StatMsg, UpdateMsg,
};
