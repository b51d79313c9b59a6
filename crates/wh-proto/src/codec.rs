//! Envelope encode/decode.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ProtoError, ProtoResult};
use crate::msg::{
    inbound_types, outbound_types, ControlMsg, Inbound, OrderMsg, StartMsg, UpdateMsg,
};

/// ACK `status` values.
pub mod status {
    pub const OK: u8 = 0;
    pub const ERROR: u8 = 1;
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    data: Value,
}

// ── Decode ────────────────────────────────────────────────────────────────────

/// Decode one inbound JSON message into a typed [`Inbound`].
///
/// Any shape problem — not an object, missing/unknown `type`, payload that
/// does not deserialize — is a [`ProtoError::Format`]; nothing panics on
/// client input.
pub fn decode_inbound(raw: &str) -> ProtoResult<Inbound> {
    let envelope: Envelope =
        serde_json::from_str(raw).map_err(|e| ProtoError::Format(e.to_string()))?;
    decode_envelope(envelope)
}

/// Like [`decode_inbound`] but starting from an already-parsed [`Value`].
pub fn decode_inbound_value(raw: Value) -> ProtoResult<Inbound> {
    let envelope: Envelope =
        serde_json::from_value(raw).map_err(|e| ProtoError::Format(e.to_string()))?;
    decode_envelope(envelope)
}

fn decode_envelope(envelope: Envelope) -> ProtoResult<Inbound> {
    let data = envelope.data;
    match envelope.kind {
        inbound_types::START => {
            let msg: StartMsg = from_data(data)?;
            msg.state.validate()?;
            Ok(Inbound::Start(msg))
        }
        inbound_types::STOP => Ok(Inbound::Stop),
        inbound_types::PAUSE => Ok(Inbound::Pause),
        inbound_types::RESUME => Ok(Inbound::Resume),
        inbound_types::ORDER => {
            let msg: OrderMsg = from_data(data)?;
            if msg.kind_code().is_none() {
                return Err(ProtoError::InvalidArgs {
                    reason: "unknown order type".to_string(),
                    id: Some(msg.id),
                });
            }
            Ok(Inbound::Order(msg))
        }
        inbound_types::CONTROL => {
            let msg: ControlMsg = from_data(data)?;
            if msg.kind_code().is_none() {
                return Err(ProtoError::InvalidArgs {
                    reason: "unknown control type".to_string(),
                    id: Some(msg.id),
                });
            }
            Ok(Inbound::Control(msg))
        }
        inbound_types::ACK_UPDATE => Ok(Inbound::AckUpdate),
        other => Err(ProtoError::Format(format!("unknown message type {other}"))),
    }
}

fn from_data<T: serde::de::DeserializeOwned>(data: Value) -> ProtoResult<T> {
    serde_json::from_value(data).map_err(|e| ProtoError::Format(e.to_string()))
}

// ── Encode ────────────────────────────────────────────────────────────────────

fn envelope(kind: u8, data: Value) -> Value {
    json!({ "type": kind, "data": data })
}

/// Encode an ACK envelope of `ack_type`; `Ok` becomes `{ status: OK }`,
/// an error becomes `{ status: ERROR, msg: { reason, id, args } }`.
pub fn encode_ack(ack_type: u8, result: Result<(), &ProtoError>) -> Value {
    match result {
        Ok(()) => envelope(ack_type, json!({ "status": status::OK })),
        Err(err) => {
            let args = err.error_args();
            envelope(
                ack_type,
                json!({
                    "status": status::ERROR,
                    "msg": { "reason": args.reason, "id": args.id, "args": args.args },
                }),
            )
        }
    }
}

/// Encode a per-tick UPDATE batch.
pub fn encode_update(update: &UpdateMsg) -> Value {
    envelope(
        outbound_types::UPDATE,
        serde_json::to_value(update).unwrap_or(Value::Null),
    )
}

/// Encode an out-of-band MSG error (fatal path).
pub fn encode_msg(err: &ProtoError) -> Value {
    let args = err.error_args();
    envelope(
        outbound_types::MSG,
        json!({ "reason": args.reason, "id": args.id, "args": args.args }),
    )
}
