//! Typed message bodies for both directions of the channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WarehouseConfig;

// ── Inbound ───────────────────────────────────────────────────────────────────

/// Inbound envelope `type` codes.
pub mod inbound_types {
    pub const START: u8 = 1;
    pub const STOP: u8 = 2;
    pub const PAUSE: u8 = 3;
    pub const RESUME: u8 = 4;
    pub const ORDER: u8 = 5;
    pub const CONTROL: u8 = 6;
    pub const ACK_UPDATE: u8 = 7;
}

/// Outbound envelope `type` codes.
pub mod outbound_types {
    pub const ACK_START: u8 = 100;
    pub const ACK_RESUME: u8 = 101;
    pub const ACK_ORDER: u8 = 102;
    pub const UPDATE: u8 = 103;
    pub const MSG: u8 = 104;
}

/// A decoded inbound message, ready for the controller's command queue.
#[derive(Debug)]
pub enum Inbound {
    Start(StartMsg),
    Stop,
    Pause,
    Resume,
    Order(OrderMsg),
    Control(ControlMsg),
    AckUpdate,
}

#[derive(Debug, Deserialize)]
pub struct StartMsg {
    /// 0 = simulation (ACK-gated ticks), 1 = deployment (hardware-paced).
    pub mode: u8,
    /// The full warehouse configuration.
    pub state: WarehouseConfig,
}

/// `ORDER.type` codes.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OrderKindCode {
    Collect = 0,
    Refill = 1,
}

#[derive(Debug, Deserialize)]
pub struct OrderMsg {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: u8,
    pub gate_id: u32,
    #[serde(default)]
    pub rack_id: Option<u32>,
    pub items: Vec<ItemQty>,
}

impl OrderMsg {
    pub fn kind_code(&self) -> Option<OrderKindCode> {
        match self.kind {
            0 => Some(OrderKindCode::Collect),
            1 => Some(OrderKindCode::Refill),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ItemQty {
    pub id: u32,
    pub quantity: u32,
}

/// `CONTROL.type` codes.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ControlKind {
    Activate = 0,
    Deactivate = 1,
}

#[derive(Debug, Deserialize)]
pub struct ControlMsg {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: u8,
}

impl ControlMsg {
    pub fn kind_code(&self) -> Option<ControlKind> {
        match self.kind {
            0 => Some(ControlKind::Activate),
            1 => Some(ControlKind::Deactivate),
            _ => None,
        }
    }
}

// ── Outbound ──────────────────────────────────────────────────────────────────

/// One agent action inside an UPDATE: `{ type, id }`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionMsg {
    #[serde(rename = "type")]
    pub kind: u8,
    pub id: u32,
}

/// Log entry `type` codes inside an UPDATE.
pub mod log_types {
    pub const TASK_ASSIGNED: u8 = 0;
    pub const TASK_COMPLETED: u8 = 1;
    pub const ORDER_FULFILLED: u8 = 2;
    pub const BATTERY_UPDATED: u8 = 3;
}

/// One log entry inside an UPDATE: `{ type, data }`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogMsg {
    #[serde(rename = "type")]
    pub kind: u8,
    pub data: Value,
}

impl LogMsg {
    pub fn task_assigned(task: u32, order: u32, agent: u32, rack: u32) -> Self {
        Self {
            kind: log_types::TASK_ASSIGNED,
            data: serde_json::json!({
                "task_id": task, "order_id": order, "agent_id": agent, "rack_id": rack,
            }),
        }
    }

    pub fn task_completed(task: u32, agent: u32, rack: u32) -> Self {
        Self {
            kind: log_types::TASK_COMPLETED,
            data: serde_json::json!({ "task_id": task, "agent_id": agent, "rack_id": rack }),
        }
    }

    pub fn order_fulfilled(order: u32) -> Self {
        Self {
            kind: log_types::ORDER_FULFILLED,
            data: serde_json::json!({ "order_id": order }),
        }
    }

    pub fn battery_updated(agent: u32, level: u8) -> Self {
        Self {
            kind: log_types::BATTERY_UPDATED,
            data: serde_json::json!({ "agent_id": agent, "level": level }),
        }
    }
}

/// Statistics keys inside an UPDATE.  Semantics are passthrough counters.
pub mod stat_keys {
    pub const ORDERS_FULFILLED: u8 = 0;
    pub const ACTIVE_TASKS: u8 = 1;
}

/// One statistics entry: `{ key, value }`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatMsg {
    pub key: u8,
    pub value: u64,
}

/// The per-tick UPDATE batch.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct UpdateMsg {
    pub timestep: u64,
    pub actions: Vec<ActionMsg>,
    pub logs: Vec<LogMsg>,
    pub statistics: Vec<StatMsg>,
}

impl UpdateMsg {
    /// `true` when the tick produced no observable event — such a tick
    /// sends no UPDATE and arms no gate.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.logs.is_empty()
    }
}
