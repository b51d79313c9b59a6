use thiserror::Error;

use wh_core::{AgentId, GateId, ItemId, RackId, StationId};

#[derive(Debug, Error)]
pub enum EntityError {
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    #[error("rack {0} not found")]
    RackNotFound(RackId),

    #[error("gate {0} not found")]
    GateNotFound(GateId),

    #[error("station {0} not found")]
    StationNotFound(StationId),

    #[error("item {item}: want {want} units, only {have} unreserved")]
    InsufficientUnits { item: ItemId, want: u32, have: u32 },

    #[error("rack {rack}, item {item}: want {want} units, only {have} unreserved")]
    InsufficientStock { rack: RackId, item: ItemId, want: u32, have: u32 },

    #[error("rack {rack}: capacity exceeded by {excess} weight units")]
    CapacityExceeded { rack: RackId, excess: u32 },

    #[error("rack {rack} is already allocated to agent {agent}")]
    AlreadyAllocated { rack: RackId, agent: AgentId },

    #[error("facility is already bound to agent {0}")]
    AlreadyBound(AgentId),

    #[error("facility is not bound")]
    NotBound,
}

pub type EntityResult<T> = Result<T, EntityError>;
