use thiserror::Error;

use wh_core::{GateId, ItemId, OrderId, RackId};
use wh_entity::EntityError;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order {0} already exists")]
    DuplicateOrder(OrderId),

    #[error("order {order}: unknown item {item}")]
    UnknownItem { order: OrderId, item: ItemId },

    #[error("order {order}: unknown gate {gate}")]
    UnknownGate { order: OrderId, gate: GateId },

    #[error("order {order}: unknown rack {rack}")]
    UnknownRack { order: OrderId, rack: RackId },

    #[error("refill order {0} names no rack")]
    MissingRack(OrderId),

    #[error("order {0} requests no items")]
    EmptyOrder(OrderId),

    /// Collect demand exceeds the unreserved units of the listed items.
    #[error("collect order {order} infeasible: short on {short:?}")]
    InfeasibleCollect { order: OrderId, short: Vec<ItemId> },

    /// The refill would push the rack past capacity by `excess` weight units.
    #[error("refill order {order} infeasible: rack {rack} over capacity by {excess}")]
    InfeasibleRefill { order: OrderId, rack: RackId, excess: u32 },

    #[error(transparent)]
    Entity(#[from] EntityError),
}

pub type OrderResult<T> = Result<T, OrderError>;
