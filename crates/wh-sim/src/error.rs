use thiserror::Error;

use wh_agent::AgentError;
use wh_core::{OrderId, TaskId};
use wh_entity::EntityError;
use wh_grid::GridError;
use wh_order::OrderError;

/// Internal controller failures.
///
/// These never reach the wire as-is: the executor converts them into a
/// fatal MSG (code SERVER) and idles the warehouse.  Boundary rejections
/// use `wh_proto::ProtoError` instead and never become `SimError`.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),
}

pub type SimResult<T> = Result<T, SimError>;
