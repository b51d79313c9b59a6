use thiserror::Error;

use wh_core::CellPos;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no path from {from} to {to}")]
    Unreachable { from: CellPos, to: CellPos },

    #[error("start pose {0} is outside the map")]
    StartOutOfBounds(CellPos),
}

pub type PlanResult<T> = Result<T, PlanError>;
