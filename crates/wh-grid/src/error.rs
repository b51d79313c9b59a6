use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("cell ({row}, {col}) is outside the {height}x{width} map")]
    OutOfBounds { row: i32, col: i32, height: u32, width: u32 },

    #[error("cell ({row}, {col}) already holds an object")]
    CellOccupied { row: i32, col: i32 },
}

pub type GridResult<T> = Result<T, GridError>;
