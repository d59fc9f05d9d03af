use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanopyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No frames match the query")]
    NoData,

    #[error("Band '{band}' not present on frame")]
    BandMissing { band: String },

    #[error("Band '{band}' already exists on frame")]
    DuplicateBand { band: String },

    #[error("Grid shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Frames do not share the same spatial reference")]
    GridMismatch,

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Duplicate region label '{0}'")]
    DuplicateRegion(String),

    #[error("Invalid grid file: {0}")]
    InvalidGrid(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Query cancelled")]
    Cancelled,

    #[error("Query timed out")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, CanopyError>;
