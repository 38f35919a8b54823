use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("{0}")]
    Other(String),
}
