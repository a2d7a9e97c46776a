use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("file not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid roster: {0}")]
    InvalidRoster(String),
}
