//! Checkpoint store error types

use thiserror::Error;

/// Errors from checkpoint store operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Thread not found: {0}")]
    NotFound(String),

    #[error("Thread is busy: {0}")]
    Busy(String),

    #[error("Patch rejected: {0}")]
    PatchRejected(String),

    #[error("Invalid thread id: {0:?}")]
    InvalidThreadId(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for checkpoint store operations
pub type Result<T> = std::result::Result<T, CheckpointError>;
