//! Error types for snapshot persistence.

use thiserror::Error;

/// Result type alias for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while storing or restoring a snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open snapshot file: {0}")]
    Open(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("malformed snapshot: {0}")]
    Deserialize(String),

    #[error("persistence task failed: {0}")]
    Task(String),
}
