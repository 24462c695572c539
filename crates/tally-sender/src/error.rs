//! Error types for report delivery.

use http::StatusCode;
use thiserror::Error;

use crate::retry::Retryable;

/// Result type alias for delivery operations.
pub type SendResult<T> = Result<T, SendError>;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to encode metric: {0}")]
    Encode(String),

    #[error("unsupported scheme {0:?}, only http is spoken")]
    UnsupportedScheme(String),

    #[error("connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl Retryable for SendError {
    fn is_retryable(&self) -> bool {
        match self {
            SendError::Encode(_) | SendError::UnsupportedScheme(_) => false,
            SendError::Connect { .. } | SendError::Request(_) => true,
            SendError::Status { status, .. } => status.is_server_error(),
        }
    }
}
