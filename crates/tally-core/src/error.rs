//! Error types for metric parsing and endpoint addresses.

use thiserror::Error;

use crate::types::MetricKind;

/// Result type alias for metric validation.
pub type MetricResult<T> = Result<T, MetricError>;

/// Errors raised while building or validating a metric.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    #[error("unknown metric type: {0}")]
    UnknownKind(String),

    #[error("invalid {kind} value {raw:?}: {reason}")]
    InvalidValue {
        kind: MetricKind,
        raw: String,
        reason: String,
    },

    #[error("metric name is empty")]
    EmptyName,

    #[error("{kind} metric {name:?} carries no {field}")]
    MissingPayload {
        kind: MetricKind,
        name: String,
        field: &'static str,
    },
}

/// Errors raised while parsing a `host:port` address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("endpoint {0:?} must have exactly one ':' divider")]
    Format(String),

    #[error("invalid port in endpoint {input:?}: {reason}")]
    Port { input: String, reason: String },
}
