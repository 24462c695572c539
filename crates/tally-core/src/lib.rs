//! tally-core — types shared by the tally server and agent.
//!
//! - [`MetricKind`] / [`MetricValue`] — the closed set of metric kinds and
//!   their payloads (counter deltas accumulate, gauge values replace).
//! - [`MetricPayload`] — the JSON wire form exchanged over HTTP.
//! - [`Report`] — agent-side batch of metrics built per poll cycle.
//! - [`Endpoint`] — `host:port` address used by both binaries.

pub mod endpoint;
pub mod error;
pub mod types;

pub use endpoint::Endpoint;
pub use error::{EndpointError, MetricError, MetricResult};
pub use types::*;
