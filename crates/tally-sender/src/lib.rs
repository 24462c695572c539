//! tally-sender — ships agent reports to the server.
//!
//! Every metric in a [`Report`](tally_core::Report) is encoded as JSON,
//! gzip-compressed and POSTed to `/update/` on its own. Failed attempts
//! are retried under a [`RetryPolicy`]; one metric failing does not stop
//! the others.
//!
//! # Architecture
//!
//! ```text
//! ReportSender::send(report)
//!   └── for each metric
//!         └── RetryPolicy::run ── post_once() ── hyper http1 connection
//!                 │
//!                 └── Backoff::delay(attempt) between failures
//! ```
//!
//! Transport errors and 5xx responses are retried; a 4xx response means
//! the server rejected the metric and is returned immediately.

pub mod endpoint;
pub mod error;
pub mod retry;
pub mod sender;

pub use endpoint::ServerEndpoint;
pub use error::{SendError, SendResult};
pub use retry::{Backoff, Retryable, RetryPolicy};
pub use sender::{ReportSender, WireFormat, send_path};
