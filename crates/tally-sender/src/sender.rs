//! ReportSender — delivers each metric of a report to the server.

use std::io::Write;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use http::{Method, Request, header};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use tally_core::{Metric, MetricPayload, Report};
use tracing::{debug, warn};

use crate::endpoint::ServerEndpoint;
use crate::error::{SendError, SendResult};
use crate::retry::RetryPolicy;

/// How a metric is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// JSON body POSTed to `/update/`.
    #[default]
    Json,
    /// Empty POST to `/update/{type}/{name}/{value}`.
    Path,
}

/// Sends reports to a [`ServerEndpoint`] under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct ReportSender {
    endpoint: ServerEndpoint,
    policy: RetryPolicy,
    format: WireFormat,
    compress: bool,
}

impl ReportSender {
    /// JSON, gzip-compressed, default retry policy.
    pub fn new(endpoint: ServerEndpoint) -> Self {
        Self {
            endpoint,
            policy: RetryPolicy::default(),
            format: WireFormat::Json,
            compress: true,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    /// Deliver every metric in `report`.
    ///
    /// Each metric is attempted independently. Returns the last error seen,
    /// if any.
    pub async fn send(&self, report: &Report) -> SendResult<()> {
        let mut last_err = None;
        let mut delivered = 0usize;
        for metric in report.iter() {
            match self.send_metric(metric).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(metric = %metric.name, error = %e, "metric dropped");
                    last_err = Some(e);
                }
            }
        }
        debug!(delivered, total = report.len(), "report sent");
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Deliver one metric, retrying per policy.
    pub async fn send_metric(&self, metric: &Metric) -> SendResult<()> {
        let (path, body) = match self.format {
            WireFormat::Json => {
                let json = serde_json::to_vec(&MetricPayload::from(metric))
                    .map_err(|e| SendError::Encode(e.to_string()))?;
                ("/update/".to_string(), json)
            }
            WireFormat::Path => (send_path(metric), Vec::new()),
        };
        let body = if self.compress && !body.is_empty() {
            gzip(&body)?
        } else {
            body
        };
        let body = Bytes::from(body);

        self.policy
            .run(|attempt| {
                debug!(metric = %metric.name, attempt, %path, "sending metric");
                self.post_once(&path, body.clone())
            })
            .await
    }

    async fn post_once(&self, path: &str, body: Bytes) -> SendResult<()> {
        if !self.endpoint.is_plain_http() {
            return Err(SendError::UnsupportedScheme(self.endpoint.scheme.clone()));
        }
        let address = self.endpoint.authority();
        let uri = self.endpoint.create_url(path);

        let stream = tokio::net::TcpStream::connect(&address)
            .await
            .map_err(|e| SendError::Connect {
                address: address.clone(),
                reason: e.to_string(),
            })?;
        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| SendError::Connect {
                address: address.clone(),
                reason: e.to_string(),
            })?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(&uri)
            .header(header::HOST, &address)
            .header(header::USER_AGENT, "tally-agent/0.1");
        builder = match self.format {
            WireFormat::Json => builder.header(header::CONTENT_TYPE, "application/json"),
            WireFormat::Path => builder.header(header::CONTENT_TYPE, "text/plain"),
        };
        if self.compress && !body.is_empty() {
            builder = builder.header(header::CONTENT_ENCODING, "gzip");
        }
        let req = builder
            .body(Full::new(body))
            .map_err(|e| SendError::Request(e.to_string()))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| SendError::Request(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = match resp.into_body().collect().await {
            Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).trim().to_string(),
            Err(_) => String::new(),
        };
        Err(SendError::Status { status, body })
    }
}

/// `/update/{type}/{name}/{value}` for the plain-text route.
pub fn send_path(metric: &Metric) -> String {
    format!(
        "/update/{}/{}/{}",
        metric.kind(),
        urlencoding::encode(&metric.name),
        metric.value
    )
}

fn gzip(data: &[u8]) -> SendResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SendError::Encode(e.to_string()))?;
    encoder.finish().map_err(|e| SendError::Encode(e.to_string()))
}
