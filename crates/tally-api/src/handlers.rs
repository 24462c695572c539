//! Update, lookup and health handlers.
//!
//! Validation failures are `400` with a plain-text reason; lookups that
//! miss are `404`.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tally_core::{Metric, MetricKind, MetricPayload, MetricValue};
use tracing::{debug, warn};

use crate::ApiState;

fn reject(status: StatusCode, msg: impl Into<String>) -> Response {
    let msg = msg.into();
    debug!(%status, reason = %msg, "request rejected");
    (status, msg).into_response()
}

fn parse_payload(body: &[u8]) -> Result<MetricPayload, Response> {
    serde_json::from_slice(body)
        .map_err(|e| reject(StatusCode::BAD_REQUEST, format!("malformed metric: {e}")))
}

// ── Updates ────────────────────────────────────────────────────

/// POST /update/{type}/{name}/{value}
pub async fn update_path(
    State(state): State<ApiState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> Response {
    let kind = match kind.parse::<MetricKind>() {
        Ok(kind) => kind,
        Err(e) => return reject(StatusCode::BAD_REQUEST, e.to_string()),
    };
    if name.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "metric name is required");
    }
    let value = match kind.parse_value(&value) {
        Ok(value) => value,
        Err(e) => return reject(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match value {
        MetricValue::Counter(delta) => state.store.update_counter(&name, delta),
        MetricValue::Gauge(value) => state.store.update_gauge(&name, value),
    }
    debug!(%kind, %name, %value, "metric updated");
    StatusCode::OK.into_response()
}

/// POST /update
///
/// Echoes the accepted metric back as JSON.
pub async fn update_json(State(state): State<ApiState>, body: Bytes) -> Response {
    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(resp) => return resp,
    };
    let metric = match payload.to_metric() {
        Ok(metric) => metric,
        Err(e) => return reject(StatusCode::BAD_REQUEST, e.to_string()),
    };

    state.store.apply(&metric);
    debug!(kind = %metric.kind(), name = %metric.name, value = %metric.value, "metric updated");
    Json(MetricPayload::from(&metric)).into_response()
}

// ── Lookups ────────────────────────────────────────────────────

/// POST /value
pub async fn value_json(State(state): State<ApiState>, body: Bytes) -> Response {
    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(resp) => return resp,
    };
    if !payload.is_readable() {
        return reject(StatusCode::BAD_REQUEST, "metric id is required");
    }

    match state.store.get(payload.kind, &payload.id) {
        Some(value) => {
            let metric = Metric {
                name: payload.id,
                value,
            };
            Json(MetricPayload::from(&metric)).into_response()
        }
        None => reject(
            StatusCode::NOT_FOUND,
            format!("{} {} not found", payload.kind, payload.id),
        ),
    }
}

/// GET /value/{type}/{name}
pub async fn value_path(
    State(state): State<ApiState>,
    Path((kind, name)): Path<(String, String)>,
) -> Response {
    let kind = match kind.parse::<MetricKind>() {
        Ok(kind) => kind,
        Err(e) => return reject(StatusCode::BAD_REQUEST, e.to_string()),
    };
    match state.store.get(kind, &name) {
        Some(value) => value.to_string().into_response(),
        None => reject(StatusCode::NOT_FOUND, format!("{kind} {name} not found")),
    }
}

// ── Health ─────────────────────────────────────────────────────

/// GET /ping
pub async fn ping(State(state): State<ApiState>) -> impl IntoResponse {
    let Some(pool) = state.db.as_ref() else {
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "database not configured");
    };
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => {
            warn!(error = %e, "database ping failed");
            reject(StatusCode::INTERNAL_SERVER_ERROR, "database unreachable")
        }
    }
}
