//! Write-through flushing for mutating routes.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::error;

use crate::ApiState;

/// Runs the handler, then stores a snapshot if the request succeeded and
/// the server is in write-through mode.
///
/// A failed flush is logged; the update itself stays applied and the
/// client still gets the handler's response.
pub async fn flush_after_write(State(state): State<ApiState>, req: Request, next: Next) -> Response {
    let resp = next.run(req).await;
    if !resp.status().is_success() {
        return resp;
    }
    if let Some(persistence) = state.persistence.as_ref().filter(|p| p.is_write_through()) {
        if let Err(e) = persistence.store_async().await {
            error!(error = %e, path = ?persistence.path(), "write-through snapshot failed");
        }
    }
    resp
}
