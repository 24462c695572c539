//! tally-api — HTTP surface of the metric server.
//!
//! Translates requests into [`MetricStore`] operations. In write-through
//! mode every successful mutating request is followed by a snapshot flush.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/update/{type}/{name}/{value}` | Update one metric from the path |
//! | POST | `/update`, `/update/` | Update one metric from a JSON body |
//! | POST | `/value`, `/value/` | Look a metric up from a JSON body |
//! | GET | `/value/{type}/{name}` | Look a metric up, plain-text value |
//! | GET | `/` | HTML table of every metric |
//! | GET | `/ping` | Database connectivity check |
//!
//! Gzip request bodies are decompressed and responses are gzip-compressed
//! for clients that accept it.

pub mod handlers;
pub mod listing;
pub mod persist;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use sqlx::PgPool;
use tally_store::{MetricStore, PersistenceManager};
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: MetricStore,
    /// Present when the server persists snapshots.
    pub persistence: Option<PersistenceManager>,
    /// Present when a database DSN was configured.
    pub db: Option<PgPool>,
}

impl ApiState {
    pub fn new(store: MetricStore) -> Self {
        Self {
            store,
            persistence: None,
            db: None,
        }
    }

    pub fn with_persistence(mut self, persistence: PersistenceManager) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_db(mut self, db: PgPool) -> Self {
        self.db = Some(db);
        self
    }
}

/// Build the complete router.
pub fn build_router(state: ApiState) -> Router {
    let writes = Router::new()
        .route("/update", post(handlers::update_json))
        .route("/update/", post(handlers::update_json))
        .route("/update/{kind}/{name}/{value}", post(handlers::update_path))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            persist::flush_after_write,
        ));

    Router::new()
        .merge(writes)
        .route("/value", post(handlers::value_json))
        .route("/value/", post(handlers::value_json))
        .route("/value/{kind}/{name}", get(handlers::value_path))
        .route("/", get(listing::list_metrics))
        .route("/ping", get(handlers::ping))
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
