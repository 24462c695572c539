//! tallyd — the Tally metric server.
//!
//! Assembles the server subsystems:
//! - Metric store (in memory)
//! - Snapshot persistence (periodic or write-through)
//! - Optional Postgres pool for `/ping`
//! - HTTP API
//!
//! # Usage
//!
//! ```text
//! tallyd -a localhost:8080 -i 300 -f values.json -r true
//! ```

mod config;

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tally_api::{ApiState, build_router};
use tally_store::{MetricStore, PersistenceManager};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("invalid log level {:?}", config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        address = %config.address,
        store_interval = config.store_interval,
        path = ?config.file_storage_path,
        restore = config.restore,
        "tallyd starting"
    );

    // ── Store and persistence ──────────────────────────────────

    let store = MetricStore::new();
    let persistence =
        PersistenceManager::new(store.clone(), &config.file_storage_path, config.persist_mode());

    if config.restore {
        persistence
            .restore()
            .with_context(|| format!("restoring {}", config.file_storage_path.display()))?;
        info!(path = ?config.file_storage_path, "snapshot restored");
    }

    // ── Database ───────────────────────────────────────────────

    let db = config.database_dsn.as_deref().and_then(connect_db);

    // ── Start API server ───────────────────────────────────────

    let mut state = ApiState::new(store).with_persistence(persistence.clone());
    if let Some(db) = db {
        state = state.with_db(db);
    }
    let router = build_router(state);

    let listener = TcpListener::bind((config.address.host.as_str(), config.address.port))
        .await
        .with_context(|| format!("binding {}", config.address))?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    serve(listener, router, persistence, async {
        shutdown_signal().await;
        info!("shutdown signal received");
    })
    .await?;

    info!("tallyd stopped");
    Ok(())
}

/// Serve `router` alongside the persistence task until `signal` resolves.
///
/// Persistence is told to stop only after in-flight requests have drained,
/// so its final flush covers every acknowledged update.
async fn serve(
    listener: TcpListener,
    router: Router,
    persistence: PersistenceManager,
    signal: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let persistence_handle = tokio::spawn(async move {
        persistence.run(shutdown_rx).await;
    });

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(signal)
        .await;

    let _ = shutdown_tx.send(true);
    let _ = persistence_handle.await;
    served
}

fn connect_db(dsn: &str) -> Option<PgPool> {
    match PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy(dsn)
    {
        Ok(pool) => {
            info!("database pool configured");
            Some(pool)
        }
        Err(e) => {
            warn!(error = %e, "invalid database DSN, /ping will fail");
            None
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
