//! tally-agent — samples this process and reports to a Tally server.
//!
//! # Usage
//!
//! ```text
//! tally-agent -a localhost:8080 -p 2 -r 10
//! ```

mod agent;
mod config;

use anyhow::Context;
use clap::Parser;
use tally_collector::{Collector, CountingAllocator};
use tally_sender::{ReportSender, ServerEndpoint};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::agent::Agent;
use crate::config::AgentConfig;

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AgentConfig::parse();

    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("invalid log level {:?}", config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let endpoint = ServerEndpoint::from(&config.address);
    info!(server = %endpoint, "tally-agent starting");

    let agent = Agent::new(
        Collector::new(),
        ReportSender::new(endpoint),
        config.poll_interval(),
        config.report_interval(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let agent_handle = tokio::spawn(agent.run(shutdown_rx));

    shutdown_signal().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = agent_handle.await;

    info!("tally-agent stopped");
    Ok(())
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
