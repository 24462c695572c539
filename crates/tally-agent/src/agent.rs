//! Poll/report loop.

use std::time::Duration;

use tally_collector::Collector;
use tally_core::{Metric, Report};
use tally_sender::ReportSender;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Polls on one timer and reports on another.
///
/// Each poll replaces the pending report and bumps the poll count. Each
/// report ships the latest sample plus a `PollCount` counter carrying the
/// polls since the previous report, then resets the count.
pub struct Agent {
    collector: Collector,
    sender: ReportSender,
    poll_interval: Duration,
    report_interval: Duration,
}

impl Agent {
    pub fn new(
        collector: Collector,
        sender: ReportSender,
        poll_interval: Duration,
        report_interval: Duration,
    ) -> Self {
        Self {
            collector,
            sender,
            poll_interval,
            report_interval,
        }
    }

    /// Run until the shutdown signal. Sends still in flight are not
    /// awaited.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            server = %self.sender.endpoint(),
            poll_ms = self.poll_interval.as_millis() as u64,
            report_ms = self.report_interval.as_millis() as u64,
            "agent started"
        );

        let start = Instant::now();
        let mut poll = tokio::time::interval_at(start + self.poll_interval, self.poll_interval);
        let mut report_tick = tokio::time::interval_at(start + self.report_interval, self.report_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        report_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut report = Report::new();
        let mut poll_count: i64 = 0;

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    report = self.collector.poll();
                    poll_count += 1;
                }
                _ = report_tick.tick() => {
                    let mut outgoing = report.clone();
                    outgoing.add(Metric::counter("PollCount", poll_count));
                    poll_count = 0;

                    debug!(metrics = outgoing.len(), "reporting");
                    let sender = self.sender.clone();
                    tokio::spawn(async move {
                        if let Err(e) = sender.send(&outgoing).await {
                            warn!(error = %e, "report delivered partially");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    info!("agent shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_api::{ApiState, build_router};
    use tally_sender::ServerEndpoint;
    use tally_store::MetricStore;

    async fn spawn_server(store: MetricStore) -> ServerEndpoint {
        let router = build_router(ApiState::new(store));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ServerEndpoint::new("http", "127.0.0.1", port)
    }

    #[tokio::test]
    async fn reports_reach_the_server() {
        let store = MetricStore::new();
        let endpoint = spawn_server(store.clone()).await;

        let agent = Agent::new(
            Collector::new(),
            ReportSender::new(endpoint),
            Duration::from_millis(10),
            Duration::from_millis(50),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(agent.run(shutdown_rx));

        let mut delivered = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if store.get_counter("PollCount").unwrap_or(0) > 0 && store.get_gauge("RandomValue").is_some() {
                delivered = true;
                break;
            }
        }

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(delivered, "no report reached the server");
        assert!(store.get_gauge("Alloc").is_some());
        assert!(store.get_gauge("TotalMemory").is_some());
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        // Nothing listens here; the agent must still stop promptly.
        let agent = Agent::new(
            Collector::new(),
            ReportSender::new(ServerEndpoint::new("http", "127.0.0.1", 1)),
            Duration::from_secs(60),
            Duration::from_secs(60),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(agent.run(shutdown_rx));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("agent did not stop")
            .unwrap();
    }
}
