//! Agent configuration from flags and environment.

use std::time::Duration;

use clap::Parser;
use tally_core::Endpoint;

#[derive(Parser, Debug, Clone)]
#[command(name = "tally-agent", about = "Tally metrics agent")]
pub struct AgentConfig {
    /// Server address, `host:port`.
    #[arg(short = 'a', long = "address", env = "ADDRESS", default_value = "localhost:8080")]
    pub address: Endpoint,

    /// Seconds between polls.
    #[arg(
        short = 'p',
        long = "poll-interval",
        env = "POLL_INTERVAL",
        default_value_t = 2,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,

    /// Seconds between reports.
    #[arg(
        short = 'r',
        long = "report-interval",
        env = "REPORT_INTERVAL",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub report_interval: u64,

    /// Log filter directive.
    #[arg(short = 'l', long = "log-level", env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl AgentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval)
    }
}
