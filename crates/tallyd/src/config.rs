//! Server configuration from flags and environment.
//!
//! Flags take precedence over environment variables, which take
//! precedence over the defaults.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tally_core::Endpoint;
use tally_store::PersistMode;

#[derive(Parser, Debug, Clone)]
#[command(name = "tallyd", about = "Tally metric server")]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    #[arg(short = 'a', long = "address", env = "ADDRESS", default_value = "localhost:8080")]
    pub address: Endpoint,

    /// Snapshot interval in seconds; 0 flushes after every update.
    #[arg(short = 'i', long = "store-interval", env = "STORE_INTERVAL", default_value_t = 300)]
    pub store_interval: u64,

    /// Snapshot file path.
    #[arg(short = 'f', long = "file-storage-path", env = "FILE_STORAGE_PATH", default_value = "values.json")]
    pub file_storage_path: PathBuf,

    /// Restore the snapshot at startup. Only "true" enables it.
    #[arg(
        short = 'r',
        long = "restore",
        env = "RESTORE",
        default_value = "false",
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = parse_restore,
    )]
    pub restore: bool,

    /// Log filter directive, e.g. `info` or `tallyd=debug`.
    #[arg(short = 'l', long = "log-level", env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Postgres DSN used by `/ping`.
    #[arg(short = 'd', long = "database-dsn", env = "DATABASE_DSN")]
    pub database_dsn: Option<String>,
}

impl ServerConfig {
    pub fn persist_mode(&self) -> PersistMode {
        PersistMode::from_interval_secs(self.store_interval)
    }
}

fn parse_restore(s: &str) -> Result<bool, String> {
    Ok(s == "true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(args: &[&str]) -> ServerConfig {
        ServerConfig::try_parse_from(std::iter::once("tallyd").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&["-a", "127.0.0.1:9090", "-i", "0", "-f", "/tmp/m.json", "-r", "true", "-l", "debug"]);
        assert_eq!(config.address, Endpoint::new("127.0.0.1", 9090));
        assert_eq!(config.persist_mode(), PersistMode::WriteThrough);
        assert_eq!(config.file_storage_path, PathBuf::from("/tmp/m.json"));
        assert!(config.restore);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn periodic_interval() {
        let config = parse(&["-i", "5"]);
        assert_eq!(config.persist_mode(), PersistMode::Periodic(Duration::from_secs(5)));
    }

    #[test]
    fn restore_only_accepts_true() {
        assert!(parse(&["-r"]).restore);
        assert!(parse(&["-r", "true"]).restore);
        assert!(!parse(&["-r", "false"]).restore);
        assert!(!parse(&["-r", "yes"]).restore);
        assert!(!parse(&["-r", "TRUE"]).restore);
    }

    #[test]
    fn rejects_malformed_address() {
        let err = ServerConfig::try_parse_from(["tallyd", "-a", "127.0.0.18080"]);
        assert!(err.is_err());
        let err = ServerConfig::try_parse_from(["tallyd", "-a", "localhost:http"]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_negative_interval() {
        assert!(ServerConfig::try_parse_from(["tallyd", "-i", "-1"]).is_err());
    }
}
