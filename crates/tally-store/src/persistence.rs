//! PersistenceManager — writes store snapshots to disk and reads them back.
//!
//! The store lock is held only while the snapshot is copied; encoding and
//! file I/O happen afterwards. Each write goes to its own temp file in the
//! target directory which is then renamed over the target, so a failed
//! flush never leaves a half-written snapshot behind. Flushes are
//! serialized, so the last one to finish carries the newest state.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::error::{StoreError, StoreResult};
use crate::snapshot::Snapshot;
use crate::store::MetricStore;

/// Convert any `Display` error into a `StoreError` variant, prefixed with the path.
macro_rules! map_err {
    ($variant:ident, $path:expr) => {
        |e| StoreError::$variant(format!("{}: {}", $path.display(), e))
    };
}

/// When snapshots are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Flush after every mutating request.
    WriteThrough,
    /// Flush on a fixed timer.
    Periodic(Duration),
}

impl PersistMode {
    /// `0` selects write-through; anything else is a period in seconds.
    pub fn from_interval_secs(secs: u64) -> Self {
        if secs == 0 {
            PersistMode::WriteThrough
        } else {
            PersistMode::Periodic(Duration::from_secs(secs))
        }
    }
}

/// Stores and restores snapshots of a [`MetricStore`] at a fixed path.
#[derive(Debug, Clone)]
pub struct PersistenceManager {
    store: MetricStore,
    path: PathBuf,
    mode: PersistMode,
    flush: Arc<Mutex<()>>,
}

impl PersistenceManager {
    pub fn new(store: MetricStore, path: impl Into<PathBuf>, mode: PersistMode) -> Self {
        Self {
            store,
            path: path.into(),
            mode,
            flush: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> PersistMode {
        self.mode
    }

    pub fn is_write_through(&self) -> bool {
        self.mode == PersistMode::WriteThrough
    }

    /// Write the current snapshot to disk, replacing any previous file.
    pub fn store(&self) -> StoreResult<()> {
        let _flush = self.flush.lock();
        let snapshot = self.store.snapshot();
        let mut bytes = serde_json::to_vec(&snapshot).map_err(map_err!(Serialize, self.path))?;
        bytes.push(b'\n');
        write_replace(&self.path, &bytes)?;
        debug!(
            path = ?self.path,
            gauges = snapshot.gauges.len(),
            counters = snapshot.counters.len(),
            "snapshot stored"
        );
        Ok(())
    }

    /// Load the snapshot file into the store, creating an empty file if
    /// none exists. An empty file leaves the store unchanged.
    pub fn restore(&self) -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(map_err!(Open, self.path))?;

        let mut content = Vec::new();
        file.read_to_end(&mut content).map_err(map_err!(Read, self.path))?;

        if content.iter().all(u8::is_ascii_whitespace) {
            debug!(path = ?self.path, "snapshot file empty, nothing to restore");
            return Ok(());
        }

        let snapshot: Snapshot =
            serde_json::from_slice(&content).map_err(map_err!(Deserialize, self.path))?;
        debug!(
            path = ?self.path,
            gauges = snapshot.gauges.len(),
            counters = snapshot.counters.len(),
            "snapshot restored"
        );
        self.store.replace(snapshot);
        Ok(())
    }

    /// [`store`](Self::store) on the blocking thread pool.
    pub async fn store_async(&self) -> StoreResult<()> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.store())
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Run the flush loop until the shutdown signal, then flush once more.
    ///
    /// In write-through mode there is no timer; the request path flushes
    /// and this task only performs the final flush.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        match self.mode {
            PersistMode::Periodic(interval) => {
                info!(
                    interval_secs = interval.as_secs(),
                    path = ?self.path,
                    "periodic persistence started"
                );
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {
                            if let Err(e) = self.store_async().await {
                                error!(error = %e, "periodic snapshot failed");
                            }
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            }
            PersistMode::WriteThrough => {
                info!(path = ?self.path, "write-through persistence enabled");
                let _ = shutdown.changed().await;
            }
        }

        info!("persistence shutting down");
        // Final snapshot before exit.
        if let Err(e) = self.store_async().await {
            error!(error = %e, "final snapshot failed");
        }
    }
}

/// Write `bytes` to `path` through a temp file in the same directory and an
/// atomic rename.
fn write_replace(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(map_err!(Open, dir))?;
    tmp.write_all(bytes).map_err(map_err!(Write, tmp.path()))?;
    tmp.as_file().sync_all().map_err(map_err!(Write, tmp.path()))?;
    tmp.persist(path).map_err(|e| StoreError::Write(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}
