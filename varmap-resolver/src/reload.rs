//! Catalog hot-reload
//!
//! `SnapshotWatcher` polls the catalog file's modification stamp and loads a
//! new snapshot when it changes. A file that cannot be read or fails
//! validation is logged and skipped; the store keeps serving the previous
//! snapshot.

use crate::catalog::load_catalog_file;
use crate::error::Result;
use crate::models::SnapshotInfo;
use crate::store::VariantStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Modification time plus length; either changing counts as a new file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

async fn file_stamp(path: &Path) -> std::io::Result<FileStamp> {
    let metadata = tokio::fs::metadata(path).await?;
    Ok(FileStamp {
        modified: metadata.modified()?,
        len: metadata.len(),
    })
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadStatus {
    /// File stamp unchanged since the last poll
    Unchanged,
    /// New snapshot loaded
    Reloaded(SnapshotInfo),
    /// File changed but was rejected; previous snapshot still active
    Rejected(String),
    /// File could not be inspected
    Unreadable(String),
}

/// Polls a catalog file and swaps snapshots into the store
pub struct SnapshotWatcher {
    store: Arc<VariantStore>,
    path: PathBuf,
    poll_interval: Duration,
    last_seen: Option<FileStamp>,
    /// Set once a missing file has been warned about; cleared when it returns
    unreadable: bool,
}

impl SnapshotWatcher {
    pub fn new(store: Arc<VariantStore>, path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            store,
            path: path.into(),
            poll_interval,
            last_seen: None,
            unreadable: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the catalog now, failing if it is unusable
    ///
    /// Used for the initial load so a bad catalog stops startup instead of
    /// leaving an empty store.
    pub async fn load_now(&mut self) -> Result<SnapshotInfo> {
        let stamp = file_stamp(&self.path).await.ok();
        let info = load_catalog_file(&self.store, &self.path).await?;
        self.last_seen = stamp;
        Ok(info)
    }

    /// Reload if the file changed since the last poll
    pub async fn reload_if_changed(&mut self) -> ReloadStatus {
        let stamp = match file_stamp(&self.path).await {
            Ok(stamp) => stamp,
            Err(e) => {
                if self.unreadable {
                    debug!(path = %self.path.display(), "Catalog file still unavailable: {}", e);
                } else {
                    warn!(path = %self.path.display(), "Catalog file unavailable: {}", e);
                    self.unreadable = true;
                }
                return ReloadStatus::Unreadable(e.to_string());
            }
        };
        if self.unreadable {
            info!(path = %self.path.display(), "Catalog file available again");
            self.unreadable = false;
        }

        if self.last_seen == Some(stamp) {
            return ReloadStatus::Unchanged;
        }
        // Record the stamp even on failure; the next edit retries
        self.last_seen = Some(stamp);

        match load_catalog_file(&self.store, &self.path).await {
            Ok(info) => {
                info!(
                    path = %self.path.display(),
                    version = info.version,
                    variants = info.variant_count,
                    "Catalog reloaded"
                );
                ReloadStatus::Reloaded(info)
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    active_version = self.store.snapshot().version(),
                    "Catalog reload failed, keeping previous snapshot: {}",
                    e
                );
                ReloadStatus::Rejected(e.to_string())
            }
        }
    }

    /// Poll until cancelled
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            path = %self.path.display(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "Starting catalog watcher"
        );

        let mut timer = interval(self.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(path = %self.path.display(), "Catalog watcher stopped");
                    break;
                }
                _ = timer.tick() => {
                    let status = self.reload_if_changed().await;
                    if status == ReloadStatus::Unchanged {
                        debug!("Catalog unchanged");
                    }
                }
            }
        }
    }

    /// Spawn `run` on the tokio runtime
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let store = Arc::new(VariantStore::new());
        let mut watcher = SnapshotWatcher::new(
            store.clone(),
            "/nonexistent/varmap/catalog.json",
            Duration::from_millis(10),
        );
        assert!(matches!(
            watcher.reload_if_changed().await,
            ReloadStatus::Unreadable(_)
        ));
        assert!(watcher.load_now().await.is_err());
        assert_eq!(store.info().version, 0);
    }

    #[tokio::test]
    async fn test_unreadable_warned_once_until_file_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let mut watcher = SnapshotWatcher::new(
            Arc::new(VariantStore::new()),
            &path,
            Duration::from_millis(10),
        );

        assert!(matches!(watcher.reload_if_changed().await, ReloadStatus::Unreadable(_)));
        assert!(watcher.unreadable);
        assert!(matches!(watcher.reload_if_changed().await, ReloadStatus::Unreadable(_)));
        assert!(watcher.unreadable);

        std::fs::write(&path, r#"{"variants": []}"#).unwrap();
        assert!(matches!(watcher.reload_if_changed().await, ReloadStatus::Reloaded(_)));
        assert!(!watcher.unreadable);

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(watcher.reload_if_changed().await, ReloadStatus::Unreadable(_)));
        assert!(watcher.unreadable);
    }

    #[tokio::test]
    async fn test_cancel_stops_watcher() {
        let store = Arc::new(VariantStore::new());
        let watcher = SnapshotWatcher::new(store, "/nonexistent/catalog.json", Duration::from_millis(5));
        let cancel = CancellationToken::new();
        let handle = watcher.spawn(cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("watcher should stop after cancel")
            .unwrap();
    }
}
