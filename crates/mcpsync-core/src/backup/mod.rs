//! Per-application config backups.
//!
//! Layout: `<root>/<app>/<seq>-<timestamp>.bak` holds the copied bytes and
//! `<root>/<app>/<seq>-<timestamp>.meta.json` describes them. Sequence
//! numbers increase monotonically per application; the oldest backups are
//! pruned once more than `retention` exist.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapter::{AdapterContext, AppAdapter, validate_server};
use crate::config::settings::DEFAULT_BACKUP_RETENTION;
use crate::error::{SyncError, SyncResult};
use crate::fs::{atomic_write, hash_bytes, read_optional};

const BACKUP_EXT: &str = ".bak";
const META_EXT: &str = ".meta.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub app_name: String,
    pub timestamp: DateTime<Utc>,
    pub seq: u64,
    /// The backup copy.
    pub path: PathBuf,
    /// The live file the copy was taken from.
    pub original_path: PathBuf,
    pub content_hash: String,
}

#[derive(Debug)]
pub struct BackupManager {
    root: PathBuf,
    retention: AtomicUsize,
}

impl BackupManager {
    pub fn new(root: PathBuf, retention: usize) -> Self {
        Self {
            root,
            retention: AtomicUsize::new(retention.max(1)),
        }
    }

    pub fn with_default_retention(root: PathBuf) -> Self {
        Self::new(root, DEFAULT_BACKUP_RETENTION)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn retention(&self) -> usize {
        self.retention.load(Ordering::Relaxed)
    }

    pub fn set_retention(&self, retention: usize) {
        self.retention.store(retention.max(1), Ordering::Relaxed);
    }

    fn app_dir(&self, app: &str) -> PathBuf {
        self.root.join(app)
    }

    /// Copy `content` (the current bytes of `original_path`) into a new
    /// backup, then prune. Any failure is reported as `BackupFailed`.
    pub fn snapshot(
        &self,
        app: &str,
        original_path: &Path,
        content: &[u8],
    ) -> SyncResult<BackupEntry> {
        self.write_snapshot(app, original_path, content)
            .map_err(|err| SyncError::BackupFailed {
                app: app.to_string(),
                message: err.to_string(),
            })
    }

    /// Back up a live file if it exists.
    pub fn snapshot_file(&self, app: &str, original_path: &Path) -> SyncResult<Option<BackupEntry>> {
        match read_optional(original_path)? {
            Some(content) => self.snapshot(app, original_path, &content).map(Some),
            None => Ok(None),
        }
    }

    fn write_snapshot(
        &self,
        app: &str,
        original_path: &Path,
        content: &[u8],
    ) -> SyncResult<BackupEntry> {
        let dir = self.app_dir(app);
        let seq = self
            .list(app)?
            .last()
            .map(|entry| entry.seq + 1)
            .unwrap_or(1);
        let timestamp = Utc::now();
        let stem = format!("{seq:06}-{}", timestamp.format("%Y%m%dT%H%M%S%.3fZ"));

        let entry = BackupEntry {
            app_name: app.to_string(),
            timestamp,
            seq,
            path: dir.join(format!("{stem}{BACKUP_EXT}")),
            original_path: original_path.to_path_buf(),
            content_hash: hash_bytes(content),
        };
        atomic_write(&entry.path, content)?;

        let meta = serde_json::to_vec_pretty(&entry).map_err(|e| SyncError::BackupFailed {
            app: app.to_string(),
            message: e.to_string(),
        })?;
        atomic_write(&dir.join(format!("{stem}{META_EXT}")), &meta)?;

        tracing::info!(app, seq, path = %entry.path.display(), "created backup");
        self.prune(app)?;
        Ok(entry)
    }

    /// Backups for one application, oldest first.
    pub fn list(&self, app: &str) -> SyncResult<Vec<BackupEntry>> {
        let dir = self.app_dir(app);
        let read_dir = match fs::read_dir(&dir) {
            Ok(iter) => iter,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(SyncError::io(&dir, err)),
        };

        let mut entries = Vec::new();
        for item in read_dir.filter_map(|item| item.ok()) {
            let meta_path = item.path();
            let Some(stem) = meta_path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(META_EXT))
            else {
                continue;
            };
            let backup_path = dir.join(format!("{stem}{BACKUP_EXT}"));
            if !backup_path.is_file() {
                continue;
            }
            let bytes = fs::read(&meta_path).map_err(|e| SyncError::io(&meta_path, e))?;
            match serde_json::from_slice::<BackupEntry>(&bytes) {
                Ok(mut entry) => {
                    entry.path = backup_path;
                    entries.push(entry);
                }
                Err(err) => {
                    tracing::warn!(app, path = %meta_path.display(), error = %err, "skipping unreadable backup metadata");
                }
            }
        }
        entries.sort_by_key(|entry| entry.seq);
        Ok(entries)
    }

    pub fn get(&self, app: &str, seq: u64) -> SyncResult<BackupEntry> {
        self.list(app)?
            .into_iter()
            .find(|entry| entry.seq == seq)
            .ok_or_else(|| SyncError::UnknownBackup {
                app: app.to_string(),
                seq,
            })
    }

    /// Delete the oldest backups beyond the retention count.
    pub fn prune(&self, app: &str) -> SyncResult<usize> {
        let entries = self.list(app)?;
        let remove_count = entries.len().saturating_sub(self.retention());
        for entry in entries.iter().take(remove_count) {
            let meta_path = meta_path_for(&entry.path);
            for path in [&entry.path, &meta_path] {
                if let Err(err) = fs::remove_file(path) {
                    tracing::warn!(app, path = %path.display(), error = %err, "failed to delete old backup");
                }
            }
        }
        if remove_count > 0 {
            tracing::debug!(app, removed = remove_count, "pruned backups");
        }
        Ok(remove_count)
    }

    /// Replace the live file with a backup's bytes.
    ///
    /// The bytes must parse with the application's schema and every server in
    /// them must be valid; otherwise nothing is touched. The live file is
    /// itself backed up before it is replaced.
    pub fn restore(
        &self,
        adapter: &dyn AppAdapter,
        ctx: &AdapterContext,
        entry: &BackupEntry,
    ) -> SyncResult<()> {
        let bytes = fs::read(&entry.path).map_err(|e| SyncError::io(&entry.path, e))?;
        let servers = adapter.parse(&entry.path, &bytes)?;
        for server in &servers {
            validate_server(server)?;
        }
        let live_path = adapter.config_path(ctx);
        self.snapshot_file(adapter.id(), &live_path)?;
        adapter.commit(&live_path, &bytes)?;
        tracing::info!(app = adapter.id(), seq = entry.seq, "restored backup");
        Ok(())
    }
}

fn meta_path_for(backup_path: &Path) -> PathBuf {
    let name = backup_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(BACKUP_EXT))
        .unwrap_or_default();
    backup_path.with_file_name(format!("{name}{META_EXT}"))
}
