//! File notification queue: one JSON file per notification.

use super::file_store::{checked_stem, write_atomic};
use crate::domain::{LedgerError, Notification};
use crate::ports::outbound::NotificationSink;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

const NOTIFICATIONS_DIR: &str = "notifications";

/// Stores `notifications/<household_id>_<ms>_<seq>.json`.
#[derive(Debug)]
pub struct FileNotificationSink {
    dir: PathBuf,
    seq: AtomicU64,
}

impl FileNotificationSink {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            dir: root.as_ref().join(NOTIFICATIONS_DIR),
            seq: AtomicU64::new(0),
        }
    }

    /// Files queued for `household_id`. Ids never contain `_`.
    fn queued(&self, household_id: &str) -> Result<Vec<PathBuf>, LedgerError> {
        let prefix = format!("{}_", checked_stem(household_id)?);
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix) && n.ends_with(".json"))
                .unwrap_or(false);
            if matches {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

impl NotificationSink for FileNotificationSink {
    fn push(&self, notification: &Notification) -> Result<(), LedgerError> {
        let stem = checked_stem(&notification.household_id)?;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let path = self
            .dir
            .join(format!("{}_{}_{}.json", stem, notification.timestamp, seq));
        write_atomic(&path, &serde_json::to_vec_pretty(notification)?)
    }

    fn take_unread(&self, household_id: &str) -> Result<Vec<Notification>, LedgerError> {
        let mut unread = Vec::new();
        for path in self.queued(household_id)? {
            match std::fs::read(&path)
                .map_err(LedgerError::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<Notification>(&bytes)?))
            {
                Ok(notification) => unread.push(notification),
                Err(e) => warn!("[voucher] Skipping unreadable notification {}: {}", path.display(), e),
            }
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("[voucher] Could not delete notification {}: {}", path.display(), e);
            }
        }
        unread.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(unread)
    }

    fn clear(&self, household_id: &str) -> Result<usize, LedgerError> {
        let paths = self.queued(household_id)?;
        for path in &paths {
            std::fs::remove_file(path)?;
        }
        Ok(paths.len())
    }
}
