//! File-backed ledger store.
//!
//! One JSON document per household under `households/`, plus a single
//! `merchants.json`. Every write goes to a temp file which is synced and then
//! renamed over the target; the parent directory is synced after the rename
//! (on Unix) so the new name itself survives power loss. A crash leaves
//! either the old or the new record, never a torn one.

use crate::domain::{Household, LedgerError, Merchant};
use crate::ports::outbound::LedgerStore;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const HOUSEHOLDS_DIR: &str = "households";
const MERCHANTS_FILE: &str = "merchants.json";

/// Rejects ids that cannot be used verbatim as a file stem.
pub(crate) fn checked_stem(id: &str) -> Result<&str, LedgerError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(id)
    } else {
        Err(LedgerError::Validation(format!("malformed id: {:?}", id)))
    }
}

/// Flushes a directory entry table to disk.
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> Result<(), LedgerError> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> Result<(), LedgerError> {
    Ok(())
}

/// Writes `bytes` to `path` via temp file + fsync + rename + directory fsync.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LedgerError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp_path = path.with_extension("tmp");
    let mut file = std::fs::File::create(&temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;

    std::fs::rename(&temp_path, path)?;
    sync_dir(parent)
}

/// Reads a JSON document, `None` if the file does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, LedgerError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// JSON-file ledger store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileLedgerStore {
    root: PathBuf,
}

impl JsonFileLedgerStore {
    /// Creates a store at `root`. Directories are created on first write.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn household_path(&self, household_id: &str) -> Result<PathBuf, LedgerError> {
        let stem = checked_stem(household_id)?;
        Ok(self
            .root
            .join(HOUSEHOLDS_DIR)
            .join(format!("{}.json", stem)))
    }

    fn merchants_path(&self) -> PathBuf {
        self.root.join(MERCHANTS_FILE)
    }
}

impl LedgerStore for JsonFileLedgerStore {
    fn load_households(&self) -> Result<Vec<Household>, LedgerError> {
        let dir = self.root.join(HOUSEHOLDS_DIR);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("[voucher] 📁 No household records at {}", dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut households = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_json::<Household>(&path)? {
                Some(household) => households.push(household),
                None => warn!("[voucher] Household file vanished: {}", path.display()),
            }
        }
        households.sort_by(|a, b| a.household_id.cmp(&b.household_id));

        info!(
            "[voucher] 💾 Loaded {} households from {}",
            households.len(),
            dir.display()
        );
        Ok(households)
    }

    fn save_household(&self, household: &Household) -> Result<(), LedgerError> {
        let path = self.household_path(&household.household_id)?;
        let bytes = serde_json::to_vec_pretty(household)?;
        write_atomic(&path, &bytes)
    }

    fn load_merchants(&self) -> Result<Vec<Merchant>, LedgerError> {
        let merchants: Vec<Merchant> = read_json(&self.merchants_path())?.unwrap_or_default();
        info!("[voucher] 💾 Loaded {} merchants", merchants.len());
        Ok(merchants)
    }

    fn save_merchants(&self, merchants: &[Merchant]) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec_pretty(merchants)?;
        write_atomic(&self.merchants_path(), &bytes)
    }
}
