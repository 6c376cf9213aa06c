//! File audit sink: hourly settlement CSV plus per-household history.
//!
//! Layout under the data directory:
//!
//! ```text
//! redemptions/RedeemYYYYMMDDHH.csv   one row per (tranche, denomination)
//! transactions/<household_id>.json   most recent first, capped
//! ```
//!
//! The CSV is an export derived from committed redemptions. It is appended
//! to, never rewritten.

use super::file_store::{checked_stem, read_json, write_atomic};
use crate::domain::{itemize, LedgerError, RedemptionRecord, Timestamp};
use crate::ports::outbound::AuditSink;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const REDEMPTIONS_DIR: &str = "redemptions";
const TRANSACTIONS_DIR: &str = "transactions";

/// Header row of every settlement export.
pub const CSV_HEADER: &str = "Transaction_ID,Household_ID,Merchant_ID,Transaction_Date_Time,\
Voucher_Code,Denomination_Used,Amount_Redeemed,Payment_Status,Remarks";

fn utc(timestamp: Timestamp) -> DateTime<Utc> {
    i64::try_from(timestamp)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_default()
}

fn dollars(amount: u64) -> String {
    format!("${}.00", amount)
}

/// Quotes a field when it would otherwise break the row.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Renders the CSV rows for one record, without trailing newline per row.
pub fn csv_rows(record: &RedemptionRecord) -> Vec<String> {
    let when = utc(record.timestamp).format("%Y%m%d%H%M%S").to_string();

    itemize(record)
        .into_iter()
        .map(|line| {
            [
                csv_field(&record.transaction_id),
                csv_field(&record.household_id),
                csv_field(&record.merchant_id),
                when.clone(),
                line.voucher_code,
                dollars(u64::from(line.denomination)),
                dollars(line.amount),
                record.status.to_string(),
                csv_field(&line.remarks),
            ]
            .join(",")
        })
        .collect()
}

/// Audit sink writing under a data directory.
#[derive(Debug)]
pub struct FileAuditSink {
    root: PathBuf,
    capacity: usize,
    /// Serializes appends and history read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl FileAuditSink {
    pub fn new<P: AsRef<Path>>(root: P, capacity: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            capacity,
            write_lock: Mutex::new(()),
        }
    }

    /// Export file covering the hour that contains `timestamp`.
    pub fn export_path(&self, timestamp: Timestamp) -> PathBuf {
        let hour = utc(timestamp).format("%Y%m%d%H");
        self.root
            .join(REDEMPTIONS_DIR)
            .join(format!("Redeem{}.csv", hour))
    }

    fn history_path(&self, household_id: &str) -> Result<PathBuf, LedgerError> {
        let stem = checked_stem(household_id)?;
        Ok(self
            .root
            .join(TRANSACTIONS_DIR)
            .join(format!("{}.json", stem)))
    }

    fn append_export(&self, record: &RedemptionRecord) -> Result<(), LedgerError> {
        let path = self.export_path(record.timestamp);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut out = String::new();
        if file.metadata()?.len() == 0 {
            out.push_str(CSV_HEADER);
            out.push('\n');
        }
        for row in csv_rows(record) {
            out.push_str(&row);
            out.push('\n');
        }
        file.write_all(out.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }

    fn prepend_history(&self, record: &RedemptionRecord) -> Result<(), LedgerError> {
        let path = self.history_path(&record.household_id)?;
        let mut history: Vec<RedemptionRecord> = read_json(&path)?.unwrap_or_default();
        history.insert(0, record.clone());
        history.truncate(self.capacity);
        write_atomic(&path, &serde_json::to_vec_pretty(&history)?)
    }
}

impl AuditSink for FileAuditSink {
    fn record_redemption(&self, record: &RedemptionRecord) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock();
        self.append_export(record)?;
        self.prepend_history(record)?;
        debug!(
            "[voucher] 🧾 Audit rows written for {} ({})",
            record.transaction_id, record.household_id
        );
        Ok(())
    }

    fn history(
        &self,
        household_id: &str,
        limit: usize,
    ) -> Result<Vec<RedemptionRecord>, LedgerError> {
        let path = self.history_path(household_id)?;
        let mut history: Vec<RedemptionRecord> = read_json(&path)?.unwrap_or_default();
        history.truncate(limit);
        Ok(history)
    }
}
