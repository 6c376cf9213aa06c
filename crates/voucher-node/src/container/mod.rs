//! # Ledger Container
//!
//! Wires the file adapters into a [`VoucherService`] rooted at the configured
//! data directory.

pub mod config;

pub use config::{ConfigError, NodeConfig};

use voucher_ledger::{
    FileAuditSink, FileNotificationSink, JsonFileLedgerStore, LedgerDependencies, LedgerError,
    SystemTimeSource, VoucherService,
};

/// The ledger as the node runs it.
pub type NodeLedger =
    VoucherService<JsonFileLedgerStore, FileAuditSink, FileNotificationSink, SystemTimeSource>;

/// Opens the file-backed ledger described by `config`.
pub fn open_ledger(config: &NodeConfig) -> Result<NodeLedger, LedgerError> {
    let data_dir = &config.data_dir;
    let deps = LedgerDependencies {
        store: JsonFileLedgerStore::new(data_dir),
        audit: FileAuditSink::new(data_dir, config.ledger.history_capacity),
        notifications: FileNotificationSink::new(data_dir),
        time_source: SystemTimeSource,
    };
    VoucherService::open(deps, config.ledger.clone())
}
