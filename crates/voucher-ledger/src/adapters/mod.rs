//! Adapters layer for the voucher ledger.
//!
//! Implementations of the outbound ports: JSON files on disk for the node,
//! in-memory variants for tests.

pub mod audit_csv;
pub mod file_store;
pub mod memory;
pub mod notifications;

pub use audit_csv::{csv_rows, FileAuditSink, CSV_HEADER};
pub use file_store::JsonFileLedgerStore;
pub use memory::{InMemoryAuditSink, InMemoryLedgerStore, InMemoryNotificationSink};
pub use notifications::FileNotificationSink;
