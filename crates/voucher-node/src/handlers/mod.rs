//! # Command Handlers
//!
//! Transport adapters that drive the ledger through `VoucherLedgerApi`.

pub mod command;

pub use command::{dispatch, handle_line, serve, Command, ErrorBody, Response};
