//! # Voucher Node Library
//!
//! This library exposes the internal modules of the voucher node for testing.
//! The main entry point is the `main.rs` binary.
//!
//! - `container/` - Configuration and adapter wiring
//! - `handlers/` - JSON-lines command transport

#![allow(clippy::type_complexity)]

pub mod container;
pub mod handlers;

pub use container::{open_ledger, ConfigError, NodeConfig, NodeLedger};
pub use handlers::{handle_line, serve, Command, Response};
