//! # Integration Tests
//!
//! - `ledger_flows`: household lifecycle through the public API
//! - `persistence`: file-backed store, audit export, restart recovery
//! - `concurrency`: per-household serialization under parallel load
//! - `node_commands`: the JSON-lines transport against a file-backed ledger

pub mod ledger_flows;
pub mod node_commands;
pub mod persistence;
