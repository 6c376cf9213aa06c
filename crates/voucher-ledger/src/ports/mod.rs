//! Ports layer for the voucher ledger.
//!
//! Defines the hexagonal architecture port traits:
//! - Inbound (Driving) ports: API exposed to transports
//! - Outbound (Driven) ports: storage, audit, notifications, clock

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
