//! # Voucher Ledger Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Ledger builders shared by tests and benches
//! ├── exploits/         # Attack simulations against the token protocol
//! └── integration/      # End-to-end ledger flows, persistence, concurrency
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p voucher-tests
//!
//! # By category
//! cargo test -p voucher-tests integration::
//! cargo test -p voucher-tests exploits::
//!
//! # Benchmarks
//! cargo bench -p voucher-tests
//! ```

pub mod fixtures;
pub mod integration;
