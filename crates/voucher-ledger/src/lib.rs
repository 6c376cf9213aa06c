//! # Voucher Ledger
//!
//! Household voucher balances, tranche claims and the two-phase
//! token redemption protocol.
//!
//! ## Purpose
//!
//! Households register, claim fixed-value voucher tranches, reserve a subset
//! of their vouchers behind an opaque token, and hand that token to a
//! merchant. The merchant redeems it; the vouchers are deducted, an audit
//! record is written and the household is notified.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Balances never go negative | `domain/value_objects.rs` - `apply_deduction()` validates every entry first |
//! | A tranche is claimed at most once | `domain/entities.rs` - `Household::claim_tranche()` |
//! | A token redeems at most once | `service/mod.rs` - reservation dropped in the same commit as the deduction |
//! | Nothing is reported committed unless persisted | `service/mod.rs` - draft, `save_household`, then swap |
//! | One household mutated at a time | `service/mod.rs` - per-household `Mutex` |
//!
//! ## Two-Phase Redemption
//!
//! Vouchers are NEVER deducted at issue time. Deduction happens only when a
//! merchant redeems the token.
//!
//! ```text
//! [BALANCE] ──issue──→ [RESERVED] ──redeem──→ [DEDUCTED + AUDITED]
//!                          │
//!                          ├── superseded (single-pending policy) ──→ [DEAD]
//!                          └── expired (TTL) ──→ [DEAD]
//! ```
//!
//! | Stage | Method | Effect |
//! |-------|--------|--------|
//! | Issue | `issue_token()` | Reservation stored on the household, balances untouched |
//! | Resolve | `resolve_token()` | Read-only lookup of the live reservation |
//! | Redeem | `redeem_token()` | All-or-nothing deduction, reservation cleared |
//! | Retry | `redeem_token()` again | Allowed after `InsufficientBalance`; the token stays live |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - JSON file store, CSV audit, notification queue,    │
//! │              in-memory variants                                 │
//! │  service/  - VoucherService (locking + commit protocol)         │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - VoucherLedgerApi trait                     │
//! │  ports/outbound.rs - LedgerStore, AuditSink, NotificationSink,  │
//! │                      TimeSource                                 │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/entities.rs      - Household, Reservation, Merchant     │
//! │  domain/value_objects.rs - VoucherBalances, Bundle              │
//! │  domain/schema.rs        - VoucherSchema, TrancheSchema         │
//! │  domain/token.rs         - TokenBroker                          │
//! │  domain/redemption.rs    - RedemptionStage, itemization         │
//! │  domain/config.rs        - LedgerConfig, TokenPolicy            │
//! │  domain/errors.rs        - LedgerError enum                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
pub use service::{LedgerDependencies, VoucherService};
