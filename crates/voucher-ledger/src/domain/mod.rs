//! # Domain Layer - Voucher Ledger
//!
//! Pure business logic: no I/O, no locks.
//!
//! ## Components
//!
//! - `schema`: Tranche definitions (static configuration)
//! - `entities`: Household, Reservation, Merchant, RedemptionRecord
//! - `value_objects`: VoucherBalances, Bundle
//! - `token`: TokenBroker (issue / resolve / clear)
//! - `redemption`: Redemption stages, audit itemization
//! - `config`: LedgerConfig, TokenPolicy
//! - `errors`: LedgerError enumeration

pub mod config;
pub mod entities;
pub mod errors;
pub mod redemption;
pub mod schema;
pub mod token;
pub mod value_objects;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use redemption::*;
pub use schema::*;
pub use token::*;
pub use value_objects::*;
