//! Ledger error types.
//!
//! Every failure the ledger can report at a request boundary. None of them
//! are process-fatal.

use super::entities::Denomination;
use thiserror::Error;

/// Kind of record a lookup failed to find.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Household,
    Tranche,
    Merchant,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Household => write!(f, "household"),
            Self::Tranche => write!(f, "tranche"),
            Self::Merchant => write!(f, "merchant"),
        }
    }
}

/// Voucher ledger error type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Malformed or missing input. Never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unknown household, tranche or merchant.
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    /// The household already holds this tranche.
    #[error("Tranche {tranche} already claimed by household {household_id}")]
    AlreadyClaimed {
        household_id: String,
        tranche: String,
    },

    /// The token is unknown, superseded, already redeemed or expired.
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    /// A deduction or reservation would drive a count below zero.
    #[error(
        "Insufficient balance for {tranche} ${denomination}: requested {requested}, available {available}"
    )]
    InsufficientBalance {
        tranche: String,
        denomination: Denomination,
        requested: u32,
        available: u32,
    },

    /// A merchant with this id is already registered.
    #[error("Merchant ID already exists: {0}")]
    DuplicateMerchant(String),

    /// The durable write failed; the operation did not commit.
    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl LedgerError {
    /// Shorthand for a missing household.
    pub fn household_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: RecordKind::Household,
            id: id.into(),
        }
    }

    /// Shorthand for an unknown tranche.
    pub fn tranche_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: RecordKind::Tranche,
            id: name.into(),
        }
    }

    /// Shorthand for an unknown merchant.
    pub fn merchant_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: RecordKind::Merchant,
            id: id.into(),
        }
    }

    /// Stable snake_case identifier for transports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::AlreadyClaimed { .. } => "already_claimed",
            Self::InvalidOrExpiredToken => "invalid_or_expired_token",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::DuplicateMerchant(_) => "duplicate_merchant",
            Self::Persistence(_) => "persistence_error",
        }
    }

    /// True for failures caused by the caller's input rather than the ledger.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Persistence(_))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}
