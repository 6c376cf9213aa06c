//! Ledger configuration.
//!
//! Defaults match the production deployment; `for_testing()` shortens the
//! token lifetime.

use super::schema::VoucherSchema;
use thiserror::Error;

/// Minimum CSPRNG bytes per token.
pub const MIN_TOKEN_ENTROPY_BYTES: usize = 16;

/// How many outstanding tokens a household may hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenPolicy {
    /// Issuing a new token supersedes any unredeemed one.
    #[default]
    SinglePending,
    /// Tokens coexist; each new bundle must fit in what earlier live
    /// reservations leave free.
    MultiplePending,
}

impl std::str::FromStr for TokenPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "single_pending" => Ok(Self::SinglePending),
            "multiple" | "multiple_pending" => Ok(Self::MultiplePending),
            other => Err(ConfigError::UnknownTokenPolicy(other.to_string())),
        }
    }
}

/// Configuration errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("token entropy of {0} bytes is below the {}-byte minimum", MIN_TOKEN_ENTROPY_BYTES)]
    WeakTokenEntropy(usize),

    #[error("history capacity must be at least 1")]
    ZeroHistoryCapacity,

    #[error("token TTL must be positive when set")]
    ZeroTokenTtl,

    #[error("unknown token policy: {0}")]
    UnknownTokenPolicy(String),
}

/// Voucher ledger configuration.
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Outstanding-token policy.
    pub token_policy: TokenPolicy,
    /// Token lifetime (milliseconds); `None` means tokens never expire.
    pub token_ttl_ms: Option<u64>,
    /// Random bytes per token.
    pub token_entropy_bytes: usize,
    /// Transaction history entries kept per household.
    pub history_capacity: usize,
    /// Tranche schema.
    pub schema: VoucherSchema,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            token_policy: TokenPolicy::SinglePending,
            token_ttl_ms: Some(30 * 60 * 1000), // 30 minutes
            token_entropy_bytes: 32,
            history_capacity: 50,
            schema: VoucherSchema::default(),
        }
    }
}

impl LedgerConfig {
    /// Creates a minimal config for testing.
    pub fn for_testing() -> Self {
        Self {
            token_ttl_ms: Some(60_000), // 1 minute
            history_capacity: 10,
            ..Default::default()
        }
    }

    /// Same config with a different token policy.
    pub fn with_policy(mut self, policy: TokenPolicy) -> Self {
        self.token_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_entropy_bytes < MIN_TOKEN_ENTROPY_BYTES {
            return Err(ConfigError::WeakTokenEntropy(self.token_entropy_bytes));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        if self.token_ttl_ms == Some(0) {
            return Err(ConfigError::ZeroTokenTtl);
        }
        Ok(())
    }
}
