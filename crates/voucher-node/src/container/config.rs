//! # Node Configuration
//!
//! Environment-driven configuration for the voucher node.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `VOUCHER_DATA_DIR` | `./data` | Root of the JSON store, audit CSVs and notifications |
//! | `VOUCHER_TOKEN_TTL_SECS` | `1800` | Token lifetime; `0` disables expiry |
//! | `VOUCHER_TOKEN_POLICY` | `single` | `single` or `multiple` outstanding tokens per household |
//! | `VOUCHER_HISTORY_CAPACITY` | `50` | Transaction history kept per household |
//! | `VOUCHER_LOG_LEVEL` | `info` | Log filter when `RUST_LOG` is unset |
//! | `VOUCHER_SCHEMA_FILE` | unset | JSON tranche schema replacing the built-in one |

use std::path::PathBuf;
use thiserror::Error;
use voucher_ledger::{LedgerConfig, LedgerError, TokenPolicy, VoucherSchema};

pub const ENV_DATA_DIR: &str = "VOUCHER_DATA_DIR";
pub const ENV_TOKEN_TTL_SECS: &str = "VOUCHER_TOKEN_TTL_SECS";
pub const ENV_TOKEN_POLICY: &str = "VOUCHER_TOKEN_POLICY";
pub const ENV_HISTORY_CAPACITY: &str = "VOUCHER_HISTORY_CAPACITY";
pub const ENV_LOG_LEVEL: &str = "VOUCHER_LOG_LEVEL";
pub const ENV_SCHEMA_FILE: &str = "VOUCHER_SCHEMA_FILE";

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory for every file adapter.
    pub data_dir: PathBuf,
    /// Fallback log filter.
    pub log_level: String,
    /// Ledger configuration.
    pub ledger: LedgerConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            ledger: LedgerConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("cannot read schema file {path}: {source}")]
    SchemaFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid tranche schema: {0}")]
    Schema(LedgerError),

    #[error(transparent)]
    Ledger(#[from] voucher_ledger::ConfigError),
}

impl NodeConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through `lookup`, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.log_level = level;
        }

        if let Some(value) = lookup(ENV_TOKEN_TTL_SECS) {
            let secs: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: ENV_TOKEN_TTL_SECS,
                value: value.clone(),
            })?;
            config.ledger.token_ttl_ms = match secs {
                0 => None,
                secs => Some(secs.saturating_mul(1000)),
            };
        }

        if let Some(value) = lookup(ENV_TOKEN_POLICY) {
            config.ledger.token_policy = value.parse::<TokenPolicy>()?;
        }

        if let Some(value) = lookup(ENV_HISTORY_CAPACITY) {
            config.ledger.history_capacity =
                value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    var: ENV_HISTORY_CAPACITY,
                    value: value.clone(),
                })?;
        }

        if let Some(path) = lookup(ENV_SCHEMA_FILE) {
            let path = PathBuf::from(path);
            let json = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::SchemaFile {
                    path: path.clone(),
                    source,
                })?;
            config.ledger.schema = VoucherSchema::from_json(&json).map_err(ConfigError::Schema)?;
        }

        config.ledger.validate()?;
        Ok(config)
    }
}
