//! # Voucher Node
//!
//! Runs the voucher ledger behind a JSON-lines command stream.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Install the log subscriber (`RUST_LOG`, else `VOUCHER_LOG_LEVEL`)
//! 3. Open the file-backed ledger (loads households, merchants, tokens)
//! 4. Serve stdin → stdout until EOF or Ctrl+C

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use voucher_node::{open_ledger, serve, NodeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("invalid configuration")?;

    // Logs go to stderr; stdout carries responses only.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("===========================================");
    info!("  Voucher Node v{}", env!("CARGO_PKG_VERSION"));
    info!("  Data directory: {}", config.data_dir.display());
    info!("===========================================");

    let ledger = open_ledger(&config)
        .with_context(|| format!("failed to open ledger at {}", config.data_dir.display()))?;
    let ledger = Arc::new(ledger);

    let input = BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();

    tokio::select! {
        served = serve(ledger, input, output) => {
            served.context("command stream failed")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received");
        }
    }

    info!("Shutdown complete");
    Ok(())
}
