//! # Command Handler
//!
//! Newline-delimited JSON commands in, one JSON response per line out.
//!
//! ```text
//! stdin ──line──→ Command ──dispatch──→ VoucherLedgerApi ──→ Response ──line──→ stdout
//! ```
//!
//! Requests are tagged by `op`:
//!
//! ```json
//! {"op": "issue_token", "household_id": "H04918273645", "bundle": {"Jan2026": {"10": 2}}}
//! ```
//!
//! Responses are `{"ok": true, "result": ...}` or
//! `{"ok": false, "error": {"kind": ..., "message": ...}}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use voucher_ledger::{Bundle, Denomination, LedgerError, Merchant, VoucherLedgerApi};

/// Error kind for lines that are not a valid command.
pub const INVALID_COMMAND: &str = "invalid_command";

const DEFAULT_HISTORY_LIMIT: usize = 10;

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// Denomination → count as it appears on the wire (JSON keys are strings).
pub type WireCounts = BTreeMap<String, u32>;

/// Tranche → denomination → count as it appears on the wire.
pub type WireBundle = BTreeMap<String, WireCounts>;

/// One request line.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    RegisterHousehold {
        members: Vec<String>,
        postal_code: String,
    },
    ClaimTranche {
        household_id: String,
        tranche: String,
    },
    GetBalance {
        household_id: String,
    },
    GetTotalBalance {
        household_id: String,
    },
    IssueToken {
        household_id: String,
        bundle: WireBundle,
    },
    IssueTokenForDenominations {
        household_id: String,
        denominations: WireCounts,
    },
    ResolveToken {
        token: String,
    },
    RedeemToken {
        token: String,
        merchant_id: String,
    },
    RedeemDirect {
        household_id: String,
        merchant_id: String,
        bundle: WireBundle,
    },
    GetTransactionHistory {
        household_id: String,
        #[serde(default = "default_history_limit")]
        limit: usize,
    },
    RegisterMerchant {
        merchant: Merchant,
    },
    GetMerchant {
        merchant_id: String,
    },
    ListTranches,
    UnclaimedTranches {
        household_id: String,
    },
    TakeNotifications {
        household_id: String,
    },
    ClearNotifications {
        household_id: String,
    },
}

/// Error body of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

/// One response line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(kind: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(ErrorBody {
                kind: kind.to_string(),
                message: message.into(),
            }),
        }
    }
}

impl From<LedgerError> for Response {
    fn from(e: LedgerError) -> Self {
        Self::failure(e.kind(), e.to_string())
    }
}

fn parse_denominations(raw: WireCounts) -> Result<BTreeMap<Denomination, u32>, LedgerError> {
    raw.into_iter()
        .map(|(key, count)| {
            key.trim()
                .parse::<Denomination>()
                .map(|denomination| (denomination, count))
                .map_err(|_| LedgerError::Validation(format!("invalid denomination {:?}", key)))
        })
        .collect()
}

fn parse_bundle(raw: WireBundle) -> Result<Bundle, LedgerError> {
    let mut bundle = Bundle::new();
    for (tranche, counts) in raw {
        for (denomination, count) in parse_denominations(counts)? {
            bundle.add(&tranche, denomination, count);
        }
    }
    Ok(bundle)
}

/// Runs one command against the ledger.
pub fn dispatch(api: &dyn VoucherLedgerApi, command: Command) -> Result<Value, LedgerError> {
    let result = match command {
        Command::RegisterHousehold {
            members,
            postal_code,
        } => json!({ "household_id": api.register_household(members, postal_code)? }),
        Command::ClaimTranche {
            household_id,
            tranche,
        } => serde_json::to_value(api.claim_tranche(&household_id, &tranche)?)?,
        Command::GetBalance { household_id } => {
            serde_json::to_value(api.get_balance(&household_id)?)?
        }
        Command::GetTotalBalance { household_id } => {
            json!({ "total": api.get_total_balance(&household_id)? })
        }
        Command::IssueToken {
            household_id,
            bundle,
        } => serde_json::to_value(api.issue_token(&household_id, parse_bundle(bundle)?)?)?,
        Command::IssueTokenForDenominations {
            household_id,
            denominations,
        } => serde_json::to_value(
            api.issue_token_for_denominations(&household_id, parse_denominations(denominations)?)?,
        )?,
        Command::ResolveToken { token } => serde_json::to_value(api.resolve_token(&token)?)?,
        Command::RedeemToken { token, merchant_id } => {
            serde_json::to_value(api.redeem_token(&token, &merchant_id)?)?
        }
        Command::RedeemDirect {
            household_id,
            merchant_id,
            bundle,
        } => serde_json::to_value(api.redeem_direct(
            &household_id,
            &merchant_id,
            parse_bundle(bundle)?,
        )?)?,
        Command::GetTransactionHistory {
            household_id,
            limit,
        } => serde_json::to_value(api.get_transaction_history(&household_id, limit)?)?,
        Command::RegisterMerchant { merchant } => {
            json!({ "merchant_id": api.register_merchant(merchant)? })
        }
        Command::GetMerchant { merchant_id } => {
            serde_json::to_value(api.get_merchant(&merchant_id)?)?
        }
        Command::ListTranches => serde_json::to_value(api.list_tranches())?,
        Command::UnclaimedTranches { household_id } => {
            serde_json::to_value(api.unclaimed_tranches(&household_id)?)?
        }
        Command::TakeNotifications { household_id } => {
            serde_json::to_value(api.take_notifications(&household_id)?)?
        }
        Command::ClearNotifications { household_id } => {
            json!({ "cleared": api.clear_notifications(&household_id)? })
        }
    };
    Ok(result)
}

/// Parses and runs one request line.
pub fn handle_line(api: &dyn VoucherLedgerApi, line: &str) -> Response {
    let command: Command = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(e) => {
            debug!("[node] Unparseable command: {}", e);
            return Response::failure(INVALID_COMMAND, e.to_string());
        }
    };

    match dispatch(api, command) {
        Ok(result) => Response::success(result),
        Err(e) => e.into(),
    }
}

/// Serves commands from `input` until EOF.
///
/// Ledger calls do blocking file I/O, so each one runs on the blocking pool.
pub async fn serve<L, R, W>(ledger: Arc<L>, input: R, mut output: W) -> std::io::Result<u64>
where
    L: VoucherLedgerApi + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut served = 0u64;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let ledger = Arc::clone(&ledger);
        let response = match tokio::task::spawn_blocking(move || {
            handle_line(ledger.as_ref(), &line)
        })
        .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("[node] Command task failed: {}", e);
                Response::failure("internal_error", e.to_string())
            }
        };

        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        output.write_all(encoded.as_bytes()).await?;
        output.flush().await?;
        served += 1;
    }

    info!("[node] Input closed after {} commands", served);
    Ok(served)
}
