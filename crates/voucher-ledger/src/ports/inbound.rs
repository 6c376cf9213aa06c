//! # Inbound Port - VoucherLedgerApi
//!
//! Primary driving port. Transports (command loop, HTTP, RPC) call the ledger
//! only through this trait.
//!
//! | Method | Failure |
//! |--------|---------|
//! | `register_household` | Validation |
//! | `claim_tranche` | NotFound, AlreadyClaimed |
//! | `get_balance` | NotFound |
//! | `issue_token` | Validation, InsufficientBalance |
//! | `redeem_token` | InvalidOrExpiredToken, InsufficientBalance, NotFound (merchant) |
//! | `get_transaction_history` | NotFound |
//!
//! Every mutating method can also fail with `Persistence`, in which case
//! nothing was committed.

use crate::domain::{
    Bundle, Denomination, HouseholdId, LedgerError, Merchant, MerchantId, Notification,
    RedemptionReceipt, RedemptionRecord, Timestamp, Token, TrancheSchema, VoucherBalances,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Answer to a successful `issue_token`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: Token,
    pub total_amount: u64,
    pub bundle: Bundle,
    pub expires_at: Option<Timestamp>,
}

/// Merchant-side preview of a token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedToken {
    pub household_id: HouseholdId,
    pub bundle: Bundle,
    pub total_amount: u64,
}

/// Primary API for the voucher ledger.
///
/// # Example
///
/// ```rust,ignore
/// use voucher_ledger::ports::VoucherLedgerApi;
///
/// fn example(ledger: &impl VoucherLedgerApi) -> Result<(), LedgerError> {
///     let hid = ledger.register_household(vec!["Tan".into()], "123456".into())?;
///     ledger.claim_tranche(&hid, "Jan2026")?;
///
///     let issued = ledger.issue_token(&hid, Bundle::new().with("Jan2026", 10, 2))?;
///     let receipt = ledger.redeem_token(&issued.token, "M1")?;
///     assert_eq!(receipt.total_amount, 20);
///     Ok(())
/// }
/// ```
pub trait VoucherLedgerApi: Send + Sync {
    /// Registers a household with empty balances and returns its new id.
    fn register_household(
        &self,
        members: Vec<String>,
        postal_code: String,
    ) -> Result<HouseholdId, LedgerError>;

    /// Claims a tranche's full allotment. At most once per household.
    fn claim_tranche(
        &self,
        household_id: &str,
        tranche: &str,
    ) -> Result<VoucherBalances, LedgerError>;

    /// Balance snapshot.
    fn get_balance(&self, household_id: &str) -> Result<VoucherBalances, LedgerError>;

    /// Σ denomination × count across all tranches.
    fn get_total_balance(&self, household_id: &str) -> Result<u64, LedgerError>;

    /// Reserves `bundle` behind a fresh token. Nothing is deducted yet.
    fn issue_token(&self, household_id: &str, bundle: Bundle) -> Result<IssuedToken, LedgerError>;

    /// Like `issue_token`, but picks tranches for a denomination-only request.
    fn issue_token_for_denominations(
        &self,
        household_id: &str,
        request: BTreeMap<Denomination, u32>,
    ) -> Result<IssuedToken, LedgerError>;

    /// Looks a token up without consuming it.
    fn resolve_token(&self, token: &str) -> Result<ResolvedToken, LedgerError>;

    /// Redeems a token at a merchant: deduct, clear, audit, notify.
    fn redeem_token(&self, token: &str, merchant_id: &str)
        -> Result<RedemptionReceipt, LedgerError>;

    /// Redeems an explicit bundle without a token.
    fn redeem_direct(
        &self,
        household_id: &str,
        merchant_id: &str,
        bundle: Bundle,
    ) -> Result<RedemptionReceipt, LedgerError>;

    /// Most recent redemptions first.
    fn get_transaction_history(
        &self,
        household_id: &str,
        limit: usize,
    ) -> Result<Vec<RedemptionRecord>, LedgerError>;

    /// Registers a merchant.
    fn register_merchant(&self, merchant: Merchant) -> Result<MerchantId, LedgerError>;

    fn get_merchant(&self, merchant_id: &str) -> Result<Merchant, LedgerError>;

    /// The tranche schema, oldest first.
    fn list_tranches(&self) -> Vec<TrancheSchema>;

    /// Tranches the household can still claim.
    fn unclaimed_tranches(&self, household_id: &str) -> Result<Vec<String>, LedgerError>;

    /// Consumes unread notifications, newest first.
    fn take_notifications(&self, household_id: &str) -> Result<Vec<Notification>, LedgerError>;

    /// Drops queued notifications; returns how many.
    fn clear_notifications(&self, household_id: &str) -> Result<usize, LedgerError>;
}
