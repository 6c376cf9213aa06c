//! Core domain entities for the voucher ledger.
//!
//! `Household` is the one canonical ledger record: members, postal code,
//! per-tranche balances and outstanding token reservations.

use super::errors::LedgerError;
use super::schema::TrancheSchema;
use super::value_objects::{Bundle, VoucherBalances};
use serde::{Deserialize, Serialize};

/// Timestamp in milliseconds since UNIX epoch.
pub type Timestamp = u64;

/// Voucher face value in dollars.
pub type Denomination = u32;

/// Household identifier, e.g. `H04918273645`.
pub type HouseholdId = String;

/// Merchant identifier chosen at merchant registration.
pub type MerchantId = String;

/// Opaque single-use bearer token.
pub type Token = String;

/// Vouchers set aside behind a token, awaiting redemption.
///
/// The bundle is NOT deducted from balances until the token is redeemed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub token: Token,
    pub household_id: HouseholdId,
    pub bundle: Bundle,
    pub created_at: Timestamp,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

impl Reservation {
    /// Expiry is a plain wall-clock comparison at resolve time.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }

    pub fn total_amount(&self) -> u64 {
        self.bundle.total_amount()
    }
}

/// A registered household and its voucher ledger.
///
/// INVARIANT: every balance count is ≥ 0 (unsigned, deducted only after a
/// full validation pass).
/// INVARIANT: a tranche appears in `balances` at most once; re-claiming fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Household {
    pub household_id: HouseholdId,
    pub members: Vec<String>,
    pub postal_code: String,
    #[serde(default, alias = "vouchers")]
    pub balances: VoucherBalances,
    /// Outstanding reservations, oldest first.
    #[serde(default)]
    pub pending: Vec<Reservation>,
}

impl Household {
    /// Creates a household with empty balances.
    pub fn new(household_id: HouseholdId, members: Vec<String>, postal_code: String) -> Self {
        Self {
            household_id,
            members,
            postal_code,
            balances: VoucherBalances::new(),
            pending: Vec::new(),
        }
    }

    /// Copies the tranche allotment into balances.
    ///
    /// # Errors
    /// `AlreadyClaimed` if the tranche is present, even when fully spent.
    pub fn claim_tranche(&mut self, tranche: &TrancheSchema) -> Result<(), LedgerError> {
        if self.balances.has_tranche(&tranche.name) {
            return Err(LedgerError::AlreadyClaimed {
                household_id: self.household_id.clone(),
                tranche: tranche.name.clone(),
            });
        }
        self.balances
            .insert_tranche(&tranche.name, tranche.denominations.clone());
        Ok(())
    }

    /// All-or-nothing deduction of `bundle` from balances.
    pub fn deduct(&mut self, bundle: &Bundle) -> Result<&VoucherBalances, LedgerError> {
        self.balances.apply_deduction(bundle)?;
        Ok(&self.balances)
    }

    /// Σ denomination × count across every tranche.
    pub fn total_balance(&self) -> u64 {
        self.balances.total_value()
    }

    /// The live (unexpired) reservation behind `token`.
    pub fn reservation(&self, token: &str, now: Timestamp) -> Option<&Reservation> {
        self.pending
            .iter()
            .find(|r| r.token == token && !r.is_expired(now))
    }

    /// Sum of every live reservation.
    pub fn reserved_total(&self, now: Timestamp) -> Bundle {
        self.pending
            .iter()
            .filter(|r| !r.is_expired(now))
            .fold(Bundle::new(), |acc, r| acc.merged(&r.bundle))
    }

    /// Removes the reservation behind `token`, if present.
    pub fn remove_reservation(&mut self, token: &str) -> Option<Reservation> {
        let idx = self.pending.iter().position(|r| r.token == token)?;
        Some(self.pending.remove(idx))
    }

    /// Drops every reservation, returning their tokens.
    pub fn clear_reservations(&mut self) -> Vec<Token> {
        self.pending.drain(..).map(|r| r.token).collect()
    }

    /// Drops expired reservations, returning their tokens.
    pub fn prune_expired(&mut self, now: Timestamp) -> Vec<Token> {
        let (expired, live): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|r| r.is_expired(now));
        self.pending = live;
        expired.into_iter().map(|r| r.token).collect()
    }
}

/// Merchant account status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MerchantStatus {
    #[default]
    Active,
    Suspended,
}

/// A registered merchant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Merchant {
    pub merchant_id: MerchantId,
    pub merchant_name: String,
    pub uen: String,
    pub bank_name: String,
    pub bank_code: String,
    pub branch_code: String,
    pub account_number: String,
    pub account_holder: String,
    /// `YYYY-MM-DD`; filled at registration when empty.
    pub registration_date: String,
    pub status: MerchantStatus,
}

impl Merchant {
    pub fn new(merchant_id: &str, merchant_name: &str) -> Self {
        Self {
            merchant_id: merchant_id.to_string(),
            merchant_name: merchant_name.to_string(),
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MerchantStatus::Active
    }
}

/// Outcome recorded for a redemption.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedemptionStatus {
    #[default]
    Completed,
}

impl std::fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "Completed"),
        }
    }
}

/// Append-only audit record for one committed redemption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRecord {
    pub transaction_id: String,
    pub household_id: HouseholdId,
    pub merchant_id: MerchantId,
    pub merchant_name: String,
    pub timestamp: Timestamp,
    pub bundle: Bundle,
    #[serde(rename = "amount")]
    pub total_amount: u64,
    pub status: RedemptionStatus,
}

/// Merchant-facing settlement summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionReceipt {
    pub transaction_id: String,
    pub household_id: HouseholdId,
    pub merchant_id: MerchantId,
    pub merchant_name: String,
    #[serde(rename = "amount")]
    pub total_amount: u64,
    pub bundle: Bundle,
    pub timestamp: Timestamp,
}

impl From<&RedemptionRecord> for RedemptionReceipt {
    fn from(record: &RedemptionRecord) -> Self {
        Self {
            transaction_id: record.transaction_id.clone(),
            household_id: record.household_id.clone(),
            merchant_id: record.merchant_id.clone(),
            merchant_name: record.merchant_name.clone(),
            total_amount: record.total_amount,
            bundle: record.bundle.clone(),
            timestamp: record.timestamp,
        }
    }
}

/// Notification kinds pushed to households.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RedemptionSuccess,
}

/// Best-effort household notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub household_id: HouseholdId,
    pub amount: u64,
    pub bundle: Bundle,
    pub merchant_name: String,
    pub timestamp: Timestamp,
}

impl Notification {
    pub fn redemption_success(record: &RedemptionRecord) -> Self {
        Self {
            kind: NotificationKind::RedemptionSuccess,
            household_id: record.household_id.clone(),
            amount: record.total_amount,
            bundle: record.bundle.clone(),
            merchant_name: record.merchant_name.clone(),
            timestamp: record.timestamp,
        }
    }
}
