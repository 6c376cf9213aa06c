//! Redemption attempt state machine and audit itemization.
//!
//! ```text
//! [PRESENTED] ──→ [RESOLVED] ──→ [DEDUCTED] ──→ [LOGGED] ──→ [DONE]
//!      │              │              │
//!      └──────────────┴──────────────┴──→ [REJECTED]
//! ```

use super::entities::{HouseholdId, Merchant, RedemptionRecord, RedemptionStatus, Timestamp};
use super::value_objects::Bundle;
use tracing::debug;
use uuid::Uuid;

/// Remarks on the last itemized line of a transaction.
pub const FINAL_LINE_REMARK: &str = "Final denomination used";

/// Stage of one redemption attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedemptionStage {
    Presented,
    Resolved,
    Deducted,
    Logged,
    Done,
    Rejected,
}

impl RedemptionStage {
    /// Whether `next` may follow `self`.
    pub fn can_advance_to(self, next: RedemptionStage) -> bool {
        use RedemptionStage::*;
        matches!(
            (self, next),
            (Presented, Resolved)
                | (Resolved, Deducted)
                | (Deducted, Logged)
                | (Logged, Done)
                | (Presented | Resolved | Deducted, Rejected)
        )
    }
}

/// Tracks one attempt through the stages.
#[derive(Debug)]
pub struct RedemptionAttempt {
    subject: String,
    stage: RedemptionStage,
}

impl RedemptionAttempt {
    /// Starts an attempt for a token or household id.
    pub fn presented(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            stage: RedemptionStage::Presented,
        }
    }

    pub fn stage(&self) -> RedemptionStage {
        self.stage
    }

    /// Moves to `next`. Out-of-order transitions are ignored.
    pub fn advance(&mut self, next: RedemptionStage) {
        if !self.stage.can_advance_to(next) {
            debug!(
                "[voucher] redemption {} ignored transition {:?} -> {:?}",
                short(&self.subject),
                self.stage,
                next
            );
            return;
        }
        debug!(
            "[voucher] redemption {} {:?} -> {:?}",
            short(&self.subject),
            self.stage,
            next
        );
        self.stage = next;
    }

    pub fn reject(&mut self) {
        self.advance(RedemptionStage::Rejected);
    }
}

/// First characters of a token or id, enough to correlate log lines.
pub fn short(subject: &str) -> &str {
    let end = subject
        .char_indices()
        .nth(12)
        .map(|(i, _)| i)
        .unwrap_or(subject.len());
    &subject[..end]
}

/// New transaction id, `TX` + 32 uppercase hex digits.
pub fn new_transaction_id() -> String {
    format!("TX{}", Uuid::new_v4().simple()).to_uppercase()
}

/// Builds the audit record for a committed deduction.
pub fn build_record(
    household_id: &HouseholdId,
    merchant: &Merchant,
    bundle: Bundle,
    timestamp: Timestamp,
) -> RedemptionRecord {
    RedemptionRecord {
        transaction_id: new_transaction_id(),
        household_id: household_id.clone(),
        merchant_id: merchant.merchant_id.clone(),
        merchant_name: merchant.merchant_name.clone(),
        total_amount: bundle.total_amount(),
        bundle,
        timestamp,
        status: RedemptionStatus::Completed,
    }
}

/// One row of the settlement export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemizedLine {
    pub tranche: String,
    pub denomination: u32,
    pub count: u32,
    pub amount: u64,
    pub voucher_code: String,
    pub remarks: String,
}

/// Voucher code: `V` + last 8 household digits (zero padded) + 3-digit sequence.
pub fn voucher_code(household_id: &str, sequence: usize) -> String {
    let digits: String = household_id.chars().filter(char::is_ascii_digit).collect();
    let tail = &digits[digits.len().saturating_sub(8)..];
    format!("V{:0>8}{:03}", tail, sequence)
}

/// Splits a record into one line per (tranche, denomination).
pub fn itemize(record: &RedemptionRecord) -> Vec<ItemizedLine> {
    let entries: Vec<_> = record.bundle.entries().collect();
    let last = entries.len();

    entries
        .into_iter()
        .enumerate()
        .map(|(i, (tranche, denomination, count))| {
            let sequence = i + 1;
            ItemizedLine {
                tranche: tranche.to_string(),
                denomination,
                count,
                amount: u64::from(denomination) * u64::from(count),
                voucher_code: voucher_code(&record.household_id, sequence),
                remarks: if sequence == last {
                    FINAL_LINE_REMARK.to_string()
                } else {
                    sequence.to_string()
                },
            }
        })
        .collect()
}
