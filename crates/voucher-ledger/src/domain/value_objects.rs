//! Value objects for the voucher ledger.
//!
//! `VoucherBalances` is what a household holds; `Bundle` is what a token
//! reserves or a redemption removes. Both are keyed tranche → denomination →
//! count, which serializes as `{"Jan2026": {"10": 2}}`.

use super::entities::Denomination;
use super::errors::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Voucher counts per denomination inside one tranche.
pub type TrancheCounts = BTreeMap<Denomination, u32>;

/// A set of (tranche, denomination, count) entries handled together.
///
/// Zero counts are never stored; an entry either carries a positive count or
/// is absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle(BTreeMap<String, TrancheCounts>);

impl Bundle {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Bundle::add`].
    pub fn with(mut self, tranche: &str, denomination: Denomination, count: u32) -> Self {
        self.add(tranche, denomination, count);
        self
    }

    /// Adds `count` vouchers of `denomination` from `tranche`, accumulating
    /// onto any existing entry.
    pub fn add(&mut self, tranche: &str, denomination: Denomination, count: u32) {
        if count == 0 {
            return;
        }
        let slot = self
            .0
            .entry(tranche.to_string())
            .or_default()
            .entry(denomination)
            .or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Drops zero counts and empty tranches (input from the wire may carry them).
    pub fn normalized(self) -> Self {
        let mut out = Self::new();
        for (tranche, counts) in self.0 {
            for (denomination, count) in counts {
                out.add(&tranche, denomination, count);
            }
        }
        out
    }

    /// True when no entry carries a positive count.
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    /// Iterates `(tranche, denomination, count)` with positive counts.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Denomination, u32)> + '_ {
        self.0.iter().flat_map(|(tranche, counts)| {
            counts
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(move |(denomination, count)| (tranche.as_str(), *denomination, *count))
        })
    }

    /// Count reserved for one (tranche, denomination).
    pub fn count(&self, tranche: &str, denomination: Denomination) -> u32 {
        self.0
            .get(tranche)
            .and_then(|counts| counts.get(&denomination))
            .copied()
            .unwrap_or(0)
    }

    /// Σ denomination × count.
    pub fn total_amount(&self) -> u64 {
        self.entries()
            .map(|(_, denomination, count)| u64::from(denomination) * u64::from(count))
            .sum()
    }

    /// Number of individual vouchers in the bundle.
    pub fn voucher_count(&self) -> u64 {
        self.entries().map(|(_, _, count)| u64::from(count)).sum()
    }

    /// Sum of two bundles.
    pub fn merged(&self, other: &Bundle) -> Bundle {
        let mut out = self.clone();
        for (tranche, denomination, count) in other.entries() {
            out.add(tranche, denomination, count);
        }
        out
    }

    /// Raw tranche map.
    pub fn as_map(&self) -> &BTreeMap<String, TrancheCounts> {
        &self.0
    }
}

impl From<BTreeMap<String, TrancheCounts>> for Bundle {
    fn from(map: BTreeMap<String, TrancheCounts>) -> Self {
        Bundle(map).normalized()
    }
}

/// A household's remaining vouchers, per claimed tranche.
///
/// INVARIANT: counts are unsigned and only decreased through
/// [`VoucherBalances::apply_deduction`], which validates the whole bundle
/// before touching any count.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoucherBalances(BTreeMap<String, TrancheCounts>);

impl VoucherBalances {
    /// Creates empty balances (no tranche claimed).
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the tranche has been claimed (even if fully spent).
    pub fn has_tranche(&self, tranche: &str) -> bool {
        self.0.contains_key(tranche)
    }

    /// Counts held for one tranche.
    pub fn tranche(&self, tranche: &str) -> Option<&TrancheCounts> {
        self.0.get(tranche)
    }

    /// Claimed tranche names.
    pub fn tranche_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    /// Remaining count for one (tranche, denomination); zero when absent.
    pub fn available(&self, tranche: &str, denomination: Denomination) -> u32 {
        self.0
            .get(tranche)
            .and_then(|counts| counts.get(&denomination))
            .copied()
            .unwrap_or(0)
    }

    /// Installs a freshly claimed tranche allotment.
    pub(crate) fn insert_tranche(&mut self, tranche: &str, counts: TrancheCounts) {
        self.0.insert(tranche.to_string(), counts);
    }

    /// Checks that `bundle` fits in what is left after `reserved`.
    ///
    /// Returns the first offending entry as `InsufficientBalance`.
    pub fn check_covers(&self, bundle: &Bundle, reserved: &Bundle) -> Result<(), LedgerError> {
        for (tranche, denomination, requested) in bundle.entries() {
            let available = self
                .available(tranche, denomination)
                .saturating_sub(reserved.count(tranche, denomination));
            if requested > available {
                return Err(LedgerError::InsufficientBalance {
                    tranche: tranche.to_string(),
                    denomination,
                    requested,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Removes `bundle` all-or-nothing.
    ///
    /// Every entry is validated first; on failure no count is changed.
    pub fn apply_deduction(&mut self, bundle: &Bundle) -> Result<(), LedgerError> {
        self.check_covers(bundle, &Bundle::new())?;

        for (tranche, denomination, count) in bundle.entries() {
            if let Some(slot) = self
                .0
                .get_mut(tranche)
                .and_then(|counts| counts.get_mut(&denomination))
            {
                *slot -= count;
            }
        }
        Ok(())
    }

    /// Σ denomination × count over every tranche.
    pub fn total_value(&self) -> u64 {
        self.0
            .values()
            .flat_map(|counts| counts.iter())
            .map(|(denomination, count)| u64::from(*denomination) * u64::from(*count))
            .sum()
    }

    /// Spreads a denomination-only request across tranches.
    ///
    /// Tranches are drained in `order`; whatever `reserved` already holds is
    /// skipped over.
    pub fn allocate(
        &self,
        request: &BTreeMap<Denomination, u32>,
        order: &[&str],
        reserved: &Bundle,
    ) -> Result<Bundle, LedgerError> {
        let mut bundle = Bundle::new();

        for (&denomination, &requested) in request.iter().filter(|(_, c)| **c > 0) {
            let mut remaining = requested;
            for tranche in order.iter().filter(|t| self.has_tranche(t)) {
                if remaining == 0 {
                    break;
                }
                let free = self
                    .available(tranche, denomination)
                    .saturating_sub(reserved.count(tranche, denomination));
                let take = free.min(remaining);
                bundle.add(tranche, denomination, take);
                remaining -= take;
            }

            if remaining > 0 {
                return Err(LedgerError::InsufficientBalance {
                    tranche: "all tranches".to_string(),
                    denomination,
                    requested,
                    available: requested - remaining,
                });
            }
        }

        Ok(bundle)
    }
}

impl From<BTreeMap<String, TrancheCounts>> for VoucherBalances {
    fn from(map: BTreeMap<String, TrancheCounts>) -> Self {
        VoucherBalances(map)
    }
}
