//! Voucher tranche schema.
//!
//! Static, process-wide configuration: which tranches exist and how many
//! vouchers of each denomination a household receives when claiming one.
//! Read-only once the service is built.

use super::entities::Denomination;
use super::errors::LedgerError;
use super::value_objects::TrancheCounts;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One claimable tranche.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrancheSchema {
    /// Tranche key, e.g. `Jan2026`.
    pub name: String,
    /// Denomination → count issued per claiming household.
    pub denominations: TrancheCounts,
}

impl TrancheSchema {
    pub fn new(name: &str, denominations: &[(Denomination, u32)]) -> Self {
        Self {
            name: name.to_string(),
            denominations: denominations.iter().copied().collect(),
        }
    }

    /// Face value of one full allotment.
    pub fn face_value(&self) -> u64 {
        self.denominations
            .iter()
            .map(|(d, c)| u64::from(*d) * u64::from(*c))
            .sum()
    }
}

/// Ordered set of tranches, oldest first.
///
/// INVARIANT: names are unique, non-empty, and every denomination is positive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TrancheSchema>", into = "Vec<TrancheSchema>")]
pub struct VoucherSchema {
    tranches: Vec<TrancheSchema>,
}

impl VoucherSchema {
    /// Builds a schema, rejecting duplicate names and zero denominations.
    pub fn new(tranches: Vec<TrancheSchema>) -> Result<Self, LedgerError> {
        if tranches.is_empty() {
            return Err(LedgerError::Validation(
                "voucher schema needs at least one tranche".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for tranche in &tranches {
            if tranche.name.trim().is_empty() {
                return Err(LedgerError::Validation("tranche name is empty".to_string()));
            }
            if !seen.insert(tranche.name.as_str()) {
                return Err(LedgerError::Validation(format!(
                    "duplicate tranche {}",
                    tranche.name
                )));
            }
            if tranche.denominations.contains_key(&0) {
                return Err(LedgerError::Validation(format!(
                    "tranche {} has a zero denomination",
                    tranche.name
                )));
            }
        }

        Ok(Self { tranches })
    }

    /// Parses a JSON array of tranches.
    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(json).map_err(|e| LedgerError::Validation(e.to_string()))
    }

    pub fn tranche(&self, name: &str) -> Option<&TrancheSchema> {
        self.tranches.iter().find(|t| t.name == name)
    }

    pub fn tranches(&self) -> &[TrancheSchema] {
        &self.tranches
    }

    /// Tranche names in schema order.
    pub fn names(&self) -> Vec<&str> {
        self.tranches.iter().map(|t| t.name.as_str()).collect()
    }
}

impl Default for VoucherSchema {
    fn default() -> Self {
        Self {
            tranches: vec![
                TrancheSchema::new("May2025", &[(2, 50), (5, 20), (10, 30)]),
                TrancheSchema::new("Jan2026", &[(2, 30), (5, 20), (10, 14)]),
            ],
        }
    }
}

impl TryFrom<Vec<TrancheSchema>> for VoucherSchema {
    type Error = LedgerError;

    fn try_from(tranches: Vec<TrancheSchema>) -> Result<Self, Self::Error> {
        Self::new(tranches)
    }
}

impl From<VoucherSchema> for Vec<TrancheSchema> {
    fn from(schema: VoucherSchema) -> Self {
        schema.tranches
    }
}
