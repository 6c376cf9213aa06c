//! # Token Broker
//!
//! Issues opaque redemption tokens and resolves them back to the owning
//! household and reserved bundle.
//!
//! ## Two-Phase Reservation
//!
//! ```text
//! [ISSUED] ──resolve──→ [RESOLVED] ──deduct ok──→ [CLEARED]
//!    │                       │
//!    │                       └── deduct fails ──→ [ISSUED] (retry allowed)
//!    └── superseded / expired ──→ [DEAD]
//! ```
//!
//! Reservations live on the `Household` record (so they are persisted with
//! it). The broker owns only the token → household index. Every mutating call
//! works on a household *draft*; the index is updated through
//! [`TokenBroker::commit_issue`] / [`TokenBroker::forget`] once the draft has
//! been durably saved.

use super::config::{LedgerConfig, TokenPolicy};
use super::entities::{Household, HouseholdId, Reservation, Timestamp, Token};
use super::errors::LedgerError;
use super::value_objects::Bundle;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;

/// Prefix carried by every token (kept from the QR format merchants scan).
pub const TOKEN_PREFIX: &str = "TXN-";

/// Result of a reservation on a household draft.
#[derive(Clone, Debug)]
pub struct IssueOutcome {
    /// The new reservation.
    pub reservation: Reservation,
    /// Tokens the draft dropped (superseded or expired).
    pub released: Vec<Token>,
}

/// Token issuance and resolution.
#[derive(Debug)]
pub struct TokenBroker {
    policy: TokenPolicy,
    ttl_ms: Option<u64>,
    entropy_bytes: usize,
    /// Live token → owning household.
    index: HashMap<Token, HouseholdId>,
}

impl TokenBroker {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            policy: config.token_policy,
            ttl_ms: config.token_ttl_ms,
            entropy_bytes: config.token_entropy_bytes,
            index: HashMap::new(),
        }
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    /// Rebuilds the index from persisted reservations.
    pub fn rebuild<'a>(&mut self, households: impl IntoIterator<Item = &'a Household>) {
        self.index.clear();
        for household in households {
            for reservation in &household.pending {
                self.index
                    .insert(reservation.token.clone(), household.household_id.clone());
            }
        }
    }

    /// Number of indexed tokens.
    pub fn outstanding(&self) -> usize {
        self.index.len()
    }

    /// Generates a fresh token from the OS CSPRNG.
    pub fn generate_token(&self) -> Token {
        loop {
            let mut bytes = vec![0u8; self.entropy_bytes];
            OsRng.fill_bytes(&mut bytes);
            let token = format!("{}{}", TOKEN_PREFIX, hex::encode_upper(&bytes));
            if !self.index.contains_key(&token) {
                return token;
            }
        }
    }

    /// Reserves `bundle` on the household draft.
    ///
    /// Balances are only checked, never deducted. Under
    /// `TokenPolicy::SinglePending` every earlier reservation is dropped.
    ///
    /// # Errors
    /// - `Validation` if the bundle is empty or names an unclaimed tranche
    /// - `InsufficientBalance` if any entry exceeds what is free
    pub fn reserve(
        &self,
        household: &mut Household,
        bundle: Bundle,
        now: Timestamp,
    ) -> Result<IssueOutcome, LedgerError> {
        let bundle = bundle.normalized();
        if bundle.is_empty() {
            return Err(LedgerError::Validation(
                "select at least one voucher".to_string(),
            ));
        }
        if let Some(tranche) = bundle
            .as_map()
            .keys()
            .find(|t| !household.balances.has_tranche(t))
        {
            return Err(LedgerError::Validation(format!(
                "tranche {} has not been claimed",
                tranche
            )));
        }

        let mut released = household.prune_expired(now);

        let reserved = match self.policy {
            TokenPolicy::SinglePending => Bundle::new(),
            TokenPolicy::MultiplePending => household.reserved_total(now),
        };
        household.balances.check_covers(&bundle, &reserved)?;

        if self.policy == TokenPolicy::SinglePending {
            released.extend(self.clear(household));
        }

        let reservation = Reservation {
            token: self.generate_token(),
            household_id: household.household_id.clone(),
            bundle,
            created_at: now,
            expires_at: self.ttl_ms.map(|ttl| now.saturating_add(ttl)),
        };
        household.pending.push(reservation.clone());

        Ok(IssueOutcome {
            reservation,
            released,
        })
    }

    /// Applies a committed reservation to the index.
    pub fn commit_issue(&mut self, outcome: &IssueOutcome) {
        self.forget(&outcome.released);
        self.index.insert(
            outcome.reservation.token.clone(),
            outcome.reservation.household_id.clone(),
        );
    }

    /// Household that owns `token`, if the token is indexed.
    pub fn lookup(&self, token: &str) -> Option<&HouseholdId> {
        self.index.get(token)
    }

    /// Resolves `token` against its household record.
    ///
    /// Does not clear anything; a failed deduction must leave the
    /// reservation in place.
    pub fn resolve(
        &self,
        household: &Household,
        token: &str,
        now: Timestamp,
    ) -> Option<(HouseholdId, Bundle)> {
        if self.index.get(token) != Some(&household.household_id) {
            return None;
        }
        household
            .reservation(token, now)
            .map(|r| (r.household_id.clone(), r.bundle.clone()))
    }

    /// Drops one reservation from the draft. Idempotent.
    pub fn release(&self, household: &mut Household, token: &str) -> Option<Reservation> {
        household.remove_reservation(token)
    }

    /// Drops every reservation from the draft. Idempotent.
    pub fn clear(&self, household: &mut Household) -> Vec<Token> {
        household.clear_reservations()
    }

    /// Removes tokens from the index.
    pub fn forget(&mut self, tokens: &[Token]) {
        for token in tokens {
            self.index.remove(token);
        }
    }
}
