//! # Voucher Ledger Service
//!
//! Implements [`VoucherLedgerApi`] on top of the outbound ports.
//!
//! ## Locking
//!
//! - Each household sits behind its own `Mutex`; claim, issue and redeem for
//!   one household are serialized, different households run in parallel.
//! - The household map is an `RwLock` only touched to look up or insert.
//!   Registration persists the new record with no map lock held; ids being
//!   registered are parked in a separate set so they are never handed out
//!   twice.
//! - Merchant registrations are serialized by their own `Mutex`, and the
//!   merchant map is write-locked only for the final insert.
//! - The token index (`TokenBroker`) has its own short-lived `Mutex`.
//!   Lock order is household → broker; the broker lock is never held while
//!   waiting for a household.
//!
//! ## Commit Protocol
//!
//! Every mutation runs on a clone of the household (the draft). The draft is
//! written through `LedgerStore::save_household`; only after that returns `Ok`
//! does it replace the in-memory record. A failed write drops the draft, so
//! the caller sees `Persistence` and nothing changed.
//!
//! Audit rows and notifications are written after the commit and are
//! best-effort: their failures are logged, never returned.

use crate::domain::{
    build_record, short, Bundle, Denomination, Household, HouseholdId, LedgerConfig, LedgerError,
    Merchant, MerchantId, MerchantStatus, Notification, RedemptionAttempt, RedemptionReceipt,
    RedemptionRecord, RedemptionStage, Timestamp, TokenBroker, TokenPolicy, TrancheSchema,
    VoucherBalances,
};
use crate::ports::inbound::{IssuedToken, ResolvedToken, VoucherLedgerApi};
use crate::ports::outbound::{AuditSink, LedgerStore, NotificationSink, TimeSource};
use chrono::{TimeZone, Utc};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Number of random digits in a generated household id.
const HOUSEHOLD_ID_DIGITS: u32 = 11;

/// External collaborators of the service.
pub struct LedgerDependencies<S, A, N, T> {
    pub store: S,
    pub audit: A,
    pub notifications: N,
    pub time_source: T,
}

/// The voucher ledger.
pub struct VoucherService<S, A, N, T>
where
    S: LedgerStore,
    A: AuditSink,
    N: NotificationSink,
    T: TimeSource,
{
    config: LedgerConfig,
    store: S,
    audit: A,
    notifications: N,
    time_source: T,
    households: RwLock<HashMap<HouseholdId, Arc<Mutex<Household>>>>,
    /// Ids allocated to registrations whose write is still in flight.
    registering: Mutex<HashSet<HouseholdId>>,
    merchants: RwLock<HashMap<MerchantId, Merchant>>,
    merchant_writes: Mutex<()>,
    broker: Mutex<TokenBroker>,
}

impl<S, A, N, T> VoucherService<S, A, N, T>
where
    S: LedgerStore,
    A: AuditSink,
    N: NotificationSink,
    T: TimeSource,
{
    /// Loads persisted state and rebuilds the token index.
    ///
    /// # Errors
    /// `Validation` for an invalid config, `Persistence` if the store cannot
    /// be read.
    pub fn open(
        deps: LedgerDependencies<S, A, N, T>,
        config: LedgerConfig,
    ) -> Result<Self, LedgerError> {
        config
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let loaded = deps.store.load_households()?;
        let merchants = deps.store.load_merchants()?;

        let mut broker = TokenBroker::new(&config);
        broker.rebuild(loaded.iter());

        info!(
            "[voucher] 🚀 Ledger opened: {} households, {} merchants, {} outstanding tokens ({:?})",
            loaded.len(),
            merchants.len(),
            broker.outstanding(),
            broker.policy()
        );

        let households = loaded
            .into_iter()
            .map(|h| (h.household_id.clone(), Arc::new(Mutex::new(h))))
            .collect();
        let merchants = merchants
            .into_iter()
            .map(|m| (m.merchant_id.clone(), m))
            .collect();

        Ok(Self {
            config,
            store: deps.store,
            audit: deps.audit,
            notifications: deps.notifications,
            time_source: deps.time_source,
            households: RwLock::new(households),
            registering: Mutex::new(HashSet::new()),
            merchants: RwLock::new(merchants),
            merchant_writes: Mutex::new(()),
            broker: Mutex::new(broker),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn household_count(&self) -> usize {
        self.households.read().len()
    }

    /// Tokens currently indexed (live or not yet pruned).
    pub fn outstanding_tokens(&self) -> usize {
        self.broker.lock().outstanding()
    }

    fn household(&self, household_id: &str) -> Result<Arc<Mutex<Household>>, LedgerError> {
        self.households
            .read()
            .get(household_id)
            .cloned()
            .ok_or_else(|| LedgerError::household_not_found(household_id))
    }

    /// Picks an id that is neither registered nor being registered.
    ///
    /// Lock order is households → registering.
    fn allocate_household_id(&self) -> HouseholdId {
        let households = self.households.read();
        let mut registering = self.registering.lock();
        let mut rng = rand::thread_rng();
        let upper = 10u64.pow(HOUSEHOLD_ID_DIGITS);
        loop {
            let candidate = format!(
                "H{:0width$}",
                rng.gen_range(0..upper),
                width = HOUSEHOLD_ID_DIGITS as usize
            );
            if !households.contains_key(&candidate) && registering.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    fn active_merchant(&self, merchant_id: &str) -> Result<Merchant, LedgerError> {
        let merchant = self.get_merchant(merchant_id)?;
        if !merchant.is_active() {
            return Err(LedgerError::Validation(format!(
                "merchant {} is not active",
                merchant_id
            )));
        }
        Ok(merchant)
    }

    fn today(&self) -> String {
        i64::try_from(self.time_source.now())
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_default()
            .format("%Y-%m-%d")
            .to_string()
    }

    /// Reserves `bundle` on `household` and commits it.
    fn issue_locked(
        &self,
        household: &mut Household,
        bundle: Bundle,
        now: Timestamp,
    ) -> Result<IssuedToken, LedgerError> {
        let mut draft = household.clone();
        let outcome = self.broker.lock().reserve(&mut draft, bundle, now)?;

        self.store.save_household(&draft)?;
        *household = draft;
        self.broker.lock().commit_issue(&outcome);

        let reservation = outcome.reservation;
        info!(
            "[voucher] 🎫 Token {}… issued for {} (${}, {} superseded)",
            short(&reservation.token),
            reservation.household_id,
            reservation.total_amount(),
            outcome.released.len()
        );

        Ok(IssuedToken {
            total_amount: reservation.total_amount(),
            token: reservation.token,
            bundle: reservation.bundle,
            expires_at: reservation.expires_at,
        })
    }

    /// Deducts `bundle` (and drops `token`'s reservation, if any), then commits.
    fn deduct_locked(
        &self,
        household: &mut Household,
        bundle: &Bundle,
        token: Option<&str>,
    ) -> Result<(), LedgerError> {
        let mut draft = household.clone();
        draft.deduct(bundle)?;
        if let Some(token) = token {
            self.broker.lock().release(&mut draft, token);
        }

        self.store.save_household(&draft)?;
        *household = draft;
        if let Some(token) = token {
            self.broker.lock().forget(&[token.to_string()]);
        }
        Ok(())
    }

    /// Post-commit steps: audit, notify, receipt.
    fn settle(&self, record: RedemptionRecord, attempt: &mut RedemptionAttempt) -> RedemptionReceipt {
        if let Err(e) = self.audit.record_redemption(&record) {
            warn!(
                "[voucher] ⚠️ Audit write failed for {} (ledger already committed): {}",
                record.transaction_id, e
            );
        }
        attempt.advance(RedemptionStage::Logged);

        if let Err(e) = self
            .notifications
            .push(&Notification::redemption_success(&record))
        {
            warn!(
                "[voucher] Notification for {} dropped: {}",
                record.household_id, e
            );
        }
        attempt.advance(RedemptionStage::Done);

        info!(
            "[voucher] ✅ Redeemed ${} for {} at {} ({})",
            record.total_amount, record.household_id, record.merchant_id, record.transaction_id
        );
        RedemptionReceipt::from(&record)
    }
}

impl<S, A, N, T> VoucherLedgerApi for VoucherService<S, A, N, T>
where
    S: LedgerStore,
    A: AuditSink,
    N: NotificationSink,
    T: TimeSource,
{
    fn register_household(
        &self,
        members: Vec<String>,
        postal_code: String,
    ) -> Result<HouseholdId, LedgerError> {
        let members: Vec<String> = members
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if members.is_empty() {
            return Err(LedgerError::Validation(
                "at least one household member is required".to_string(),
            ));
        }
        let postal_code = postal_code.trim().to_string();
        if postal_code.is_empty() {
            return Err(LedgerError::Validation("postal code is required".to_string()));
        }

        let household_id = self.allocate_household_id();
        let household = Household::new(household_id.clone(), members, postal_code);

        if let Err(e) = self.store.save_household(&household) {
            self.registering.lock().remove(&household_id);
            return Err(e);
        }
        self.households
            .write()
            .insert(household_id.clone(), Arc::new(Mutex::new(household)));
        self.registering.lock().remove(&household_id);

        info!("[voucher] 🏠 Registered household {}", household_id);
        Ok(household_id)
    }

    fn claim_tranche(
        &self,
        household_id: &str,
        tranche: &str,
    ) -> Result<VoucherBalances, LedgerError> {
        let handle = self.household(household_id)?;
        let schema = self
            .config
            .schema
            .tranche(tranche)
            .ok_or_else(|| LedgerError::tranche_not_found(tranche))?;

        let mut household = handle.lock();
        let mut draft = household.clone();
        if let Err(e) = draft.claim_tranche(schema) {
            warn!("[voucher] Claim rejected for {}: {}", household_id, e);
            return Err(e);
        }

        self.store.save_household(&draft)?;
        *household = draft;

        info!(
            "[voucher] 🎟️ {} claimed {} (${})",
            household_id,
            tranche,
            schema.face_value()
        );
        Ok(household.balances.clone())
    }

    fn get_balance(&self, household_id: &str) -> Result<VoucherBalances, LedgerError> {
        let handle = self.household(household_id)?;
        let balances = handle.lock().balances.clone();
        Ok(balances)
    }

    fn get_total_balance(&self, household_id: &str) -> Result<u64, LedgerError> {
        let handle = self.household(household_id)?;
        let total = handle.lock().total_balance();
        Ok(total)
    }

    fn issue_token(&self, household_id: &str, bundle: Bundle) -> Result<IssuedToken, LedgerError> {
        let handle = self.household(household_id)?;
        let mut household = handle.lock();
        let now = self.time_source.now();

        self.issue_locked(&mut household, bundle, now)
            .map_err(|e| {
                warn!("[voucher] Token issue rejected for {}: {}", household_id, e);
                e
            })
    }

    fn issue_token_for_denominations(
        &self,
        household_id: &str,
        request: BTreeMap<Denomination, u32>,
    ) -> Result<IssuedToken, LedgerError> {
        let handle = self.household(household_id)?;
        let mut household = handle.lock();
        let now = self.time_source.now();

        let reserved = match self.config.token_policy {
            TokenPolicy::SinglePending => Bundle::new(),
            TokenPolicy::MultiplePending => household.reserved_total(now),
        };
        let bundle = household
            .balances
            .allocate(&request, &self.config.schema.names(), &reserved)?;
        debug!(
            "[voucher] Allocated {} vouchers across tranches for {}",
            bundle.voucher_count(),
            household_id
        );

        self.issue_locked(&mut household, bundle, now)
    }

    fn resolve_token(&self, token: &str) -> Result<ResolvedToken, LedgerError> {
        let household_id = self
            .broker
            .lock()
            .lookup(token)
            .cloned()
            .ok_or(LedgerError::InvalidOrExpiredToken)?;
        let handle = self
            .household(&household_id)
            .map_err(|_| LedgerError::InvalidOrExpiredToken)?;

        let household = handle.lock();
        let now = self.time_source.now();
        let (household_id, bundle) = self
            .broker
            .lock()
            .resolve(&household, token, now)
            .ok_or(LedgerError::InvalidOrExpiredToken)?;

        debug!("[voucher] Token {}… resolved to {}", short(token), household_id);
        Ok(ResolvedToken {
            household_id,
            total_amount: bundle.total_amount(),
            bundle,
        })
    }

    fn redeem_token(
        &self,
        token: &str,
        merchant_id: &str,
    ) -> Result<RedemptionReceipt, LedgerError> {
        let mut attempt = RedemptionAttempt::presented(token);
        let reject = |attempt: &mut RedemptionAttempt, e: LedgerError| {
            attempt.reject();
            warn!("[voucher] ❌ Redemption of {}… rejected: {}", short(token), e);
            e
        };

        let merchant = self
            .active_merchant(merchant_id)
            .map_err(|e| reject(&mut attempt, e))?;

        let household_id = self.broker.lock().lookup(token).cloned();
        let handle = household_id
            .and_then(|id| self.household(&id).ok())
            .ok_or_else(|| reject(&mut attempt, LedgerError::InvalidOrExpiredToken))?;

        let mut household = handle.lock();
        let now = self.time_source.now();
        let resolved = self.broker.lock().resolve(&household, token, now);
        let (household_id, bundle) =
            resolved.ok_or_else(|| reject(&mut attempt, LedgerError::InvalidOrExpiredToken))?;
        attempt.advance(RedemptionStage::Resolved);

        // On any failure here the reservation stays, so the token can be retried.
        self.deduct_locked(&mut household, &bundle, Some(token))
            .map_err(|e| reject(&mut attempt, e))?;
        attempt.advance(RedemptionStage::Deducted);

        let record = build_record(&household_id, &merchant, bundle, now);
        Ok(self.settle(record, &mut attempt))
    }

    fn redeem_direct(
        &self,
        household_id: &str,
        merchant_id: &str,
        bundle: Bundle,
    ) -> Result<RedemptionReceipt, LedgerError> {
        let mut attempt = RedemptionAttempt::presented(household_id);
        let reject = |attempt: &mut RedemptionAttempt, e: LedgerError| {
            attempt.reject();
            warn!("[voucher] ❌ Direct redemption for {} rejected: {}", household_id, e);
            e
        };

        let merchant = self
            .active_merchant(merchant_id)
            .map_err(|e| reject(&mut attempt, e))?;
        let handle = self
            .household(household_id)
            .map_err(|e| reject(&mut attempt, e))?;

        let bundle = bundle.normalized();
        if bundle.is_empty() {
            return Err(reject(
                &mut attempt,
                LedgerError::Validation("select at least one voucher".to_string()),
            ));
        }
        attempt.advance(RedemptionStage::Resolved);

        let mut household = handle.lock();
        let now = self.time_source.now();
        self.deduct_locked(&mut household, &bundle, None)
            .map_err(|e| reject(&mut attempt, e))?;
        attempt.advance(RedemptionStage::Deducted);

        let record = build_record(&household.household_id, &merchant, bundle, now);
        Ok(self.settle(record, &mut attempt))
    }

    fn get_transaction_history(
        &self,
        household_id: &str,
        limit: usize,
    ) -> Result<Vec<RedemptionRecord>, LedgerError> {
        self.household(household_id)?;
        self.audit
            .history(household_id, limit.min(self.config.history_capacity))
    }

    fn register_merchant(&self, merchant: Merchant) -> Result<MerchantId, LedgerError> {
        let mut merchant = merchant;
        merchant.merchant_id = merchant.merchant_id.trim().to_string();
        merchant.merchant_name = merchant.merchant_name.trim().to_string();
        if merchant.merchant_id.is_empty() || merchant.merchant_name.is_empty() {
            return Err(LedgerError::Validation(
                "merchant id and name are required".to_string(),
            ));
        }
        if merchant.registration_date.trim().is_empty() {
            merchant.registration_date = self.today();
        }

        // Holds off other registrations; readers keep the map until the insert.
        let _writer = self.merchant_writes.lock();
        let mut draft: Vec<Merchant> = {
            let merchants = self.merchants.read();
            if merchants.contains_key(&merchant.merchant_id) {
                return Err(LedgerError::DuplicateMerchant(merchant.merchant_id));
            }
            merchants.values().cloned().collect()
        };
        draft.push(merchant.clone());
        draft.sort_by(|a, b| a.merchant_id.cmp(&b.merchant_id));
        self.store.save_merchants(&draft)?;

        let merchant_id = merchant.merchant_id.clone();
        if merchant.status == MerchantStatus::Suspended {
            info!("[voucher] 🏪 Registered merchant {} (suspended)", merchant_id);
        } else {
            info!("[voucher] 🏪 Registered merchant {}", merchant_id);
        }
        self.merchants.write().insert(merchant_id.clone(), merchant);
        Ok(merchant_id)
    }

    fn get_merchant(&self, merchant_id: &str) -> Result<Merchant, LedgerError> {
        self.merchants
            .read()
            .get(merchant_id)
            .cloned()
            .ok_or_else(|| LedgerError::merchant_not_found(merchant_id))
    }

    fn list_tranches(&self) -> Vec<TrancheSchema> {
        self.config.schema.tranches().to_vec()
    }

    fn unclaimed_tranches(&self, household_id: &str) -> Result<Vec<String>, LedgerError> {
        let handle = self.household(household_id)?;
        let household = handle.lock();
        Ok(self
            .config
            .schema
            .names()
            .into_iter()
            .filter(|name| !household.balances.has_tranche(name))
            .map(str::to_string)
            .collect())
    }

    fn take_notifications(&self, household_id: &str) -> Result<Vec<Notification>, LedgerError> {
        self.household(household_id)?;
        self.notifications.take_unread(household_id)
    }

    fn clear_notifications(&self, household_id: &str) -> Result<usize, LedgerError> {
        self.household(household_id)?;
        self.notifications.clear(household_id)
    }
}
