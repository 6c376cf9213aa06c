//! In-memory adapters for every outbound port.
//!
//! Used by unit and integration tests, and by embedders that keep the ledger
//! purely in process.

use crate::domain::{Household, HouseholdId, LedgerError, Merchant, Notification, RedemptionRecord};
use crate::ports::outbound::{AuditSink, LedgerStore, NotificationSink};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory ledger store with write-failure injection.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    households: Mutex<HashMap<HouseholdId, Household>>,
    merchants: Mutex<Vec<Merchant>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded store, as if loaded from disk.
    pub fn with_households(households: Vec<Household>) -> Self {
        let store = Self::default();
        {
            let mut map = store.households.lock();
            for h in households {
                map.insert(h.household_id.clone(), h);
            }
        }
        store
    }

    /// Makes every subsequent write fail with `Persistence`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// The durable copy of a household, if any.
    pub fn stored_household(&self, household_id: &str) -> Option<Household> {
        self.households.lock().get(household_id).cloned()
    }

    fn check_writable(&self) -> Result<(), LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Persistence("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load_households(&self) -> Result<Vec<Household>, LedgerError> {
        let mut households: Vec<_> = self.households.lock().values().cloned().collect();
        households.sort_by(|a, b| a.household_id.cmp(&b.household_id));
        Ok(households)
    }

    fn save_household(&self, household: &Household) -> Result<(), LedgerError> {
        self.check_writable()?;
        self.households
            .lock()
            .insert(household.household_id.clone(), household.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load_merchants(&self) -> Result<Vec<Merchant>, LedgerError> {
        Ok(self.merchants.lock().clone())
    }

    fn save_merchants(&self, merchants: &[Merchant]) -> Result<(), LedgerError> {
        self.check_writable()?;
        *self.merchants.lock() = merchants.to_vec();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory audit trail. Keeps every record; `history` reads newest first.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    records: Mutex<Vec<RedemptionRecord>>,
    fail: AtomicBool,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Every record in append order.
    pub fn records(&self) -> Vec<RedemptionRecord> {
        self.records.lock().clone()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record_redemption(&self, record: &RedemptionRecord) -> Result<(), LedgerError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LedgerError::Persistence("audit sink unavailable".to_string()));
        }
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn history(
        &self,
        household_id: &str,
        limit: usize,
    ) -> Result<Vec<RedemptionRecord>, LedgerError> {
        Ok(self
            .records
            .lock()
            .iter()
            .rev()
            .filter(|r| r.household_id == household_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// In-memory notification queue.
#[derive(Debug, Default)]
pub struct InMemoryNotificationSink {
    queues: Mutex<HashMap<HouseholdId, Vec<Notification>>>,
    fail: AtomicBool,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn pending(&self, household_id: &str) -> usize {
        self.queues.lock().get(household_id).map_or(0, Vec::len)
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn push(&self, notification: &Notification) -> Result<(), LedgerError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LedgerError::Persistence("notification queue unavailable".to_string()));
        }
        self.queues
            .lock()
            .entry(notification.household_id.clone())
            .or_default()
            .push(notification.clone());
        Ok(())
    }

    fn take_unread(&self, household_id: &str) -> Result<Vec<Notification>, LedgerError> {
        let mut unread = self.queues.lock().remove(household_id).unwrap_or_default();
        // Stable sort keeps push order reversed for equal timestamps.
        unread.reverse();
        unread.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(unread)
    }

    fn clear(&self, household_id: &str) -> Result<usize, LedgerError> {
        Ok(self
            .queues
            .lock()
            .remove(household_id)
            .map_or(0, |q| q.len()))
    }
}
