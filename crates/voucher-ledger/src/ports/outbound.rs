//! Outbound (Driven) ports for the voucher ledger.
//!
//! These traits define the external collaborators the ledger depends on:
//! durable storage, the audit trail, the notification queue and the clock.

use crate::domain::{Household, LedgerError, Merchant, Notification, RedemptionRecord, Timestamp};
use std::sync::Arc;

/// Durable ledger storage.
///
/// A write that returns `Ok` is the commit point: the service only replaces
/// its in-memory record after `save_household` succeeds.
pub trait LedgerStore: Send + Sync {
    /// Loads every household record.
    fn load_households(&self) -> Result<Vec<Household>, LedgerError>;

    /// Durably writes one household record (replacing any previous version).
    fn save_household(&self, household: &Household) -> Result<(), LedgerError>;

    /// Loads every merchant.
    fn load_merchants(&self) -> Result<Vec<Merchant>, LedgerError>;

    /// Durably writes the full merchant registry.
    fn save_merchants(&self, merchants: &[Merchant]) -> Result<(), LedgerError>;
}

/// Append-only audit trail and per-household transaction history.
pub trait AuditSink: Send + Sync {
    /// Appends one committed redemption.
    fn record_redemption(&self, record: &RedemptionRecord) -> Result<(), LedgerError>;

    /// Most recent records first, at most `limit`.
    fn history(&self, household_id: &str, limit: usize)
        -> Result<Vec<RedemptionRecord>, LedgerError>;
}

/// Best-effort push-notification queue.
pub trait NotificationSink: Send + Sync {
    /// Queues a notification.
    fn push(&self, notification: &Notification) -> Result<(), LedgerError>;

    /// Returns unread notifications, newest first, and deletes them.
    fn take_unread(&self, household_id: &str) -> Result<Vec<Notification>, LedgerError>;

    /// Drops every queued notification for a household; returns how many.
    fn clear(&self, household_id: &str) -> Result<usize, LedgerError>;
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Manually driven clock.
#[derive(Debug, Default)]
pub struct MockTimeSource {
    time: std::sync::atomic::AtomicU64,
}

impl MockTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: std::sync::atomic::AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time.store(time, std::sync::atomic::Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(std::sync::atomic::Ordering::SeqCst)
    }
}

// Shared handles, so callers can keep a reference to an adapter they hand over.

impl<T: LedgerStore + ?Sized> LedgerStore for Arc<T> {
    fn load_households(&self) -> Result<Vec<Household>, LedgerError> {
        (**self).load_households()
    }

    fn save_household(&self, household: &Household) -> Result<(), LedgerError> {
        (**self).save_household(household)
    }

    fn load_merchants(&self) -> Result<Vec<Merchant>, LedgerError> {
        (**self).load_merchants()
    }

    fn save_merchants(&self, merchants: &[Merchant]) -> Result<(), LedgerError> {
        (**self).save_merchants(merchants)
    }
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn record_redemption(&self, record: &RedemptionRecord) -> Result<(), LedgerError> {
        (**self).record_redemption(record)
    }

    fn history(
        &self,
        household_id: &str,
        limit: usize,
    ) -> Result<Vec<RedemptionRecord>, LedgerError> {
        (**self).history(household_id, limit)
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn push(&self, notification: &Notification) -> Result<(), LedgerError> {
        (**self).push(notification)
    }

    fn take_unread(&self, household_id: &str) -> Result<Vec<Notification>, LedgerError> {
        (**self).take_unread(household_id)
    }

    fn clear(&self, household_id: &str) -> Result<usize, LedgerError> {
        (**self).clear(household_id)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
