//! Ledger builders shared by the integration suite and the benchmarks.

use std::path::Path;
use std::sync::Arc;
use voucher_ledger::{
    FileAuditSink, FileNotificationSink, HouseholdId, InMemoryAuditSink, InMemoryLedgerStore,
    InMemoryNotificationSink, JsonFileLedgerStore, LedgerConfig, LedgerDependencies, Merchant,
    MockTimeSource, SystemTimeSource, Timestamp, VoucherLedgerApi, VoucherService,
};

/// 2026-01-15 09:30:05 UTC.
pub const START: Timestamp = 1_768_469_405_000;

/// Merchant registered by every fixture.
pub const MERCHANT_ID: &str = "M1";
pub const MERCHANT_NAME: &str = "Kopi Corner";

pub type MemoryLedger = VoucherService<
    Arc<InMemoryLedgerStore>,
    Arc<InMemoryAuditSink>,
    Arc<InMemoryNotificationSink>,
    Arc<MockTimeSource>,
>;

pub type FileLedger =
    VoucherService<JsonFileLedgerStore, FileAuditSink, FileNotificationSink, SystemTimeSource>;

/// In-memory ledger plus handles to its adapters.
pub struct MemoryHarness {
    pub ledger: MemoryLedger,
    pub store: Arc<InMemoryLedgerStore>,
    pub audit: Arc<InMemoryAuditSink>,
    pub notifications: Arc<InMemoryNotificationSink>,
    pub clock: Arc<MockTimeSource>,
}

impl MemoryHarness {
    pub fn new(config: LedgerConfig) -> Self {
        let store = Arc::new(InMemoryLedgerStore::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        let notifications = Arc::new(InMemoryNotificationSink::new());
        let clock = Arc::new(MockTimeSource::new(START));
        let deps = LedgerDependencies {
            store: Arc::clone(&store),
            audit: Arc::clone(&audit),
            notifications: Arc::clone(&notifications),
            time_source: Arc::clone(&clock),
        };
        let ledger = VoucherService::open(deps, config).expect("in-memory ledger opens");
        ensure_merchant(&ledger);

        Self {
            ledger,
            store,
            audit,
            notifications,
            clock,
        }
    }
}

/// File-backed ledger rooted at `dir`, as the node runs it.
pub fn file_ledger(dir: &Path, config: LedgerConfig) -> FileLedger {
    let deps = LedgerDependencies {
        store: JsonFileLedgerStore::new(dir),
        audit: FileAuditSink::new(dir, config.history_capacity),
        notifications: FileNotificationSink::new(dir),
        time_source: SystemTimeSource,
    };
    let ledger = VoucherService::open(deps, config).expect("file ledger opens");
    ensure_merchant(&ledger);
    ledger
}

fn ensure_merchant(ledger: &dyn VoucherLedgerApi) {
    if ledger.get_merchant(MERCHANT_ID).is_err() {
        ledger
            .register_merchant(Merchant::new(MERCHANT_ID, MERCHANT_NAME))
            .expect("merchant registers");
    }
}

/// Registers a two-member household and claims `tranches`.
pub fn household_with(ledger: &dyn VoucherLedgerApi, tranches: &[&str]) -> HouseholdId {
    let household_id = ledger
        .register_household(vec!["Tan".to_string(), "Lim".to_string()], "123456".to_string())
        .expect("household registers");
    for tranche in tranches {
        ledger
            .claim_tranche(&household_id, tranche)
            .expect("tranche claims");
    }
    household_id
}
