//! # Persistence Tests
//!
//! File-backed ledger on a temp directory: durable state survives a restart,
//! the audit export is laid out hourly, and a failed write leaves both the
//! in-memory and on-disk record untouched.

#[cfg(test)]
mod tests {
    use crate::fixtures::{file_ledger, household_with, MemoryHarness, MERCHANT_ID};
    use voucher_ledger::{
        Bundle, FileAuditSink, Household, LedgerConfig, LedgerError, VoucherLedgerApi, CSV_HEADER,
    };

    fn config() -> LedgerConfig {
        LedgerConfig::for_testing()
    }

    #[test]
    fn test_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        let (hid, token, merchant) = {
            let ledger = file_ledger(dir.path(), config());
            let hid = household_with(&ledger, &["Jan2026"]);
            ledger
                .redeem_direct(&hid, MERCHANT_ID, Bundle::new().with("Jan2026", 10, 4))
                .unwrap();
            let issued = ledger
                .issue_token(&hid, Bundle::new().with("Jan2026", 5, 2))
                .unwrap();
            (hid, issued.token, ledger.get_merchant(MERCHANT_ID).unwrap())
        };

        let reopened = file_ledger(dir.path(), config());
        assert_eq!(reopened.household_count(), 1);
        assert_eq!(reopened.get_merchant(MERCHANT_ID).unwrap(), merchant);
        assert_eq!(
            reopened.get_balance(&hid).unwrap().available("Jan2026", 10),
            10
        );
        assert_eq!(reopened.get_transaction_history(&hid, 10).unwrap().len(), 1);

        // The outstanding reservation was persisted with the household.
        let receipt = reopened.redeem_token(&token, MERCHANT_ID).unwrap();
        assert_eq!(receipt.total_amount, 10);
        assert_eq!(
            reopened.get_balance(&hid).unwrap().available("Jan2026", 5),
            18
        );
    }

    #[test]
    fn test_household_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = file_ledger(dir.path(), config());
        let hid = household_with(&ledger, &["May2025"]);

        let path = dir.path().join("households").join(format!("{}.json", hid));
        let stored: Household =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(stored.household_id, hid);
        assert_eq!(stored.postal_code, "123456");
        assert_eq!(stored.balances.available("May2025", 2), 50);
        assert!(stored.pending.is_empty());

        assert!(dir.path().join("merchants.json").exists());
    }

    #[test]
    fn test_audit_export_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = file_ledger(dir.path(), config());
        let hid = household_with(&ledger, &["Jan2026"]);

        let receipt = ledger
            .redeem_direct(
                &hid,
                MERCHANT_ID,
                Bundle::new().with("Jan2026", 2, 2).with("Jan2026", 10, 1),
            )
            .unwrap();

        let sink = FileAuditSink::new(dir.path(), 10);
        let csv = std::fs::read_to_string(sink.export_path(receipt.timestamp)).unwrap();
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with(&receipt.transaction_id));
        assert!(lines[1].contains(",$2.00,$4.00,Completed,1"));
        assert!(lines[2].ends_with(",$10.00,$10.00,Completed,Final denomination used"));
    }

    #[test]
    fn test_notifications_persist_until_taken() {
        let dir = tempfile::tempdir().unwrap();
        let hid = {
            let ledger = file_ledger(dir.path(), config());
            let hid = household_with(&ledger, &["Jan2026"]);
            ledger
                .redeem_direct(&hid, MERCHANT_ID, Bundle::new().with("Jan2026", 5, 1))
                .unwrap();
            hid
        };

        let reopened = file_ledger(dir.path(), config());
        let notes = reopened.take_notifications(&hid).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].amount, 5);
        assert!(reopened.take_notifications(&hid).unwrap().is_empty());
    }

    #[test]
    fn test_failed_write_does_not_commit() {
        let h = MemoryHarness::new(config());
        let hid = household_with(&h.ledger, &["Jan2026"]);
        let issued = h
            .ledger
            .issue_token(&hid, Bundle::new().with("Jan2026", 10, 3))
            .unwrap();
        let durable_before = h.store.stored_household(&hid).unwrap();

        h.store.set_fail_writes(true);
        let err = h.ledger.redeem_token(&issued.token, MERCHANT_ID).unwrap_err();
        assert!(matches!(err, LedgerError::Persistence(_)));
        assert!(!err.is_client_error());

        // Neither copy moved, and no side channel saw the redemption.
        assert_eq!(h.store.stored_household(&hid).unwrap(), durable_before);
        assert_eq!(h.ledger.get_balance(&hid).unwrap(), durable_before.balances);
        assert!(h.audit.records().is_empty());
        assert_eq!(h.notifications.pending(&hid), 0);

        h.store.set_fail_writes(false);
        assert_eq!(
            h.ledger
                .redeem_token(&issued.token, MERCHANT_ID)
                .unwrap()
                .total_amount,
            30
        );
    }

    #[test]
    fn test_failed_registration_leaves_no_household() {
        let h = MemoryHarness::new(config());
        h.store.set_fail_writes(true);

        let err = h
            .ledger
            .register_household(vec!["Tan".into()], "123456".into())
            .unwrap_err();
        assert_eq!(err.kind(), "persistence_error");
        assert_eq!(h.ledger.household_count(), 0);
    }
}
