//! # Ledger Flow Tests
//!
//! Household lifecycle end to end:
//!
//! ```text
//! register → claim → issue_token → [hand token to merchant] → redeem_token
//!                                                                │
//!                                   audit record + notification ←┘
//! ```

#[cfg(test)]
mod tests {
    use crate::fixtures::{household_with, MemoryHarness, MERCHANT_ID, MERCHANT_NAME, START};
    use serde_json::json;
    use std::collections::BTreeMap;
    use voucher_ledger::{
        Bundle, LedgerConfig, LedgerError, NotificationKind, TokenPolicy, VoucherLedgerApi,
    };

    fn harness() -> MemoryHarness {
        MemoryHarness::new(LedgerConfig::for_testing())
    }

    // =============================================================================
    // HAPPY PATH
    // =============================================================================

    #[test]
    fn test_register_claim_issue_redeem() {
        let h = harness();
        let ledger = &h.ledger;

        let hid = ledger
            .register_household(vec!["Tan".into(), "Lim".into()], "123456".into())
            .unwrap();
        ledger.claim_tranche(&hid, "Jan2026").unwrap();
        assert_eq!(
            serde_json::to_value(ledger.get_balance(&hid).unwrap()).unwrap(),
            json!({"Jan2026": {"2": 30, "5": 20, "10": 14}})
        );

        let issued = ledger
            .issue_token(&hid, Bundle::new().with("Jan2026", 10, 2))
            .unwrap();
        assert_eq!(issued.total_amount, 20);

        let receipt = ledger.redeem_token(&issued.token, MERCHANT_ID).unwrap();
        assert_eq!(receipt.total_amount, 20);
        assert_eq!(receipt.merchant_name, MERCHANT_NAME);
        assert_eq!(
            serde_json::to_value(ledger.get_balance(&hid).unwrap()).unwrap(),
            json!({"Jan2026": {"2": 30, "5": 20, "10": 12}})
        );

        assert_eq!(
            ledger.redeem_token(&issued.token, MERCHANT_ID).unwrap_err(),
            LedgerError::InvalidOrExpiredToken
        );
    }

    #[test]
    fn test_redemption_side_channels() {
        let h = harness();
        let hid = household_with(&h.ledger, &["Jan2026"]);

        let issued = h
            .ledger
            .issue_token(&hid, Bundle::new().with("Jan2026", 5, 3))
            .unwrap();
        let receipt = h.ledger.redeem_token(&issued.token, MERCHANT_ID).unwrap();

        let history = h.ledger.get_transaction_history(&hid, 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].transaction_id, receipt.transaction_id);
        assert_eq!(history[0].timestamp, START);
        assert_eq!(history[0].total_amount, 15);

        let notes = h.ledger.take_notifications(&hid).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::RedemptionSuccess);
        assert_eq!(notes[0].amount, 15);
        assert!(h.ledger.take_notifications(&hid).unwrap().is_empty());
    }

    #[test]
    fn test_both_tranches_spent_independently() {
        let h = harness();
        let hid = household_with(&h.ledger, &["May2025", "Jan2026"]);
        assert_eq!(h.ledger.get_total_balance(&hid).unwrap(), 800);

        let bundle = Bundle::new()
            .with("May2025", 10, 30)
            .with("Jan2026", 2, 1);
        let issued = h.ledger.issue_token(&hid, bundle).unwrap();
        h.ledger.redeem_token(&issued.token, MERCHANT_ID).unwrap();

        let balance = h.ledger.get_balance(&hid).unwrap();
        assert_eq!(balance.available("May2025", 10), 0);
        assert_eq!(balance.available("Jan2026", 2), 29);
        assert_eq!(h.ledger.get_total_balance(&hid).unwrap(), 800 - 302);
    }

    #[test]
    fn test_denomination_only_selection() {
        let h = harness();
        let hid = household_with(&h.ledger, &["May2025", "Jan2026"]);

        let issued = h
            .ledger
            .issue_token_for_denominations(&hid, BTreeMap::from([(2, 55), (5, 1)]))
            .unwrap();
        assert_eq!(issued.bundle.count("May2025", 2), 50);
        assert_eq!(issued.bundle.count("Jan2026", 2), 5);
        assert_eq!(issued.bundle.count("May2025", 5), 1);
        assert_eq!(issued.total_amount, 115);
    }

    // =============================================================================
    // TOKEN POLICIES
    // =============================================================================

    #[test]
    fn test_single_pending_supersedes() {
        let h = harness();
        let hid = household_with(&h.ledger, &["Jan2026"]);

        let old = h
            .ledger
            .issue_token(&hid, Bundle::new().with("Jan2026", 10, 2))
            .unwrap();
        let new = h
            .ledger
            .issue_token(&hid, Bundle::new().with("Jan2026", 2, 1))
            .unwrap();

        assert_eq!(
            h.ledger.resolve_token(&old.token).unwrap_err(),
            LedgerError::InvalidOrExpiredToken
        );
        assert_eq!(h.ledger.resolve_token(&new.token).unwrap().total_amount, 2);
    }

    #[test]
    fn test_multiple_pending_coexist() {
        let h = MemoryHarness::new(
            LedgerConfig::for_testing().with_policy(TokenPolicy::MultiplePending),
        );
        let hid = household_with(&h.ledger, &["Jan2026"]);

        let a = h
            .ledger
            .issue_token(&hid, Bundle::new().with("Jan2026", 10, 2))
            .unwrap();
        let b = h
            .ledger
            .issue_token(&hid, Bundle::new().with("Jan2026", 2, 1))
            .unwrap();

        assert!(h.ledger.resolve_token(&a.token).is_ok());
        assert!(h.ledger.resolve_token(&b.token).is_ok());

        h.ledger.redeem_token(&a.token, MERCHANT_ID).unwrap();
        assert!(h.ledger.resolve_token(&b.token).is_ok());
        h.ledger.redeem_token(&b.token, MERCHANT_ID).unwrap();
        assert_eq!(h.ledger.get_total_balance(&hid).unwrap(), 300 - 22);
    }

    #[test]
    fn test_expired_token_cannot_redeem() {
        let h = harness();
        let hid = household_with(&h.ledger, &["Jan2026"]);
        let issued = h
            .ledger
            .issue_token(&hid, Bundle::new().with("Jan2026", 10, 1))
            .unwrap();

        h.clock.advance(LedgerConfig::for_testing().token_ttl_ms.unwrap());

        assert_eq!(
            h.ledger.redeem_token(&issued.token, MERCHANT_ID).unwrap_err(),
            LedgerError::InvalidOrExpiredToken
        );
        assert_eq!(h.ledger.get_total_balance(&hid).unwrap(), 300);

        // A fresh token works and replaces the expired one.
        let fresh = h
            .ledger
            .issue_token(&hid, Bundle::new().with("Jan2026", 10, 1))
            .unwrap();
        h.ledger.redeem_token(&fresh.token, MERCHANT_ID).unwrap();
    }

    // =============================================================================
    // ERROR PATHS
    // =============================================================================

    #[test]
    fn test_claim_once_and_atomic_deduction() {
        let h = harness();
        let hid = household_with(&h.ledger, &["Jan2026"]);
        let before = h.ledger.get_balance(&hid).unwrap();

        assert!(matches!(
            h.ledger.claim_tranche(&hid, "Jan2026"),
            Err(LedgerError::AlreadyClaimed { .. })
        ));

        let overdraw = Bundle::new()
            .with("Jan2026", 2, 30)
            .with("Jan2026", 5, 21);
        assert!(matches!(
            h.ledger.redeem_direct(&hid, MERCHANT_ID, overdraw),
            Err(LedgerError::InsufficientBalance { denomination: 5, requested: 21, available: 20, .. })
        ));
        assert_eq!(h.ledger.get_balance(&hid).unwrap(), before);
        assert!(h.audit.records().is_empty());
    }

    #[test]
    fn test_error_kinds_are_client_errors() {
        let h = harness();
        let hid = household_with(&h.ledger, &["Jan2026"]);

        let errors = [
            h.ledger.get_balance("H00000000000").unwrap_err(),
            h.ledger.claim_tranche(&hid, "Jan2026").unwrap_err(),
            h.ledger.resolve_token("TXN-FORGED").unwrap_err(),
            h.ledger
                .issue_token(&hid, Bundle::new().with("Jan2026", 10, 99))
                .unwrap_err(),
            h.ledger.register_household(vec![], "1".into()).unwrap_err(),
        ];
        for e in &errors {
            assert!(e.is_client_error(), "{:?} should be a client error", e);
        }
    }
}
