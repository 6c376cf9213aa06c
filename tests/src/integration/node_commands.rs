//! # Node Command Tests
//!
//! Drives a file-backed ledger through the node's JSON-lines transport,
//! the same path the binary takes between stdin and stdout.

#[cfg(test)]
mod tests {
    use crate::fixtures::{file_ledger, MERCHANT_ID};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use voucher_ledger::LedgerConfig;
    use voucher_node::{handle_line, open_ledger, serve, NodeConfig, Response};

    fn call(ledger: &crate::fixtures::FileLedger, request: Value) -> Value {
        let response = handle_line(ledger, &request.to_string());
        assert!(response.ok, "{} failed: {:?}", request, response.error);
        response.result.unwrap_or(Value::Null)
    }

    #[test]
    fn test_household_session_over_commands() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = file_ledger(dir.path(), LedgerConfig::for_testing());

        let hid = call(
            &ledger,
            json!({"op": "register_household", "members": ["Tan"], "postal_code": "530123"}),
        );
        let hid = hid["household_id"].as_str().unwrap().to_string();

        call(&ledger, json!({"op": "claim_tranche", "household_id": hid, "tranche": "May2025"}));
        let unclaimed = call(&ledger, json!({"op": "unclaimed_tranches", "household_id": hid}));
        assert_eq!(unclaimed, json!(["Jan2026"]));

        let issued = call(
            &ledger,
            json!({
                "op": "issue_token",
                "household_id": hid,
                "bundle": {"May2025": {"2": 3, "10": 1}}
            }),
        );
        assert_eq!(issued["total_amount"], 16);
        let token = issued["token"].as_str().unwrap().to_string();
        assert!(token.starts_with("TXN-"));

        let resolved = call(&ledger, json!({"op": "resolve_token", "token": token}));
        assert_eq!(resolved["household_id"], json!(hid));

        let receipt = call(
            &ledger,
            json!({"op": "redeem_token", "token": token, "merchant_id": MERCHANT_ID}),
        );
        assert_eq!(receipt["amount"], 16);

        let total = call(&ledger, json!({"op": "get_total_balance", "household_id": hid}));
        assert_eq!(total["total"], 500 - 16);

        let history = call(
            &ledger,
            json!({"op": "get_transaction_history", "household_id": hid}),
        );
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["transaction_id"], receipt["transaction_id"]);
        assert_eq!(history[0]["amount"], 16);
    }

    #[test]
    fn test_rejections_map_to_error_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = file_ledger(dir.path(), LedgerConfig::for_testing());

        let cases = [
            (json!({"op": "get_balance", "household_id": "H404"}), "not_found"),
            (json!({"op": "resolve_token", "token": "TXN-00"}), "invalid_or_expired_token"),
            (json!({"op": "teleport"}), "invalid_command"),
            (
                json!({"op": "register_household", "members": [], "postal_code": "1"}),
                "validation_error",
            ),
        ];
        for (request, kind) in cases {
            let response = handle_line(&ledger, &request.to_string());
            assert!(!response.ok);
            assert_eq!(response.error.unwrap().kind, kind, "for {}", request);
        }
    }

    #[tokio::test]
    async fn test_serve_against_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            data_dir: dir.path().to_path_buf(),
            ledger: LedgerConfig::for_testing(),
            ..NodeConfig::default()
        };
        let ledger = Arc::new(open_ledger(&config).unwrap());

        let input = [
            json!({"op": "register_merchant", "merchant": {"merchant_id": "M9", "merchant_name": "Hawker 9"}}),
            json!({"op": "register_household", "members": ["Ong"], "postal_code": "640321"}),
            json!({"op": "list_tranches"}),
        ]
        .iter()
        .map(|request| format!("{}\n", request))
        .collect::<String>();

        let mut output = Vec::new();
        let served = serve(Arc::clone(&ledger), input.as_bytes(), &mut output)
            .await
            .unwrap();
        assert_eq!(served, 3);

        let responses: Vec<Response> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert!(responses.iter().all(|r| r.ok));
        assert_eq!(responses[0].result, Some(json!({"merchant_id": "M9"})));
        let tranches = responses[2].result.as_ref().unwrap();
        assert_eq!(tranches[0]["name"], "May2025");

        // Durable: a second node on the same directory sees both records.
        drop(ledger);
        let reopened = open_ledger(&config).unwrap();
        assert_eq!(reopened.household_count(), 1);
        let merchant = handle_line(&reopened, r#"{"op":"get_merchant","merchant_id":"M9"}"#);
        assert_eq!(merchant.result.unwrap()["merchant_name"], "Hawker 9");
    }
}
