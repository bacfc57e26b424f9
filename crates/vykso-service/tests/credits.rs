//! Credit balance and transaction integration tests.

mod common;

use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn balance_reports_plan_and_tier() {
    let harness = TestHarness::new();
    harness.provision().await;

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credits"], 10);
    assert_eq!(body["plan"], "free");
    assert_eq!(body["tier"], "creator");
    assert_eq!(body["aspect_ratio"], "9:16");
}

#[tokio::test]
async fn balance_without_account_fails() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.auth_header())
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn transactions_include_the_welcome_grant() {
    let harness = TestHarness::new();
    harness.provision().await;

    let response = harness
        .server
        .get("/v1/credits/transactions")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["kind"], "credit");
    assert_eq!(transactions[0]["amount"], 10);
    assert_eq!(transactions[0]["balance_after"], 10);
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn grant_credits_with_service_key() {
    let harness = TestHarness::new();
    harness.provision().await;

    let response = harness
        .server
        .post("/v1/credits/grant")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "account_id": harness.account_id.to_string(),
            "amount": 120,
            "reason": "Support compensation"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credits"], 130);

    assert_eq!(harness.balance().await, 130);
}

#[tokio::test]
async fn grant_without_service_key_fails() {
    let harness = TestHarness::new();
    harness.provision().await;

    harness
        .server
        .post("/v1/credits/grant")
        .json(&json!({
            "account_id": harness.account_id.to_string(),
            "amount": 100,
            "reason": "Nope"
        }))
        .await
        .assert_status_unauthorized();

    harness
        .server
        .post("/v1/credits/grant")
        .add_header("x-api-key", "wrong-key")
        .json(&json!({
            "account_id": harness.account_id.to_string(),
            "amount": 100,
            "reason": "Nope"
        }))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn grant_to_unknown_account_fails() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/credits/grant")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "account_id": harness.account_id.to_string(),
            "amount": 100,
            "reason": "No account yet"
        }))
        .await
        .assert_status_not_found();
}
