//! Webhook integration tests: billing events and generation callbacks.

mod common;

use common::TestHarness;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Billing webhooks
// ============================================================================

#[tokio::test]
async fn credit_purchase_is_applied_once() {
    let harness = TestHarness::new();
    harness.provision().await; // 10 credits

    let event = json!({
        "id": "evt_purchase_1",
        "type": "checkout.session.completed",
        "data": { "object": {
            "client_reference_id": harness.account_id.to_string(),
            "payment_status": "paid",
            "metadata": { "type": "credit_purchase", "credits": "120" }
        }}
    });

    let response = harness.server.post("/webhooks/billing").json(&event).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["received"], true);
    assert_eq!(harness.balance().await, 130);

    // At-least-once delivery: the replay is acknowledged without effect.
    let response = harness.server.post("/webhooks/billing").json(&event).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["duplicate"], true);
    assert_eq!(harness.balance().await, 130);
}

#[tokio::test]
async fn unpaid_checkout_is_skipped() {
    let harness = TestHarness::new();
    harness.provision().await;

    harness
        .server
        .post("/webhooks/billing")
        .json(&json!({
            "id": "evt_unpaid",
            "type": "checkout.session.completed",
            "data": { "object": {
                "client_reference_id": harness.account_id.to_string(),
                "payment_status": "unpaid",
                "metadata": { "type": "credit_purchase", "credits": "120" }
            }}
        }))
        .await
        .assert_status_ok();

    assert_eq!(harness.balance().await, 10);
}

#[tokio::test]
async fn subscription_start_sets_plan_and_grants_credits() {
    let harness = TestHarness::new();
    harness.provision().await; // 10 credits

    harness
        .server
        .post("/webhooks/billing")
        .json(&json!({
            "id": "evt_sub_start",
            "type": "checkout.session.completed",
            "data": { "object": {
                "client_reference_id": harness.account_id.to_string(),
                "payment_status": "paid",
                "customer": "cus_1",
                "subscription": "sub_1",
                "metadata": { "plan": "creator_basic" }
            }}
        }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["plan"], "creator_basic");
    assert_eq!(body["tier"], "creator");
    assert_eq!(body["credits"], 110); // 10 welcome + 100 plan grant
}

#[tokio::test]
async fn plan_change_flips_tier_without_balance_change() {
    let harness = TestHarness::new();
    harness.provision().await;

    let update = |event_id: &str, plan: &str| {
        json!({
            "id": event_id,
            "type": "customer.subscription.updated",
            "data": { "object": {
                "id": "sub_2",
                "status": "active",
                "metadata": {
                    "account_id": harness.account_id.to_string(),
                    "plan": plan
                }
            }}
        })
    };

    // First land on a creator-tier plan...
    harness
        .server
        .post("/webhooks/billing")
        .json(&update("evt_plan_a", "pro"))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["plan"], "pro");
    assert_eq!(body["tier"], "creator");
    assert_eq!(body["aspect_ratio"], "9:16");

    // ...then the upgrade to pro_pro flips tier and aspect ratio, and the
    // balance is untouched.
    harness
        .server
        .post("/webhooks/billing")
        .json(&update("evt_plan_b", "pro_pro"))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["plan"], "pro_pro");
    assert_eq!(body["tier"], "professional");
    assert_eq!(body["aspect_ratio"], "16:9");
    assert_eq!(body["credits"], 10);
}

#[tokio::test]
async fn renewal_grants_plan_credits_once() {
    let harness = TestHarness::new();
    harness.provision().await;

    // Subscribe to creator_pro (200 credits/month), indexed under sub_9.
    harness
        .server
        .post("/webhooks/billing")
        .json(&json!({
            "id": "evt_sub_9",
            "type": "customer.subscription.updated",
            "data": { "object": {
                "id": "sub_9",
                "status": "active",
                "metadata": {
                    "account_id": harness.account_id.to_string(),
                    "plan": "creator_pro"
                }
            }}
        }))
        .await
        .assert_status_ok();
    assert_eq!(harness.balance().await, 10);

    let renewal = json!({
        "id": "evt_renewal_1",
        "type": "invoice.payment_succeeded",
        "data": { "object": {
            "subscription": "sub_9",
            "billing_reason": "subscription_cycle"
        }}
    });

    harness
        .server
        .post("/webhooks/billing")
        .json(&renewal)
        .await
        .assert_status_ok();
    assert_eq!(harness.balance().await, 210);

    // Replayed renewal grants nothing.
    let response = harness.server.post("/webhooks/billing").json(&renewal).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["duplicate"], true);
    assert_eq!(harness.balance().await, 210);
}

#[tokio::test]
async fn subscription_deleted_reverts_to_free() {
    let harness = TestHarness::new();
    harness.provision().await;

    harness
        .server
        .post("/webhooks/billing")
        .json(&json!({
            "id": "evt_sub_del_setup",
            "type": "customer.subscription.updated",
            "data": { "object": {
                "id": "sub_del",
                "status": "active",
                "metadata": {
                    "account_id": harness.account_id.to_string(),
                    "plan": "max_pro"
                }
            }}
        }))
        .await
        .assert_status_ok();

    harness
        .server
        .post("/webhooks/billing")
        .json(&json!({
            "id": "evt_sub_del",
            "type": "customer.subscription.deleted",
            "data": { "object": { "id": "sub_del" } }
        }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["plan"], "free");
    assert_eq!(body["tier"], "creator");
}

// ============================================================================
// Generation callbacks
// ============================================================================

#[tokio::test]
async fn unknown_generation_task_is_acknowledged() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/webhooks/generation")
        .json(&json!({
            "data": { "taskId": "task-nobody-knows", "state": "success" }
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["received"], true);
}

/// Start a mock generation provider that accepts every submission with the
/// given task id.
async fn mock_provider(task_id: &str) -> MockServer {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "msg": "success",
            "data": { "taskId": task_id }
        })))
        .mount(&provider)
        .await;
    provider
}

/// Create a creator job and wait for the provider handoff.
async fn generating_job(harness: &TestHarness) -> String {
    let response = harness
        .server
        .post("/v1/videos")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "model": "veo3_fast", "prompt": "Drone shot over cliffs" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let job_id = body["job"]["id"].as_str().unwrap().to_string();

    harness.wait_for_job_status(&job_id, "generating").await;
    job_id
}

#[tokio::test]
async fn failure_callback_refunds_once_even_when_replayed() {
    let provider = mock_provider("task-fail-1").await;
    let harness = TestHarness::with_provider(&provider.uri());
    harness.provision().await; // 10 credits

    let job_id = generating_job(&harness).await;
    assert_eq!(harness.balance().await, 2); // 8s debited

    let failure = json!({
        "data": {
            "taskId": "task-fail-1",
            "state": "fail",
            "failCode": "500",
            "failMsg": "Internal provider error"
        }
    });

    // Provider reports failure: job fails and the debit comes back.
    harness
        .server
        .post("/webhooks/generation")
        .json(&failure)
        .await
        .assert_status_ok();

    let job = harness.wait_for_job_status(&job_id, "failed").await;
    assert_eq!(job["error"], "500: Internal provider error");
    assert_eq!(harness.balance().await, 10);

    // The retried webhook is a no-op: still exactly one refund.
    let response = harness
        .server
        .post("/webhooks/generation")
        .json(&failure)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["duplicate"], true);
    assert_eq!(harness.balance().await, 10);
}

#[tokio::test]
async fn success_callback_completes_the_job() {
    let provider = mock_provider("task-ok-1").await;
    let harness = TestHarness::with_provider(&provider.uri());
    harness.provision().await;

    let job_id = generating_job(&harness).await;

    harness
        .server
        .post("/webhooks/generation")
        .json(&json!({
            "data": {
                "taskId": "task-ok-1",
                "state": "success",
                "resultJson": "{\"resultUrls\":[\"https://cdn.vykso.app/task-ok-1.mp4\"]}"
            }
        }))
        .await
        .assert_status_ok();

    let job = harness.wait_for_job_status(&job_id, "completed").await;
    assert_eq!(job["video_url"], "https://cdn.vykso.app/task-ok-1.mp4");
    assert_eq!(job["progress"], 100);

    // Completion keeps the debit.
    assert_eq!(harness.balance().await, 2);

    // A late failure signal cannot claw the video back or refund.
    harness
        .server
        .post("/webhooks/generation")
        .json(&json!({
            "data": { "taskId": "task-ok-1", "state": "fail", "failMsg": "late" }
        }))
        .await
        .assert_status_ok();
    assert_eq!(harness.balance().await, 2);
}

#[tokio::test]
async fn progress_callbacks_update_the_job() {
    let provider = mock_provider("task-prog-1").await;
    let harness = TestHarness::with_provider(&provider.uri());
    harness.provision().await;

    let job_id = generating_job(&harness).await;

    harness
        .server
        .post("/webhooks/generation")
        .json(&json!({
            "data": { "taskId": "task-prog-1", "state": "processing", "progress": 60 }
        }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get(&format!("/v1/videos/{job_id}"))
        .add_header("authorization", harness.auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["progress"], 60);
    assert_eq!(body["status"], "generating");
}

#[tokio::test]
async fn submission_failure_refunds_the_debit() {
    // A provider that rejects every submission.
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 422,
            "msg": "prompt rejected"
        })))
        .mount(&provider)
        .await;

    let harness = TestHarness::with_provider(&provider.uri());
    harness.provision().await;

    let response = harness
        .server
        .post("/v1/videos")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "model": "veo3_fast", "prompt": "Anything" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let job_id = body["job"]["id"].as_str().unwrap().to_string();

    let job = harness.wait_for_job_status(&job_id, "failed").await;
    assert!(job["error"].as_str().unwrap().contains("submission failed"));
    assert_eq!(harness.balance().await, 10);
}
