//! Common test utilities for vykso integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use vykso_core::AccountId;
use vykso_service::{create_router, AppState, ServiceConfig};
use vykso_store::RocksStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test account id for authenticated requests.
    pub account_id: AccountId,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and no provider.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a harness whose generation provider points at a mock server.
    pub fn with_provider(provider_url: &str) -> Self {
        Self::build(Some(provider_url.to_string()))
    }

    fn build(provider_api_url: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let service_api_key = "test-service-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            auth_base_url: "http://localhost".into(),
            auth_audience: "vykso".into(),
            service_api_key: Some(service_api_key.clone()),
            provider_api_key: provider_api_url.as_ref().map(|_| "test-provider-key".into()),
            provider_callback_url: provider_api_url
                .as_ref()
                .map(|_| "http://localhost/webhooks/generation".into()),
            provider_api_url,
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            starting_credits: 10,
        };

        let state = AppState::new(Arc::new(store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let account_id = AccountId::generate();

        Self {
            server,
            _temp_dir: temp_dir,
            account_id,
            service_api_key,
        }
    }

    /// Get the authorization header for user authentication.
    pub fn auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.account_id)
    }

    /// Get a different user's auth header (for testing isolation).
    pub fn other_auth_header() -> String {
        format!("Bearer test-token:{}", AccountId::generate())
    }

    /// Provision the test account (10 welcome credits) and return it.
    pub async fn provision(&self) -> serde_json::Value {
        let response = self
            .server
            .post("/v1/accounts")
            .add_header("authorization", self.auth_header())
            .json(&serde_json::json!({}))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Top up the test account through the admin grant endpoint.
    pub async fn grant_credits(&self, amount: i64) {
        self.server
            .post("/v1/credits/grant")
            .add_header("x-api-key", self.service_api_key.clone())
            .json(&serde_json::json!({
                "account_id": self.account_id.to_string(),
                "amount": amount,
                "reason": "Test top-up"
            }))
            .await
            .assert_status_ok();
    }

    /// Current balance via the API.
    pub async fn balance(&self) -> i64 {
        let response = self
            .server
            .get("/v1/credits/balance")
            .add_header("authorization", self.auth_header())
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["credits"].as_i64().unwrap()
    }

    /// Poll a job until it reaches `status`, panicking after ~2s.
    ///
    /// Provider dispatch runs as a spawned task, so tests that exercise the
    /// full flow need to wait for the handoff to land.
    pub async fn wait_for_job_status(&self, job_id: &str, status: &str) -> serde_json::Value {
        for _ in 0..80 {
            let response = self
                .server
                .get(&format!("/v1/videos/{job_id}"))
                .add_header("authorization", self.auth_header())
                .await;
            response.assert_status_ok();
            let body: serde_json::Value = response.json();
            if body["status"] == status {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {job_id} never reached status {status}");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
