//! Vykso HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use crate::error::ClientError;
use crate::types::{
    AccountInfo, ApiErrorResponse, Balance, CreateVideoRequest, CreateVideoResponse,
    ProfileRequest, TransactionList, VideoJobInfo, VideoJobList,
};

/// Options for building a [`VyksoClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

/// Vykso API client.
///
/// Authenticates as an end user with a bearer token from the identity
/// provider.
#[derive(Debug, Clone)]
pub struct VyksoClient {
    client: Client,
    base_url: String,
    token: String,
}

impl VyksoClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the Vykso API (e.g. `"https://api.vykso.app"`)
    /// * `token` - The user's bearer token
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_options(base_url, token, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (does not happen with
    /// default settings).
    #[must_use]
    pub fn with_options(
        base_url: impl Into<String>,
        token: impl Into<String>,
        options: ClientOptions,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Provision (get-or-create) the caller's account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn provision_account(
        &self,
        profile: ProfileRequest,
    ) -> Result<AccountInfo, ClientError> {
        let response = self
            .client
            .post(format!("{}/v1/accounts", self.base_url))
            .bearer_auth(&self.token)
            .json(&profile)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Get the caller's account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the account doesn't exist.
    pub async fn get_account(&self) -> Result<AccountInfo, ClientError> {
        let response = self
            .client
            .get(format!("{}/v1/accounts/me", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Get the caller's credit balance, plan, and tier.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the account doesn't exist.
    pub async fn get_balance(&self) -> Result<Balance, ClientError> {
        let response = self
            .client
            .get(format!("{}/v1/credits/balance", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// List the caller's credit transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the account doesn't exist.
    pub async fn list_transactions(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<TransactionList, ClientError> {
        let response = self
            .client
            .get(format!("{}/v1/credits/transactions", self.base_url))
            .query(&[("limit", limit), ("offset", offset)])
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Create a video generation job.
    ///
    /// Debits credits equal to the clip duration; poll the returned job
    /// with [`VyksoClient::get_video`] until it reaches a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientCredits`] when the balance
    /// doesn't cover the request, [`ClientError::InvalidDuration`] for an
    /// out-of-range professional request, or another error variant for
    /// transport and server failures.
    pub async fn create_video(
        &self,
        request: CreateVideoRequest,
    ) -> Result<CreateVideoResponse, ClientError> {
        let response = self
            .client
            .post(format!("{}/v1/videos", self.base_url))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Get a video job by id (the polling call).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the job doesn't exist.
    pub async fn get_video(&self, job_id: &str) -> Result<VideoJobInfo, ClientError> {
        let response = self
            .client
            .get(format!("{}/v1/videos/{job_id}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// List the caller's video jobs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_videos(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<VideoJobList, ClientError> {
        let response = self
            .client
            .get(format!("{}/v1/videos", self.base_url))
            .query(&[("limit", limit), ("offset", offset)])
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Cancel a video job, refunding its debit if it wasn't terminal yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the job doesn't exist.
    pub async fn cancel_video(&self, job_id: &str) -> Result<VideoJobInfo, ClientError> {
        let response = self
            .client
            .post(format!("{}/v1/videos/{job_id}/cancel", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Parse a response, mapping error bodies to typed variants.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body: Result<ApiErrorResponse, _> = response.json().await;
        let Ok(body) = body else {
            return Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            });
        };

        match body.error.code.as_str() {
            "insufficient_credits" => {
                let details = body.error.details.unwrap_or_default();
                Err(ClientError::InsufficientCredits {
                    balance: details.get("balance").and_then(serde_json::Value::as_i64).unwrap_or(0),
                    required: details
                        .get("required")
                        .and_then(serde_json::Value::as_i64)
                        .unwrap_or(0),
                })
            }
            "invalid_duration" => Err(ClientError::InvalidDuration {
                message: body.error.message,
            }),
            "not_found" => Err(ClientError::NotFound(body.error.message)),
            code => Err(ClientError::Api {
                code: code.to_string(),
                message: body.error.message,
                status: status.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vykso_core::GenerationModel;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_balance_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/credits/balance"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "credits": 92,
                "plan": "creator_basic",
                "tier": "creator",
                "aspect_ratio": "9:16"
            })))
            .mount(&server)
            .await;

        let client = VyksoClient::new(server.uri(), "tok");
        let balance = client.get_balance().await.unwrap();
        assert_eq!(balance.credits, 92);
        assert_eq!(balance.tier, "creator");
    }

    #[tokio::test]
    async fn insufficient_credits_maps_to_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/videos"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {
                    "code": "insufficient_credits",
                    "message": "Insufficient credits - top up to keep generating",
                    "details": { "balance": 2, "required": 8 }
                }
            })))
            .mount(&server)
            .await;

        let client = VyksoClient::new(server.uri(), "tok");
        let result = client
            .create_video(CreateVideoRequest {
                model: GenerationModel::Veo3Fast,
                prompt: "Clip".into(),
                duration_seconds: None,
                reference_image_urls: vec![],
            })
            .await;

        assert!(matches!(
            result,
            Err(ClientError::InsufficientCredits {
                balance: 2,
                required: 8
            })
        ));
    }

    #[tokio::test]
    async fn create_video_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/videos"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "job": {
                    "id": "01JGQZ5K8F3T1V9W2X4Y6Z8A0B",
                    "status": "pending",
                    "progress": 0,
                    "duration_seconds": 8,
                    "model": "veo3_fast",
                    "prompt": "Clip",
                    "aspect_ratio": "9:16",
                    "reference_image_urls": [],
                    "video_url": null,
                    "error": null,
                    "charged_credits": 8,
                    "created_at": "2025-06-01T12:00:00Z",
                    "completed_at": null
                },
                "credits": 92
            })))
            .mount(&server)
            .await;

        let client = VyksoClient::new(server.uri(), "tok");
        let created = client
            .create_video(CreateVideoRequest {
                model: GenerationModel::Veo3Fast,
                prompt: "Clip".into(),
                duration_seconds: None,
                reference_image_urls: vec![],
            })
            .await
            .unwrap();

        assert_eq!(created.credits, 92);
        assert_eq!(created.job.charged_credits, 8);
        assert!(created.job.video_url.is_none());
    }

    #[tokio::test]
    async fn not_found_maps_to_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/accounts/me"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "not_found", "message": "Account not found" }
            })))
            .mount(&server)
            .await;

        let client = VyksoClient::new(server.uri(), "tok");
        let result = client.get_account().await;
        assert!(matches!(result, Err(ClientError::NotFound(_))));
    }
}
