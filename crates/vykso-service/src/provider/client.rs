//! Generation provider API client.

use reqwest::Client;
use std::time::Duration;

use vykso_core::VideoJob;

use super::types::{SubmitEnvelope, SubmitRequest};

/// Error type for generation provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the request.
    #[error("provider error {code}: {message}")]
    Api {
        /// Provider status code.
        code: i64,
        /// Provider error message.
        message: String,
    },

    /// Provider accepted the request but returned no task id.
    #[error("provider returned no task id")]
    MissingTaskId,
}

/// Generation provider API client.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    client: Client,
    base_url: String,
    api_key: String,
    callback_url: Option<String>,
}

impl GenerationClient {
    /// Create a new generation provider client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (does not happen with
    /// default settings).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        callback_url: Option<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            callback_url,
        }
    }

    /// Submit a generation task for a job.
    ///
    /// Returns the provider's task id, echoed later in status callbacks.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider rejects it.
    pub async fn submit(&self, job: &VideoJob) -> Result<String, ProviderError> {
        let request = SubmitRequest {
            prompt: job.prompt.clone(),
            model: job.model.as_str().to_string(),
            aspect_ratio: job.aspect_ratio.as_str().to_string(),
            duration: job.duration_seconds,
            image_urls: job.reference_image_urls.clone(),
            call_back_url: self.callback_url.clone(),
        };

        tracing::debug!(
            job_id = %job.id,
            model = %request.model,
            duration = %request.duration,
            "Submitting generation task"
        );

        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let envelope: SubmitEnvelope = response.json().await?;
        if envelope.code != 200 {
            return Err(ProviderError::Api {
                code: envelope.code,
                message: envelope.msg.unwrap_or_else(|| "unknown error".into()),
            });
        }

        envelope
            .data
            .map(|data| data.task_id)
            .ok_or(ProviderError::MissingTaskId)
    }
}
