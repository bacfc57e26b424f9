//! Request and response types mirroring the Vykso API.

use serde::{Deserialize, Serialize};

use vykso_core::{GenerationModel, JobStatus, TransactionKind};

/// Account info returned by `/v1/accounts` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    /// Account id.
    pub id: String,
    /// Contact email, if known.
    pub email: Option<String>,
    /// Display name, if known.
    pub display_name: Option<String>,
    /// Credit balance.
    pub credits: i64,
    /// Current plan name.
    pub plan: String,
    /// Tier derived from the plan (`"creator"` / `"professional"`).
    pub tier: String,
    /// Aspect ratio mandated by the tier (`"9:16"` / `"16:9"`).
    pub aspect_ratio: String,
    /// Created timestamp (RFC 3339).
    pub created_at: String,
}

/// Profile fields sent when provisioning an account.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileRequest {
    /// Contact email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Balance summary from `/v1/credits/balance`.
#[derive(Debug, Clone, Deserialize)]
pub struct Balance {
    /// Credit balance.
    pub credits: i64,
    /// Current plan name.
    pub plan: String,
    /// Tier derived from the plan.
    pub tier: String,
    /// Aspect ratio mandated by the tier.
    pub aspect_ratio: String,
}

/// One transaction in the history listing.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRecord {
    /// Transaction id.
    pub id: String,
    /// Signed credit amount (negative = debit).
    pub amount: i64,
    /// Transaction kind.
    pub kind: TransactionKind,
    /// Balance after this transaction.
    pub balance_after: i64,
    /// Description.
    pub description: String,
    /// Timestamp (RFC 3339).
    pub created_at: String,
}

/// Transaction history page.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionList {
    /// Transactions, newest first.
    pub transactions: Vec<TransactionRecord>,
    /// Whether more transactions exist past this page.
    pub has_more: bool,
}

/// Request body for creating a video job.
#[derive(Debug, Clone, Serialize)]
pub struct CreateVideoRequest {
    /// Generation model to use.
    pub model: GenerationModel,
    /// The generation prompt.
    pub prompt: String,
    /// Requested duration; ignored for creator accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    /// Reference images (at most 3).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_image_urls: Vec<String>,
}

/// A video job as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoJobInfo {
    /// Job id.
    pub id: String,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Generation progress, 0-100.
    pub progress: u8,
    /// Clip length in seconds.
    pub duration_seconds: u32,
    /// Generation model.
    pub model: GenerationModel,
    /// The prompt the clip is generated from.
    pub prompt: String,
    /// Frame orientation.
    pub aspect_ratio: String,
    /// Reference images.
    pub reference_image_urls: Vec<String>,
    /// Playable URL; present only when completed.
    pub video_url: Option<String>,
    /// Failure message; present only when failed.
    pub error: Option<String>,
    /// Credits debited for this job.
    pub charged_credits: i64,
    /// Created timestamp (RFC 3339).
    pub created_at: String,
    /// Terminal timestamp, if reached.
    pub completed_at: Option<String>,
}

/// Response from job creation: the job plus the balance after the debit.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVideoResponse {
    /// The created job.
    pub job: VideoJobInfo,
    /// Credit balance after the debit.
    pub credits: i64,
}

/// Job listing page.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoJobList {
    /// Jobs, newest first.
    pub jobs: Vec<VideoJobInfo>,
    /// Whether more jobs exist past this page.
    pub has_more: bool,
}

/// Error response body from the API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub(crate) error: ApiErrorBody,
}

/// Error payload inside an error response.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub(crate) code: String,
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) details: Option<serde_json::Value>,
}
