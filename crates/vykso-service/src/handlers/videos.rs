//! Video job handlers: creation, polling, listing, cancellation.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vykso_core::{GenerationModel, JobId, JobStatus, VideoJob};
use vykso_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Video job response.
#[derive(Debug, Serialize)]
pub struct VideoJobResponse {
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
    /// Created timestamp.
    pub created_at: String,
    /// Terminal timestamp, if reached.
    pub completed_at: Option<String>,
}

impl From<&VideoJob> for VideoJobResponse {
    fn from(job: &VideoJob) -> Self {
        Self {
            id: job.id.to_string(),
            status: job.status,
            progress: job.progress,
            duration_seconds: job.duration_seconds,
            model: job.model,
            prompt: job.prompt.clone(),
            aspect_ratio: job.aspect_ratio.as_str().to_string(),
            reference_image_urls: job.reference_image_urls.clone(),
            video_url: job.video_url.clone(),
            error: job.error.clone(),
            charged_credits: job.charged_credits,
            created_at: job.created_at.to_rfc3339(),
            completed_at: job.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Create video request.
#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    /// Generation model to use.
    pub model: GenerationModel,
    /// The generation prompt.
    pub prompt: String,
    /// Requested duration. Ignored for creator accounts (the model's
    /// fixed duration applies); required range for professional is 6-60s.
    pub duration_seconds: Option<u32>,
    /// Reference images (at most 3).
    #[serde(default)]
    pub reference_image_urls: Vec<String>,
}

/// Create video response: the job plus the balance after the debit.
#[derive(Debug, Serialize)]
pub struct CreateVideoResponse {
    /// The created job.
    pub job: VideoJobResponse,
    /// Credit balance after the debit.
    pub credits: i64,
}

/// Create a video generation job.
///
/// Validates the request against the account's tier, debits
/// `duration_seconds` credits, persists the job as `pending`, and hands it
/// to the generation provider in the background. The response returns
/// immediately; clients poll `GET /v1/videos/{id}` for progress.
pub async fn create_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateVideoRequest>,
) -> Result<Json<CreateVideoResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    // Tier is re-derived from the plan string; the cached field is for
    // queries only.
    let job = VideoJob::create(
        auth.account_id,
        account.tier(),
        body.model,
        body.duration_seconds,
        &body.prompt,
        body.reference_image_urls,
    )?;

    let receipt = state.store.create_job(&job)?;

    tracing::info!(
        account_id = %auth.account_id,
        job_id = %job.id,
        duration = %job.duration_seconds,
        model = %job.model.as_str(),
        charged = %job.charged_credits,
        new_balance = %receipt.balance,
        "Video job created"
    );

    // Provider submission is decoupled from the debit: the request
    // returns now and the job advances via provider callbacks.
    tokio::spawn(dispatch_job(Arc::clone(&state), job.clone()));

    Ok(Json(CreateVideoResponse {
        job: VideoJobResponse::from(&job),
        credits: receipt.balance,
    }))
}

/// Submit a freshly-created job to the generation provider.
///
/// On acceptance the job moves to `generating`; a submission failure is a
/// job failure like any other and refunds the debit.
async fn dispatch_job(state: Arc<AppState>, job: VideoJob) {
    let Some(provider) = state.provider.as_ref() else {
        tracing::warn!(job_id = %job.id, "No generation provider configured - job stays pending");
        return;
    };

    match provider.submit(&job).await {
        Ok(task_id) => match state.store.mark_job_generating(job.id, &task_id) {
            Ok(_) => {
                tracing::info!(job_id = %job.id, provider_ref = %task_id, "Job accepted by provider");
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Failed to record provider acceptance");
            }
        },
        Err(e) => {
            tracing::warn!(job_id = %job.id, error = %e, "Provider submission failed");
            match state.store.fail_job(job.id, &format!("submission failed: {e}")) {
                Ok(transition) if transition.applied => {
                    tracing::info!(job_id = %job.id, "Job failed at submission, debit refunded");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to record submission failure");
                }
            }
        }
    }
}

/// Job list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListVideosQuery {
    /// Maximum number of jobs to return (default: 20, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// List videos response.
#[derive(Debug, Serialize)]
pub struct ListVideosResponse {
    /// Jobs, newest first.
    pub jobs: Vec<VideoJobResponse>,
    /// Whether more jobs exist past this page.
    pub has_more: bool,
}

/// List the caller's video jobs, newest first.
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListVideosQuery>,
) -> Result<Json<ListVideosResponse>, ApiError> {
    let limit = query.limit.min(100);
    let jobs = state
        .store
        .list_jobs(&auth.account_id, limit + 1, query.offset)?;

    let has_more = jobs.len() > limit;
    let jobs: Vec<_> = jobs.iter().take(limit).map(VideoJobResponse::from).collect();

    Ok(Json(ListVideosResponse { jobs, has_more }))
}

/// Get a video job by id (the polling endpoint).
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(job_id): Path<String>,
) -> Result<Json<VideoJobResponse>, ApiError> {
    let job = load_owned_job(&state, &auth, &job_id)?;
    Ok(Json(VideoJobResponse::from(&job)))
}

/// Cancel a video job.
///
/// Cancellation is a failure transition with the standard refund; a job
/// already terminal is returned unchanged.
pub async fn cancel_video(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(job_id): Path<String>,
) -> Result<Json<VideoJobResponse>, ApiError> {
    let job = load_owned_job(&state, &auth, &job_id)?;

    let transition = state.store.fail_job(job.id, "canceled by user")?;
    if transition.applied {
        tracing::info!(
            account_id = %auth.account_id,
            job_id = %job.id,
            refunded = %job.charged_credits,
            "Job canceled"
        );
    }

    Ok(Json(VideoJobResponse::from(&transition.job)))
}

/// Fetch a job and verify the caller owns it.
///
/// Foreign jobs read as not-found rather than forbidden, so job ids don't
/// leak across accounts.
fn load_owned_job(state: &AppState, auth: &AuthUser, job_id: &str) -> Result<VideoJob, ApiError> {
    let job_id: JobId = job_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid job id".into()))?;

    let job = state
        .store
        .get_job(job_id)?
        .filter(|job| job.account_id == auth.account_id)
        .ok_or_else(|| ApiError::NotFound("Job not found".into()))?;

    Ok(job)
}
