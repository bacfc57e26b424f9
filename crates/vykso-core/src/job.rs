//! Video generation jobs.
//!
//! A job moves `pending → generating → completed | failed`. Both terminal
//! states are absorbing: once a job is completed or failed, further
//! transition attempts are no-ops. That no-op behavior is what makes
//! replayed provider callbacks safe: the store refunds only when a
//! `fail` transition actually applies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::plan::{AspectRatio, DurationRule, Tier};
use crate::{AccountId, JobId};

/// Longest prompt the generation provider accepts.
pub const MAX_PROMPT_CHARS: usize = 5000;

/// Most reference images the generation provider accepts.
pub const MAX_REFERENCE_IMAGES: usize = 3;

/// Generation model families offered to users.
///
/// Creator-tier durations are fixed per family: 8 seconds for the Veo
/// family, 10 seconds for the Sora family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationModel {
    /// Veo 3, quality-oriented.
    Veo3,

    /// Veo 3 fast variant.
    Veo3Fast,

    /// Sora 2.
    Sora2,

    /// Sora 2 pro variant.
    Sora2Pro,
}

impl GenerationModel {
    /// The fixed clip length (seconds) this model produces for
    /// creator-tier accounts.
    #[must_use]
    pub const fn fixed_duration_seconds(self) -> u32 {
        match self {
            Self::Veo3 | Self::Veo3Fast => 8,
            Self::Sora2 | Self::Sora2Pro => 10,
        }
    }

    /// The provider's wire name for this model.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Veo3 => "veo3",
            Self::Veo3Fast => "veo3_fast",
            Self::Sora2 => "sora-2",
            Self::Sora2Pro => "sora-2-pro",
        }
    }
}

/// Job lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Debited and persisted, not yet accepted by the provider.
    Pending,

    /// Accepted by the provider, generation in flight.
    Generating,

    /// Finished with a playable video.
    Completed,

    /// Finished with an error; the debit has been refunded.
    Failed,
}

impl JobStatus {
    /// Whether this state is terminal (absorbing).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One video-generation request and its lifecycle record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoJob {
    /// Job id (ULID, time-ordered).
    pub id: JobId,

    /// The owning account.
    pub account_id: AccountId,

    /// Lifecycle state.
    pub status: JobStatus,

    /// Generation progress, 0–100.
    pub progress: u8,

    /// Clip length in seconds; also the number of credits charged.
    pub duration_seconds: u32,

    /// Which model family generates the clip.
    pub model: GenerationModel,

    /// The generation prompt.
    pub prompt: String,

    /// Frame orientation, fixed by the account's tier at creation.
    pub aspect_ratio: AspectRatio,

    /// Optional reference images, at most [`MAX_REFERENCE_IMAGES`].
    pub reference_image_urls: Vec<String>,

    /// The provider's task id, recorded when the provider accepts the job.
    pub provider_ref: Option<String>,

    /// Playable video URL; present only when completed.
    pub video_url: Option<String>,

    /// Failure message; present only when failed.
    pub error: Option<String>,

    /// Credits debited when the job was created (refunded on failure).
    pub charged_credits: i64,

    /// When the job was created.
    pub created_at: DateTime<Utc>,

    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl VideoJob {
    /// Validate a generation request against the account's tier and build
    /// the job in `pending` state.
    ///
    /// Creator accounts always receive the model's fixed duration; the
    /// requested value (if any) is silently overridden. Professional
    /// accounts must request within the allowed range.
    ///
    /// The prompt is truncated to the provider's limit; more than
    /// [`MAX_REFERENCE_IMAGES`] reference images is rejected.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidDuration`] for a professional request outside
    ///   the allowed range.
    /// - [`CoreError::InvalidRequest`] for too many reference images or an
    ///   empty prompt.
    pub fn create(
        account_id: AccountId,
        tier: Tier,
        model: GenerationModel,
        requested_duration: Option<u32>,
        prompt: &str,
        reference_image_urls: Vec<String>,
    ) -> Result<Self> {
        let duration_seconds = match tier.duration_rule(model) {
            DurationRule::Fixed(seconds) => seconds,
            DurationRule::Range { min, max } => {
                let requested = requested_duration.unwrap_or(min);
                if requested < min || requested > max {
                    return Err(CoreError::InvalidDuration {
                        requested,
                        min,
                        max,
                    });
                }
                requested
            }
        };

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(CoreError::InvalidRequest("prompt must not be empty".into()));
        }
        if reference_image_urls.len() > MAX_REFERENCE_IMAGES {
            return Err(CoreError::InvalidRequest(format!(
                "at most {MAX_REFERENCE_IMAGES} reference images are allowed"
            )));
        }

        let prompt = prompt.chars().take(MAX_PROMPT_CHARS).collect();

        Ok(Self {
            id: JobId::generate(),
            account_id,
            status: JobStatus::Pending,
            progress: 0,
            duration_seconds,
            model,
            prompt,
            aspect_ratio: tier.aspect_ratio(),
            reference_image_urls,
            provider_ref: None,
            video_url: None,
            error: None,
            charged_credits: i64::from(duration_seconds),
            created_at: Utc::now(),
            completed_at: None,
        })
    }

    /// Transition `pending → generating` once the provider accepts.
    ///
    /// Returns `false` (no mutation) unless the job is pending.
    pub fn accept(&mut self, provider_ref: impl Into<String>) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Generating;
        self.provider_ref = Some(provider_ref.into());
        true
    }

    /// Record a provider progress report.
    ///
    /// Returns `false` (no mutation) if the job is already terminal.
    pub fn report_progress(&mut self, progress: u8) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.progress = progress.min(100);
        true
    }

    /// Transition to `completed` with the playable URL.
    ///
    /// Returns `false` (no mutation) if the job is already terminal.
    pub fn complete(&mut self, video_url: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Completed;
        self.video_url = Some(video_url.into());
        self.progress = 100;
        self.completed_at = Some(Utc::now());
        true
    }

    /// Transition to `failed` with an error message.
    ///
    /// Returns `false` (no mutation) if the job is already terminal; the
    /// store uses this to guarantee the refund is issued exactly once.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        true
    }
}
