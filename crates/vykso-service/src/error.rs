//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use vykso_core::CoreError;
use vykso_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Insufficient credits for the requested job.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Requested duration outside the tier's allowed range.
    #[error("invalid duration: {requested}s (allowed {min}-{max}s)")]
    InvalidDuration {
        /// Requested duration in seconds.
        requested: u32,
        /// Inclusive lower bound.
        min: u32,
        /// Inclusive upper bound.
        max: u32,
    },

    /// Duplicate webhook event.
    #[error("duplicate event: {0}")]
    DuplicateEvent(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error (generation or billing provider).
    #[error("external service error: {0}")]
    ExternalService(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("not found".into()),
            StoreError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            StoreError::DuplicateEvent { event_id } => Self::DuplicateEvent(event_id),
            StoreError::InvalidAmount(amount) => {
                Self::BadRequest(format!("invalid amount: {amount}"))
            }
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AccountNotFound { account_id } => {
                Self::NotFound(format!("account not found: {account_id}"))
            }
            CoreError::JobNotFound { job_id } => Self::NotFound(format!("job not found: {job_id}")),
            CoreError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            CoreError::InvalidDuration {
                requested,
                min,
                max,
            } => Self::InvalidDuration {
                requested,
                min,
                max,
            },
            CoreError::InvalidRequest(msg) => Self::BadRequest(msg),
            CoreError::DuplicateEvent { event_id } => Self::DuplicateEvent(event_id),
            CoreError::Provider(msg) => Self::ExternalService(msg),
            CoreError::InvalidId(e) => Self::BadRequest(e.to_string()),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientCredits { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                "Insufficient credits - top up to keep generating".to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::InvalidDuration {
                requested,
                min,
                max,
            } => (
                StatusCode::BAD_REQUEST,
                "invalid_duration",
                self.to_string(),
                Some(serde_json::json!({
                    "requested": requested,
                    "min": min,
                    "max": max
                })),
            ),
            Self::DuplicateEvent(id) => (
                StatusCode::CONFLICT,
                "duplicate_event",
                format!("Event {id} already processed"),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}
