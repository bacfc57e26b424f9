//! Error types for the ledger core.

use crate::ids::IdError;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in ledger and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Account not found.
    #[error("account not found: {account_id}")]
    AccountNotFound {
        /// The account id that was not found.
        account_id: String,
    },

    /// Job not found.
    #[error("job not found: {job_id}")]
    JobNotFound {
        /// The job id that was not found.
        job_id: String,
    },

    /// A debit was attempted beyond the available balance.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Credits required by the request.
        required: i64,
    },

    /// A professional-tier request outside the allowed duration range.
    #[error("invalid duration: {requested}s (allowed {min}-{max}s)")]
    InvalidDuration {
        /// The requested duration in seconds.
        requested: u32,
        /// Inclusive lower bound.
        min: u32,
        /// Inclusive upper bound.
        max: u32,
    },

    /// A malformed generation request (prompt, reference images, amount).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A replayed webhook event, detected by its event id.
    #[error("duplicate event: {event_id}")]
    DuplicateEvent {
        /// The replayed event id.
        event_id: String,
    },

    /// A failure signaled by the generation or billing collaborator.
    #[error("provider error: {0}")]
    Provider(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
