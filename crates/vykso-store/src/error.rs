//! Error types for the storage layer.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Encoding or decoding a stored record failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// A debit was attempted beyond the available balance.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Credits required by the request.
        required: i64,
    },

    /// A ledger operation was called with a non-positive amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// A webhook event id was already processed.
    #[error("duplicate event: {event_id}")]
    DuplicateEvent {
        /// The replayed event id.
        event_id: String,
    },
}
