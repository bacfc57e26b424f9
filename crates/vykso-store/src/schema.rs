//! Column family layout.

/// Column family names.
pub mod cf {
    /// Account records, keyed by account id (16 bytes).
    pub const ACCOUNTS: &str = "accounts";

    /// Credit transactions, keyed by transaction id (16-byte ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Per-account transaction index: `account_id || transaction_id`.
    pub const TRANSACTIONS_BY_ACCOUNT: &str = "transactions_by_account";

    /// Video jobs, keyed by job id (16-byte ULID).
    pub const JOBS: &str = "jobs";

    /// Per-account job index: `account_id || job_id`.
    pub const JOBS_BY_ACCOUNT: &str = "jobs_by_account";

    /// Provider task id → job id, for webhook callback matching.
    pub const JOBS_BY_PROVIDER: &str = "jobs_by_provider";

    /// Billing subscription ref → account id, for renewal webhooks.
    pub const ACCOUNTS_BY_SUBSCRIPTION: &str = "accounts_by_subscription";

    /// Processed webhook event ids, for at-least-once deduplication.
    pub const PROCESSED_EVENTS: &str = "processed_events";
}

/// All column families the store opens.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_ACCOUNT,
        cf::JOBS,
        cf::JOBS_BY_ACCOUNT,
        cf::JOBS_BY_PROVIDER,
        cf::ACCOUNTS_BY_SUBSCRIPTION,
        cf::PROCESSED_EVENTS,
    ]
}
