//! Persistent storage for the Vykso account and job ledger.
//!
//! Backed by `RocksDB` with column families (see [`schema`]). Every ledger
//! or lifecycle mutation (balance change, transaction append, job
//! transition, event-id record) commits through a single `WriteBatch`, so
//! an operation either fully happens or leaves no trace. Balance mutations
//! for a store are additionally serialized through a write gate, so two
//! concurrent debits against the same account always observe each other
//! (no read-then-write races).
//!
//! # Example
//!
//! ```no_run
//! use vykso_core::{Account, AccountId, TransactionKind};
//! use vykso_store::{RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/vykso-db").unwrap();
//!
//! let account_id = AccountId::generate();
//! store.put_account(&Account::new(account_id)).unwrap();
//! let receipt = store
//!     .add_credits(&account_id, 100, TransactionKind::Credit, "Welcome grant", None)
//!     .unwrap();
//! assert_eq!(receipt.balance, 100);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use vykso_core::{
    Account, AccountId, CreditTransaction, JobId, TransactionId, TransactionKind, VideoJob,
};

/// The outcome of a ledger operation: the new balance and the transaction
/// that recorded it.
#[derive(Debug, Clone)]
pub struct LedgerReceipt {
    /// Balance after the operation.
    pub balance: i64,

    /// The appended transaction.
    pub transaction: CreditTransaction,
}

/// The outcome of a terminal job transition.
///
/// `applied` is `false` when the job was already terminal: the signal was
/// a duplicate and nothing was written (in particular, no second refund).
#[derive(Debug, Clone)]
pub struct JobTransition {
    /// The job after the call (unchanged when `applied` is `false`).
    pub job: VideoJob,

    /// Whether the transition actually mutated the job.
    pub applied: bool,

    /// The refund issued alongside a `failed` transition, if any.
    pub refund: Option<LedgerReceipt>,
}

/// Storage operations for accounts, the credit ledger, and job lifecycle.
///
/// Abstracts the backing database so the service can be tested against a
/// throwaway store.
pub trait Store: Send + Sync {
    // =========================================================================
    // Accounts
    // =========================================================================

    /// Insert or overwrite an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &Account) -> Result<()>;

    /// Fetch an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>>;

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the account doesn't exist.
    fn delete_account(&self, account_id: &AccountId) -> Result<()>;

    /// Change an account's plan, refreshing the cached tier and aspect
    /// ratio. The balance is never touched.
    ///
    /// When `event_id` is given (webhook-driven changes), the event is
    /// deduplicated and recorded in the same atomic unit.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the account doesn't exist.
    /// - [`StoreError::DuplicateEvent`] if `event_id` was already processed.
    fn apply_plan_change(
        &self,
        account_id: &AccountId,
        plan: &str,
        customer_ref: Option<&str>,
        subscription_ref: Option<&str>,
        event_id: Option<&str>,
    ) -> Result<Account>;

    /// Look up an account by its billing subscription reference.
    ///
    /// Renewal webhooks identify accounts this way; the index is
    /// maintained by [`Store::apply_plan_change`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_account_by_subscription_ref(&self, subscription_ref: &str)
        -> Result<Option<Account>>;

    // =========================================================================
    // Credit ledger
    // =========================================================================

    /// Debit credits. Fails without any effect if the balance is short.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidAmount`] if `amount <= 0`.
    /// - [`StoreError::NotFound`] if the account doesn't exist.
    /// - [`StoreError::InsufficientCredits`] if the balance is short; no
    ///   transaction is recorded.
    fn debit(&self, account_id: &AccountId, amount: i64, description: &str)
        -> Result<LedgerReceipt>;

    /// Refund credits. Always succeeds against a valid account.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidAmount`] if `amount <= 0`.
    /// - [`StoreError::NotFound`] if the account doesn't exist.
    fn refund(
        &self,
        account_id: &AccountId,
        amount: i64,
        description: &str,
    ) -> Result<LedgerReceipt>;

    /// Grant credits from a purchase (`kind = Credit`) or a subscription
    /// renewal (`kind = Subscription`).
    ///
    /// When `event_id` is given, the event is deduplicated and recorded in
    /// the same atomic unit, so a replayed payment webhook grants nothing.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidAmount`] if `amount <= 0`.
    /// - [`StoreError::NotFound`] if the account doesn't exist.
    /// - [`StoreError::DuplicateEvent`] if `event_id` was already processed.
    fn add_credits(
        &self,
        account_id: &AccountId,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        event_id: Option<&str>,
    ) -> Result<LedgerReceipt>;

    /// Fetch a transaction by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: TransactionId)
        -> Result<Option<CreditTransaction>>;

    /// List an account's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>>;

    // =========================================================================
    // Job lifecycle
    // =========================================================================

    /// Persist a freshly-validated `pending` job, debiting its
    /// `charged_credits` in the same atomic unit.
    ///
    /// If the debit fails the job is never written.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the account doesn't exist.
    /// - [`StoreError::InsufficientCredits`] if the balance is short.
    fn create_job(&self, job: &VideoJob) -> Result<LedgerReceipt>;

    /// Fetch a job by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_job(&self, job_id: JobId) -> Result<Option<VideoJob>>;

    /// List an account's jobs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_jobs(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<VideoJob>>;

    /// Look up a job by the generation provider's task id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_job_by_provider_ref(&self, provider_ref: &str) -> Result<Option<VideoJob>>;

    /// Move a pending job to `generating`, recording the provider's task
    /// id for callback matching. A no-op for jobs past `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the job doesn't exist.
    fn mark_job_generating(&self, job_id: JobId, provider_ref: &str) -> Result<VideoJob>;

    /// Record a provider progress report. A no-op for terminal jobs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the job doesn't exist.
    fn update_job_progress(&self, job_id: JobId, progress: u8) -> Result<VideoJob>;

    /// Move a job to `completed` with its playable URL.
    ///
    /// Idempotent: a duplicate signal for an already-terminal job returns
    /// `applied = false` and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the job doesn't exist.
    fn complete_job(&self, job_id: JobId, video_url: &str) -> Result<JobTransition>;

    /// Move a job to `failed` and refund its `charged_credits`.
    ///
    /// Idempotent: the refund is issued exactly once; a duplicate failure
    /// signal returns `applied = false` with no second refund.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the job doesn't exist.
    fn fail_job(&self, job_id: JobId, error: &str) -> Result<JobTransition>;

    // =========================================================================
    // Webhook events
    // =========================================================================

    /// Whether a webhook event id has already been processed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn has_processed_event(&self, event_id: &str) -> Result<bool>;
}
