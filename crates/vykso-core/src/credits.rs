//! Credit transactions.
//!
//! Every balance change appends exactly one transaction, so for any
//! account the sum of transaction amounts equals the current balance.
//! Transactions are immutable once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, TransactionId};

/// An immutable record of one balance change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Transaction id (ULID, time-ordered).
    pub id: TransactionId,

    /// The account whose balance changed.
    pub account_id: AccountId,

    /// Signed credit amount. Negative = debit.
    pub amount: i64,

    /// What kind of change this was.
    pub kind: TransactionKind,

    /// Balance after this transaction was applied.
    pub balance_after: i64,

    /// Human-readable description for the transaction history view.
    pub description: String,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// A debit: credits reserved for a generation job.
    ///
    /// The stored amount is always negative regardless of the sign passed.
    #[must_use]
    pub fn debit(
        account_id: AccountId,
        amount: i64,
        balance_after: i64,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            account_id,
            amount: -amount.abs(),
            kind: TransactionKind::Debit,
            balance_after,
            description,
            created_at: Utc::now(),
        }
    }

    /// A refund: the debit for a failed job returned to the account.
    #[must_use]
    pub fn refund(
        account_id: AccountId,
        amount: i64,
        balance_after: i64,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            account_id,
            amount: amount.abs(),
            kind: TransactionKind::Refund,
            balance_after,
            description,
            created_at: Utc::now(),
        }
    }

    /// A credit grant: one-time purchase, welcome grant, or admin bonus.
    #[must_use]
    pub fn credit(
        account_id: AccountId,
        amount: i64,
        balance_after: i64,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            account_id,
            amount: amount.abs(),
            kind: TransactionKind::Credit,
            balance_after,
            description,
            created_at: Utc::now(),
        }
    }

    /// A subscription grant: the monthly allowance for a paid plan.
    #[must_use]
    pub fn subscription(
        account_id: AccountId,
        amount: i64,
        balance_after: i64,
        plan: &str,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            account_id,
            amount: amount.abs(),
            kind: TransactionKind::Subscription,
            balance_after,
            description: format!("Monthly credit grant for plan {plan}"),
            created_at: Utc::now(),
        }
    }
}

/// Classification of a credit transaction, for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Credits reserved for a job.
    Debit,

    /// Purchased or granted credits.
    Credit,

    /// Credits returned after a failed job.
    Refund,

    /// Monthly subscription allowance.
    Subscription,
}

impl TransactionKind {
    /// Whether this kind increases the balance.
    #[must_use]
    pub const fn is_credit(self) -> bool {
        matches!(self, Self::Credit | Self::Refund | Self::Subscription)
    }

    /// Whether this kind decreases the balance.
    #[must_use]
    pub const fn is_debit(self) -> bool {
        matches!(self, Self::Debit)
    }
}
