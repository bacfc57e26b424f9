//! Credit balance and transaction handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vykso_core::{CreditTransaction, TransactionKind};
use vykso_store::Store;

use crate::auth::{AuthUser, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Credit balance.
    pub credits: i64,
    /// Current plan name.
    pub plan: String,
    /// Tier derived from the plan.
    pub tier: String,
    /// Aspect ratio mandated by the tier.
    pub aspect_ratio: String,
}

/// Get current credit balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let tier = account.tier();
    Ok(Json(BalanceResponse {
        credits: account.credits,
        plan: account.plan.clone(),
        tier: tier.to_string(),
        aspect_ratio: tier.aspect_ratio().as_str().to_string(),
    }))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Transaction response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
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
    /// Timestamp.
    pub created_at: String,
}

impl From<&CreditTransaction> for TransactionResponse {
    fn from(tx: &CreditTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            amount: tx.amount,
            kind: tx.kind,
            balance_after: tx.balance_after,
            description: tx.description.clone(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions, newest first.
    pub transactions: Vec<TransactionResponse>,
    /// Whether more transactions exist past this page.
    pub has_more: bool,
}

/// List transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    // Fetch one more than requested to determine has_more.
    let limit = query.limit.min(100);
    let transactions = state
        .store
        .list_transactions(&auth.account_id, limit + 1, query.offset)?;

    let has_more = transactions.len() > limit;
    let transactions: Vec<_> = transactions
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}

/// Admin grant request (support compensation, promos).
#[derive(Debug, Deserialize)]
pub struct GrantCreditsRequest {
    /// Account to credit.
    pub account_id: String,
    /// Credits to grant.
    pub amount: i64,
    /// Reason, recorded on the transaction.
    pub reason: String,
}

/// Grant credits to an account (service-authenticated).
pub async fn grant_credits(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<GrantCreditsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id = body
        .account_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid account id".into()))?;

    let receipt = state.store.add_credits(
        &account_id,
        body.amount,
        TransactionKind::Credit,
        &body.reason,
        None,
    )?;

    tracing::info!(
        service = %auth.service_name,
        account_id = %account_id,
        amount = %body.amount,
        new_balance = %receipt.balance,
        reason = %body.reason,
        "Credits granted"
    );

    Ok(Json(serde_json::json!({
        "credits": receipt.balance,
        "transaction_id": receipt.transaction.id.to_string()
    })))
}
