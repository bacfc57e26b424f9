//! Account management handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use vykso_core::{Account, TransactionKind};
use vykso_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account id.
    pub id: String,
    /// Contact email, if known.
    pub email: Option<String>,
    /// Display name, if known.
    pub display_name: Option<String>,
    /// Credit balance (1 credit = 1 second of video).
    pub credits: i64,
    /// Current plan name.
    pub plan: String,
    /// Tier derived from the plan.
    pub tier: String,
    /// Aspect ratio mandated by the tier.
    pub aspect_ratio: String,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            credits: account.credits,
            plan: account.plan.clone(),
            tier: account.tier().to_string(),
            aspect_ratio: account.tier().aspect_ratio().as_str().to_string(),
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Provisioning request; profile claims from the identity provider.
#[derive(Debug, Deserialize)]
pub struct ProvisionAccountRequest {
    /// Contact email.
    pub email: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
}

/// Provision the caller's account.
///
/// The dashboard calls this on every login; the first call creates the
/// account on the free plan and applies the starting credit grant, later
/// calls just refresh profile fields and return the existing record.
pub async fn provision_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<ProvisionAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    if let Some(mut existing) = state.store.get_account(&auth.account_id)? {
        let mut dirty = false;
        if body.email.is_some() && body.email != existing.email {
            existing.email = body.email;
            dirty = true;
        }
        if body.display_name.is_some() && body.display_name != existing.display_name {
            existing.display_name = body.display_name;
            dirty = true;
        }
        if dirty {
            existing.updated_at = chrono::Utc::now();
            state.store.put_account(&existing)?;
        }
        return Ok(Json(AccountResponse::from(&existing)));
    }

    let mut account = Account::new(auth.account_id);
    account.email = body.email;
    account.display_name = body.display_name;
    state.store.put_account(&account)?;

    if state.config.starting_credits > 0 {
        let receipt = state.store.add_credits(
            &auth.account_id,
            state.config.starting_credits,
            TransactionKind::Credit,
            "Welcome credits",
            None,
        )?;
        account.credits = receipt.balance;
    }

    tracing::info!(
        account_id = %auth.account_id,
        starting_credits = %state.config.starting_credits,
        "Account provisioned"
    );

    Ok(Json(AccountResponse::from(&account)))
}

/// Get the current user's account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(AccountResponse::from(&account)))
}

/// Delete the current user's account.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_account(&auth.account_id)?;

    tracing::info!(account_id = %auth.account_id, "Account deleted");

    Ok(Json(serde_json::json!({ "deleted": true })))
}
