//! Webhook handlers for the billing and generation providers.
//!
//! Both providers deliver at-least-once. Billing events carry an event id
//! that the store deduplicates atomically with the mutation it gates;
//! generation callbacks are matched by provider task id and rely on the
//! job state machine's absorbing terminal states, so a replayed terminal
//! signal never refunds twice.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use vykso_core::{monthly_grant, AccountId, TransactionKind, FREE_PLAN};
use vykso_store::{Store, StoreError};

use crate::error::ApiError;
use crate::state::AppState;

/// Webhook acknowledgment.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was received.
    pub received: bool,
    /// Whether the event had already been processed (replay).
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

impl WebhookResponse {
    fn applied() -> Json<Self> {
        Json(Self {
            received: true,
            duplicate: false,
        })
    }

    fn duplicate() -> Json<Self> {
        Json(Self {
            received: true,
            duplicate: true,
        })
    }
}

// ============================================================================
// Billing provider
// ============================================================================

/// Billing webhook payload (simplified).
#[derive(Debug, Deserialize)]
pub struct BillingWebhook {
    /// Event id, used for deduplication.
    pub id: String,
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: BillingEventData,
}

/// Billing event data container.
#[derive(Debug, Deserialize)]
pub struct BillingEventData {
    /// The event's subject object.
    pub object: serde_json::Value,
}

/// Handle billing provider webhooks.
///
/// Events handled:
/// - `checkout.session.completed` - credit-pack purchase or new subscription
/// - `customer.subscription.updated` - plan change
/// - `customer.subscription.deleted` - cancellation (plan reverts to free)
/// - `invoice.payment_succeeded` - renewal credit grant
pub async fn billing_webhook(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let webhook: BillingWebhook =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event_type = %webhook.event_type,
        event_id = %webhook.id,
        "Received billing webhook"
    );

    let applied = match webhook.event_type.as_str() {
        "checkout.session.completed" => {
            handle_checkout_completed(&state, &webhook.id, &webhook.data.object)?
        }
        "customer.subscription.updated" => {
            handle_subscription_updated(&state, &webhook.id, &webhook.data.object)?
        }
        "customer.subscription.deleted" => {
            handle_subscription_deleted(&state, &webhook.id, &webhook.data.object)?
        }
        "invoice.payment_succeeded" => {
            handle_renewal(&state, &webhook.id, &webhook.data.object)?
        }
        _ => {
            tracing::debug!(event_type = %webhook.event_type, "Unhandled billing event");
            true
        }
    };

    Ok(if applied {
        WebhookResponse::applied()
    } else {
        WebhookResponse::duplicate()
    })
}

/// Run a store mutation that may hit event-id deduplication.
///
/// Returns `Ok(false)` for a replayed event so the webhook can be
/// acknowledged without effect; every other error propagates.
fn dedup<T>(result: Result<T, StoreError>) -> Result<bool, ApiError> {
    match result {
        Ok(_) => Ok(true),
        Err(StoreError::DuplicateEvent { event_id }) => {
            tracing::info!(event_id = %event_id, "Replayed billing event ignored");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn handle_checkout_completed(
    state: &AppState,
    event_id: &str,
    object: &serde_json::Value,
) -> Result<bool, ApiError> {
    let payment_status = object
        .get("payment_status")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    if payment_status != "paid" {
        tracing::info!(payment_status = %payment_status, "Checkout not paid yet, skipping");
        return Ok(true);
    }

    let account_id = extract_account_id(object)?;
    let metadata = object.get("metadata").cloned().unwrap_or_default();

    // One-time credit-pack purchase.
    if metadata.get("type").and_then(|v| v.as_str()) == Some("credit_purchase") {
        let credits = metadata
            .get("credits")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing credits in purchase metadata".into()))?;

        let applied = dedup(state.store.add_credits(
            &account_id,
            credits,
            TransactionKind::Credit,
            &format!("Purchased {credits} credits"),
            Some(event_id),
        ))?;

        if applied {
            tracing::info!(account_id = %account_id, credits = %credits, "Credit pack applied");
        }
        return Ok(applied);
    }

    // New subscription: plan change plus the first monthly grant. The two
    // mutations dedup independently so a replay after a partial apply
    // still finishes the remainder.
    let plan = metadata
        .get("plan")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::BadRequest("Missing plan in checkout metadata".into()))?;
    let customer_ref = object.get("customer").and_then(|v| v.as_str());
    let subscription_ref = object.get("subscription").and_then(|v| v.as_str());

    let plan_applied = dedup(state.store.apply_plan_change(
        &account_id,
        plan,
        customer_ref,
        subscription_ref,
        Some(&format!("{event_id}:plan")),
    ))?;

    let grant = monthly_grant(plan);
    let grant_applied = if grant > 0 {
        dedup(state.store.add_credits(
            &account_id,
            grant,
            TransactionKind::Subscription,
            plan,
            Some(&format!("{event_id}:grant")),
        ))?
    } else {
        tracing::warn!(plan = %plan, "No credit grant configured for plan");
        false
    };

    if plan_applied {
        tracing::info!(account_id = %account_id, plan = %plan, grant = %grant, "Subscription started");
    }
    Ok(plan_applied || grant_applied)
}

fn handle_subscription_updated(
    state: &AppState,
    event_id: &str,
    object: &serde_json::Value,
) -> Result<bool, ApiError> {
    let account = resolve_subscription_account(state, object)?;
    let Some(account) = account else {
        return Ok(true);
    };

    let Some(plan) = object
        .get("metadata")
        .and_then(|m| m.get("plan"))
        .and_then(|v| v.as_str())
    else {
        tracing::warn!("Subscription update without plan metadata, skipping");
        return Ok(true);
    };

    let subscription_ref = object.get("id").and_then(|v| v.as_str());
    let applied = dedup(state.store.apply_plan_change(
        &account.id,
        plan,
        None,
        subscription_ref,
        Some(event_id),
    ))?;

    if applied {
        tracing::info!(account_id = %account.id, plan = %plan, "Plan updated");
    }
    Ok(applied)
}

fn handle_subscription_deleted(
    state: &AppState,
    event_id: &str,
    object: &serde_json::Value,
) -> Result<bool, ApiError> {
    let account = resolve_subscription_account(state, object)?;
    let Some(account) = account else {
        return Ok(true);
    };

    let applied = dedup(state.store.apply_plan_change(
        &account.id,
        FREE_PLAN,
        None,
        None,
        Some(event_id),
    ))?;

    if applied {
        tracing::info!(account_id = %account.id, "Subscription canceled, plan reverted to free");
    }
    Ok(applied)
}

fn handle_renewal(
    state: &AppState,
    event_id: &str,
    object: &serde_json::Value,
) -> Result<bool, ApiError> {
    let billing_reason = object
        .get("billing_reason")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    if billing_reason != "subscription_cycle" {
        tracing::debug!(billing_reason = %billing_reason, "Non-renewal invoice, skipping");
        return Ok(true);
    }

    let Some(subscription_ref) = object.get("subscription").and_then(|v| v.as_str()) else {
        tracing::debug!("Invoice without subscription (one-time payment)");
        return Ok(true);
    };

    let Some(account) = state.store.find_account_by_subscription_ref(subscription_ref)? else {
        tracing::warn!(subscription_ref = %subscription_ref, "No account for renewed subscription");
        return Ok(true);
    };

    let grant = monthly_grant(&account.plan);
    if grant == 0 {
        tracing::warn!(account_id = %account.id, plan = %account.plan, "No grant for renewed plan");
        return Ok(true);
    }

    let applied = dedup(state.store.add_credits(
        &account.id,
        grant,
        TransactionKind::Subscription,
        &account.plan,
        Some(event_id),
    ))?;

    if applied {
        tracing::info!(account_id = %account.id, grant = %grant, "Renewal credits granted");
    }
    Ok(applied)
}

/// Pull the account id out of a checkout session object.
fn extract_account_id(object: &serde_json::Value) -> Result<AccountId, ApiError> {
    object
        .get("client_reference_id")
        .and_then(|v| v.as_str())
        .or_else(|| {
            object
                .get("metadata")
                .and_then(|m| m.get("account_id"))
                .and_then(|v| v.as_str())
        })
        .ok_or_else(|| ApiError::BadRequest("Missing account reference in checkout session".into()))?
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid account id in checkout session".into()))
}

/// Resolve the account a subscription event refers to, by metadata or by
/// the subscription reference index. `None` means "unknown account",
/// logged and acknowledged so the provider stops retrying.
fn resolve_subscription_account(
    state: &AppState,
    object: &serde_json::Value,
) -> Result<Option<vykso_core::Account>, ApiError> {
    if let Some(account_id) = object
        .get("metadata")
        .and_then(|m| m.get("account_id"))
        .and_then(|v| v.as_str())
    {
        let account_id: AccountId = account_id
            .parse()
            .map_err(|_| ApiError::BadRequest("Invalid account id in metadata".into()))?;
        if let Some(account) = state.store.get_account(&account_id)? {
            return Ok(Some(account));
        }
    }

    if let Some(subscription_ref) = object.get("id").and_then(|v| v.as_str()) {
        if let Some(account) = state.store.find_account_by_subscription_ref(subscription_ref)? {
            return Ok(Some(account));
        }
        tracing::warn!(subscription_ref = %subscription_ref, "No account for subscription event");
    }

    Ok(None)
}

// ============================================================================
// Generation provider
// ============================================================================

/// Generation provider callback payload.
#[derive(Debug, Deserialize)]
pub struct GenerationCallback {
    /// Callback data.
    pub data: GenerationCallbackData,
}

/// Generation callback body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationCallbackData {
    /// The provider's task id, matched to a job's `provider_ref`.
    pub task_id: String,

    /// Callback state: `"processing"`, `"success"`, or `"fail"`.
    pub state: String,

    /// JSON-encoded result payload, present on success.
    #[serde(default)]
    pub result_json: Option<String>,

    /// Failure code, present on failure.
    #[serde(default)]
    pub fail_code: Option<String>,

    /// Failure message, present on failure.
    #[serde(default)]
    pub fail_msg: Option<String>,

    /// Generation progress, present on processing callbacks.
    #[serde(default)]
    pub progress: Option<u8>,
}

/// The success payload embedded in `result_json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationResult {
    result_urls: Vec<String>,
}

/// Handle generation provider callbacks.
///
/// Unknown task ids are acknowledged with a warning so the provider stops
/// retrying (the job may have been deleted). Terminal signals for
/// already-terminal jobs are no-ops.
pub async fn generation_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerationCallback>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let data = payload.data;

    tracing::info!(
        task_id = %data.task_id,
        state = %data.state,
        "Received generation callback"
    );

    let Some(job) = state.store.find_job_by_provider_ref(&data.task_id)? else {
        tracing::warn!(task_id = %data.task_id, "No job for generation callback");
        return Ok(WebhookResponse::applied());
    };

    match data.state.as_str() {
        "success" => {
            let result_json = data
                .result_json
                .ok_or_else(|| ApiError::BadRequest("Success callback without result".into()))?;
            let result: GenerationResult = serde_json::from_str(&result_json)
                .map_err(|e| ApiError::BadRequest(format!("Malformed result payload: {e}")))?;
            let video_url = result
                .result_urls
                .first()
                .ok_or_else(|| ApiError::BadRequest("Success callback without video URL".into()))?;

            let transition = state.store.complete_job(job.id, video_url)?;
            if transition.applied {
                tracing::info!(job_id = %job.id, video_url = %video_url, "Job completed");
            } else {
                tracing::info!(job_id = %job.id, "Duplicate completion signal ignored");
            }
            Ok(if transition.applied {
                WebhookResponse::applied()
            } else {
                WebhookResponse::duplicate()
            })
        }
        "fail" => {
            let error = format!(
                "{}: {}",
                data.fail_code.as_deref().unwrap_or("unknown"),
                data.fail_msg.as_deref().unwrap_or("generation failed")
            );

            let transition = state.store.fail_job(job.id, &error)?;
            if transition.applied {
                tracing::info!(job_id = %job.id, error = %error, "Job failed, debit refunded");
            } else {
                tracing::info!(job_id = %job.id, "Duplicate failure signal ignored");
            }
            Ok(if transition.applied {
                WebhookResponse::applied()
            } else {
                WebhookResponse::duplicate()
            })
        }
        "processing" => {
            if let Some(progress) = data.progress {
                state.store.update_job_progress(job.id, progress)?;
            }
            Ok(WebhookResponse::applied())
        }
        other => {
            tracing::debug!(state = %other, "Unhandled generation callback state");
            Ok(WebhookResponse::applied())
        }
    }
}
