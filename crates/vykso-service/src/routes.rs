//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, credits, health, videos, webhooks};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Accounts (user auth)
/// - `POST /v1/accounts` - Provision (get-or-create) the caller's account
/// - `GET /v1/accounts/me` - Get the caller's account
/// - `DELETE /v1/accounts/me` - Delete the caller's account
///
/// ## Credits (user auth)
/// - `GET /v1/credits/balance` - Current balance, plan, and tier
/// - `GET /v1/credits/transactions` - Transaction history
/// - `POST /v1/credits/grant` - Admin credit grant (service API key)
///
/// ## Videos (user auth)
/// - `POST /v1/videos` - Create a generation job (debits credits)
/// - `GET /v1/videos` - List the caller's jobs
/// - `GET /v1/videos/:id` - Poll a job's status
/// - `POST /v1/videos/:id/cancel` - Cancel a job (refunds the debit)
///
/// ## Webhooks
/// - `POST /webhooks/billing` - Billing provider events
/// - `POST /webhooks/generation` - Generation provider callbacks
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Accounts
        .route("/v1/accounts", post(accounts::provision_account))
        .route("/v1/accounts/me", get(accounts::get_account))
        .route("/v1/accounts/me", delete(accounts::delete_account))
        // Credits
        .route("/v1/credits/balance", get(credits::get_balance))
        .route("/v1/credits/transactions", get(credits::list_transactions))
        .route("/v1/credits/grant", post(credits::grant_credits))
        // Videos
        .route("/v1/videos", post(videos::create_video))
        .route("/v1/videos", get(videos::list_videos))
        .route("/v1/videos/:id", get(videos::get_video))
        .route("/v1/videos/:id/cancel", post(videos::cancel_video))
        // Webhooks
        .route("/webhooks/billing", post(webhooks::billing_webhook))
        .route("/webhooks/generation", post(webhooks::generation_webhook))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
