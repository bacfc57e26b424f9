//! Vykso HTTP API service.
//!
//! This crate provides the HTTP surface over the account and job ledger:
//!
//! - Account provisioning and profile
//! - Credit balance and transaction history
//! - Video job creation, polling, and cancellation
//! - Billing and generation provider webhooks
//!
//! # Authentication
//!
//! Two authentication methods:
//!
//! 1. **Identity-provider tokens** - for end-user requests (the dashboard)
//! 2. **Service API keys** - for operational requests (admin credit grants)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for routing consistency

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod provider;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use provider::{GenerationClient, ProviderError};
pub use routes::create_router;
pub use state::AppState;
