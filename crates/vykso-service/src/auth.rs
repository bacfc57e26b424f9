//! Authentication extractors.
//!
//! - [`AuthUser`] - end-user authentication via identity-provider tokens
//! - [`ServiceAuth`] - service-to-service authentication via API key

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use vykso_core::AccountId;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated user, resolved from the identity provider's token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The account id (the identity provider's subject).
    pub account_id: AccountId,

    /// The raw subject claim.
    pub subject: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let auth_header = parts
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or(ApiError::Unauthorized)?;

            // Test token format: "test-token:<account-uuid>". Real tokens
            // are identity-provider JWTs; validation against the provider's
            // JWKS is pending and non-test tokens are rejected until then.
            if let Some(subject) = token.strip_prefix("test-token:") {
                let account_id = subject
                    .parse::<AccountId>()
                    .map_err(|_| ApiError::Unauthorized)?;

                return Ok(AuthUser {
                    account_id,
                    subject: subject.to_string(),
                });
            }

            Err(ApiError::Unauthorized)
        })
    }
}

/// Service authentication via API key.
///
/// Used for operational requests such as admin credit grants.
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The calling service's self-reported name.
    pub service_name: String,
}

impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let api_key = parts
                .headers
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            let expected_key = state
                .config
                .service_api_key
                .as_ref()
                .ok_or(ApiError::Unauthorized)?;

            if api_key != expected_key {
                return Err(ApiError::Unauthorized);
            }

            let service_name = parts
                .headers
                .get("x-service-name")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();

            Ok(ServiceAuth { service_name })
        })
    }
}
