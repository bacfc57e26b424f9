//! Application state.

use std::sync::Arc;

use vykso_store::RocksStore;

use crate::config::ServiceConfig;
use crate::provider::GenerationClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Generation provider client (optional; without it jobs stay pending).
    pub provider: Option<Arc<GenerationClient>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let provider = config
            .provider_api_url
            .as_ref()
            .zip(config.provider_api_key.as_ref())
            .map(|(url, key)| {
                tracing::info!(provider_url = %url, "Generation provider enabled");
                Arc::new(GenerationClient::new(
                    url,
                    key,
                    config.provider_callback_url.clone(),
                ))
            });

        if provider.is_none() {
            tracing::warn!("Generation provider not configured - jobs will stay pending");
        }

        Self {
            store,
            config,
            provider,
        }
    }

    /// Check if the generation provider is configured.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }
}
