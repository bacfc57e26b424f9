//! Service configuration.

use serde::Deserialize;
use std::path::Path;

/// Default starting credit grant for freshly provisioned accounts.
pub const DEFAULT_STARTING_CREDITS: i64 = 10;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/vykso").
    pub data_dir: String,

    /// Identity provider base URL for token validation.
    pub auth_base_url: String,

    /// Expected token audience (default: "vykso").
    pub auth_audience: String,

    /// API key for service-to-service requests (admin credit grants).
    pub service_api_key: Option<String>,

    /// Generation provider API URL (optional; jobs stay pending without it).
    pub provider_api_url: Option<String>,

    /// Generation provider API key (optional).
    pub provider_api_key: Option<String>,

    /// Public URL the provider posts generation callbacks to.
    pub provider_callback_url: Option<String>,

    /// Frontend URL, used in transaction descriptions and redirects.
    pub frontend_url: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Credits granted to a new account at provisioning.
    pub starting_credits: i64,
}

/// Generation provider secrets file structure.
#[derive(Debug, Deserialize)]
struct ProviderSecrets {
    api_url: String,
    api_key: String,
    #[serde(default)]
    callback_url: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let (provider_api_url, provider_api_key, provider_callback_url) =
            load_provider_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/vykso".into()),
            auth_base_url: std::env::var("AUTH_BASE_URL")
                .unwrap_or_else(|_| "https://auth.vykso.app".into()),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "vykso".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            provider_api_url,
            provider_api_key,
            provider_callback_url,
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            starting_credits: std::env::var("STARTING_CREDITS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_STARTING_CREDITS),
        }
    }
}

/// Load generation provider secrets from file or environment.
fn load_provider_secrets() -> (Option<String>, Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/generation.json",
        "vykso/.secrets/generation.json",
        "../.secrets/generation.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<ProviderSecrets>(path) {
            tracing::info!(path = %path, "Loaded generation provider secrets from file");
            return (
                Some(secrets.api_url),
                Some(secrets.api_key),
                secrets.callback_url,
            );
        }
    }

    tracing::debug!("Provider secrets file not found, using environment variables");
    (
        std::env::var("PROVIDER_API_URL").ok(),
        std::env::var("PROVIDER_API_KEY").ok(),
        std::env::var("PROVIDER_CALLBACK_URL").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/vykso".into(),
            auth_base_url: "https://auth.vykso.app".into(),
            auth_audience: "vykso".into(),
            service_api_key: None,
            provider_api_url: None,
            provider_api_key: None,
            provider_callback_url: None,
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            starting_credits: DEFAULT_STARTING_CREDITS,
        }
    }
}
