use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum chapter content length in characters. Longer submissions are
    /// rejected rather than truncated so stored text always matches its
    /// fingerprint.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// Rate limit: translations per user per window
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    /// Rate limit window in seconds
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,

    /// Shared secret for the legacy HS256 token scheme
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Shared secret for the external scheme's HMAC fallback
    #[serde(default)]
    pub external_jwt_secret: Option<String>,

    /// Remote key-set endpoint for the external scheme's EdDSA keys
    #[serde(default)]
    pub jwks_url: Option<String>,

    /// Key-set cache time-to-live in seconds
    #[serde(default = "default_jwks_ttl_secs")]
    pub jwks_ttl_secs: u64,

    /// Key-set fetch timeout in seconds
    #[serde(default = "default_jwks_fetch_timeout_secs")]
    pub jwks_fetch_timeout_secs: u64,

    /// Translation backend API base URL
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Translation backend API key
    #[serde(default)]
    pub backend_api_key: String,

    /// Translation backend model identifier
    #[serde(default = "default_backend_model")]
    pub backend_model: String,

    /// Translation backend request timeout in seconds
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    /// Delay before the single backend retry, in seconds
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Source language tag for stored translations
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language tag for this deployment
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Path to the SQLite translation cache database
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_content_chars: default_max_content_chars(),
            rate_limit: default_rate_limit(),
            rate_window_secs: default_rate_window_secs(),
            jwt_secret: default_jwt_secret(),
            external_jwt_secret: None,
            jwks_url: None,
            jwks_ttl_secs: default_jwks_ttl_secs(),
            jwks_fetch_timeout_secs: default_jwks_fetch_timeout_secs(),
            backend_url: default_backend_url(),
            backend_api_key: String::new(),
            backend_model: default_backend_model(),
            backend_timeout_secs: default_backend_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            source_language: default_source_language(),
            target_language: default_target_language(),
            database_path: default_database_path(),
            enable_cors: default_true(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and config files
    pub fn load() -> anyhow::Result<Self> {
        // .env is optional; ignore a missing file.
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("translation-service").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("TRANSLATION").separator("__"));

        let config: AppConfig = builder.build()?.try_deserialize()?;

        if config.jwt_secret == default_jwt_secret() {
            tracing::warn!("Using the default JWT secret; set TRANSLATION_JWT_SECRET in production");
        }

        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get rate-limit window as Duration
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    /// Get key-set cache TTL as Duration
    pub fn jwks_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_ttl_secs)
    }

    /// Get key-set fetch timeout as Duration
    pub fn jwks_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.jwks_fetch_timeout_secs)
    }

    /// Get backend request timeout as Duration
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    /// Get the inter-retry delay as Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_content_chars() -> usize {
    5000
}

fn default_rate_limit() -> u32 {
    10
}

fn default_rate_window_secs() -> u64 {
    3600
}

fn default_jwt_secret() -> String {
    "default-secret-key-change-in-production".to_string()
}

fn default_jwks_ttl_secs() -> u64 {
    900
}

fn default_jwks_fetch_timeout_secs() -> u64 {
    5
}

fn default_backend_url() -> String {
    "https://openrouter.ai/api".to_string()
}

fn default_backend_model() -> String {
    "google/gemini-2.0-flash-001".to_string()
}

fn default_backend_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "ur".to_string()
}

fn default_database_path() -> String {
    "translations.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
