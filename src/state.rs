use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::backend::{OpenRouterClient, TranslationBackend};
use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::jwks::JwksCache;
use crate::pipeline::TranslationPipeline;
use crate::rate_limit::RateLimiter;
use crate::store::TranslationStore;

/// Shared application state.
///
/// The mutable caches (rate-limit windows, key-set cache) are explicit
/// process-scoped objects built once here and injected into the pipeline,
/// each with its own internal synchronization.
pub struct AppState {
    /// Service configuration
    pub config: Arc<AppConfig>,

    /// The translation pipeline handling `/translate` and `/translate/stats`
    pub pipeline: TranslationPipeline,

    /// Cache store handle, kept for the readiness probe
    pub store: TranslationStore,
}

impl AppState {
    /// Create state with the production backend client and on-disk store.
    pub fn new(config: AppConfig) -> ApiResult<Self> {
        let store = TranslationStore::open(&config.database_path)?;
        let backend = Arc::new(
            OpenRouterClient::from_config(&config)
                .map_err(|e| ApiError::Config(e.to_string()))?,
        );
        Self::with_parts(config, store, backend)
    }

    /// Create state from externally constructed parts. Tests inject a stub
    /// backend and an in-memory store through this constructor.
    pub fn with_parts(
        config: AppConfig,
        store: TranslationStore,
        backend: Arc<dyn TranslationBackend>,
    ) -> ApiResult<Self> {
        let jwks = match &config.jwks_url {
            Some(url) => Some(Arc::new(
                JwksCache::new(url.clone(), config.jwks_ttl(), config.jwks_fetch_timeout())
                    .map_err(|e| ApiError::Config(e.to_string()))?,
            )),
            None => None,
        };

        let verifier = Arc::new(TokenVerifier::new(
            &config.jwt_secret,
            config.external_jwt_secret.as_deref(),
            jwks,
        ));

        let limiter = Arc::new(RateLimiter::new(config.rate_limit, config.rate_window_secs));

        let pipeline = TranslationPipeline::new(
            &config,
            verifier,
            limiter,
            store.clone(),
            backend,
        );

        Ok(Self {
            config: Arc::new(config),
            pipeline,
            store,
        })
    }
}
