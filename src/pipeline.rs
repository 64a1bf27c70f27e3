//! Translation request orchestration.
//!
//! One request/response cycle, strictly ordered and short-circuiting on the
//! first failure:
//!
//! 1. authenticate the bearer token
//! 2. recompute the content fingerprint and compare to the claim
//! 3. reject oversized content
//! 4. rate limit per user
//! 5. cache lookup; a hit returns immediately
//! 6. backend call with exactly one retry after a fixed delay
//! 7. race-safe persist (insert, or adopt the winner's row on conflict)
//! 8. respond with the stored text, `cached` flag, and record id
//!
//! Steps 1-4 are hard gates with no partial work to roll back. A backend
//! failure at step 6 is terminal for the request. The unique-key race at
//! step 7 is the only place that recovers rather than propagates: the loser
//! serves the winner's row and reports `cached=true`, since the value it
//! returns came from storage.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenVerifier;
use crate::backend::TranslationBackend;
use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::fingerprint;
use crate::rate_limit::RateLimiter;
use crate::store::{NewTranslation, TranslationStore};

/// Translate request body
#[derive(Debug, Clone, Deserialize)]
pub struct TranslateRequest {
    /// Identifier of the source chapter/content unit
    pub document_id: String,

    /// Source text to translate
    pub content: String,

    /// Caller-computed SHA-256 hex digest of `content`
    pub content_fingerprint: String,
}

/// Translate response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated_content: String,
    pub cached: bool,
    pub translation_id: Option<String>,
}

/// Per-user translation quota snapshot
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub translations_remaining: u32,
    pub translations_limit: u32,
    pub window_seconds: u64,
    pub retry_after_seconds: u64,
}

/// The translation pipeline orchestrator. Owns the composition of verifier,
/// fingerprinter, rate limiter, cache store, and backend client.
pub struct TranslationPipeline {
    verifier: Arc<TokenVerifier>,
    limiter: Arc<RateLimiter>,
    store: TranslationStore,
    backend: Arc<dyn TranslationBackend>,
    max_content_chars: usize,
    retry_delay: Duration,
    source_language: String,
    target_language: String,
}

impl TranslationPipeline {
    pub fn new(
        config: &AppConfig,
        verifier: Arc<TokenVerifier>,
        limiter: Arc<RateLimiter>,
        store: TranslationStore,
        backend: Arc<dyn TranslationBackend>,
    ) -> Self {
        Self {
            verifier,
            limiter,
            store,
            backend,
            max_content_chars: config.max_content_chars,
            retry_delay: config.retry_delay(),
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
        }
    }

    /// Run one translate request through the full pipeline.
    pub async fn handle_translate(
        &self,
        auth_header: Option<&str>,
        request: TranslateRequest,
    ) -> ApiResult<TranslateResponse> {
        // 1. Authenticate
        let token = auth_header.ok_or(ApiError::MissingAuth)?;
        let user_id = self.verifier.verify(token).await?;

        tracing::info!(
            user_id = %user_id,
            document_id = %request.document_id,
            "translation request"
        );

        // 2. Validate fingerprint against the recomputed digest. The
        // recomputed value is also the storage key from here on.
        let expected = fingerprint::fingerprint(&request.content);
        if !fingerprint::verify(&request.content, &request.content_fingerprint) {
            tracing::warn!(
                expected = %expected,
                given = %request.content_fingerprint,
                "content fingerprint mismatch"
            );
            return Err(ApiError::FingerprintMismatch {
                expected,
                given: request.content_fingerprint,
            });
        }

        // 3. Size guard: reject rather than truncate, so stored text always
        // matches the fingerprint it is keyed by.
        if request.content.chars().count() > self.max_content_chars {
            return Err(ApiError::ContentTooLarge(self.max_content_chars));
        }

        // 4. Rate limit
        if !self.limiter.check(&user_id) {
            let retry_after = self.limiter.retry_after(&user_id);
            counter!("translation_rate_limited_total").increment(1);
            tracing::warn!(user_id = %user_id, retry_after, "rate limit exceeded");
            return Err(ApiError::RateLimited { retry_after });
        }

        // 5. Cache lookup
        let store = self.store.clone();
        let (doc_id, fp, lang) = (
            request.document_id.clone(),
            expected.clone(),
            self.target_language.clone(),
        );
        let cached = tokio::task::spawn_blocking(move || store.lookup(&doc_id, &fp, &lang))
            .await
            .map_err(|e| ApiError::Internal(format!("lookup task failed: {e}")))??;

        if let Some(hit) = cached {
            counter!("translation_cache_hits_total").increment(1);
            tracing::info!(document_id = %request.document_id, "cache hit");
            return Ok(TranslateResponse {
                translated_content: hit.translated_text,
                cached: true,
                translation_id: Some(hit.id),
            });
        }

        counter!("translation_cache_misses_total").increment(1);
        tracing::info!(document_id = %request.document_id, "cache miss, calling backend");

        // 6. Backend call, one retry on failure
        let translated = self.translate_with_retry(&request.content).await?;

        // 7. Persist; a lost insert race adopts the winner's row
        let store = self.store.clone();
        let new = NewTranslation {
            document_id: request.document_id.clone(),
            fingerprint: expected,
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            original_text: request.content,
            translated_text: translated,
            owner_user_id: user_id,
        };
        let (record, inserted) = tokio::task::spawn_blocking(move || store.insert_or_get(new))
            .await
            .map_err(|e| ApiError::Internal(format!("persist task failed: {e}")))??;

        if !inserted {
            tracing::info!(
                document_id = %request.document_id,
                translation_id = %record.id,
                "lost insert race, serving winning row"
            );
        }

        // 8. Respond. The stored row is authoritative even for the request
        // that computed the translation.
        Ok(TranslateResponse {
            translated_content: record.translated_text,
            cached: !inserted,
            translation_id: Some(record.id),
        })
    }

    /// Report the caller's quota state.
    pub async fn handle_stats(&self, auth_header: Option<&str>) -> ApiResult<StatsResponse> {
        let token = auth_header.ok_or(ApiError::MissingAuth)?;
        let user_id = self.verifier.verify(token).await?;

        let remaining = self.limiter.remaining(&user_id);
        let retry_after = if remaining == 0 {
            self.limiter.retry_after(&user_id)
        } else {
            0
        };

        Ok(StatsResponse {
            translations_remaining: remaining,
            translations_limit: self.limiter.limit(),
            window_seconds: self.limiter.window_secs(),
            retry_after_seconds: retry_after,
        })
    }

    /// Call the backend, retrying exactly once after a fixed delay. No
    /// jitter, no backoff growth; further retry is the caller's problem.
    async fn translate_with_retry(&self, content: &str) -> ApiResult<String> {
        match self.backend.translate(content, &self.target_language).await {
            Ok(translated) => Ok(translated),
            Err(first) => {
                counter!("translation_backend_retries_total").increment(1);
                tracing::warn!(error = %first, "backend call failed, retrying once");
                tokio::time::sleep(self.retry_delay).await;

                match self.backend.translate(content, &self.target_language).await {
                    Ok(translated) => Ok(translated),
                    Err(second) => {
                        counter!("translation_backend_failures_total").increment(1);
                        tracing::error!(error = %second, "backend retry failed");
                        Err(ApiError::BackendUnavailable)
                    }
                }
            }
        }
    }
}
