//! Remote key-set cache for the external token scheme.
//!
//! The external identity provider publishes its verification keys as a JSON
//! key-set document. Fetching it on every request would put a network round
//! trip on the hot path, so the set is cached in process memory with a TTL.
//! When a refresh fails and a previously fetched set exists, the stale set
//! is served instead of failing the request (serve-stale-on-error); readers
//! never wait longer than the fetch timeout.

use jsonwebtoken::jwk::JwkSet;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Errors from the key-set cache.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("key-set fetch failed: {0}")]
    Fetch(String),
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// TTL'd in-process cache of a remote JSON key set.
pub struct JwksCache {
    url: String,
    ttl: Duration,
    http: reqwest::Client,
    cached: RwLock<Option<CachedKeys>>,
}

impl JwksCache {
    /// Create a cache for the given endpoint. `fetch_timeout` bounds every
    /// refresh attempt; a timed-out fetch counts as a failure.
    pub fn new(url: String, ttl: Duration, fetch_timeout: Duration) -> Result<Self, JwksError> {
        let http = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        Ok(Self {
            url,
            ttl,
            http,
            cached: RwLock::new(None),
        })
    }

    /// Return the current key set, refreshing it if the cached copy is
    /// missing or older than the TTL. On refresh failure the last good set
    /// is returned when one exists.
    pub async fn get_keys(&self) -> Result<JwkSet, JwksError> {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.keys.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;

        // Another task may have refreshed while we waited for the lock.
        if let Some(entry) = cached.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.keys.clone());
            }
        }

        match self.fetch().await {
            Ok(keys) => {
                tracing::debug!(url = %self.url, key_count = keys.keys.len(), "key set refreshed");
                *cached = Some(CachedKeys {
                    keys: keys.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(keys)
            }
            Err(e) => match cached.as_ref() {
                Some(stale) => {
                    tracing::warn!(
                        url = %self.url,
                        error = %e,
                        stale_age_secs = stale.fetched_at.elapsed().as_secs(),
                        "key-set refresh failed, serving stale set"
                    );
                    Ok(stale.keys.clone())
                }
                None => Err(e),
            },
        }
    }

    async fn fetch(&self) -> Result<JwkSet, JwksError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| JwksError::Fetch(format!("invalid key-set document: {e}")))
    }

    /// Seed the cache with an already-fetched key set. Test hook for
    /// exercising TTL and serve-stale behavior without a live endpoint;
    /// combine with a zero TTL to force the stale path.
    pub async fn seed(&self, keys: JwkSet) {
        let mut cached = self.cached.write().await;
        *cached = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
    }
}
