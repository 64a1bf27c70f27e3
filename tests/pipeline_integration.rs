//! End-to-end pipeline tests with a scripted stub backend.

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use translation_service::backend::{BackendError, TranslationBackend};
use translation_service::error::ApiError;
use translation_service::fingerprint::fingerprint;
use translation_service::pipeline::TranslateRequest;
use translation_service::store::TranslationStore;
use translation_service::{AppConfig, AppState};

const TEST_SECRET: &str = "integration-test-secret";

/// Stub translation backend. Fails the first `failures_remaining` calls,
/// then returns a distinct marker per call so a lost race is observable.
struct StubBackend {
    calls: AtomicUsize,
    failures_remaining: AtomicUsize,
}

impl StubBackend {
    fn new(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failures_remaining: AtomicUsize::new(failures),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationBackend for StubBackend {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(BackendError::Transport("stub failure".to_string()));
        }

        Ok(format!("{target_language}[{call}]: {text}"))
    }
}

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    exp: i64,
    iat: i64,
}

fn mint_token(user: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    encode(
        &Header::default(),
        &TestClaims {
            sub: user.to_string(),
            exp: now + 3600,
            iat: now,
        },
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.jwt_secret = TEST_SECRET.to_string();
    // Keep the retry path fast in tests.
    config.retry_delay_secs = 0;
    config
}

fn test_state(backend: Arc<StubBackend>) -> AppState {
    AppState::with_parts(
        test_config(),
        TranslationStore::open_in_memory().unwrap(),
        backend,
    )
    .unwrap()
}

fn request_for(content: &str) -> TranslateRequest {
    TranslateRequest {
        document_id: "chapter-1".to_string(),
        content: content.to_string(),
        content_fingerprint: fingerprint(content),
    }
}

fn bearer(user: &str) -> String {
    format!("Bearer {}", mint_token(user))
}

#[tokio::test]
async fn first_call_translates_second_call_hits_cache() {
    let backend = StubBackend::new(0);
    let state = test_state(backend.clone());
    let auth = bearer("u1");

    let first = state
        .pipeline
        .handle_translate(Some(&auth), request_for("Hello world"))
        .await
        .unwrap();
    assert!(!first.cached);
    assert!(first.translation_id.is_some());
    assert!(first.translated_content.contains("Hello world"));

    let second = state
        .pipeline
        .handle_translate(Some(&auth), request_for("Hello world"))
        .await
        .unwrap();
    assert!(second.cached);
    assert_eq!(second.translated_content, first.translated_content);
    assert_eq!(second.translation_id, first.translation_id);

    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn missing_auth_header_is_rejected() {
    let state = test_state(StubBackend::new(0));

    let err = state
        .pipeline
        .handle_translate(None, request_for("Hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MissingAuth));
}

#[tokio::test]
async fn invalid_token_is_rejected_before_fingerprint_check() {
    let state = test_state(StubBackend::new(0));

    // Bad digest too, but auth is step 1 so it never gets that far.
    let mut request = request_for("Hello");
    request.content_fingerprint = "0".repeat(64);

    let err = state
        .pipeline
        .handle_translate(Some("Bearer not-a-token"), request)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidToken));
}

#[tokio::test]
async fn fingerprint_mismatch_is_rejected_despite_valid_auth() {
    let backend = StubBackend::new(0);
    let state = test_state(backend.clone());
    let auth = bearer("u1");

    let mut request = request_for("Hello world");
    request.content_fingerprint = fingerprint("Different content");

    let err = state
        .pipeline
        .handle_translate(Some(&auth), request)
        .await
        .unwrap_err();

    match err {
        ApiError::FingerprintMismatch { expected, given } => {
            assert_eq!(expected, fingerprint("Hello world"));
            assert_eq!(given, fingerprint("Different content"));
        }
        other => panic!("expected fingerprint mismatch, got {other:?}"),
    }

    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn oversized_content_is_rejected() {
    let backend = StubBackend::new(0);
    let state = test_state(backend.clone());
    let auth = bearer("u1");

    let big = "x".repeat(5001);
    let err = state
        .pipeline
        .handle_translate(Some(&auth), request_for(&big))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ContentTooLarge(5000)));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn eleventh_request_in_window_is_rate_limited() {
    let state = test_state(StubBackend::new(0));
    let auth = bearer("u1");

    for _ in 0..10 {
        state
            .pipeline
            .handle_translate(Some(&auth), request_for("Hello world"))
            .await
            .unwrap();
    }

    let err = state
        .pipeline
        .handle_translate(Some(&auth), request_for("Hello world"))
        .await
        .unwrap_err();

    match err {
        ApiError::RateLimited { retry_after } => {
            // Oldest admission was moments ago; nearly the full hour remains.
            assert!(retry_after > 3590 && retry_after <= 3600);
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_is_scoped_per_user() {
    let state = test_state(StubBackend::new(0));
    let auth1 = bearer("u1");
    let auth2 = bearer("u2");

    for _ in 0..10 {
        state
            .pipeline
            .handle_translate(Some(&auth1), request_for("Hello world"))
            .await
            .unwrap();
    }

    // u1 is exhausted, u2 is not.
    assert!(state
        .pipeline
        .handle_translate(Some(&auth1), request_for("Hello world"))
        .await
        .is_err());
    assert!(state
        .pipeline
        .handle_translate(Some(&auth2), request_for("Hello world"))
        .await
        .is_ok());
}

#[tokio::test]
async fn backend_failure_recovers_on_single_retry() {
    let backend = StubBackend::new(1);
    let state = test_state(backend.clone());
    let auth = bearer("u1");

    let response = state
        .pipeline
        .handle_translate(Some(&auth), request_for("Hello world"))
        .await
        .unwrap();
    assert!(!response.cached);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn backend_failing_twice_is_unavailable() {
    let backend = StubBackend::new(2);
    let state = test_state(backend.clone());
    let auth = bearer("u1");

    let err = state
        .pipeline
        .handle_translate(Some(&auth), request_for("Hello world"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BackendUnavailable));

    // Exactly one retry: two calls total, and nothing was cached.
    assert_eq!(backend.calls(), 2);
    let retry = state
        .pipeline
        .handle_translate(Some(&auth), request_for("Hello world"))
        .await
        .unwrap();
    assert!(!retry.cached);
}

#[tokio::test]
async fn concurrent_identical_requests_store_one_record() {
    let backend = StubBackend::new(0);
    let state = Arc::new(test_state(backend.clone()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let state = Arc::clone(&state);
            let auth = bearer(&format!("user-{i}"));
            tokio::spawn(async move {
                state
                    .pipeline
                    .handle_translate(Some(&auth), request_for("Shared chapter text"))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut responses = Vec::new();
    for handle in handles {
        responses.push(handle.await.unwrap());
    }

    // Every response serves the same stored row.
    let first = &responses[0];
    for response in &responses {
        assert_eq!(response.translated_content, first.translated_content);
        assert_eq!(response.translation_id, first.translation_id);
    }

    // The store holds exactly one record for the key, and it is the one
    // everyone saw.
    let stored = state
        .store
        .lookup(
            "chapter-1",
            &fingerprint("Shared chapter text"),
            &state.config.target_language,
        )
        .unwrap()
        .unwrap();
    assert_eq!(Some(stored.id), first.translation_id);
    assert_eq!(stored.translated_text, first.translated_content);
}

#[tokio::test]
async fn stats_report_quota_and_count_down() {
    let state = test_state(StubBackend::new(0));
    let auth = bearer("u1");

    let stats = state.pipeline.handle_stats(Some(&auth)).await.unwrap();
    assert_eq!(stats.translations_remaining, 10);
    assert_eq!(stats.translations_limit, 10);
    assert_eq!(stats.window_seconds, 3600);
    assert_eq!(stats.retry_after_seconds, 0);

    for _ in 0..3 {
        state
            .pipeline
            .handle_translate(Some(&auth), request_for("Hello world"))
            .await
            .unwrap();
    }

    let stats = state.pipeline.handle_stats(Some(&auth)).await.unwrap();
    assert_eq!(stats.translations_remaining, 7);
    assert_eq!(stats.retry_after_seconds, 0);
}

#[tokio::test]
async fn stats_report_retry_hint_when_exhausted() {
    let mut config = test_config();
    config.rate_limit = 2;
    let state = AppState::with_parts(
        config,
        TranslationStore::open_in_memory().unwrap(),
        StubBackend::new(0),
    )
    .unwrap();
    let auth = bearer("u1");

    for _ in 0..2 {
        state
            .pipeline
            .handle_translate(Some(&auth), request_for("Hello world"))
            .await
            .unwrap();
    }

    let stats = state.pipeline.handle_stats(Some(&auth)).await.unwrap();
    assert_eq!(stats.translations_remaining, 0);
    assert!(stats.retry_after_seconds > 0 && stats.retry_after_seconds <= 3600);
}
