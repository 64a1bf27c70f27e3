//! Translation endpoints.
//!
//! Thin handlers: header extraction and JSON shaping only. Ordering, error
//! precedence, and all policy live in [`crate::pipeline`].

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::pipeline::TranslateRequest;
use crate::state::AppState;

fn bearer_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

/// POST /translate
///
/// Translate chapter content with authentication, content-fingerprint
/// validation, per-user rate limiting, and a persistent cache.
pub async fn translate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<TranslateRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = state
        .pipeline
        .handle_translate(bearer_header(&headers), request)
        .await?;
    Ok(Json(response))
}

/// GET /translate/stats
///
/// Current user's quota: remaining translations, limit, window, and how
/// long until a slot frees when exhausted.
pub async fn stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let response = state.pipeline.handle_stats(bearer_header(&headers)).await?;
    Ok(Json(response))
}
