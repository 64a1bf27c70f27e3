//! API route handlers
//!
//! - `translate`: the translation pipeline endpoints
//! - `health`: liveness/readiness probes and basic metrics

pub mod health;
pub mod translate;

use crate::error::ApiError;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Root endpoint (GET /), no authentication required.
pub async fn api_info() -> impl IntoResponse {
    Json(json!({
        "name": "Translation Service",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/translate",
            "/translate/stats",
            "/health",
            "/ready",
            "/metrics"
        ]
    }))
}

/// 404 Not Found handler
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
