use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::ApiResult;
use crate::state::AppState;

/// Global server start time for uptime calculation
static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

fn uptime_seconds() -> u64 {
    SERVER_START_TIME.elapsed().map(|d| d.as_secs()).unwrap_or(0)
}

/// Health check endpoint (liveness)
/// Returns 200 if server is running
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "translation-service",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
    }))
}

/// Readiness check endpoint
/// Returns 200 if the cache store is reachable
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store.clone();
    let store_status = tokio::task::spawn_blocking(move || store.ping())
        .await
        .map(|r| if r.is_ok() { "ready" } else { "unavailable" })
        .unwrap_or("unavailable");

    Ok(Json(json!({
        "status": if store_status == "ready" { "ready" } else { "degraded" },
        "service": "translation-service",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
        "components": {
            "api": "ready",
            "store": store_status,
        }
    })))
}

/// Basic metrics endpoint
pub async fn metrics() -> impl IntoResponse {
    Json(json!({
        "uptime_seconds": uptime_seconds(),
    }))
}
