//! Server initialization and routing
//!
//! Axum server setup: router configuration, middleware stack, structured
//! logging, and graceful shutdown handling.

use crate::config::AppConfig;
use crate::middleware::request_id;
use crate::routes::{api_info, health, not_found, translate};
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware.
///
/// Routes:
/// - Public: /, /health, /ready, /metrics
/// - Pipeline: /translate, /translate/stats (bearer token verified inside
///   the pipeline, step 1 of the request cycle)
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let public_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    let pipeline_routes = Router::new()
        .route("/translate", post(translate::translate))
        .route("/translate/stats", get(translate::stats))
        // Chapter content is capped at a few thousand characters; anything
        // near this limit is already rejected by the pipeline's size guard.
        .layer(DefaultBodyLimit::max(256 * 1024));

    Router::new()
        .merge(public_routes)
        .merge(pipeline_routes)
        .fallback(not_found)
        .layer(TimeoutLayer::new(state.config.timeout()))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the translation HTTP server.
///
/// Initializes logging, builds shared state (verifier, rate limiter, cache
/// store, backend client), binds the listener, and serves until SIGTERM or
/// Ctrl+C.
pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .json()
        .init();

    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        "Starting translation service on {} ({} -> {})",
        addr,
        config.source_language,
        config.target_language
    );
    tracing::info!(
        "Rate limit: {} translations per {}s per user",
        config.rate_limit,
        config.rate_window_secs
    );
    tracing::info!(
        "Cache store: {}, content ceiling: {} chars",
        config.database_path,
        config.max_content_chars
    );

    let state = Arc::new(AppState::new(config).map_err(|e| anyhow::anyhow!(e.to_string()))?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
