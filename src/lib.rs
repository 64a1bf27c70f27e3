//! Translation Service - authenticated, content-addressed, rate-limited
//! chapter translation API.
//!
//! The service verifies a caller's bearer token, validates that submitted
//! content matches its claimed SHA-256 fingerprint, enforces a per-user
//! sliding-window quota, resolves a persistent cache keyed by
//! (document, fingerprint, target language), and calls an external
//! translation backend with a single bounded retry. Concurrent duplicate
//! requests are reconciled by a unique-key constraint in the store: at most
//! one record ever exists per key, no matter how many requests race to
//! create it.
//!
//! # Endpoints
//!
//! - `POST /translate` - translate chapter content (bearer token required)
//! - `GET /translate/stats` - per-user quota state (bearer token required)
//! - `GET /` - API information
//! - `GET /health` - liveness probe
//! - `GET /ready` - readiness probe
//! - `GET /metrics` - basic metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use translation_service::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     translation_service::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod jwks;
pub mod middleware;
pub mod pipeline;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use server::{build_router, start_server};
pub use state::AppState;
