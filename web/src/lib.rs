//! Axum shell for Pay self-service.
//!
//! Owns the per-request values the upstream client reads:
//!
//! - **Correlation ids**: [`correlation_id_layer`] takes the id from
//!   `x-request-id` (or generates one), stores a `RequestContext` for
//!   handlers and echoes the id on the response
//! - **Upstream errors**: [`AppError`] converts `RequestError` into the
//!   generic problem response
//! - **Health**: liveness and upstream readiness endpoints
//! - **Logging**: [`telemetry::init_tracing`]
//!
//! # Example
//!
//! ```no_run
//! use pay_selfservice_client::ClientConfig;
//! use pay_selfservice_web::{router, telemetry, AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::from_env()?;
//!     telemetry::init_tracing(&config.log_level)?;
//!
//!     let app = router(AppState::from_config(&config)?);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:9200").await?;
//!     pay_selfservice_web::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod telemetry;

use axum::{routing::get, Router};

// Re-export key types for convenience
pub use error::{AppError, GENERIC_PROBLEM_MESSAGE};
pub use extractors::Correlation;
pub use middleware::correlation_id_layer;
pub use state::AppState;

/// Routes served by this crate, behind the correlation id layer.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(handlers::health_check))
        .route("/healthcheck/upstreams", get(handlers::upstream_health))
        .with_state(state)
        .layer(correlation_id_layer())
}

/// Serve `app` on `listener` until the process is stopped.
///
/// # Errors
///
/// Returns error if the server fails while accepting connections
pub async fn serve(listener: tokio::net::TcpListener, app: Router) -> std::io::Result<()> {
    tracing::info!(addr = ?listener.local_addr().ok(), "Listening");
    axum::serve(listener, app).await
}
