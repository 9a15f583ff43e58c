use axum::extract::State;
use axum::{routing::get, Json, Router};
use hermes_core::medium::Medium;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the subscriber store is reachable.
    pub store_healthy: bool,
    /// Media with a registered dispatcher.
    pub media: Vec<Medium>,
}

/// GET /health -- returns service and store health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_healthy = match state.directory.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            false
        }
    };

    let status = if store_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store_healthy,
        media: state.publisher.dispatchers().media(),
    })
}

/// Mount health check routes (root level, not under `ROOT_PATH`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
