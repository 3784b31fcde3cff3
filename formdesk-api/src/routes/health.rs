/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// { "status": "healthy", "version": "0.1.0", "store": "ready" }
/// ```
///
/// `store` is `not_initialized` until setup has run, and `unavailable` when
/// the backend cannot be reached; both report `degraded`.

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Store status
    pub store: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let context = state.services.context();
    let store_status = match context.current_store_id().await {
        None => "not_initialized",
        Some(id) => match context.store().store_exists(&id).await {
            Ok(true) => "ready",
            Ok(false) => "not_initialized",
            Err(e) => {
                tracing::warn!(error = %e, "Health check could not reach the store");
                "unavailable"
            }
        },
    };

    Json(HealthResponse {
        status: if store_status == "ready" {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store_status.to_string(),
    })
}
