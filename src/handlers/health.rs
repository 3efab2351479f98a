//! Health endpoint.
//!
//! `GET /health` - liveness check, exempt from rate limiting.

use axum::Json;
use chrono::Utc;
use tracing::instrument;

use crate::models::HealthResponse;

/// Health check endpoint. Always returns 200 OK.
#[instrument]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}
