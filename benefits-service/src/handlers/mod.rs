//! HTTP handlers for benefits-service.

pub mod benefits;
pub mod search;

use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

/// Health check endpoint for liveness probes.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "benefits-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness: the database fallback must be reachable.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.catalog.store().check_connection().await {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        )
    }
}

/// Fallback for any method a route does not accept.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
