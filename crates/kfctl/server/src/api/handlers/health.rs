//! Health and fallback handlers

use crate::api::state::AppState;
use crate::error::ApiError;
use axum::{extract::State, http::Uri, Json};
use kfctl_types::HealthResponse;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
    })
}

/// Structured 404 for routes that are not registered
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no endpoint registered at {}", uri.path()))
}
