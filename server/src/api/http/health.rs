//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub jobs_tracked: usize,
    pub jobs_running: usize,
}

/// Liveness probe with a job count summary
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.process_service.registry();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        jobs_tracked: registry.len(),
        jobs_running: registry.running(),
    })
}
