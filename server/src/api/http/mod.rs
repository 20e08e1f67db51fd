//! HTTP API handlers

mod health;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::mcp;
use crate::AppState;

/// Create the HTTP router: health probe plus the MCP endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mcp_path = state.config.mcp_path.clone();
    let mcp_service = mcp::create_mcp_service(state.clone());

    Router::new()
        .route("/health", get(health::health_check))
        .with_state(state)
        .nest_service(&mcp_path, mcp_service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
