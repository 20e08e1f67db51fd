//! MCP (Model Context Protocol) API layer
//!
//! This module provides MCP server functionality, allowing AI assistants
//! to run shell commands and edit files through standardized tools.

mod common;
mod handler;
mod types;

pub use handler::ShellToolsMcpHandler;

use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::ServiceExt;
use tracing::info;

use crate::AppState;

/// Start MCP server in stdio mode
///
/// This runs the MCP server using stdin/stdout for communication,
/// suitable for local CLI usage with AI assistants.
pub async fn serve_stdio(state: AppState) -> anyhow::Result<()> {
    info!("Starting MCP server in stdio mode");

    let handler = ShellToolsMcpHandler::new(state);
    let service = handler.serve(stdio()).await?;

    info!("MCP server ready, waiting for requests...");
    service.waiting().await?;

    info!("MCP server shutdown");
    Ok(())
}

/// Streamable HTTP service, one handler per MCP session
pub fn create_mcp_service(
    state: AppState,
) -> StreamableHttpService<ShellToolsMcpHandler, LocalSessionManager> {
    StreamableHttpService::new(
        move || Ok(ShellToolsMcpHandler::new(state.clone())),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    )
}
