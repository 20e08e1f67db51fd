//! Shell Tools Server
//!
//! MCP server exposing shell command execution (foreground or as background
//! jobs) and exact-match file editing, over stdio or streamable HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod domain;
mod error;
mod infra;
mod service;

pub use config::Config;
pub use error::{Error, Result};

use infra::job_registry::JobRegistry;
use service::file::FileService;
use service::process::ProcessService;

/// MCP server for shell commands and file edits
#[derive(Parser, Debug)]
#[command(name = "shell-tools-server", version)]
#[command(about = "MCP server for shell command execution and exact-match file editing")]
struct Args {
    /// Serve MCP over streamable HTTP instead of stdio
    #[arg(long)]
    http: bool,

    /// HTTP bind host (implies --http)
    #[arg(long)]
    host: Option<String>,

    /// HTTP bind port (implies --http)
    #[arg(short, long)]
    port: Option<u16>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub process_service: Arc<ProcessService>,
    pub file_service: Arc<FileService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration first to check MCP mode
    dotenvy::dotenv().ok();
    let mut config = Config::load()?;
    if let Some(host) = args.host {
        config.http_host = host;
        config.mcp_mode = "http".to_string();
    }
    if let Some(port) = args.port {
        config.http_port = port;
        config.mcp_mode = "http".to_string();
    }
    if args.http {
        config.mcp_mode = "http".to_string();
    }
    let config = Arc::new(config);

    // Initialize tracing - use stderr for MCP stdio mode to avoid polluting stdout
    if config.mcp_mode == "stdio" {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(
                EnvFilter::builder()
                    .with_default_directive(Level::INFO.into())
                    .from_env_lossy(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(
                EnvFilter::builder()
                    .with_default_directive(Level::INFO.into())
                    .from_env_lossy(),
            )
            .init();
    }

    info!("Starting Shell Tools Server");
    info!(
        "Shell: {}, default timeout: {}s, max timeout: {}s",
        config.shell, config.default_timeout_secs, config.max_timeout_secs
    );

    // Initialize services
    let job_registry = Arc::new(JobRegistry::with_capacity(config.max_finished_jobs));
    let process_service = Arc::new(ProcessService::new(job_registry, &config));
    let file_service = Arc::new(FileService::new());

    // Create application state
    let state = AppState {
        config: config.clone(),
        process_service,
        file_service,
    };

    // stdio mode runs exclusively
    if config.mcp_mode == "stdio" {
        return api::mcp::serve_stdio(state).await;
    }

    let http_addr: SocketAddr = config.http_addr().parse()?;
    let app = api::http::create_router(state);

    info!("HTTP listening on {}", http_addr);
    info!("MCP endpoint at {}", config.mcp_path);

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("HTTP server error: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
