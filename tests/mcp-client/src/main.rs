//! MCP Client Test
//!
//! Spawns the shell tools server over stdio and exercises every tool.

use std::time::Duration;

use anyhow::{ensure, Context, Result};
use rmcp::{
    ServiceExt,
    model::CallToolRequestParam,
    transport::{TokioChildProcess, ConfigureCommandExt},
};
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::{info, error, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Client = rmcp::service::RunningService<rmcp::service::RoleClient, ()>;

const EXPECTED_TOOLS: &[&str] = &[
    "run_shell_command",
    "job_status",
    "job_list",
    "job_reap",
    "file_edit",
    "file_replace",
    "file_multi_edit",
    "file_read",
];

/// Tool output text and whether it was flagged as an error
struct ToolOutput {
    text: String,
    is_error: bool,
}

impl ToolOutput {
    fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.text).with_context(|| format!("not JSON: {}", self.text))
    }
}

/// Helper to call a tool and print the result
async fn call_tool(client: &Client, name: &str, args: Value) -> Result<ToolOutput> {
    info!("📤 Calling tool: {}", name);
    info!("   Arguments: {}", serde_json::to_string_pretty(&args)?);

    let result = client
        .call_tool(CallToolRequestParam {
            name: name.to_string().into(),
            arguments: args.as_object().cloned(),
        })
        .await?;

    let text = result
        .content
        .first()
        .and_then(|c| c.raw.as_text())
        .map(|t| t.text.clone())
        .unwrap_or_else(|| "No content".into());
    let is_error = result.is_error.unwrap_or(false);

    if is_error {
        error!("❌ Tool error: {}", text);
    } else {
        info!("✅ Result:\n{}", text);
    }

    Ok(ToolOutput { text, is_error })
}

/// Poll job_status until the job leaves the running state
async fn wait_for_job(client: &Client, job_id: &str) -> Result<Value> {
    for _ in 0..100 {
        let status = call_tool(client, "job_status", json!({ "job_id": job_id })).await?;
        ensure!(!status.is_error, "job_status failed: {}", status.text);
        let snapshot = status.json()?;
        if snapshot["state"] != "running" {
            return Ok(snapshot);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    anyhow::bail!("job {} never finished", job_id)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    info!("🚀 Starting MCP Client Test");
    info!("================================");

    // Get the path to the server binary
    let server_path = std::env::var("MCP_SERVER_PATH")
        .unwrap_or_else(|_| "../../target/debug/shell-tools-server".to_string());

    info!("📡 Connecting to MCP server: {}", server_path);

    let transport = TokioChildProcess::new(
        Command::new(&server_path).configure(|cmd| {
            cmd.env("SHELL_TOOLS_MCP_MODE", "stdio");
        })
    )?;

    // Connect to the server using () as a simple client handler
    let client = ().serve(transport).await?;

    info!("✅ Connected to MCP server");
    info!("");

    let scratch = tempfile::tempdir()?;
    let scratch_path = scratch.path().to_string_lossy().to_string();

    // ========================================================================
    // Test 1: List available tools
    // ========================================================================
    info!("📋 Test 1: List available tools");
    info!("--------------------------------");

    let tools = client.list_tools(None).await?;
    info!("Available tools ({}):", tools.tools.len());
    for tool in &tools.tools {
        info!("  - {} : {}", tool.name, tool.description.as_deref().unwrap_or(""));
    }
    for expected in EXPECTED_TOOLS {
        ensure!(
            tools.tools.iter().any(|t| t.name == *expected),
            "missing tool {}",
            expected
        );
    }
    info!("");

    // ========================================================================
    // Test 2: Foreground commands
    // ========================================================================
    info!("⚙️  Test 2: Foreground commands");
    info!("--------------------------------");

    info!("\n⚙️  2.1 Echo with pipe in scratch dir...");
    let echo = call_tool(
        &client,
        "run_shell_command",
        json!({
            "command": "echo hello | tr a-z A-Z && pwd",
            "cwd": scratch_path
        }),
    )
    .await?
    .json()?;
    ensure!(echo["exit_code"] == 0, "unexpected exit code: {}", echo);
    ensure!(echo["stdout"].as_str().unwrap_or("").starts_with("HELLO\n"));
    info!("");

    info!("⚙️  2.2 Non-zero exit and stderr...");
    let failed = call_tool(
        &client,
        "run_shell_command",
        json!({ "command": "echo oops 1>&2; exit 3" }),
    )
    .await?
    .json()?;
    ensure!(failed["exit_code"] == 3);
    ensure!(failed["stderr"] == "oops\n");
    info!("");

    info!("⚙️  2.3 Timeout...");
    let timed_out = call_tool(
        &client,
        "run_shell_command",
        json!({ "command": "echo started; sleep 5", "timeout": 1 }),
    )
    .await?
    .json()?;
    ensure!(timed_out["timed_out"] == true);
    ensure!(timed_out["exit_code"].is_null());
    ensure!(timed_out["stdout"] == "started\n");
    info!("");

    info!("⚙️  2.4 Invalid working directory...");
    let bad_cwd = call_tool(
        &client,
        "run_shell_command",
        json!({ "command": "echo hi", "cwd": "/nonexistent/shell-tools" }),
    )
    .await?;
    ensure!(bad_cwd.is_error);
    ensure!(bad_cwd.json()?["kind"] == "invalid_argument");
    info!("");

    // ========================================================================
    // Test 3: Background jobs
    // ========================================================================
    info!("⏳ Test 3: Background jobs");
    info!("--------------------------------");

    info!("\n⏳ 3.1 Launching background job...");
    let launched = call_tool(
        &client,
        "run_shell_command",
        json!({ "command": "sleep 1; echo hi", "run_in_bg": true }),
    )
    .await?
    .json()?;
    let job_id = launched["job_id"]
        .as_str()
        .context("background run returned no job_id")?
        .to_string();
    info!("");

    info!("⏳ 3.2 Listing jobs...");
    let list = call_tool(&client, "job_list", json!({})).await?.json()?;
    ensure!(list.as_array().map(|jobs| !jobs.is_empty()).unwrap_or(false));
    info!("");

    info!("⏳ 3.3 Waiting for job {}...", job_id);
    let snapshot = wait_for_job(&client, &job_id).await?;
    ensure!(snapshot["state"] == "completed", "unexpected state: {}", snapshot);
    ensure!(snapshot["stdout"].as_str().unwrap_or("").contains("hi"));
    info!("");

    info!("⏳ 3.4 Reaping job...");
    let reaped = call_tool(&client, "job_reap", json!({ "job_id": job_id })).await?;
    ensure!(!reaped.is_error);
    let gone = call_tool(&client, "job_status", json!({ "job_id": job_id })).await?;
    ensure!(gone.is_error && gone.json()?["code"] == 4001);
    info!("");

    // ========================================================================
    // Test 4: File tools
    // ========================================================================
    info!("📁 Test 4: File tools");
    info!("--------------------------------");

    let file_path = scratch.path().join("notes.txt");
    let file = file_path.to_string_lossy().to_string();
    std::fs::write(&file_path, "alpha\nbeta\nbeta\ngamma\n")?;

    info!("\n✏️  4.1 Unique edit...");
    let edited = call_tool(
        &client,
        "file_edit",
        json!({ "file_path": file, "old_string": "alpha", "new_string": "ALPHA" }),
    )
    .await?
    .json()?;
    ensure!(edited["replacements"] == 1);
    info!("");

    info!("✏️  4.2 Ambiguous replace is rejected...");
    let ambiguous = call_tool(
        &client,
        "file_replace",
        json!({ "file_path": file, "old_string": "beta", "new_string": "BETA" }),
    )
    .await?;
    ensure!(ambiguous.is_error);
    ensure!(ambiguous.json()?["kind"] == "ambiguous_match");
    ensure!(std::fs::read_to_string(&file_path)? == "ALPHA\nbeta\nbeta\ngamma\n");
    info!("");

    info!("✏️  4.3 Multi edit...");
    let multi = call_tool(
        &client,
        "file_multi_edit",
        json!({
            "file_path": file,
            "edits": [
                { "old_string": "beta", "new_string": "BETA", "replace_all": true },
                { "old_string": "gamma", "new_string": "GAMMA" }
            ]
        }),
    )
    .await?
    .json()?;
    ensure!(multi["edits_applied"] == 2);
    ensure!(std::fs::read_to_string(&file_path)? == "ALPHA\nBETA\nBETA\nGAMMA\n");
    info!("");

    info!("📖 4.4 Windowed read...");
    let read = call_tool(
        &client,
        "file_read",
        json!({ "file_path": file, "offset": 1, "limit": 2 }),
    )
    .await?;
    ensure!(read.text == "BETA\nBETA", "unexpected read: {:?}", read.text);
    info!("");

    info!("📖 4.5 Missing file...");
    let missing = call_tool(
        &client,
        "file_read",
        json!({ "file_path": format!("{}/missing.txt", scratch_path) }),
    )
    .await?;
    ensure!(missing.is_error && missing.json()?["kind"] == "file_not_found");
    info!("");

    // ========================================================================
    // Done
    // ========================================================================
    info!("");
    info!("================================");
    info!("✅ All MCP tests completed successfully!");
    info!("================================");

    // Disconnect
    client.cancel().await?;

    Ok(())
}
