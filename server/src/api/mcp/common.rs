//! Shared result rendering for MCP tools

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use tracing::error;

use crate::domain::types::CommandResult;
use crate::Error;

/// Render a service result as tool output: pretty JSON on success, a
/// structured `{kind, code, message}` tool error otherwise.
pub fn render<T: Serialize>(tool: &str, result: crate::Result<T>) -> CallToolResult {
    match result.and_then(|value| to_pretty_json(&value)) {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => failure(tool, &e),
    }
}

/// Render an error as a tool error
pub fn failure(tool: &str, err: &Error) -> CallToolResult {
    error!("MCP: {} failed: {}", tool, err);
    let body = serde_json::to_string_pretty(&err.to_response())
        .unwrap_or_else(|_| format!("{{\"kind\":\"{}\",\"code\":{}}}", err.kind(), err.code()));
    CallToolResult::error(vec![Content::text(body)])
}

fn to_pretty_json<T: Serialize>(value: &T) -> crate::Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize result: {}", e)))
}

/// Format command result as JSON
pub fn format_command_result(result: &CommandResult) -> serde_json::Value {
    match &result.job_id {
        Some(job_id) => serde_json::json!({
            "job_id": job_id,
            "state": "running",
        }),
        None => serde_json::json!({
            "exit_code": result.exit_code,
            "status_code": result.status_code(),
            "stdout": result.stdout,
            "stderr": result.stderr,
            "timed_out": result.timed_out,
            "truncated": result.truncated,
        }),
    }
}

/// Convert a caller supplied timeout, rejecting negatives
pub fn timeout_secs(timeout: Option<i64>) -> crate::Result<Option<u64>> {
    match timeout {
        Some(t) if t < 0 => Err(Error::InvalidArgument(format!(
            "timeout must be >= 0, got {}",
            t
        ))),
        Some(t) => Ok(Some(t as u64)),
        None => Ok(None),
    }
}
