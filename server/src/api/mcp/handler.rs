//! MCP Server Handler implementation
//!
//! Implements the MCP ServerHandler trait for the shell tools server:
//! shell command execution, background job inspection and exact-match
//! file editing.

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use tracing::info;

use super::common::{failure, format_command_result, render, timeout_secs};
use super::types::{
    FileEditParams, FileMultiEditParams, FileReadParams, JobIdParams, RunShellCommandParams,
};
use crate::AppState;
use crate::domain::types::{CommandRequest, EditOperation};
use crate::service::file::ReadWindow;

/// MCP Handler for shell and file tools
#[derive(Clone)]
pub struct ShellToolsMcpHandler {
    state: AppState,
    tool_router: ToolRouter<Self>,
}

impl ShellToolsMcpHandler {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    async fn edit_file(&self, tool: &str, params: FileEditParams) -> CallToolResult {
        info!("MCP: {} called for {}", tool, params.file_path);
        let result = self
            .state
            .file_service
            .edit(&params.file_path, &params.operation())
            .await;
        render(tool, result)
    }
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl ShellToolsMcpHandler {
    // ------------------------------------------------------------------------
    // Shell Tools
    // ------------------------------------------------------------------------

    #[tool(
        description = "Run a shell command. Blocks until it exits or the timeout expires and returns exit_code, stdout and stderr; with run_in_bg it returns a job_id immediately. A foreground call also waits for anything left running with `&` that still holds its output, up to the timeout, and then kills it; start servers and daemons with run_in_bg instead."
    )]
    async fn run_shell_command(
        &self,
        Parameters(params): Parameters<RunShellCommandParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            "MCP: run_shell_command called with command: {}",
            params.command
        );

        let timeout = match timeout_secs(params.timeout) {
            Ok(t) => t,
            Err(e) => return Ok(failure("run_shell_command", &e)),
        };
        let mut request = if params.run_in_bg.unwrap_or(false) {
            CommandRequest::background(params.command)
        } else {
            CommandRequest::foreground(params.command)
        };
        if let Some(cwd) = params.cwd {
            request = request.with_cwd(cwd);
        }
        if let Some(secs) = timeout {
            request = request.with_timeout(secs);
        }

        let result = self
            .state
            .process_service
            .run(request)
            .await
            .map(|r| format_command_result(&r));
        Ok(render("run_shell_command", result))
    }

    #[tool(description = "Get the state and output captured so far of a background job.")]
    async fn job_status(
        &self,
        Parameters(params): Parameters<JobIdParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: job_status called for {}", params.job_id);
        let result = self.state.process_service.job_status(&params.job_id).await;
        Ok(render("job_status", result))
    }

    #[tool(description = "List background jobs, oldest first.")]
    async fn job_list(&self) -> Result<CallToolResult, McpError> {
        info!("MCP: job_list called");
        Ok(render("job_list", Ok(self.state.process_service.job_list())))
    }

    #[tool(description = "Remove a finished background job and return its final state and output.")]
    async fn job_reap(
        &self,
        Parameters(params): Parameters<JobIdParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: job_reap called for {}", params.job_id);
        let result = self.state.process_service.job_reap(&params.job_id).await;
        Ok(render("job_reap", result))
    }

    // ------------------------------------------------------------------------
    // File Tools
    // ------------------------------------------------------------------------

    #[tool(
        description = "Replace old_string with new_string in a file. old_string must match exactly once unless replace_all is set; the file is untouched on failure."
    )]
    async fn file_edit(
        &self,
        Parameters(params): Parameters<FileEditParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.edit_file("file_edit", params).await)
    }

    #[tool(description = "Alias of file_edit.")]
    async fn file_replace(
        &self,
        Parameters(params): Parameters<FileEditParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.edit_file("file_replace", params).await)
    }

    #[tool(
        description = "Apply several exact-match edits to one file in order. Either all edits apply and the file is written once, or nothing changes."
    )]
    async fn file_multi_edit(
        &self,
        Parameters(params): Parameters<FileMultiEditParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            "MCP: file_multi_edit called for {} with {} edits",
            params.file_path,
            params.edits.len()
        );
        let edits: Vec<EditOperation> = params.edits.into_iter().map(Into::into).collect();
        let result = self
            .state
            .file_service
            .multi_edit(&params.file_path, &edits)
            .await;
        Ok(render("file_multi_edit", result))
    }

    #[tool(description = "Read lines from a text file, starting at a 0-based offset.")]
    async fn file_read(
        &self,
        Parameters(params): Parameters<FileReadParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: file_read called for {}", params.file_path);

        let window = match ReadWindow::new(params.offset, params.limit) {
            Ok(w) => w,
            Err(e) => return Ok(failure("file_read", &e)),
        };
        match self.state.file_service.read(&params.file_path, window).await {
            Ok(lines) => Ok(CallToolResult::success(vec![Content::text(lines.join("\n"))])),
            Err(e) => Ok(failure("file_read", &e)),
        }
    }
}

// ============================================================================
// ServerHandler Implementation
// ============================================================================

#[tool_handler]
impl ServerHandler for ShellToolsMcpHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Shell Tools MCP Server - Run shell commands and edit files. Use \
                run_shell_command to execute commands (run_in_bg plus job_status for long \
                ones), file_read to inspect files and file_edit / file_multi_edit for \
                exact-match replacements."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
