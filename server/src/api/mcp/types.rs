//! MCP Tool Parameter Types

use rmcp::schemars;
use serde::Deserialize;

use crate::domain::types::EditOperation;

// ============================================================================
// Shell Tool Parameters
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RunShellCommandParams {
    /// Shell command string
    #[schemars(description = "Shell command to run; pipes, redirection and && work as in sh -c")]
    pub command: String,

    /// Working directory for the command
    #[schemars(description = "Working directory for the command (default: server's current directory)")]
    pub cwd: Option<String>,

    /// Timeout in seconds
    #[schemars(description = "Timeout in seconds (default: 60). The whole process group is killed when it expires")]
    pub timeout: Option<i64>,

    /// Run as a background job
    #[schemars(description = "Run in the background and return a job_id immediately (default: false)")]
    pub run_in_bg: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct JobIdParams {
    /// ID returned by a background run_shell_command
    #[schemars(description = "Job ID returned by run_shell_command with run_in_bg")]
    pub job_id: String,
}

// ============================================================================
// File Tool Parameters
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FileEditParams {
    /// Path to the file to edit
    #[schemars(description = "Path to the file to edit")]
    pub file_path: String,

    /// Exact text to replace
    #[schemars(description = "Exact text to replace; must occur exactly once unless replace_all is set")]
    pub old_string: String,

    /// Replacement text
    #[schemars(description = "Text to replace old_string with")]
    pub new_string: String,

    /// Replace every occurrence
    #[schemars(description = "Replace every occurrence of old_string (default: false)")]
    pub replace_all: Option<bool>,
}

impl FileEditParams {
    pub fn operation(&self) -> EditOperation {
        EditOperation {
            old_string: self.old_string.clone(),
            new_string: self.new_string.clone(),
            replace_all: self.replace_all.unwrap_or(false),
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EditParams {
    #[schemars(description = "Exact text to replace")]
    pub old_string: String,

    #[schemars(description = "Text to replace old_string with")]
    pub new_string: String,

    #[schemars(description = "Replace every occurrence of old_string (default: false)")]
    pub replace_all: Option<bool>,
}

impl From<EditParams> for EditOperation {
    fn from(params: EditParams) -> Self {
        EditOperation {
            old_string: params.old_string,
            new_string: params.new_string,
            replace_all: params.replace_all.unwrap_or(false),
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FileMultiEditParams {
    /// Path to the file to edit
    #[schemars(description = "Path to the file to edit")]
    pub file_path: String,

    /// Edits applied in order
    #[schemars(description = "Edits applied in order, each to the result of the previous one. Nothing is written unless all succeed")]
    pub edits: Vec<EditParams>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FileReadParams {
    /// Path to the file to read
    #[schemars(description = "Path to the file to read")]
    pub file_path: String,

    /// First line to return
    #[schemars(description = "0-based line to start reading from (default: 0)")]
    pub offset: Option<i64>,

    /// Maximum number of lines
    #[schemars(description = "Maximum number of lines to return (default: to end of file)")]
    pub limit: Option<i64>,
}
