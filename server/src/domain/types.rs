//! Common domain types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Status reported for a command that hit its deadline
pub const TIMEOUT_STATUS_CODE: i32 = 124;

/// A shell command to launch
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub command: String,
    /// Working directory (None = server's current directory)
    pub cwd: Option<PathBuf>,
    /// Deadline in seconds (None = configured default)
    pub timeout_secs: Option<u64>,
    pub background: bool,
}

impl CommandRequest {
    pub fn foreground(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cwd: None,
            timeout_secs: None,
            background: false,
        }
    }

    pub fn background(command: impl Into<String>) -> Self {
        Self {
            background: true,
            ..Self::foreground(command)
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// Command result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Absent while running and when the deadline was hit
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    /// Present iff the command was launched in the background
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Set when either stream exceeded the capture cap
    pub truncated: bool,
}

impl CommandResult {
    /// Result handed back for a freshly backgrounded job
    pub fn launched(job_id: String) -> Self {
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
            job_id: Some(job_id),
            truncated: false,
        }
    }

    /// Shell-style status: the exit code, or 124 for a timed out command
    pub fn status_code(&self) -> Option<i32> {
        if self.timed_out {
            Some(TIMEOUT_STATUS_CODE)
        } else {
            self.exit_code
        }
    }
}

/// A single exact-match replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOperation {
    pub old_string: String,
    pub new_string: String,
    #[serde(default)]
    pub replace_all: bool,
}

impl EditOperation {
    #[cfg(test)]
    pub fn new(old_string: impl Into<String>, new_string: impl Into<String>) -> Self {
        Self {
            old_string: old_string.into(),
            new_string: new_string.into(),
            replace_all: false,
        }
    }

    #[cfg(test)]
    pub fn all(old_string: impl Into<String>, new_string: impl Into<String>) -> Self {
        Self {
            replace_all: true,
            ..Self::new(old_string, new_string)
        }
    }
}

/// What an applied edit did to a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditOutcome {
    pub path: String,
    pub edits_applied: usize,
    pub replacements: usize,
    pub bytes_before: usize,
    pub bytes_after: usize,
    /// Signed size delta (after - before)
    pub bytes_changed: i64,
}
