//! Background job domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Background job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Process is still running
    Running,
    /// Process exited on its own (any exit code)
    Completed,
    /// Deadline hit, process group killed
    TimedOut,
    /// Supervisor lost track of the process (wait failed)
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::TimedOut => "timed_out",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Running)
    }
}

/// Point-in-time copy of a job, including captured output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: String,
    pub command: String,
    pub cwd: String,
    pub pid: Option<u32>,
    pub timeout_secs: u64,
    pub state: JobState,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub stdout: String,
    pub stderr: String,
    pub truncated: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Job listing entry without output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: String,
    pub command: String,
    pub state: JobState,
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// How a supervised process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited on its own; signal deaths are reported as 128 + signal
    Exited(i32),
    /// Deadline hit and the process group was killed
    TimedOut,
    /// Waiting on the process failed
    Failed(String),
}
