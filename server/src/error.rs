//! Error types for the shell tools server

use serde::Serialize;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the shell tools server
#[derive(Debug, Error)]
pub enum Error {
    // General errors (1000-1999)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),

    // FileSystem errors (3000-3999)
    #[error("File not found: {0}. Recheck the path.")]
    FileNotFound(String),

    // Edit errors (3100-3199)
    #[error("No match: {0}")]
    NoMatch(String),

    #[error("Ambiguous match: {detail} (found {count} occurrences; widen old_string or set replace_all)")]
    AmbiguousMatch { count: usize, detail: String },

    // Process errors (4000-4099)
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Command timed out after {0}s")]
    Timeout(u64),

    #[error("Failed to launch command: {0}")]
    LaunchError(String),
}

impl Error {
    /// Get the error code
    pub fn code(&self) -> u32 {
        match self {
            // General errors (1000-1999)
            Error::InvalidArgument(_) => 1002,
            Error::Internal(_) => 1003,

            // FileSystem errors (3000-3999)
            Error::FileNotFound(_) => 3001,
            Error::NoMatch(_) => 3101,
            Error::AmbiguousMatch { .. } => 3102,

            // Process errors (4000-4099)
            Error::JobNotFound(_) => 4001,
            Error::Timeout(_) => 4002,
            Error::LaunchError(_) => 4003,
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Internal(_) => "internal_error",
            Error::FileNotFound(_) => "file_not_found",
            Error::NoMatch(_) => "no_match",
            Error::AmbiguousMatch { .. } => "ambiguous_match",
            Error::JobNotFound(_) => "job_not_found",
            Error::Timeout(_) => "timeout",
            Error::LaunchError(_) => "launch_error",
        }
    }

    /// Build the structured failure body relayed to tool callers
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            kind: self.kind(),
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Structured failure relayed to tool callers
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub kind: &'static str,
    pub code: u32,
    pub message: String,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
