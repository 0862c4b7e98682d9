//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while orchestrating external media tools.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{program} exited with status {}", describe_exit(.exit_code))]
    ExternalToolFailure {
        program: String,
        args: Vec<String>,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Could not parse probe output {output:?}: {reason}")]
    ProbeParseError { output: String, reason: String },

    #[error("{0} not found")]
    ToolNotFound(String),

    #[error("{program} timed out after {secs} seconds")]
    Timeout { program: String, secs: u64 },

    #[error("Expected artifact missing or empty: {0}")]
    MissingArtifact(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string())
}

impl MediaError {
    /// Create a probe parse error.
    pub fn probe_parse(output: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProbeParseError {
            output: output.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Whether this error came from an external process exiting non-zero.
    pub fn is_tool_failure(&self) -> bool {
        matches!(self, Self::ExternalToolFailure { .. })
    }
}
