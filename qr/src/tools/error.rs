//! Tool error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur inside tool helpers
///
/// Tools report failures to the engine as error results; these values are
/// rendered into the result text.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Path {path} escapes working directory {workdir}")]
    SandboxViolation { path: PathBuf, workdir: PathBuf },

    #[error("Command timed out after {timeout_ms}ms")]
    CommandTimeout { timeout_ms: u64 },

    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_violation_message() {
        let err = ToolError::SandboxViolation {
            path: PathBuf::from("/etc/passwd"),
            workdir: PathBuf::from("/tmp/llm-files"),
        };

        let msg = err.to_string();
        assert!(msg.contains("/etc/passwd"));
        assert!(msg.contains("/tmp/llm-files"));
    }

    #[test]
    fn test_timeout_message() {
        let msg = ToolError::CommandTimeout { timeout_ms: 1500 }.to_string();
        assert!(msg.contains("1500ms"));
    }
}
