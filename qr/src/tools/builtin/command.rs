//! Shared helper for tools that shell out to external programs

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::tools::{ToolError, ToolResult};

/// Maximum characters of command output handed back to the engine
const MAX_OUTPUT_CHARS: usize = 30_000;

/// Captured output of a finished command
#[derive(Debug)]
pub(crate) struct CommandOutput {
    pub exit_code: i32,
    pub success: bool,
    pub text: String,
}

impl CommandOutput {
    /// Convert into a tool result (non-zero exit is an error result)
    pub fn into_result(self) -> ToolResult {
        if self.success {
            ToolResult::success(self.text)
        } else {
            ToolResult::error(format!("Exit code: {}\n{}", self.exit_code, self.text))
        }
    }
}

/// Run `program args...` in `cwd` with a timeout
pub(crate) async fn run(program: &str, args: &[String], cwd: &Path, timeout: Duration) -> Result<CommandOutput, ToolError> {
    debug!(%program, ?args, ?cwd, "command::run: called");
    let output = match tokio::time::timeout(
        timeout,
        tokio::process::Command::new(program)
            .args(args)
            .current_dir(cwd)
            .kill_on_drop(true)
            .output(),
    )
    .await
    {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(ToolError::Spawn {
                program: program.to_string(),
                source,
            });
        }
        Err(_) => {
            return Err(ToolError::CommandTimeout {
                timeout_ms: timeout.as_millis() as u64,
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    let combined = if stdout.is_empty() && !stderr.is_empty() {
        stderr.to_string()
    } else if stderr.is_empty() {
        stdout.to_string()
    } else {
        format!("{}\n\nSTDERR:\n{}", stdout, stderr)
    };

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        success: output.status.success(),
        text: truncate(combined, MAX_OUTPUT_CHARS),
    })
}

/// Split a configured command line ("uv pip install") into program and args
pub(crate) fn split_command(command: &str) -> Option<(String, Vec<String>)> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Truncate long output, noting the original length
pub(crate) fn truncate(text: String, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text;
    }
    let mut cut = max_chars;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...\n[truncated, {} chars total]", &text[..cut], text.len())
}
