//! run_code tool - execute generated Python in the workdir

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::command::run;
use crate::tools::{Tool, ToolContext, ToolResult, required_str};

/// Write code to a fresh file in the workdir and run it with the interpreter
pub struct RunCodeTool;

#[async_trait]
impl Tool for RunCodeTool {
    fn name(&self) -> &'static str {
        "run_code"
    }

    fn description(&self) -> &'static str {
        "Run Python code in the working directory and return stdout, stderr and the exit code. \
         Files saved by download_file are available by their relative names. Print the values you need."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Complete Python program to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!("RunCodeTool::execute: called");
        let code = match required_str(&input, "code") {
            Ok(c) => c,
            Err(e) => return e,
        };

        if let Err(e) = ctx.ensure_workdir().await {
            return e.into();
        }

        let filename = format!("runner-{}.py", Uuid::now_v7());
        let path = ctx.workdir.join(&filename);
        if let Err(e) = tokio::fs::write(&path, code).await {
            return ToolResult::error(format!("Failed to write {}: {}", path.display(), e));
        }
        debug!(%filename, "RunCodeTool::execute: script written");

        match run(&ctx.settings.python, &[filename], &ctx.workdir, ctx.command_timeout()).await {
            Ok(out) => out.into_result(),
            Err(e) => e.into(),
        }
    }
}
