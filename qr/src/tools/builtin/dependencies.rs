//! add_dependencies tool - install Python packages for generated code

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::command::{run, split_command};
use crate::tools::{Tool, ToolContext, ToolResult};

/// Install packages with the configured installer command
pub struct AddDependenciesTool;

/// Package specs may only contain name/version characters
fn is_valid_package(spec: &str) -> bool {
    !spec.is_empty()
        && !spec.starts_with('-')
        && spec
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-=<>!~[],".contains(c))
}

#[async_trait]
impl Tool for AddDependenciesTool {
    fn name(&self) -> &'static str {
        "add_dependencies"
    }

    fn description(&self) -> &'static str {
        "Install Python packages needed by code you will run with run_code."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "dependencies": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Package names, optionally with version specifiers"
                }
            },
            "required": ["dependencies"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "AddDependenciesTool::execute: called");
        let packages: Vec<String> = match input["dependencies"].as_array() {
            Some(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
            None => return ToolResult::error("dependencies is required"),
        };
        if packages.is_empty() {
            return ToolResult::error("dependencies must not be empty");
        }
        if let Some(bad) = packages.iter().find(|p| !is_valid_package(p)) {
            return ToolResult::error(format!("Invalid package spec: {}", bad));
        }

        let Some((program, mut args)) = split_command(&ctx.settings.installer) else {
            return ToolResult::error("No installer command configured");
        };
        args.extend(packages.iter().cloned());

        if let Err(e) = ctx.ensure_workdir().await {
            return e.into();
        }

        match run(&program, &args, &ctx.workdir, ctx.command_timeout()).await {
            Ok(out) if out.success => ToolResult::success(format!("Installed: {}", packages.join(", "))),
            Ok(out) => out.into_result(),
            Err(e) => e.into(),
        }
    }
}
