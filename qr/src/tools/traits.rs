//! Tool trait definition

use async_trait::async_trait;
use serde_json::Value;

use super::ToolError;
use super::context::ToolContext;

/// A capability the engine can invoke by name
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches the engine's function name)
    fn name(&self) -> &'static str;

    /// Human-readable description shown to the engine
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> Value;

    /// Execute the tool; failures are reported as error results, never panics
    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult;
}

/// Result of a tool execution, treated as opaque text by the controller
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        ToolResult::error(err.to_string())
    }
}

/// Required string argument, or an error result naming it
pub(crate) fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolResult> {
    input[key]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolResult::error(format!("{} is required", key)))
}
