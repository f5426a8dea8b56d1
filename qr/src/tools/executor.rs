//! ToolExecutor - dispatches tool calls by name

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::llm::{ToolCall, ToolDefinition};

use super::builtin::{
    AddDependenciesTool, DownloadFileTool, EncodeImageTool, OcrImageTool, PostRequestTool, RenderPageTool,
    RunCodeTool, TranscribeAudioTool,
};
use super::{Tool, ToolContext, ToolResult};

/// Registry of the tools the engine may call
pub struct ToolExecutor {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolExecutor {
    /// Executor with the fixed quiz-solving tool set
    pub fn standard() -> Self {
        debug!("ToolExecutor::standard: called");
        let mut executor = Self::empty();
        executor.add_tool(Box::new(RenderPageTool));
        executor.add_tool(Box::new(DownloadFileTool));
        executor.add_tool(Box::new(PostRequestTool));
        executor.add_tool(Box::new(AddDependenciesTool));
        executor.add_tool(Box::new(RunCodeTool));
        executor.add_tool(Box::new(OcrImageTool));
        executor.add_tool(Box::new(TranscribeAudioTool));
        executor.add_tool(Box::new(EncodeImageTool));
        executor
    }

    /// Create an empty executor (for testing)
    pub fn empty() -> Self {
        Self { tools: BTreeMap::new() }
    }

    /// Add a tool, replacing any tool with the same name
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        debug!(tool_name = %tool.name(), "ToolExecutor::add_tool: called");
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names in sorted order
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Tool definitions advertised to the engine
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition::new(t.name(), t.description(), t.input_schema()))
            .collect()
    }

    /// Execute a single tool call
    pub async fn execute(&self, tool_call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        debug!(tool_name = %tool_call.name, tool_id = %tool_call.id, "ToolExecutor::execute: called");
        match self.tools.get(&tool_call.name) {
            Some(tool) => {
                let result = tool.execute(tool_call.input.clone(), ctx).await;
                if result.is_error {
                    warn!(tool_name = %tool_call.name, error = %crate::submit::snippet(&result.content, 300), "Tool returned an error");
                }
                result
            }
            None => {
                debug!("ToolExecutor::execute: unknown tool");
                ToolResult::error(format!("Unknown tool: {}", tool_call.name))
            }
        }
    }

    /// Execute tool calls in order, pairing each result with its call id
    pub async fn execute_all(&self, tool_calls: &[ToolCall], ctx: &ToolContext) -> Vec<(String, ToolResult)> {
        debug!(count = %tool_calls.len(), "ToolExecutor::execute_all: called");
        let mut results = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            let result = self.execute(call, ctx).await;
            results.push((call.id.clone(), result));
        }
        results
    }
}
