//! transcribe_audio tool - speech to text for audio files in the workdir

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::command::{run, split_command};
use crate::tools::{Tool, ToolContext, ToolResult, required_str};

/// Run the configured transcription command as `<command> <file>`
pub struct TranscribeAudioTool;

#[async_trait]
impl Tool for TranscribeAudioTool {
    fn name(&self) -> &'static str {
        "transcribe_audio"
    }

    fn description(&self) -> &'static str {
        "Transcribe speech in an audio file (mp3, wav, opus, ...) from the working directory to text."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the audio file, relative to the working directory"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "TranscribeAudioTool::execute: called");
        let file = match required_str(&input, "file_path") {
            Ok(f) => f,
            Err(e) => return e,
        };
        let path = match ctx.validate_path(Path::new(file)) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };
        if !path.is_file() {
            return ToolResult::error(format!("Audio file not found: {}", file));
        }

        let Some((program, mut args)) = split_command(&ctx.settings.transcribe_command) else {
            return ToolResult::error("No transcription command configured");
        };
        args.push(path.display().to_string());

        match run(&program, &args, &ctx.workdir, ctx.command_timeout()).await {
            Ok(out) if out.success && out.text.trim().is_empty() => ToolResult::error("Transcription produced no text"),
            Ok(out) => out.into_result(),
            Err(e) => e.into(),
        }
    }
}
