//! ocr_image_tool - extract text from an image in the workdir

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::command::{run, split_command};
use crate::tools::{Tool, ToolContext, ToolResult, required_str};

/// Run the configured OCR command on an image
///
/// The command is invoked as `<ocr-command> <image> stdout`, the
/// calling convention of tesseract.
pub struct OcrImageTool;

#[async_trait]
impl Tool for OcrImageTool {
    fn name(&self) -> &'static str {
        "ocr_image_tool"
    }

    fn description(&self) -> &'static str {
        "Extract text from an image file in the working directory using OCR."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "image_path": {
                    "type": "string",
                    "description": "Path of the image, relative to the working directory"
                }
            },
            "required": ["image_path"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "OcrImageTool::execute: called");
        let image = match required_str(&input, "image_path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        let path = match ctx.validate_path(Path::new(image)) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };
        if !path.is_file() {
            return ToolResult::error(format!("Image not found: {}", image));
        }

        let Some((program, mut args)) = split_command(&ctx.settings.ocr_command) else {
            return ToolResult::error("No OCR command configured");
        };
        args.push(path.display().to_string());
        args.push("stdout".to_string());

        match run(&program, &args, &ctx.workdir, ctx.command_timeout()).await {
            Ok(out) => out.into_result(),
            Err(e) => e.into(),
        }
    }
}
