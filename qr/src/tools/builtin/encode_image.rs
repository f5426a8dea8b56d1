//! encode_image_to_base64 tool - inline an image as a data URI

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolResult, required_str};

/// Largest image that will be encoded
const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

pub struct EncodeImageTool;

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Tool for EncodeImageTool {
    fn name(&self) -> &'static str {
        "encode_image_to_base64"
    }

    fn description(&self) -> &'static str {
        "Encode an image file from the working directory as a base64 data URI, e.g. to include it in a submitted answer."
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
        debug!(?input, "EncodeImageTool::execute: called");
        let image = match required_str(&input, "image_path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        let path = match ctx.validate_path(Path::new(image)) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.len() > MAX_IMAGE_BYTES => {
                return ToolResult::error(format!("Image too large ({} bytes)", meta.len()));
            }
            Ok(_) => {}
            Err(e) => return ToolResult::error(format!("Cannot read {}: {}", image, e)),
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => ToolResult::success(format!("data:{};base64,{}", mime_for(&path), STANDARD.encode(bytes))),
            Err(e) => ToolResult::error(format!("Cannot read {}: {}", image, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context_in;
    use tempfile::tempdir;

    #[test]
    fn test_mime_by_extension() {
        assert_eq!(mime_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_encodes_data_uri() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("chart.png"), b"abc").unwrap();
        let result = EncodeImageTool
            .execute(serde_json::json!({"image_path": "chart.png"}), &context_in(temp.path()))
            .await;
        assert!(!result.is_error, "{}", result.content);
        assert_eq!(result.content, "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp = tempdir().unwrap();
        let result = EncodeImageTool
            .execute(serde_json::json!({"image_path": "none.png"}), &context_in(temp.path()))
            .await;
        assert!(result.is_error);
    }
}
