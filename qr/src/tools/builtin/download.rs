//! download_file tool - save a remote file into the workdir

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolResult, required_str};

/// Download a URL into the tool workdir
pub struct DownloadFileTool;

#[async_trait]
impl Tool for DownloadFileTool {
    fn name(&self) -> &'static str {
        "download_file"
    }

    fn description(&self) -> &'static str {
        "Download a file (CSV, PDF, image, audio, ...) from a URL into the working directory and return its saved path."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "URL of the file"
                },
                "filename": {
                    "type": "string",
                    "description": "Name to save the file under, relative to the working directory"
                }
            },
            "required": ["url", "filename"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "DownloadFileTool::execute: called");
        let url = match required_str(&input, "url") {
            Ok(u) => u,
            Err(e) => return e,
        };
        let filename = match required_str(&input, "filename") {
            Ok(f) => f,
            Err(e) => return e,
        };

        if let Err(e) = ctx.ensure_workdir().await {
            return e.into();
        }
        let path = match ctx.validate_path(Path::new(filename)) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };

        let response = match ctx.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => return ToolResult::error(format!("Failed to download {}: {}", url, e)),
        };
        if !response.status().is_success() {
            return ToolResult::error(format!("HTTP error: {}", response.status()));
        }
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return ToolResult::error(format!("Failed to read response: {}", e)),
        };

        if let Some(parent) = path.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return ToolResult::error(format!("Failed to create directory: {}", e));
        }

        match tokio::fs::write(&path, &bytes).await {
            Ok(()) => {
                debug!(path = %path.display(), size = %bytes.len(), "DownloadFileTool::execute: saved");
                ToolResult::success(format!("Saved {} bytes to {}", bytes.len(), path.display()))
            }
            Err(e) => ToolResult::error(format!("Failed to write {}: {}", path.display(), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context_in;
    use axum::{Router, routing::get};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_downloads_into_workdir() {
        let app = Router::new().route("/data.csv", get(|| async { "a,b\n1,2\n" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let temp = tempdir().unwrap();
        let ctx = context_in(temp.path());
        let result = DownloadFileTool
            .execute(
                serde_json::json!({"url": format!("http://{}/data.csv", addr), "filename": "data.csv"}),
                &ctx,
            )
            .await;

        assert!(!result.is_error, "{}", result.content);
        let saved = std::fs::read_to_string(temp.path().join("data.csv")).unwrap();
        assert_eq!(saved, "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_refuses_paths_outside_workdir() {
        let temp = tempdir().unwrap();
        let ctx = context_in(temp.path());
        let result = DownloadFileTool
            .execute(
                serde_json::json!({"url": "http://127.0.0.1:9/x", "filename": "../escape.csv"}),
                &ctx,
            )
            .await;
        assert!(result.is_error);
        assert!(result.content.contains("escapes working directory"));
    }

    #[tokio::test]
    async fn test_requires_filename() {
        let temp = tempdir().unwrap();
        let result = DownloadFileTool
            .execute(serde_json::json!({"url": "http://127.0.0.1:9/x"}), &context_in(temp.path()))
            .await;
        assert!(result.is_error);
        assert_eq!(result.content, "filename is required");
    }
}
