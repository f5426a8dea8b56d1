//! get_rendered_html tool - fetch a page for the engine to read

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::command::truncate;
use crate::tools::{Tool, ToolContext, ToolResult, required_str};

/// Largest body accepted from a page
const MAX_BODY_BYTES: usize = 2_000_000;

/// Characters handed back to the engine
const MAX_OUTPUT_CHARS: usize = 50_000;

/// Fetch a URL and return its HTML, or Markdown on request
///
/// Pages are fetched with a plain GET; scripts are not executed.
pub struct RenderPageTool;

#[async_trait]
impl Tool for RenderPageTool {
    fn name(&self) -> &'static str {
        "get_rendered_html"
    }

    fn description(&self) -> &'static str {
        "Fetch a web page and return its HTML content. Set markdown=true to get a Markdown rendering instead. \
         Use this first on every quiz URL to read the question."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "URL of the page to fetch"
                },
                "markdown": {
                    "type": "boolean",
                    "description": "Convert HTML to Markdown (default: false)"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "RenderPageTool::execute: called");
        let url = match required_str(&input, "url") {
            Ok(u) => u,
            Err(e) => return e,
        };

        if !url.starts_with("http://") && !url.starts_with("https://") {
            debug!("RenderPageTool::execute: invalid URL scheme");
            return ToolResult::error("URL must start with http:// or https://");
        }

        let markdown = input["markdown"].as_bool().unwrap_or(false);

        let response = match ctx.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => return ToolResult::error(format!("Failed to fetch URL: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "RenderPageTool::execute: HTTP error status");
            return ToolResult::error(format!("HTTP error: {}", status));
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return ToolResult::error(format!("Failed to read response: {}", e)),
        };

        if body.len() > MAX_BODY_BYTES {
            return ToolResult::error(format!("Response too large ({} bytes)", body.len()));
        }

        let content = if markdown {
            debug!("RenderPageTool::execute: converting HTML to markdown");
            html2md::rewrite_html(&body, false)
        } else {
            body
        };

        ToolResult::success(truncate(content, MAX_OUTPUT_CHARS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context_in;
    use axum::{Router, routing::get};
    use tempfile::tempdir;

    async fn serve_page() -> String {
        let app = Router::new()
            .route(
                "/quiz-1",
                get(|| async { axum::response::Html("<h1>Question</h1><p>What is 2+2?</p>") }),
            )
            .route("/missing", get(|| async { axum::http::StatusCode::NOT_FOUND }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_missing_url() {
        let temp = tempdir().unwrap();
        let result = RenderPageTool
            .execute(serde_json::json!({}), &context_in(temp.path()))
            .await;
        assert!(result.is_error);
        assert!(result.content.contains("url is required"));
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let temp = tempdir().unwrap();
        let result = RenderPageTool
            .execute(serde_json::json!({"url": "file:///etc/passwd"}), &context_in(temp.path()))
            .await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn test_returns_html_and_markdown() {
        let temp = tempdir().unwrap();
        let ctx = context_in(temp.path());
        let base = serve_page().await;

        let html = RenderPageTool
            .execute(serde_json::json!({"url": format!("{}/quiz-1", base)}), &ctx)
            .await;
        assert!(!html.is_error);
        assert!(html.content.contains("<h1>Question</h1>"));

        let md = RenderPageTool
            .execute(serde_json::json!({"url": format!("{}/quiz-1", base), "markdown": true}), &ctx)
            .await;
        assert!(!md.is_error);
        assert!(md.content.contains("Question"));
        assert!(!md.content.contains("<h1>"));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let temp = tempdir().unwrap();
        let base = serve_page().await;
        let result = RenderPageTool
            .execute(serde_json::json!({"url": format!("{}/missing", base)}), &context_in(temp.path()))
            .await;
        assert!(result.is_error);
        assert!(result.content.contains("404"));
    }
}
