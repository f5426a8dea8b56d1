//! post_request tool - JSON POST, with answer submission routed through the session

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::command::truncate;
use crate::submit::SubmissionPayload;
use crate::tools::{Tool, ToolContext, ToolResult, required_str};

const MAX_OUTPUT_CHARS: usize = 20_000;

/// POST a JSON payload to a URL
///
/// Posts to the configured submit endpoint never trust the model's `email`,
/// `secret` or `url` fields: the payload is rebuilt from the session, keeping
/// only the model's `answer`.
pub struct PostRequestTool;

impl PostRequestTool {
    fn is_submit_endpoint(url: &str, ctx: &ToolContext) -> bool {
        url.trim_end_matches('/') == ctx.submitter.submit_url().trim_end_matches('/')
    }

    async fn submit(&self, payload: &Value, ctx: &ToolContext) -> ToolResult {
        let answer = match &payload["answer"] {
            Value::Null => return ToolResult::error("payload.answer is required for submissions"),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        let submission = {
            let session = ctx.session.read().await;
            match SubmissionPayload::for_current(&session, answer) {
                Ok(p) => p,
                Err(e) => return ToolResult::error(e.to_string()),
            }
        };

        match ctx.submitter.submit(&submission).await {
            Ok(outcome) => {
                info!(
                    url = %submission.url,
                    correct = ?outcome.result.correct,
                    next = ?outcome.result.next_url(),
                    "Submission answered"
                );
                ToolResult::success(outcome.raw.to_string())
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

#[async_trait]
impl Tool for PostRequestTool {
    fn name(&self) -> &'static str {
        "post_request"
    }

    fn description(&self) -> &'static str {
        "Send an HTTP POST request with a JSON payload and return the response body. \
         Use this to submit answers: payload must contain email, secret, url and answer."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Endpoint to POST to"
                },
                "payload": {
                    "type": "object",
                    "description": "JSON body to send"
                },
                "headers": {
                    "type": "object",
                    "description": "Optional extra request headers",
                    "additionalProperties": {"type": "string"}
                }
            },
            "required": ["url", "payload"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "PostRequestTool::execute: called");
        let url = match required_str(&input, "url") {
            Ok(u) => u,
            Err(e) => return e,
        };
        let payload = &input["payload"];
        if payload.is_null() {
            return ToolResult::error("payload is required");
        }

        if Self::is_submit_endpoint(url, ctx) {
            debug!("PostRequestTool::execute: routing to submission client");
            return self.submit(payload, ctx).await;
        }

        let mut request = ctx.http.post(url).json(payload);
        if let Some(headers) = input["headers"].as_object() {
            for (name, value) in headers {
                if let Some(v) = value.as_str() {
                    request = request.header(name.as_str(), v);
                }
            }
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return ToolResult::error(format!("POST failed: {}", e)),
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return ToolResult::error(format!("Failed to read response: {}", e)),
        };

        if status.is_success() {
            ToolResult::success(truncate(body, MAX_OUTPUT_CHARS))
        } else {
            ToolResult::error(format!("HTTP {}: {}", status, truncate(body, MAX_OUTPUT_CHARS)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Credentials, SessionState};
    use crate::tools::test_support::context_with_session;
    use axum::{Json, Router, routing::post};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;
    use tokio::time::Instant;

    async fn serve_recorder() -> (String, Arc<Mutex<Vec<Value>>>) {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let app = Router::new()
            .route(
                "/submit",
                post(move |Json(body): Json<Value>| {
                    let captured = captured.clone();
                    async move {
                        captured.lock().unwrap().push(body);
                        Json(serde_json::json!({"correct": true, "url": "https://host/quiz-2"}))
                    }
                }),
            )
            .route("/echo", post(|Json(body): Json<Value>| async move { Json(body) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), seen)
    }

    #[tokio::test]
    async fn test_submission_uses_session_values() {
        let (base, seen) = serve_recorder().await;
        let submit_url = format!("{}/submit", base);

        let mut state = SessionState::new();
        state.start(Credentials::new("me@x.com", "s3cret"), "https://host/quiz-1", Instant::now());
        let temp = tempdir().unwrap();
        let ctx = context_with_session(temp.path(), state.shared(), &submit_url);

        let input = serde_json::json!({
            "url": submit_url,
            "payload": {"email": "wrong@x.com", "secret": "nope", "url": "https://host/quiz-99", "answer": 42}
        });
        let result = PostRequestTool.execute(input, &ctx).await;

        assert!(!result.is_error, "{}", result.content);
        assert!(result.content.contains("https://host/quiz-2"));

        let bodies = seen.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["email"], "me@x.com");
        assert_eq!(bodies[0]["secret"], "s3cret");
        assert_eq!(bodies[0]["url"], "https://host/quiz-1");
        assert_eq!(bodies[0]["answer"], "42");
    }

    #[tokio::test]
    async fn test_submission_without_session_is_error() {
        let (base, seen) = serve_recorder().await;
        let submit_url = format!("{}/submit", base);
        let temp = tempdir().unwrap();
        let ctx = context_with_session(temp.path(), SessionState::new().shared(), &submit_url);

        let input = serde_json::json!({"url": submit_url, "payload": {"answer": "x"}});
        let result = PostRequestTool.execute(input, &ctx).await;
        assert!(result.is_error);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generic_post_passes_payload_through() {
        let (base, _) = serve_recorder().await;
        let temp = tempdir().unwrap();
        let ctx = context_with_session(temp.path(), SessionState::new().shared(), &format!("{}/submit", base));

        let input = serde_json::json!({
            "url": format!("{}/echo", base),
            "payload": {"k": "v"},
            "headers": {"X-Test": "1"}
        });
        let result = PostRequestTool.execute(input, &ctx).await;
        assert!(!result.is_error);
        assert_eq!(result.content, r#"{"k":"v"}"#);
    }

    #[tokio::test]
    async fn test_requires_payload() {
        let temp = tempdir().unwrap();
        let ctx = context_with_session(temp.path(), SessionState::new().shared(), "http://127.0.0.1:9/submit");
        let result = PostRequestTool
            .execute(serde_json::json!({"url": "http://127.0.0.1:9/x"}), &ctx)
            .await;
        assert!(result.is_error);
        assert_eq!(result.content, "payload is required");
    }
}
