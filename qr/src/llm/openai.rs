//! OpenAI-compatible chat-completions client
//!
//! Works against any endpoint speaking the OpenAI wire format, including
//! Gemini's compatibility layer (the default). Tool calls whose argument
//! string is not valid JSON are surfaced as `StopReason::MalformedCall`
//! instead of being silently replaced with an empty object.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, LlmError, Message, MessageContent, Role,
    StopReason, TokenUsage, ToolCall,
};
use crate::config::LlmConfig;

/// Attempts per request for transient failures (rate limits excluded)
const MAX_ATTEMPTS: u32 = 4;

const BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Delay used when a 429 carries no usable `retry-after`
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl OpenAIClient {
    /// Build a client from configuration, reading the key from the named env var
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(provider = %config.provider, model = %config.model, "OpenAIClient::from_config: called");
        let api_key = config.api_key().map_err(|e| LlmError::Config(e.to_string()))?;
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let mut messages = vec![json!({"role": "system", "content": request.system_prompt})];
        messages.extend(wire_messages(&request.messages));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": request.max_tokens.min(self.max_tokens),
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(|t| t.to_openai_schema()).collect();
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }
        body
    }

    /// One HTTP round trip, with the status mapped onto `LlmError`
    async fn send_once(&self, url: &str, body: &Value) -> Result<CompletionResponse, LlmError> {
        let response = self.http.post(url).bearer_auth(&self.api_key).json(body).send().await?;
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            return Err(LlmError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let decoded: WireResponse = serde_json::from_slice(&bytes)?;
        Ok(decode_response(decoded))
    }
}

/// Translate the stored conversation into wire messages
///
/// The wire format wants one `tool` message per result, so a stored message
/// holding several results fans out.
fn wire_messages(messages: &[Message]) -> Vec<Value> {
    let mut out = Vec::with_capacity(messages.len());

    for msg in messages {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };

        let blocks = match &msg.content {
            MessageContent::Text(text) => {
                out.push(json!({"role": role, "content": text}));
                continue;
            }
            MessageContent::Blocks(blocks) => blocks,
        };

        let mut text = String::new();
        let mut calls = Vec::new();
        let mut results = Vec::new();
        for block in blocks {
            match block {
                ContentBlock::Text { text: t } => text.push_str(t),
                ContentBlock::ToolUse { id, name, input } => calls.push(json!({
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": input.to_string()},
                })),
                ContentBlock::ToolResult {
                    tool_use_id, content, ..
                } => results.push(json!({"role": "tool", "tool_call_id": tool_use_id, "content": content})),
            }
        }

        if !results.is_empty() {
            out.extend(results);
        } else if !calls.is_empty() {
            let mut wire = json!({"role": "assistant", "tool_calls": calls});
            if !text.is_empty() {
                wire["content"] = json!(text);
            }
            out.push(wire);
        } else {
            out.push(json!({"role": role, "content": text}));
        }
    }

    out
}

/// First choice of a wire response as a `CompletionResponse`
fn decode_response(response: WireResponse) -> CompletionResponse {
    let usage = response
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    let Some(choice) = response.choices.into_iter().next() else {
        debug!("decode_response: no choices");
        return CompletionResponse {
            content: None,
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage,
        };
    };

    let mut stop_reason = choice
        .finish_reason
        .as_deref()
        .map(StopReason::from_finish_reason)
        .unwrap_or(StopReason::EndTurn);

    let mut tool_calls = Vec::new();
    for call in choice.message.tool_calls.unwrap_or_default() {
        let raw = call.function.arguments.trim();
        let parsed = if raw.is_empty() {
            Ok(json!({}))
        } else {
            serde_json::from_str::<Value>(raw)
        };
        match parsed {
            Ok(input) => tool_calls.push(ToolCall::new(call.id, call.function.name, input)),
            Err(e) => {
                warn!(tool = %call.function.name, error = %e, "Tool call arguments are not valid JSON");
                stop_reason = StopReason::MalformedCall;
            }
        }
    }

    // A half-parsed batch is never dispatched
    if stop_reason == StopReason::MalformedCall {
        tool_calls.clear();
    }

    CompletionResponse {
        content: choice.message.content,
        tool_calls,
        stop_reason,
        usage,
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %self.model, message_count = %request.messages.len(), "OpenAIClient::complete: called");
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let mut attempt = 1;
        loop {
            match self.send_once(&url, &body).await {
                Ok(response) => return Ok(response),
                // Rate limits go back to the caller, which owns the longer wait
                Err(e) if e.is_rate_limit() => return Err(e),
                Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                    let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
                    warn!(attempt, backoff_ms = %backoff.as_millis(), error = %e, "Engine call failed, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolDefinition;

    fn client(max_tokens: u32) -> OpenAIClient {
        OpenAIClient {
            model: "gemini-2.5-flash".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://example.invalid/v1".to_string(),
            http: Client::new(),
            max_tokens,
        }
    }

    fn parse(json: Value) -> CompletionResponse {
        decode_response(serde_json::from_value(json).unwrap())
    }

    #[test]
    fn test_build_request_body_basic() {
        let request = CompletionRequest {
            system_prompt: "You are helpful".to_string(),
            messages: vec![Message::user("Hello")],
            tools: vec![],
            max_tokens: 1000,
        };

        let body = client(8192).build_request_body(&request);

        assert_eq!(body["model"], "gemini-2.5-flash");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are helpful");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_max_tokens_capped() {
        let request = CompletionRequest {
            system_prompt: "Test".to_string(),
            messages: vec![],
            tools: vec![ToolDefinition::new("x", "y", json!({"type": "object"}))],
            max_tokens: 5000,
        };

        let body = client(1000).build_request_body(&request);
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn test_tool_results_become_tool_messages() {
        let messages = vec![
            Message::assistant_blocks(vec![ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "post_request".to_string(),
                input: json!({"url": "u"}),
            }]),
            Message::user_blocks(vec![ContentBlock::tool_result("call_1", "{\"correct\":true}", false)]),
        ];

        let converted = wire_messages(&messages);
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0]["tool_calls"][0]["function"]["name"], "post_request");
        assert_eq!(converted[1]["role"], "tool");
        assert_eq!(converted[1]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_parse_tool_call_response() {
        let response = parse(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "run_code", "arguments": "{\"code\": \"print(1)\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }));

        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].input["code"], "print(1)");
        assert_eq!(response.usage.input_tokens, 10);
    }

    #[test]
    fn test_parse_invalid_arguments_is_malformed() {
        let response = parse(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "run_code", "arguments": "{\"code\": \"print(\"unterminated"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }));

        assert_eq!(response.stop_reason, StopReason::MalformedCall);
        assert!(response.tool_calls.is_empty());
    }

    #[test]
    fn test_parse_malformed_finish_reason() {
        let response = parse(json!({
            "choices": [{
                "message": {"content": ""},
                "finish_reason": "MALFORMED_FUNCTION_CALL"
            }]
        }));
        assert_eq!(response.stop_reason, StopReason::MalformedCall);
    }

    #[test]
    fn test_parse_empty_choices() {
        let response = parse(json!({"choices": []}));
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert!(response.content.is_none());
    }
}
