//! LLM client module
//!
//! Provides the engine abstraction, the OpenAI-compatible client and the
//! rate limiter shared by every engine call.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod openai;
mod rate_limit;
mod types;

pub use client::{LlmClient, mock};
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use rate_limit::{RateLimitedClient, RateLimiter};
pub use types::{
    CompletionRequest, CompletionResponse, ContentBlock, Message, MessageContent, Role, StopReason, TokenUsage,
    ToolCall, ToolDefinition,
};

use crate::config::{LlmConfig, RateLimitConfig};

/// Create an LLM client based on the provider specified in config
///
/// The returned client is already wrapped in the configured rate limiter.
pub fn create_client(config: &LlmConfig, rate_limit: &RateLimitConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    let inner: Arc<dyn LlmClient> = match config.provider.as_str() {
        "openai" | "gemini" => Arc::new(OpenAIClient::from_config(config)?),
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            return Err(LlmError::Config(format!(
                "Unknown LLM provider: '{}'. Supported: openai, gemini",
                other
            )));
        }
    };

    let limiter = Arc::new(RateLimiter::new(rate_limit));
    Ok(Arc::new(RateLimitedClient::new(inner, limiter)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_rejected() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        let err = create_client(&config, &RateLimitConfig::default()).err().unwrap();
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
