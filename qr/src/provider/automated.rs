//! Automated provider: the engine reasons and calls tools on its own

use async_trait::async_trait;
use tracing::debug;

use super::{AnswerProvider, ProviderError};
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient};
use crate::prompts::PromptContext;

#[derive(Debug, Default, Clone, Copy)]
pub struct AutomatedProvider;

#[async_trait]
impl AnswerProvider for AutomatedProvider {
    fn name(&self) -> &'static str {
        "automated"
    }

    async fn produce(
        &self,
        llm: &dyn LlmClient,
        request: CompletionRequest,
        prompt: &PromptContext,
    ) -> Result<CompletionResponse, ProviderError> {
        debug!(current_url = %prompt.current_url, messages = %request.messages.len(), "AutomatedProvider::produce: called");
        Ok(llm.complete(request).await?)
    }
}
