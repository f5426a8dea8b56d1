//! Answer providers
//!
//! A provider turns the (trimmed) conversation into the next engine turn.
//! The automated provider lets the engine reason freely; the manual provider
//! waits for an operator answer and has the engine submit it verbatim.

mod automated;
mod manual;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
use crate::prompts::PromptContext;

pub use automated::AutomatedProvider;
pub use manual::{AnswerSlot, ManualProvider};

/// Errors a provider can raise for one turn
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Prompt rendering failed: {0}")]
    Prompt(String),
}

/// Produces the next turn for the current quiz item
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Produce one engine turn from the prepared request
    ///
    /// `prompt` describes the current item (URL, credentials, submit endpoint).
    async fn produce(
        &self,
        llm: &dyn LlmClient,
        request: CompletionRequest,
        prompt: &PromptContext,
    ) -> Result<CompletionResponse, ProviderError>;
}
