//! Manual provider: an operator supplies the answer through a side channel

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{AnswerProvider, ProviderError};
use crate::config::ManualConfig;
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient};
use crate::prompts::{PromptContext, PromptLoader};

/// Single-value mailbox between the HTTP surface and the manual provider
///
/// A posted answer is consumed by the next wait; a later post replaces an
/// unconsumed one.
#[derive(Debug, Clone, Default)]
pub struct AnswerSlot {
    inner: Arc<SlotInner>,
}

#[derive(Debug, Default)]
struct SlotInner {
    answer: Mutex<Option<String>>,
    notify: Notify,
}

impl AnswerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposit an operator answer
    pub async fn post(&self, answer: impl Into<String>) {
        let answer = answer.into();
        debug!(%answer, "AnswerSlot::post: called");
        *self.inner.answer.lock().await = Some(answer);
        self.inner.notify.notify_one();
    }

    /// Take the pending answer, if any
    pub async fn take(&self) -> Option<String> {
        self.inner.answer.lock().await.take()
    }

    /// Wait up to `timeout` for an answer, checking every `poll_interval`
    ///
    /// A post wakes the waiter early; the interval bounds how long a missed
    /// wakeup can delay it.
    pub async fn wait(&self, timeout: Duration, poll_interval: Duration) -> Option<String> {
        debug!(?timeout, ?poll_interval, "AnswerSlot::wait: called");
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(answer) = self.take().await {
                return Some(answer);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let nap = poll_interval.min(deadline - now);
            let _ = tokio::time::timeout(nap, self.inner.notify.notified()).await;
        }
    }
}

/// Waits for an operator answer, then has the engine submit it
pub struct ManualProvider {
    slot: AnswerSlot,
    prompts: Arc<PromptLoader>,
    wait: Duration,
    poll_interval: Duration,
    timeout_answer: String,
    /// Answer of a turn whose engine call failed retryably, reused by the retry
    retained: Mutex<Option<String>>,
}

impl ManualProvider {
    pub fn new(slot: AnswerSlot, prompts: Arc<PromptLoader>, config: &ManualConfig) -> Self {
        Self {
            slot,
            prompts,
            wait: config.wait(),
            poll_interval: config.poll_interval(),
            timeout_answer: config.timeout_answer.clone(),
            retained: Mutex::new(None),
        }
    }

    /// The turn's answer: a retained one, else an operator answer, else the sentinel
    async fn resolve_answer(&self, prompt: &PromptContext) -> String {
        if let Some(answer) = self.retained.lock().await.take() {
            info!(%answer, "Reusing answer for retried turn");
            return answer;
        }

        info!(current_url = %prompt.current_url, wait_secs = %self.wait.as_secs(), "Waiting for operator answer");
        match self.slot.wait(self.wait, self.poll_interval).await {
            Some(answer) => {
                info!(%answer, "Using operator answer");
                answer
            }
            None => {
                warn!(answer = %self.timeout_answer, "No operator answer in time, substituting sentinel");
                self.timeout_answer.clone()
            }
        }
    }
}

#[async_trait]
impl AnswerProvider for ManualProvider {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn produce(
        &self,
        llm: &dyn LlmClient,
        request: CompletionRequest,
        prompt: &PromptContext,
    ) -> Result<CompletionResponse, ProviderError> {
        let answer = self.resolve_answer(prompt).await;

        let instruction = self
            .prompts
            .render("manual", &prompt.with_answer(answer.clone()))
            .map_err(|e| ProviderError::Prompt(e.to_string()))?;

        match llm.complete(request.with_instruction(instruction)).await {
            Ok(response) => Ok(response),
            Err(e) => {
                if e.is_retryable() {
                    debug!(%answer, "ManualProvider::produce: retaining answer for retry");
                    *self.retained.lock().await = Some(answer);
                }
                Err(e.into())
            }
        }
    }
}
