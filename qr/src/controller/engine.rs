//! Controller - drives one quiz session from the starting URL to the end

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::budget::TimeBudget;
use super::state::{ControllerState, Effect, Event, TurnSummary, transition};
use super::trim::trim_with_reminder;
use super::ControllerError;
use crate::config::ControllerConfig;
use crate::extract::UrlExtractor;
use crate::llm::{CompletionRequest, CompletionResponse, ContentBlock, LlmClient, Message, ToolCall};
use crate::prompts::{PromptContext, PromptLoader};
use crate::provider::{AnswerProvider, ProviderError};
use crate::session::{Credentials, SharedSession};
use crate::submit::snippet;
use crate::tools::{ToolContext, ToolExecutor, ToolResult};

/// Extra attempts for a turn that failed with a retryable engine error
const MAX_TURN_RETRIES: u32 = 3;

/// Longest pause between turn retries
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub steps: u32,
    /// URLs in the order they became current
    pub items: Vec<String>,
    /// Text of the turn that carried the termination token
    pub final_message: Option<String>,
    pub elapsed: Duration,
}

/// Mutable bookkeeping for one run
struct Run {
    id: String,
    started_at: Instant,
    steps: u32,
    malformed_streak: u32,
    messages: Vec<Message>,
    pending_calls: Vec<ToolCall>,
    last_tool_output: Option<String>,
    last_text: Option<String>,
    items: Vec<String>,
}

/// How the next turn is produced
enum TurnKind {
    /// Time budget spent: submit the sentinel, bypassing the provider
    Forced(CompletionRequest),
    Normal(CompletionRequest),
}

/// Progression controller
pub struct Controller {
    llm: Arc<dyn LlmClient>,
    provider: Arc<dyn AnswerProvider>,
    tools: ToolExecutor,
    tool_ctx: ToolContext,
    extractor: UrlExtractor,
    prompts: Arc<PromptLoader>,
    budget: TimeBudget,
    settings: ControllerConfig,
    max_tokens: u32,
}

impl Controller {
    /// Controller with the standard tool set and embedded prompts
    pub fn new(
        llm: Arc<dyn LlmClient>,
        provider: Arc<dyn AnswerProvider>,
        tool_ctx: ToolContext,
        extractor: UrlExtractor,
        settings: ControllerConfig,
    ) -> Self {
        debug!(provider = %provider.name(), ?settings, "Controller::new: called");
        Self {
            llm,
            provider,
            tools: ToolExecutor::standard(),
            tool_ctx,
            extractor,
            prompts: Arc::new(PromptLoader::embedded_only()),
            budget: TimeBudget::new(settings.time_budget()),
            settings,
            max_tokens: 8192,
        }
    }

    pub fn with_tools(mut self, tools: ToolExecutor) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_prompts(mut self, prompts: Arc<PromptLoader>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn session(&self) -> &SharedSession {
        &self.tool_ctx.session
    }

    /// Solve quizzes starting at `url` until the engine says it is done
    pub async fn run(&self, url: &str, credentials: Credentials) -> Result<RunOutcome, ControllerError> {
        if credentials.email.is_empty() || credentials.secret.is_empty() {
            return Err(ControllerError::NoCredentials);
        }

        let mut run = Run {
            id: Uuid::now_v7().to_string(),
            started_at: Instant::now(),
            steps: 0,
            malformed_streak: 0,
            messages: Vec::new(),
            pending_calls: Vec::new(),
            last_tool_output: None,
            last_text: None,
            items: vec![url.to_string()],
        };
        info!(run_id = %run.id, %url, provider = %self.provider.name(), "Starting run");

        self.session().write().await.start(credentials, url, run.started_at);
        if let Err(e) = self.tool_ctx.ensure_workdir().await {
            warn!(run_id = %run.id, error = %e, "Could not create tool workdir");
        }

        let prompt = self.prompt_context().await;
        run.messages.push(Message::user(self.render("start", &prompt)?));

        let mut state = ControllerState::Working;
        let mut event = self.take_turn(&mut run).await?;

        loop {
            self.tick(&mut run).await?;
            let (next, effects) = transition(state, event)?;
            debug!(run_id = %run.id, from = %state, to = %next, ?effects, "Controller::run: transition");
            state = next;

            let mut follow_up = None;
            for effect in effects {
                match effect {
                    Effect::InjectCorrection => {
                        self.inject_correction(&mut run).await?;
                        follow_up = Some(Event::CorrectionInjected);
                    }
                    Effect::DispatchTools => {
                        self.dispatch_tools(&mut run).await;
                        follow_up = Some(Event::ToolsDispatched);
                    }
                    Effect::ScanLastToolResult => {
                        let found = run.last_tool_output.as_deref().and_then(|text| self.extractor.extract(text));
                        debug!(run_id = %run.id, ?found, "Controller::run: scanned tool output");
                        follow_up = Some(Event::UrlScanned(found));
                    }
                    Effect::AdvanceTo(next_url) => self.advance(&mut run, next_url).await?,
                    Effect::Stop => {
                        let outcome = RunOutcome {
                            run_id: run.id.clone(),
                            steps: run.steps,
                            items: run.items.clone(),
                            final_message: run.last_text.clone(),
                            elapsed: run.started_at.elapsed(),
                        };
                        info!(
                            run_id = %outcome.run_id,
                            steps = %outcome.steps,
                            items = %outcome.items.len(),
                            elapsed_secs = %outcome.elapsed.as_secs(),
                            "Run complete"
                        );
                        return Ok(outcome);
                    }
                }
            }

            // Without a follow-up the machine is back in WORKING; a turn in
            // any other state is rejected by `transition`
            event = match follow_up {
                Some(event) => event,
                None => self.take_turn(&mut run).await?,
            };
        }
    }

    /// Count a step against the ceiling
    async fn tick(&self, run: &mut Run) -> Result<(), ControllerError> {
        run.steps += 1;
        if run.steps > self.settings.step_ceiling {
            let current_url = self.current_url().await;
            warn!(run_id = %run.id, steps = %run.steps, %current_url, "Step ceiling exceeded, aborting run");
            return Err(ControllerError::StepCeilingExceeded {
                steps: self.settings.step_ceiling,
                current_url,
            });
        }
        Ok(())
    }

    async fn current_url(&self) -> String {
        self.session().read().await.current_url().unwrap_or_default().to_string()
    }

    async fn prompt_context(&self) -> PromptContext {
        let session = self.session().read().await;
        let (email, secret) = session
            .credentials()
            .map(|c| (c.email.clone(), c.secret.clone()))
            .unwrap_or_default();
        PromptContext {
            submit_url: self.tool_ctx.submitter.submit_url().to_string(),
            email,
            secret,
            current_url: session.current_url().unwrap_or_default().to_string(),
            answer: String::new(),
            termination_token: self.settings.termination_token.clone(),
        }
    }

    fn render(&self, template: &str, prompt: &PromptContext) -> Result<String, ControllerError> {
        self.prompts
            .render(template, prompt)
            .map_err(|e| ControllerError::Prompt(e.to_string()))
    }

    fn request(&self, system_prompt: &str, messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest {
            system_prompt: system_prompt.to_string(),
            messages,
            tools: self.tools.definitions(),
            max_tokens: self.max_tokens,
        }
    }

    /// One WORKING turn: enforce the time budget, trim, then ask for the next turn
    async fn take_turn(&self, run: &mut Run) -> Result<Event, ControllerError> {
        let prompt = self.prompt_context().await;
        let system_prompt = self.render("system", &prompt)?;
        let elapsed = self.session().read().await.elapsed_on_current(Instant::now());

        let kind = if self.budget.is_exhausted(elapsed) {
            warn!(
                run_id = %run.id,
                current_url = %prompt.current_url,
                elapsed_secs = %elapsed.unwrap_or_default().as_secs(),
                answer = %self.settings.timeout_answer,
                "Time budget exceeded, forcing sentinel submission"
            );
            let instruction = self.render("timeout", &prompt.with_answer(self.settings.timeout_answer.clone()))?;
            TurnKind::Forced(self.request(&system_prompt, run.messages.clone()).with_instruction(instruction))
        } else {
            let reminder = self.render("trim-reminder", &prompt)?;
            let trimmed = trim_with_reminder(&run.messages, self.settings.context_max_tokens, || reminder);
            debug!(run_id = %run.id, kept = %trimmed.len(), total = %run.messages.len(), "Controller::take_turn: context trimmed");
            TurnKind::Normal(self.request(&system_prompt, trimmed))
        };

        let response = self.complete_turn(run, &kind, &prompt).await?;
        let summary = TurnSummary::from_response(&response, &self.settings.termination_token);
        debug!(run_id = %run.id, ?summary, "Controller::take_turn: turn summarized");
        self.record_turn(run, response, &summary, &prompt, elapsed)?;
        Ok(Event::Turn(summary))
    }

    /// Produce a turn, retrying retryable engine errors
    async fn complete_turn(
        &self,
        run: &mut Run,
        kind: &TurnKind,
        prompt: &PromptContext,
    ) -> Result<CompletionResponse, ControllerError> {
        let mut attempt = 0;
        loop {
            let result = match kind {
                TurnKind::Forced(request) => self.llm.complete(request.clone()).await.map_err(ProviderError::from),
                TurnKind::Normal(request) => self.provider.produce(self.llm.as_ref(), request.clone(), prompt).await,
            };

            match result {
                Ok(response) => return Ok(response),
                Err(ProviderError::Prompt(msg)) => return Err(ControllerError::Prompt(msg)),
                Err(ProviderError::Llm(e)) if e.is_retryable() && attempt < MAX_TURN_RETRIES => {
                    attempt += 1;
                    self.tick(run).await?;
                    let delay = e
                        .retry_after()
                        .unwrap_or(Duration::from_secs(2u64.pow(attempt)))
                        .min(MAX_RETRY_DELAY);
                    warn!(
                        run_id = %run.id,
                        current_url = %prompt.current_url,
                        %attempt,
                        delay_secs = %delay.as_secs(),
                        error = %e,
                        "Engine call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(ProviderError::Llm(e)) => {
                    warn!(run_id = %run.id, current_url = %prompt.current_url, error = %e, "Engine call failed");
                    return Err(ControllerError::Llm(e));
                }
            }
        }
    }

    /// Append the turn to the conversation and remember what the next effects need
    fn record_turn(
        &self,
        run: &mut Run,
        response: CompletionResponse,
        summary: &TurnSummary,
        prompt: &PromptContext,
        elapsed: Option<Duration>,
    ) -> Result<(), ControllerError> {
        let text = response.content.filter(|t| !t.trim().is_empty());

        if summary.malformed {
            run.malformed_streak += 1;
            warn!(
                run_id = %run.id,
                current_url = %prompt.current_url,
                elapsed_secs = %elapsed.unwrap_or_default().as_secs(),
                streak = %run.malformed_streak,
                response = %snippet(text.as_deref().unwrap_or_default(), 300),
                "Malformed tool call from engine"
            );
            if let Some(max) = self.settings.max_malformed_retries
                && run.malformed_streak > max
            {
                return Err(ControllerError::MalformedRetriesExhausted {
                    attempts: run.malformed_streak,
                    current_url: prompt.current_url.clone(),
                });
            }
            if let Some(text) = text {
                run.messages.push(Message::assistant(text));
            }
            run.pending_calls.clear();
            return Ok(());
        }
        run.malformed_streak = 0;

        let mut blocks = Vec::new();
        if let Some(text) = &text {
            blocks.push(ContentBlock::text(text));
        }
        for call in &response.tool_calls {
            blocks.push(ContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.input.clone(),
            });
        }
        if !blocks.is_empty() {
            run.messages.push(Message::assistant_blocks(blocks));
        }

        if let Some(text) = &text {
            info!(run_id = %run.id, current_url = %prompt.current_url, text = %snippet(text, 200), "Engine replied");
        }
        run.last_text = text;
        run.pending_calls = response.tool_calls;
        Ok(())
    }

    async fn inject_correction(&self, run: &mut Run) -> Result<(), ControllerError> {
        let correction = self.render("correction", &self.prompt_context().await)?;
        run.messages.push(Message::user(correction));
        Ok(())
    }

    async fn dispatch_tools(&self, run: &mut Run) {
        let calls = std::mem::take(&mut run.pending_calls);
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        info!(run_id = %run.id, tools = ?names, "Dispatching tool calls");

        let results: Vec<(String, ToolResult)> = self.tools.execute_all(&calls, &self.tool_ctx).await;
        run.last_tool_output = results.last().map(|(_, r)| r.content.clone());

        let blocks = results
            .iter()
            .map(|(id, result)| ContentBlock::tool_result(id, &result.content, result.is_error))
            .collect();
        run.messages.push(Message::user_blocks(blocks));
    }

    async fn advance(&self, run: &mut Run, next_url: String) -> Result<(), ControllerError> {
        let now = Instant::now();
        let previous = {
            let mut session = self.session().write().await;
            let previous = session.current_url().map(str::to_string);
            let spent = session.elapsed_on_current(now);
            session.advance_to(next_url.clone(), now);
            info!(
                run_id = %run.id,
                from = ?previous,
                to = %next_url,
                spent_secs = %spent.unwrap_or_default().as_secs(),
                "Advancing to next quiz"
            );
            previous
        };
        if previous.as_deref() != Some(next_url.as_str()) {
            run.items.push(next_url);
        }

        let notice = self.render("next-url", &self.prompt_context().await)?;
        run.messages.push(Message::user(notice));
        Ok(())
    }
}
