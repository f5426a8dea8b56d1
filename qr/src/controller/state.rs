//! Progression state machine
//!
//! `transition` is pure: it maps (state, event) to the next state plus the
//! effects the engine must carry out. The engine performs each effect and
//! feeds the resulting event back in.

use std::fmt;

use serde::Serialize;

use super::ControllerError;
use crate::llm::{CompletionResponse, StopReason};

/// Where the controller is in the progression of one quiz item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerState {
    Working,
    AwaitingToolResult,
    HandlingMalformed,
    ExtractingUrl,
    Done,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Working => "WORKING",
            Self::AwaitingToolResult => "AWAITING_TOOL_RESULT",
            Self::HandlingMalformed => "HANDLING_MALFORMED",
            Self::ExtractingUrl => "EXTRACTING_URL",
            Self::Done => "DONE",
        };
        write!(f, "{}", name)
    }
}

/// What the controller needs to know about one engine turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSummary {
    pub malformed: bool,
    pub tool_calls: usize,
    pub terminates: bool,
}

impl TurnSummary {
    /// Summarize a response; `termination_token` is matched case-insensitively
    /// anywhere in the text
    pub fn from_response(response: &CompletionResponse, termination_token: &str) -> Self {
        let terminates = !termination_token.is_empty()
            && response
                .content
                .as_deref()
                .is_some_and(|text| text.to_uppercase().contains(&termination_token.to_uppercase()));
        Self {
            malformed: response.stop_reason == StopReason::MalformedCall,
            tool_calls: response.tool_calls.len(),
            terminates,
        }
    }
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The provider (or a forced submission) produced a turn
    Turn(TurnSummary),
    /// The corrective instruction was appended
    CorrectionInjected,
    /// Every requested tool ran and its result was recorded
    ToolsDispatched,
    /// The latest tool result was scanned for a next-quiz URL
    UrlScanned(Option<String>),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Turn(_) => write!(f, "turn"),
            Self::CorrectionInjected => write!(f, "correction-injected"),
            Self::ToolsDispatched => write!(f, "tools-dispatched"),
            Self::UrlScanned(_) => write!(f, "url-scanned"),
        }
    }
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    InjectCorrection,
    DispatchTools,
    ScanLastToolResult,
    /// Make the URL the current item and tell the engine about it
    AdvanceTo(String),
    Stop,
}

/// Next state plus effects, in order
pub type Transition = (ControllerState, Vec<Effect>);

/// The routing table
///
/// From `Working`, a turn is checked in priority order: malformed, then tool
/// calls, then the termination token. Anything else keeps working.
pub fn transition(state: ControllerState, event: Event) -> Result<Transition, ControllerError> {
    use ControllerState::*;

    match (state, event) {
        (Working, Event::Turn(turn)) => Ok(if turn.malformed {
            (HandlingMalformed, vec![Effect::InjectCorrection])
        } else if turn.tool_calls > 0 {
            (AwaitingToolResult, vec![Effect::DispatchTools])
        } else if turn.terminates {
            (Done, vec![Effect::Stop])
        } else {
            (Working, vec![])
        }),
        (HandlingMalformed, Event::CorrectionInjected) => Ok((Working, vec![])),
        (AwaitingToolResult, Event::ToolsDispatched) => Ok((ExtractingUrl, vec![Effect::ScanLastToolResult])),
        (ExtractingUrl, Event::UrlScanned(Some(url))) => Ok((Working, vec![Effect::AdvanceTo(url)])),
        (ExtractingUrl, Event::UrlScanned(None)) => Ok((Working, vec![])),
        (state, event) => Err(ControllerError::InvalidTransition { state, event }),
    }
}
