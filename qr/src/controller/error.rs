//! Controller error types

use thiserror::Error;

use super::state::{ControllerState, Event};
use crate::llm::LlmError;

/// Faults that end a run
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Step ceiling of {steps} exceeded while working on {current_url}")]
    StepCeilingExceeded { steps: u32, current_url: String },

    #[error("Gave up after {attempts} consecutive malformed turns on {current_url}")]
    MalformedRetriesExhausted { attempts: u32, current_url: String },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("No credentials: set email and secret before starting a run")]
    NoCredentials,

    #[error("Invalid transition: {event} in state {state}")]
    InvalidTransition { state: ControllerState, event: Event },

    #[error("Prompt rendering failed: {0}")]
    Prompt(String),
}

impl ControllerError {
    /// Whether the fault came from the engine rather than the controller's own guards
    pub fn is_llm(&self) -> bool {
        matches!(self, Self::Llm(_))
    }
}
