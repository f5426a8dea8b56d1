//! Progression controller
//!
//! Drives a quiz session: asks the answer provider for turns, runs the
//! requested tools, follows next-quiz URLs found in tool output, forces a
//! sentinel submission when an item's time budget runs out, and stops when
//! the engine emits the termination token.

mod budget;
mod engine;
mod error;
mod state;
mod trim;

pub use budget::TimeBudget;
pub use engine::{Controller, RunOutcome};
pub use error::ControllerError;
pub use state::{ControllerState, Effect, Event, Transition, TurnSummary, transition};
pub use trim::{trim_messages, trim_with_reminder};
