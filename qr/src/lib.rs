//! quizrunner - follow a chain of quiz URLs, answering each one
//!
//! A run starts at one quiz URL. An answer provider (an LLM agent with tools,
//! or a human operator) produces an answer, the answer is submitted to a fixed
//! endpoint, and any next-quiz URL in the response becomes the new current
//! item. The run ends when the engine emits the termination token.
//!
//! # Modules
//!
//! - [`controller`] - the progression state machine and run loop
//! - [`provider`] - automated and manual answer providers
//! - [`session`] - current item, credentials and first-seen timestamps
//! - [`extract`] - next-quiz URL extraction
//! - [`submit`] - submission client
//! - [`tools`] - tools the engine may call
//! - [`llm`] - engine client trait, OpenAI-compatible client, rate limiting
//! - [`server`] - manual-assist HTTP surface
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod controller;
pub mod extract;
pub mod llm;
pub mod prompts;
pub mod provider;
pub mod server;
pub mod session;
pub mod submit;
pub mod tools;
