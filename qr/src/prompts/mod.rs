//! Prompt Template System
//!
//! `.pmt` templates rendered with Handlebars. Loading chain:
//! 1. `<override dir>/{name}.pmt`
//! 2. Embedded fallback in code

pub mod embedded;
mod loader;

pub use loader::{PromptContext, PromptLoader};
