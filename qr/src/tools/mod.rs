//! Tool system for the answer engine
//!
//! Each run gets a `ToolContext` holding the shared session and submit
//! client. File-producing tools are confined to the context's workdir.

mod context;
mod error;
mod executor;
mod traits;

pub mod builtin;

#[cfg(test)]
pub(crate) use context::test_support;
pub use context::ToolContext;
pub use error::ToolError;
pub use executor::ToolExecutor;
pub use traits::{Tool, ToolResult};
pub(crate) use traits::required_str;
