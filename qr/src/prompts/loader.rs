//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to embedded defaults.

use std::path::PathBuf;

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Values available to every template
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    pub submit_url: String,
    pub email: String,
    pub secret: String,
    pub current_url: String,
    /// Pre-determined answer (timeout and manual prompts)
    pub answer: String,
    pub termination_token: String,
}

impl PromptContext {
    pub fn with_answer(&self, answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            ..self.clone()
        }
    }
}

/// Loads and renders prompt templates
#[derive(Debug)]
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// Override directory (e.g. `.quizrunner/prompts/`)
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Loader that prefers `{dir}/{name}.pmt` when present
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        debug!(?override_dir, "PromptLoader::new: called");
        Self {
            hbs: Self::engine(),
            override_dir: override_dir.filter(|d| d.is_dir()),
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        Self {
            hbs: Self::engine(),
            override_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text; URLs and JSON must pass through untouched
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.set_strict_mode(true);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. Override: `{override_dir}/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, context: &PromptContext) -> Result<String> {
        debug!(%template_name, current_url = %context.current_url, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map(|s| s.trim().to_string())
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}
