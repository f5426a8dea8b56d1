//! ToolContext - execution context for tools

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::config::ToolsConfig;
use crate::session::SharedSession;
use crate::submit::SubmissionClient;

use super::ToolError;

/// Execution context shared by every tool call of one run
///
/// File operations are confined to `workdir`; submissions go through
/// `submitter` using whatever the session says is current.
#[derive(Clone)]
pub struct ToolContext {
    /// Directory downloads and generated code live in
    pub workdir: PathBuf,

    /// Shared HTTP client for fetch-style tools
    pub http: reqwest::Client,

    /// Session of the run this context belongs to
    pub session: SharedSession,

    /// Client for the submit endpoint
    pub submitter: SubmissionClient,

    /// Tool settings (interpreter, installer, external commands)
    pub settings: ToolsConfig,

    /// Whether paths are confined to the workdir (default: true)
    pub sandbox_enabled: bool,
}

impl ToolContext {
    /// Create a new tool context
    pub fn new(settings: ToolsConfig, session: SharedSession, submitter: SubmissionClient) -> Self {
        debug!(workdir = ?settings.workdir, "ToolContext::new: called");
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("quizrunner/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            workdir: settings.workdir.clone(),
            http,
            session,
            submitter,
            settings,
            sandbox_enabled: true,
        }
    }

    /// Timeout applied to installer, interpreter and external commands
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.command_timeout_ms)
    }

    /// Create the workdir if it does not exist yet
    pub async fn ensure_workdir(&self) -> Result<(), ToolError> {
        tokio::fs::create_dir_all(&self.workdir).await?;
        Ok(())
    }

    /// Normalize a path relative to the workdir
    fn normalize_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }

    /// Validate path is within the workdir (sandbox enforcement)
    pub fn validate_path(&self, path: &Path) -> Result<PathBuf, ToolError> {
        debug!(?path, "ToolContext::validate_path: called");
        let normalized = self.normalize_path(path);

        if !self.sandbox_enabled {
            return Ok(normalized);
        }

        // Existing paths are canonicalized to resolve symlinks; new files are
        // checked through their parent directory
        let canonical = if normalized.exists() {
            normalized.canonicalize().unwrap_or_else(|_| normalized.clone())
        } else {
            match normalized.parent() {
                Some(parent) if parent.exists() => {
                    let canonical_parent = parent.canonicalize().unwrap_or_else(|_| parent.to_path_buf());
                    canonical_parent.join(normalized.file_name().unwrap_or_default())
                }
                _ => normalized.clone(),
            }
        };

        let workdir_canonical = self.workdir.canonicalize().unwrap_or_else(|_| self.workdir.clone());

        if canonical.starts_with(&workdir_canonical) {
            Ok(canonical)
        } else {
            debug!("ToolContext::validate_path: sandbox violation detected");
            Err(ToolError::SandboxViolation {
                path: path.to_path_buf(),
                workdir: self.workdir.clone(),
            })
        }
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("workdir", &self.workdir)
            .field("sandbox_enabled", &self.sandbox_enabled)
            .finish()
    }
}
