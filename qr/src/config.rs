//! quizrunner configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Engine call rate limiting
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,

    /// Remote quiz endpoints and credentials lookup
    pub quiz: QuizConfig,

    /// Progression controller limits
    pub controller: ControllerConfig,

    /// Operator-assisted answering
    pub manual: ManualConfig,

    /// HTTP surface
    pub server: ServerConfig,

    /// Tool settings
    pub tools: ToolsConfig,

    /// Default log level (overridden by --log-level)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before an automated run
    ///
    /// Checks that the rate limit can refill and that the LLM API key
    /// environment variable is set, so a run fails fast with a clear message
    /// instead of stalling or failing on the first engine call.
    pub fn validate(&self) -> Result<()> {
        let rpm = self.rate_limit.requests_per_minute;
        if !rpm.is_finite() || rpm <= 0.0 {
            return Err(eyre::eyre!(
                "rate-limit.requests-per-minute must be a positive number, got {}",
                rpm
            ));
        }
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .quizrunner.yml
        let local_config = PathBuf::from(".quizrunner.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/quizrunner/quizrunner.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("quizrunner").join("quizrunner.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("openai" or "gemini", both use the OpenAI wire format)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL, up to but not including `/chat/completions`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).map_err(|_| eyre::eyre!("Environment variable {} not set", self.api_key_env))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            max_tokens: 8192,
            timeout_ms: 300_000,
        }
    }
}

/// Engine call rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Average admitted requests per minute
    #[serde(rename = "requests-per-minute")]
    pub requests_per_minute: f64,

    /// Bucket capacity
    pub burst: u32,

    /// How often a waiting caller re-checks the bucket
    #[serde(rename = "check-interval-ms")]
    pub check_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 4.0,
            burst: 4,
            check_interval_ms: 1000,
        }
    }
}

/// Remote quiz endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    /// Answer submission endpoint
    #[serde(rename = "submit-url")]
    pub submit_url: String,

    /// Host whose `/quiz-<n>` URLs are followed
    #[serde(rename = "quiz-host")]
    pub quiz_host: String,

    /// Environment variable holding the participant email
    #[serde(rename = "email-env")]
    pub email_env: String,

    /// Environment variable holding the participant secret
    #[serde(rename = "secret-env")]
    pub secret_env: String,

    /// Submission request timeout in milliseconds
    #[serde(rename = "submit-timeout-ms")]
    pub submit_timeout_ms: u64,

    /// Lowercase tool output before scanning for the next quiz URL
    #[serde(rename = "lowercase-before-match")]
    pub lowercase_before_match: bool,
}

impl QuizConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            submit_url: "https://tds-llm-analysis.s-anand.net/submit".to_string(),
            quiz_host: "tds-llm-analysis.s-anand.net".to_string(),
            email_env: "EMAIL".to_string(),
            secret_env: "SECRET".to_string(),
            submit_timeout_ms: 30_000,
            lowercase_before_match: false,
        }
    }
}

/// Progression controller limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Seconds a quiz item may be worked before a forced sentinel submission
    #[serde(rename = "time-budget-secs")]
    pub time_budget_secs: u64,

    /// Hard ceiling on controller steps for one run
    #[serde(rename = "step-ceiling")]
    pub step_ceiling: u32,

    /// Token budget the conversation is trimmed to before every turn
    #[serde(rename = "context-max-tokens")]
    pub context_max_tokens: usize,

    /// Case-insensitive token that ends the run when present in a text turn
    #[serde(rename = "termination-token")]
    pub termination_token: String,

    /// Answer submitted when the time budget is exceeded
    #[serde(rename = "timeout-answer")]
    pub timeout_answer: String,

    /// Consecutive malformed turns tolerated (unset: bounded only by the step ceiling)
    #[serde(rename = "max-malformed-retries")]
    pub max_malformed_retries: Option<u32>,
}

impl ControllerConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            time_budget_secs: 180,
            step_ceiling: 5000,
            context_max_tokens: 60_000,
            termination_token: "END".to_string(),
            timeout_answer: "TIMEOUT".to_string(),
            max_malformed_retries: None,
        }
    }
}

/// Operator-assisted answering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualConfig {
    /// Use the manual answer provider
    pub enabled: bool,

    /// How long to wait for an operator answer
    #[serde(rename = "wait-secs")]
    pub wait_secs: u64,

    /// Upper bound between checks of the answer slot
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Answer submitted when no operator answer arrives in time
    #[serde(rename = "timeout-answer")]
    pub timeout_answer: String,
}

impl ManualConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Enabled in config or through `MANUAL_MODE=true`
    pub fn is_enabled(&self) -> bool {
        self.enabled
            || std::env::var("MANUAL_MODE")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
    }
}

impl Default for ManualConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            wait_secs: 180,
            poll_interval_ms: 1000,
            timeout_answer: "MANUAL_TIMEOUT".to_string(),
        }
    }
}

/// HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:7860".to_string(),
        }
    }
}

/// Tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Directory downloads and generated code are written to
    pub workdir: PathBuf,

    /// Timeout for installer, interpreter and external commands
    #[serde(rename = "command-timeout-ms")]
    pub command_timeout_ms: u64,

    /// Interpreter used by run_code
    pub python: String,

    /// Command prefix used by add_dependencies
    pub installer: String,

    /// OCR command, invoked as `<cmd> <image> stdout`
    #[serde(rename = "ocr-command")]
    pub ocr_command: String,

    /// Transcription command, invoked as `<cmd> <audio>`
    #[serde(rename = "transcribe-command")]
    pub transcribe_command: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("llm-files"),
            command_timeout_ms: 120_000,
            python: "python3".to_string(),
            installer: "uv pip install".to_string(),
            ocr_command: "tesseract".to_string(),
            transcribe_command: "whisper".to_string(),
        }
    }
}
