//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// quizrunner - follow a chain of quiz URLs, answering each one
#[derive(Parser)]
#[command(
    name = "qr",
    about = "Solve chained quizzes with an LLM agent or an operator",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Also write logs to the log file
    #[arg(long = "log-file", global = true)]
    pub log_file: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Solve quizzes starting at URL until no next URL remains
    Run {
        /// First quiz URL
        #[arg(value_name = "URL")]
        url: String,

        /// Account email (default: from the configured env var)
        #[arg(short, long)]
        email: Option<String>,

        /// Account secret (default: from the configured env var)
        #[arg(short, long)]
        secret: Option<String>,

        /// Wait for operator answers posted to /manual-answer
        #[arg(short, long)]
        manual: bool,

        /// Override the controller's step ceiling
        #[arg(long)]
        max_steps: Option<u32>,
    },

    /// Serve the manual-assist HTTP API only
    Serve {
        /// Address to bind (default from config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Print the first quiz URL found in TEXT
    Check {
        /// Text to scan
        text: String,
    },
}

/// Result of checking an external program the tools rely on
pub struct ToolCheck {
    pub name: String,
    pub available: bool,
    pub version: Option<String>,
}

impl ToolCheck {
    /// Check if a program is available and get its version
    pub fn check(name: &str, version_args: &[&str]) -> Self {
        debug!(name, ?version_args, "ToolCheck::check: called");
        let result = std::process::Command::new(name).args(version_args).output();
        match result {
            Ok(output) if output.status.success() => {
                let text = String::from_utf8_lossy(&output.stdout).to_string() + &String::from_utf8_lossy(&output.stderr);
                Self {
                    name: name.to_string(),
                    available: true,
                    version: Some(parse_version(&text)),
                }
            }
            _ => Self {
                name: name.to_string(),
                available: false,
                version: None,
            },
        }
    }
}

/// Parse version from command output (first version-like word)
fn parse_version(output: &str) -> String {
    for word in output.split_whitespace() {
        let word = word.trim_start_matches('v');
        if word.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            let version: String = word.chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
            if !version.is_empty() {
                return version;
            }
        }
    }
    "unknown".to_string()
}

/// Check the programs behind run_code, add_dependencies and ocr_image_tool
pub fn check_required_tools() -> Vec<ToolCheck> {
    vec![
        ToolCheck::check("python3", &["--version"]),
        ToolCheck::check("uv", &["--version"]),
        ToolCheck::check("tesseract", &["--version"]),
    ]
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quizrunner")
        .join("logs")
        .join("quizrunner.log")
}

/// Generate the after_help text with tool checks
pub fn generate_after_help() -> String {
    let mut help = String::new();

    help.push_str("External Tools:\n");
    for tool in check_required_tools() {
        let icon = if tool.available { "\u{2705}" } else { "\u{274C}" };
        let version = tool.version.as_deref().unwrap_or("not found");
        help.push_str(&format!("  {} {:<10} {}\n", icon, tool.name, version));
    }

    help.push('\n');
    help.push_str(&format!("With --log-file, logs are also written to: {}\n", get_log_path().display()));
    help
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "qr",
            "run",
            "https://host/quiz-1",
            "--email",
            "a@b.com",
            "--manual",
            "--max-steps",
            "50",
        ])
        .unwrap();
        match cli.command {
            Command::Run {
                url,
                email,
                secret,
                manual,
                max_steps,
            } => {
                assert_eq!(url, "https://host/quiz-1");
                assert_eq!(email.as_deref(), Some("a@b.com"));
                assert!(secret.is_none());
                assert!(manual);
                assert_eq!(max_steps, Some(50));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["qr", "serve", "--bind", "127.0.0.1:0", "-l", "debug"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Command::Serve { bind: Some(_) }));
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("Python 3.12.1"), "3.12.1");
        assert_eq!(parse_version("tesseract v5.3.0"), "5.3.0");
        assert_eq!(parse_version("no digits here"), "unknown");
    }
}
