//! quizrunner - chained quiz solver
//!
//! CLI entry point: run the controller, serve the manual-assist API, or
//! check text for quiz URLs.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::{debug, error, info};
use tracing_subscriber::prelude::*;

use quizrunner::cli::{Cli, Command, generate_after_help, get_log_path};
use quizrunner::config::Config;
use quizrunner::controller::Controller;
use quizrunner::extract::UrlExtractor;
use quizrunner::llm::create_client;
use quizrunner::prompts::PromptLoader;
use quizrunner::provider::{AnswerProvider, AnswerSlot, AutomatedProvider, ManualProvider};
use quizrunner::server::{self, AppState};
use quizrunner::session::{Credentials, SessionState};
use quizrunner::submit::SubmissionClient;
use quizrunner::tools::ToolContext;

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, to_file: bool) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));

    let file_layer = if to_file {
        let log_path = get_log_path();
        if let Some(dir) = log_path.parent() {
            fs::create_dir_all(dir).context("Failed to create log directory")?;
        }
        let log_file = fs::File::create(&log_path).context("Failed to create log file")?;
        Some(tracing_subscriber::fmt::layer().with_writer(log_file).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref(), cli.log_file)
        .context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "quizrunner loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            url,
            email,
            secret,
            manual,
            max_steps,
        } => cmd_run(&config, &url, email, secret, manual, max_steps).await,
        Command::Serve { bind } => cmd_serve(&config, bind).await,
        Command::Check { text } => cmd_check(&config, &text),
    }
}

/// Credentials from flags, falling back to the configured env vars
fn resolve_credentials(config: &Config, email: Option<String>, secret: Option<String>) -> Result<Credentials> {
    let email = email
        .or_else(|| std::env::var(&config.quiz.email_env).ok())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| eyre!("No email: pass --email or set {}", config.quiz.email_env))?;
    let secret = secret
        .or_else(|| std::env::var(&config.quiz.secret_env).ok())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| eyre!("No secret: pass --secret or set {}", config.quiz.secret_env))?;
    Ok(Credentials::new(email, secret))
}

async fn cmd_run(
    config: &Config,
    url: &str,
    email: Option<String>,
    secret: Option<String>,
    manual: bool,
    max_steps: Option<u32>,
) -> Result<()> {
    let credentials = resolve_credentials(config, email, secret)?;
    config.validate()?;

    let llm = create_client(&config.llm, &config.rate_limit)?;
    let session = SessionState::new().shared();
    let submitter = SubmissionClient::new(&config.quiz.submit_url, config.quiz.submit_timeout())?;
    let tool_ctx = ToolContext::new(config.tools.clone(), session.clone(), submitter.clone());
    let extractor = UrlExtractor::new(&config.quiz.quiz_host, config.quiz.lowercase_before_match)?;
    let prompts = Arc::new(PromptLoader::new(Some(PathBuf::from(".quizrunner/prompts"))));

    let provider: Arc<dyn AnswerProvider> = if manual || config.manual.is_enabled() {
        let slot = AnswerSlot::new();
        let state = AppState::new(session.clone(), slot.clone(), submitter.clone());
        let bind = config.server.bind.clone();
        println!(
            "{} POST operator answers to http://{}/manual-answer",
            "Manual mode:".yellow().bold(),
            bind
        );
        tokio::spawn(async move {
            if let Err(e) = server::serve(&bind, state).await {
                error!(error = %e, "HTTP server stopped");
            }
        });
        Arc::new(ManualProvider::new(slot, prompts.clone(), &config.manual))
    } else {
        Arc::new(AutomatedProvider)
    };

    let mut settings = config.controller.clone();
    if let Some(steps) = max_steps {
        settings.step_ceiling = steps;
    }

    let controller = Controller::new(llm, provider, tool_ctx, extractor, settings)
        .with_prompts(prompts)
        .with_max_tokens(config.llm.max_tokens);

    match controller.run(url, credentials).await {
        Ok(outcome) => {
            println!(
                "{} {} quiz item(s) in {}s ({} steps)",
                "Done:".green().bold(),
                outcome.items.len(),
                outcome.elapsed.as_secs(),
                outcome.steps
            );
            for item in &outcome.items {
                println!("  {}", item.cyan());
            }
            Ok(())
        }
        Err(e) => {
            let current = controller.session().read().await.current_url().map(str::to_string);
            eprintln!("{} {}", "Run failed:".red().bold(), e);
            if let Some(url) = current {
                eprintln!("  last quiz: {}", url);
            }
            Err(e.into())
        }
    }
}

async fn cmd_serve(config: &Config, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let submitter = SubmissionClient::new(&config.quiz.submit_url, config.quiz.submit_timeout())?;
    let state = AppState::new(SessionState::new().shared(), AnswerSlot::new(), submitter);
    println!("{} http://{}", "Serving on".green().bold(), bind);
    server::serve(&bind, state).await
}

fn cmd_check(config: &Config, text: &str) -> Result<()> {
    let extractor = UrlExtractor::new(&config.quiz.quiz_host, config.quiz.lowercase_before_match)?;
    match extractor.extract(text) {
        Some(url) => {
            println!("{}", url);
            Ok(())
        }
        None => Err(eyre!("No quiz URL found")),
    }
}
