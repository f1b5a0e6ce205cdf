//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Answer one request (positional input)
//! - interactive: Read requests from stdin until `exit`/`quit`
//! - tools: List the registry
//! - history show/clear/list: Inspect stored sessions
//! - doctor: Validate configuration and check the model endpoint
//! - config path/show: Locate and print the configuration
//!
//! Answers go to stdout; logs and error lines go to stderr.

use anyhow::Result;
use sdk::errors::{AgentErrorExt, EngineError};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::{AgentConfig, AgentCore, HistoryStore, RunOutcome, Session, Shortcut};
use crate::cli::Cli;
use crate::config::Config;
use crate::llm::ollama::{OllamaOptions, OllamaProvider};
use crate::llm::LLMProvider;
use crate::tools::ToolRegistry;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Apply command-line overrides on top of the loaded configuration
pub fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<(), EngineError> {
    if let Some(level) = &cli.log {
        config.core.log_level = level.clone();
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        config.llm.base_url = endpoint.trim_end_matches('/').to_string();
    }
    if let Some(max_steps) = cli.max_steps {
        config.agent.max_steps = max_steps;
    }
    if cli.no_shortcut {
        config.shortcut.enabled = false;
    }
    config.validate()
}

/// Session id from `--session`, falling back to the configured default
pub fn session_id(config: &Config, cli: &Cli) -> String {
    cli.session
        .clone()
        .unwrap_or_else(|| config.agent.default_session.clone())
}

pub fn history_store(config: &Config) -> HistoryStore {
    HistoryStore::new(config.history_dir(), config.history.format)
}

pub fn build_provider(config: &Config) -> OllamaProvider {
    OllamaProvider::with_options(
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        OllamaOptions {
            api: config.llm.api,
            stream: config.llm.stream,
            timeout: Duration::from_secs(config.llm.timeout_secs),
            temperature: config.llm.temperature,
        },
    )
}

/// Wire provider, registry, parser, shortcut and history store together
pub fn build_agent(config: &Config) -> Result<AgentCore> {
    let provider: Arc<dyn LLMProvider> = Arc::new(build_provider(config));
    let tools = Arc::new(ToolRegistry::from_config(&config.tools)?);
    let shortcut = Shortcut::from_config(&config.shortcut)?;

    tracing::debug!(
        "Agent: model={}, tools=[{}], parser={:?}, shortcut={}",
        provider.model(),
        tools.names().join(", "),
        config.agent.parser,
        shortcut.is_some()
    );

    Ok(AgentCore::new(provider, tools, AgentConfig::from(config))
        .with_parser(config.agent.parser.build())
        .with_shortcut(shortcut)
        .with_history_store(history_store(config)))
}

/// Load the session, or start it over when `fresh` is set
fn open_session(store: &HistoryStore, id: &str, fresh: bool) -> Result<Session> {
    if fresh && store.clear(id)? {
        tracing::info!("Cleared history for session '{}'", id);
    }
    Ok(store.load(id)?)
}

fn print_outcome(outcome: &RunOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", outcome.answer),
        OutputFormat::Json => {
            let output = json!({
                "status": "completed",
                "session": outcome.session_id,
                "answer": outcome.answer,
                "iterations": outcome.iterations(),
                "via_shortcut": outcome.via_shortcut,
                "duration_ms": outcome.duration_ms,
                "steps": outcome.steps,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Answer one request
pub async fn handle_run(
    input: String,
    config: &Config,
    session: &str,
    fresh: bool,
    format: OutputFormat,
) -> Result<()> {
    let agent = build_agent(config)?;
    let store = history_store(config);
    let mut session = open_session(&store, session, fresh)?;

    match agent.run(&mut session, &input).await {
        Ok(outcome) => print_outcome(&outcome, format),
        Err(e) => {
            if let OutputFormat::Json = format {
                let output = json!({
                    "status": "failed",
                    "kind": e.kind(),
                    "error": e.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            Err(e.into())
        }
    }
}

/// Read requests line by line until `exit`, `quit` or end of input
///
/// A failed request is reported on stderr and the loop keeps going.
pub async fn handle_interactive(
    config: &Config,
    session: &str,
    fresh: bool,
    format: OutputFormat,
) -> Result<()> {
    let agent = build_agent(config)?;
    let store = history_store(config);
    let mut session = open_session(&store, session, fresh)?;

    eprintln!(
        "lagent ({} via {}), session '{}'. Type 'exit' or 'quit' to leave.",
        config.llm.model, config.llm.base_url, session.id
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        std::io::stderr().flush().ok();

        let Some(line) = lines.next_line().await.map_err(EngineError::Io)? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        match agent.run(&mut session, input).await {
            Ok(outcome) => print_outcome(&outcome, format)?,
            Err(e) => eprintln!("{}", render_engine_error(&e)),
        }
    }
    Ok(())
}

/// List registered tools
pub fn handle_tools(config: &Config, format: OutputFormat) -> Result<()> {
    let registry = ToolRegistry::from_config(&config.tools)?;
    let descriptors = registry.descriptors();

    match format {
        OutputFormat::Text => {
            if descriptors.is_empty() {
                println!("No tools enabled");
                return Ok(());
            }
            for tool in &descriptors {
                println!("{}", tool.name);
                println!("  {}", tool.description);
                if !tool.parameters.is_empty() {
                    let params: Vec<String> = tool
                        .parameters
                        .iter()
                        .map(|p| format!("{}: {}", p.name, p.kind))
                        .collect();
                    println!("  Arguments: {}", params.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "tools": descriptors }))?);
        }
    }
    Ok(())
}

/// Print every turn of a session
pub fn handle_history_show(config: &Config, id: &str, format: OutputFormat) -> Result<()> {
    let session = history_store(config).load(id)?;

    match format {
        OutputFormat::Text => {
            if session.history.is_empty() {
                println!("No history for session '{}'", id);
                return Ok(());
            }
            for turn in session.turns() {
                println!(
                    "[{}] {}: {}",
                    turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    turn.role.label(),
                    turn.content
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
    }
    Ok(())
}

/// Delete a session's history
pub fn handle_history_clear(config: &Config, id: &str, format: OutputFormat) -> Result<()> {
    let removed = history_store(config).clear(id)?;

    match format {
        OutputFormat::Text => {
            if removed {
                println!("Cleared history for session '{}'", id);
            } else {
                println!("No history for session '{}'", id);
            }
        }
        OutputFormat::Json => {
            let output = json!({ "session": id, "cleared": removed });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// List stored sessions
pub fn handle_history_list(config: &Config, format: OutputFormat) -> Result<()> {
    let sessions = history_store(config).list()?;

    match format {
        OutputFormat::Text => {
            if sessions.is_empty() {
                println!("No sessions in {}", config.history_dir().display());
                return Ok(());
            }
            for s in &sessions {
                println!(
                    "{:<24} {:>4} turns  updated {}",
                    s.id,
                    s.turns,
                    s.updated_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        OutputFormat::Json => {
            let output = json!({ "sessions": sessions, "count": sessions.len() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Validate configuration and check dependencies
pub async fn handle_doctor(config: &Config, config_path: &Path, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    // Check 1: Configuration validation
    checks.push(("Configuration", format!("Valid ({})", config_path.display())));

    // Check 2: History directory
    let history_dir = config.history_dir();
    if history_dir.is_dir() {
        checks.push(("History directory", "Exists".to_string()));
    } else {
        checks.push(("History directory", "Missing".to_string()));
        issues.push(format!("History directory does not exist: {}", history_dir.display()));
    }

    // Check 3: Tool registry
    match ToolRegistry::from_config(&config.tools) {
        Ok(registry) => checks.push(("Tools", registry.names().join(", "))),
        Err(e) => {
            checks.push(("Tools", "Invalid".to_string()));
            issues.push(e.to_string());
        }
    }

    // Check 4: Command template programs on PATH
    issues.extend(missing_programs(config));

    // Check 5: Model endpoint
    let provider = build_provider(config);
    if provider.check_health().await {
        checks.push(("Ollama", format!("Reachable at {}", config.llm.base_url)));
    } else {
        checks.push(("Ollama", "Not reachable".to_string()));
        issues.push(format!(
            "Ollama is not reachable at {}. Start it with 'ollama serve'.",
            config.llm.base_url
        ));
    }
    checks.push(("Model", format!("{} ({} API)", config.llm.model, config.llm.api)));

    // Output results
    match format {
        OutputFormat::Text => {
            println!("lagent Diagnostics");
            println!("==================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<20} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Enabled command templates whose program `which` cannot resolve
fn missing_programs(config: &Config) -> Vec<String> {
    config
        .tools
        .commands
        .iter()
        .filter(|command| config.tools.enabled.contains(&command.name))
        .filter(|command| which::which(&command.program).is_err())
        .map(|command| {
            format!(
                "Program '{}' used by tool '{}' was not found on PATH",
                command.program, command.name
            )
        })
        .collect()
}

/// Print the configuration file path
pub fn handle_config_path(path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => println!("{}", json!({ "path": path })),
    }
    Ok(())
}

/// Print the effective configuration (after overrides)
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", config.to_toml()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}

/// `error[<Kind>]: <message>` plus a hint line
pub fn render_engine_error(e: &EngineError) -> String {
    format!("error[{}]: {}\n  hint: {}", e.kind(), e, e.user_hint())
}

/// Render any handler error, naming the engine kind when there is one
pub fn render_error(e: &anyhow::Error) -> String {
    match e.downcast_ref::<EngineError>() {
        Some(engine) => render_engine_error(engine),
        None => format!("error[Error]: {:#}", e),
    }
}
