// lagent
// Main entry point for the lagent binary

use std::process::ExitCode;

use clap::Parser;
use lagent_engine::cli::{Cli, Command, ConfigAction, HistoryAction};
use lagent_engine::config::Config;
use lagent_engine::handlers::{
    apply_overrides, handle_config_path, handle_config_show, handle_doctor, handle_history_clear,
    handle_history_list, handle_history_show, handle_interactive, handle_run, handle_tools,
    render_error, session_id, OutputFormat,
};
use lagent_engine::telemetry::{init_telemetry, init_telemetry_with, LogFormat};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", render_error(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let loaded = Config::load_or_create_at(&config_path);

    // Logging starts once the level is known; a broken config still gets a subscriber
    match (&cli.log, &loaded) {
        (Some(level), Ok(config)) => init_telemetry_with(level, config.core.log_format),
        (Some(level), Err(_)) => init_telemetry_with(level, LogFormat::Auto),
        (None, Ok(config)) => init_telemetry_with(&config.core.log_level, config.core.log_format),
        (None, Err(_)) => init_telemetry(),
    }

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");
    tracing::info!("lagent v{} ({} - {})", version, commit, timestamp);

    let mut config = loaded?;
    apply_overrides(&mut config, &cli)?;
    let session = session_id(&config, &cli);
    let input = cli.input_text();

    // Handle commands
    match cli.command {
        None | Some(Command::Ask { .. }) => match input {
            Some(input) => {
                tracing::info!("Executing request in session '{}'", session);
                handle_run(input, &config, &session, cli.new_session, format).await
            }
            None => handle_interactive(&config, &session, cli.new_session, format).await,
        },

        Some(Command::Tools) => handle_tools(&config, format),

        Some(Command::History { action }) => match action {
            HistoryAction::Show { id } => {
                handle_history_show(&config, id.as_deref().unwrap_or(&session), format)
            }
            HistoryAction::Clear { id } => {
                handle_history_clear(&config, id.as_deref().unwrap_or(&session), format)
            }
            HistoryAction::List => handle_history_list(&config, format),
        },

        Some(Command::Doctor) => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, &config_path, format).await
        }

        Some(Command::Config { action }) => match action {
            ConfigAction::Path => handle_config_path(&config_path, format),
            ConfigAction::Show => handle_config_show(&config, format),
        },
    }
}
