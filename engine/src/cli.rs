//! CLI interface for lagent
//!
//! This module provides the command-line interface using clap's derive API.
//! Free text runs the agent; subcommands inspect tools, history and config.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lagent: a local agent over an Ollama model
///
/// Ask a question as free text, or start without one for an interactive
/// prompt (type `exit` or `quit` to leave). Use `lagent ask ...` when the
/// question starts with a subcommand name.
#[derive(Parser, Debug)]
#[command(name = "lagent")]
#[command(version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Session id to load and append to
    #[arg(long, global = true, value_name = "ID")]
    pub session: Option<String>,

    /// Override llm.model
    #[arg(long, global = true, value_name = "NAME")]
    pub model: Option<String>,

    /// Override llm.base_url
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Override agent.max_steps
    #[arg(long, global = true, value_name = "N")]
    pub max_steps: Option<usize>,

    /// Never route input through the trigger-phrase shortcut
    #[arg(long, global = true)]
    pub no_shortcut: bool,

    /// Clear the session's history before running
    #[arg(long, global = true)]
    pub new_session: bool,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// The request to answer
    #[arg(value_name = "INPUT", allow_negative_numbers = true)]
    pub input: Vec<String>,
}

impl Cli {
    /// Request words, from `ask` or the bare positional form, joined back together
    pub fn input_text(&self) -> Option<String> {
        let words = match &self.command {
            Some(Command::Ask { words }) => words,
            _ => &self.input,
        };
        let text = words.join(" ");
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer a request, even one starting with a subcommand name
    Ask {
        /// The request to answer
        #[arg(value_name = "INPUT", required = true, allow_negative_numbers = true)]
        words: Vec<String>,
    },

    /// List the registered tools and their arguments
    Tools,

    /// Inspect or clear stored conversations
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Run system diagnostics
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// History management actions
#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// Print the turns of a session (default: the current session)
    Show {
        /// Session id
        id: Option<String>,
    },

    /// Delete a session's history
    Clear {
        /// Session id
        id: Option<String>,
    },

    /// List stored sessions
    List,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,

    /// Show the effective configuration
    Show,
}
