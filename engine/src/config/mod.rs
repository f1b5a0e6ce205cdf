//! Configuration management
//!
//! This module handles loading, validation, and management of the lagent configuration.
//! Configuration is stored in TOML format at ~/.lagent/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: log level, data directory
//! - **llm**: Ollama endpoint, model, API style, streaming, timeout
//! - **agent**: step ceiling, response parser, default session
//! - **history**: session file directory and format
//! - **tools**: enabled tools, command templates, allowlist, facts table
//! - **shortcut**: trigger phrases routed straight to one tool
//!
//! Every section is optional in the file; missing keys take their defaults.
//!
//! # Path Expansion
//!
//! `~` is expanded to the user's home directory for `core.data_dir` and
//! `history.dir`. Both directories are created when missing.
//!
//! # Examples
//!
//! ```no_run
//! use lagent_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from default location
//! let config = Config::load_or_create()?;
//!
//! println!("Model: {}", config.llm.model);
//! println!("History: {:?}", config.history_dir());
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::history::{is_valid_session_id, HistoryFormat};
use crate::agent::interpreter::ParserKind;
use crate::llm::ApiStyle;
use crate::telemetry::LogFormat;

/// Names of the tools that are always compiled in
pub const BUILTIN_TOOLS: &[&str] = &["calculator", "web_search", "facts"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Model endpoint configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Conversation history store
    #[serde(default)]
    pub history: HistoryConfig,

    /// Tool registry
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Trigger-phrase shortcut
    #[serde(default)]
    pub shortcut: ShortcutConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log line rendering (auto, pretty, compact, json)
    #[serde(default)]
    pub log_format: LogFormat,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Ollama endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// `generate` or `chat`
    #[serde(default)]
    pub api: ApiStyle,

    /// Request a streamed response and join the chunks
    #[serde(default)]
    pub stream: bool,

    /// Ceiling for one model call (seconds)
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature, server default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Maximum model calls per run
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// How model responses are interpreted
    #[serde(default)]
    pub parser: ParserKind,

    /// Session used when `--session` is not given
    #[serde(default = "default_session")]
    pub default_session: String,
}

/// History store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryConfig {
    /// Directory holding one file per session; `<data_dir>/history` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// `json` document or `jsonl` turn-per-line
    #[serde(default)]
    pub format: HistoryFormat,
}

/// Tool registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Tools exposed to the model, by name
    #[serde(default = "default_enabled_tools")]
    pub enabled: Vec<String>,

    /// Ceiling for one tool invocation (seconds)
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,

    /// Programs command templates may run
    #[serde(default = "default_allowlist")]
    pub allowlist: Vec<String>,

    /// Pre-declared command templates
    #[serde(default = "default_commands")]
    pub commands: Vec<CommandTemplate>,

    /// Subject → fact table served by the `facts` tool
    #[serde(default = "default_facts")]
    pub facts: BTreeMap<String, String>,
}

/// A shell-free command template
///
/// `{param}` placeholders in `args` are replaced by the argument of the same
/// name, always as one whole argv element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub name: String,
    pub description: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Trigger-phrase shortcut configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortcutConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tool called with `{"query": <input>}` when a trigger matches
    #[serde(default = "default_shortcut_tool")]
    pub tool: String,

    /// Case-insensitive substrings of the user input
    #[serde(default = "default_triggers")]
    pub triggers: Vec<String>,
}

// Default value functions
fn default_log_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.lagent")
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "deepseek-r1:1.5b".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_max_steps() -> usize {
    5
}

fn default_session() -> String {
    "default".to_string()
}

fn default_tool_timeout() -> u64 {
    30
}

fn default_enabled_tools() -> Vec<String> {
    ["calculator", "web_search", "facts", "disk_usage", "disk_free"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_allowlist() -> Vec<String> {
    vec!["du".to_string(), "df".to_string()]
}

fn default_commands() -> Vec<CommandTemplate> {
    vec![
        CommandTemplate {
            name: "disk_usage".to_string(),
            description: "Report the total disk space used by a file or directory".to_string(),
            program: "du".to_string(),
            args: vec!["-sh".to_string(), "{path}".to_string()],
        },
        CommandTemplate {
            name: "disk_free".to_string(),
            description: "Report free and used space on all mounted filesystems".to_string(),
            program: "df".to_string(),
            args: vec!["-h".to_string()],
        },
    ]
}

fn default_facts() -> BTreeMap<String, String> {
    let mut facts = BTreeMap::new();
    facts.insert(
        "ollama".to_string(),
        "Ollama runs large language models locally and serves them over an HTTP API on port 11434."
            .to_string(),
    );
    facts.insert(
        "lagent".to_string(),
        "lagent is a local agent that answers questions with a locally hosted model and a small set of tools."
            .to_string(),
    );
    facts
}

fn default_shortcut_tool() -> String {
    "facts".to_string()
}

fn default_triggers() -> Vec<String> {
    vec!["tell me about ollama".to_string()]
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
            api: ApiStyle::default(),
            stream: false,
            timeout_secs: default_llm_timeout(),
            temperature: None,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            parser: ParserKind::default(),
            default_session: default_session(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_tools(),
            timeout_secs: default_tool_timeout(),
            allowlist: default_allowlist(),
            commands: default_commands(),
            facts: default_facts(),
        }
    }
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tool: default_shortcut_tool(),
            triggers: default_triggers(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.lagent/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    /// Validates the configuration after loading and returns descriptive errors
    /// if validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;
        Self::load_or_create_at(&config_path)
    }

    /// Load configuration from `path`, writing defaults there first if missing
    pub fn load_or_create_at(path: &Path) -> Result<Self, EngineError> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Self::create_default(path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        // Validate and process configuration
        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Serialize before processing so the file keeps `~` paths
        let mut config = Self::default();
        let toml_string = config.to_toml()?;

        config.validate_and_process()?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {}", path.display());
        Ok(config)
    }

    /// Get the default configuration file path (~/.lagent/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".lagent").join("config.toml"))
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Resolved history directory
    pub fn history_dir(&self) -> PathBuf {
        self.history
            .dir
            .clone()
            .unwrap_or_else(|| self.core.data_dir.join("history"))
    }

    /// Check every cross-field rule without touching the filesystem
    ///
    /// Called again by the CLI after flag overrides are applied.
    pub fn validate(&self) -> Result<(), EngineError> {
        // Validate log level
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !(self.llm.base_url.starts_with("http://") || self.llm.base_url.starts_with("https://")) {
            return Err(EngineError::Config(format!(
                "llm.base_url must be an http(s) URL, got '{}'",
                self.llm.base_url
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(EngineError::Config("llm.model must not be empty".to_string()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(EngineError::Config("llm.timeout_secs must be greater than 0".to_string()));
        }
        if let Some(t) = self.llm.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(EngineError::Config(
                    "llm.temperature must be between 0.0 and 2.0".to_string(),
                ));
            }
        }

        if self.agent.max_steps == 0 {
            return Err(EngineError::Config("agent.max_steps must be at least 1".to_string()));
        }
        if !is_valid_session_id(&self.agent.default_session) {
            return Err(EngineError::Config(format!(
                "agent.default_session '{}' may only use 1-64 letters, digits, '_' or '-'",
                self.agent.default_session
            )));
        }

        if self.tools.timeout_secs == 0 {
            return Err(EngineError::Config("tools.timeout_secs must be greater than 0".to_string()));
        }

        // Tool names are unique across builtins and command templates
        let mut known: HashSet<&str> = BUILTIN_TOOLS.iter().copied().collect();
        for command in &self.tools.commands {
            if command.name.trim().is_empty() {
                return Err(EngineError::Config("Command template with empty name".to_string()));
            }
            if !known.insert(command.name.as_str()) {
                return Err(EngineError::Config(format!(
                    "Duplicate tool name '{}'",
                    command.name
                )));
            }
            if !self.tools.allowlist.contains(&command.program) {
                return Err(EngineError::Config(format!(
                    "Command '{}' runs '{}', which is not in tools.allowlist",
                    command.name, command.program
                )));
            }
        }

        for name in &self.tools.enabled {
            if !known.contains(name.as_str()) {
                return Err(EngineError::Config(format!(
                    "tools.enabled names unknown tool '{}'",
                    name
                )));
            }
        }

        if self.shortcut.enabled && !self.tools.enabled.contains(&self.shortcut.tool) {
            return Err(EngineError::Config(format!(
                "shortcut.tool '{}' is not an enabled tool",
                self.shortcut.tool
            )));
        }

        Ok(())
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Runs `validate`
    /// - Expands ~ in paths
    /// - Creates the data and history directories if they don't exist
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        self.validate()?;

        // Expand and create data directory
        self.core.data_dir = expand_path(&self.core.data_dir)?;
        ensure_dir(&self.core.data_dir)?;

        let history_dir = expand_path(&self.history_dir())?;
        ensure_dir(&history_dir)?;
        self.history.dir = Some(history_dir);

        Ok(())
    }
}

fn ensure_dir(path: &Path) -> Result<(), EngineError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            EngineError::Config(format!("Failed to create directory {:?}: {}", path, e))
        })?;
    }
    Ok(())
}

/// Expand ~ in path to user's home directory
///
/// # Examples
///
/// ```ignore
/// let path = PathBuf::from("~/.lagent");
/// let expanded = expand_path(&path)?;
/// // expanded is now /home/user/.lagent (on Unix)
/// ```
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
