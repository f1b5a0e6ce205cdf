//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be properly loaded,
//! validated, and processed with path expansion and directory creation.

use lagent_engine::agent::{HistoryFormat, ParserKind};
use lagent_engine::config::Config;
use lagent_engine::llm::ApiStyle;
use sdk::errors::EngineError;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let data_dir = dir.path().join("data");
    let contents = format!(
        "[core]\nlog_level = \"info\"\ndata_dir = {:?}\n\n{}",
        data_dir.to_string_lossy(),
        body
    );
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_config_toml_parsing() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
[llm]
base_url = "http://gpu-box:11434"
model = "llama3.1:8b"
api = "chat"
stream = true
timeout_secs = 120
temperature = 0.2

[agent]
max_steps = 8
parser = "fenced"
default_session = "work"

[history]
format = "jsonl"

[tools]
enabled = ["calculator", "uptime"]
allowlist = ["uptime"]
timeout_secs = 5

[[tools.commands]]
name = "uptime"
description = "How long the machine has been running"
program = "uptime"

[shortcut]
enabled = false
"#,
    );

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.core.log_level, "info");
    assert_eq!(config.llm.base_url, "http://gpu-box:11434");
    assert_eq!(config.llm.model, "llama3.1:8b");
    assert_eq!(config.llm.api, ApiStyle::Chat);
    assert!(config.llm.stream);
    assert_eq!(config.llm.timeout_secs, 120);
    assert_eq!(config.llm.temperature, Some(0.2));
    assert_eq!(config.agent.max_steps, 8);
    assert_eq!(config.agent.parser, ParserKind::Fenced);
    assert_eq!(config.agent.default_session, "work");
    assert_eq!(config.history.format, HistoryFormat::Jsonl);
    assert_eq!(config.tools.commands.len(), 1);
    assert!(config.tools.commands[0].args.is_empty());
    assert!(!config.shortcut.enabled);
}

#[test]
fn test_missing_sections_use_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "");

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.llm.base_url, "http://localhost:11434");
    assert_eq!(config.llm.api, ApiStyle::Generate);
    assert_eq!(config.agent.max_steps, 5);
    assert_eq!(config.tools.timeout_secs, 30);
    assert!(config.shortcut.enabled);
    assert_eq!(config.shortcut.tool, "facts");
}

#[test]
fn test_processing_creates_history_dir() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "");

    let config = Config::load_from_path(&path).unwrap();

    let history_dir = temp_dir.path().join("data").join("history");
    assert!(history_dir.is_dir());
    assert_eq!(config.history_dir(), history_dir);
}

#[test]
fn test_load_or_create_reads_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");

    // Defaults rendered to disk, with data_dir pointed at the temp dir
    let mut config = Config::default();
    config.core.data_dir = temp_dir.path().join("data");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, config.to_toml().unwrap()).unwrap();

    let loaded = Config::load_or_create_at(&path).unwrap();
    assert_eq!(loaded.llm.model, config.llm.model);
    assert_eq!(loaded.tools.enabled, config.tools.enabled);

    // Written file parses back to the same settings
    let reparsed: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reparsed.tools.commands, config.tools.commands);
    assert_eq!(reparsed.tools.facts, config.tools.facts);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[llm\nmodel = ").unwrap();

    match Config::load_from_path(&path) {
        Err(EngineError::Config(msg)) => assert!(msg.contains("parse")),
        other => panic!("Expected Config error, got: {:?}", other),
    }
}

#[test]
fn test_unknown_enabled_tool_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        "[tools]\nenabled = [\"calculator\", \"teleport\"]\n\n[shortcut]\nenabled = false\n",
    );

    match Config::load_from_path(&path) {
        Err(EngineError::Config(msg)) => assert!(msg.contains("teleport")),
        other => panic!("Expected Config error, got: {:?}", other),
    }
}

#[test]
fn test_command_outside_allowlist_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"
[tools]
allowlist = ["du"]

[[tools.commands]]
name = "wipe"
description = "Remove a file"
program = "rm"
args = ["{path}"]
"#,
    );

    match Config::load_from_path(&path) {
        Err(EngineError::Config(msg)) => assert!(msg.contains("allowlist")),
        other => panic!("Expected Config error, got: {:?}", other),
    }
}

#[test]
fn test_shortcut_tool_must_be_enabled() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        "[tools]\nenabled = [\"calculator\"]\ncommands = []\n",
    );

    match Config::load_from_path(&path) {
        Err(EngineError::Config(msg)) => assert!(msg.contains("shortcut.tool")),
        other => panic!("Expected Config error, got: {:?}", other),
    }
}
