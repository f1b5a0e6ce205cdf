//! lagent Engine Library
//!
//! This library provides the agent loop, the Ollama client, the tool
//! registry and the CLI handlers. It is used by both the main binary and
//! integration tests.

/// Configuration management module
pub mod config;

/// Command execution security module
pub mod command_executor;

/// LLM provider abstraction layer
pub mod llm;

/// Agent loop core module
pub mod agent;

/// Built-in tools
pub mod tools;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
