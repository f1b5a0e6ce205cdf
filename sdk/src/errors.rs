//! Error types and handling
//!
//! This module provides the error taxonomy used throughout the lagent engine.
//! All errors implement the `AgentErrorExt` trait which provides a stable kind
//! name, a user-friendly hint, and whether the agent loop can recover from
//! the error by folding it into the conversation as an observation.
//!
//! # Display
//!
//! Messages are meant for end users. Raw response bodies from the model
//! endpoint are kept on the error for logging but never rendered by
//! `Display`.

use thiserror::Error;

/// Trait for error extensions
///
/// This trait provides additional context for errors: a stable kind name for
/// the CLI, a user-friendly hint, and recoverability information.
pub trait AgentErrorExt {
    /// Stable, CamelCase name of the failure kind (e.g. `MaxStepsExceeded`)
    fn kind(&self) -> &'static str;

    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the agent loop recovers from the error
    ///
    /// Recoverable errors are reported back to the model as an observation
    /// and the run continues. All other errors abort the run.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Model client**: connection, server status, decode, timeout
/// - **Interpreter**: no action found in the model output
/// - **Tools**: unknown tool, argument validation, execution failure
/// - **Loop**: step ceiling reached
/// - **Ambient**: configuration, history store, IO
///
/// # Examples
///
/// ```
/// use sdk::errors::{AgentErrorExt, EngineError};
///
/// let error = EngineError::UnknownTool("weather".to_string());
/// assert_eq!(error.kind(), "UnknownToolError");
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::MaxStepsExceeded(5);
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // History store errors
    #[error("History store error: {0}")]
    History(String),

    // Model client errors
    #[error("Cannot reach model endpoint: {0}")]
    Connection(String),

    #[error("Model endpoint returned HTTP {status}")]
    Server { status: u16, body: String },

    #[error("Could not decode model response: {0}")]
    Decode(String),

    #[error("Model call timed out after {0}s")]
    Timeout(u64),

    // Interpreter errors
    #[error("Model response contains neither a final answer nor a tool call")]
    NoActionFound,

    // Tool errors
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid argument '{field}': {reason}")]
    Argument { field: String, reason: String },

    #[error("Tool execution failed: {message}")]
    ToolExecution { message: String, code: Option<i32> },

    // Agent loop errors
    #[error("No final answer within {0} steps")]
    MaxStepsExceeded(usize),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Shorthand for an argument validation failure
    pub fn argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Argument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a tool execution failure without an exit code
    pub fn execution(message: impl Into<String>) -> Self {
        Self::ToolExecution {
            message: message.into(),
            code: None,
        }
    }
}

impl AgentErrorExt for EngineError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::History(_) => "HistoryError",
            Self::Connection(_) => "ConnectionError",
            Self::Server { .. } => "ServerError",
            Self::Decode(_) => "DecodeError",
            Self::Timeout(_) => "TimeoutError",
            Self::NoActionFound => "NoActionFound",
            Self::UnknownTool(_) => "UnknownToolError",
            Self::Argument { .. } => "ArgumentError",
            Self::ToolExecution { .. } => "ToolExecutionError",
            Self::MaxStepsExceeded(_) => "MaxStepsExceeded",
            Self::Io(_) => "IoError",
        }
    }

    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::History(_) => "The session history could not be read or written",

            Self::Connection(_) => "Is the model server running? Check llm.base_url",
            Self::Server { status, .. } if *status == 404 => {
                "Model or endpoint not found. Pull the model or check llm.api"
            }
            Self::Server { .. } => "The model server rejected the request. Check its logs",
            Self::Decode(_) => "The model server answered in an unexpected format",
            Self::Timeout(_) => "The model took too long to respond. Try again or raise llm.timeout_secs",

            Self::NoActionFound => "The model did not follow the answer format. Try rephrasing",

            Self::UnknownTool(_) => "The requested tool is not available",
            Self::Argument { .. } => "The tool was called with missing or invalid arguments",
            Self::ToolExecution { .. } => "Tool operation failed",

            Self::MaxStepsExceeded(_) => "Task too complex. Try breaking it into smaller steps",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownTool(_) | Self::Argument { .. } | Self::ToolExecution { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(EngineError::Connection("x".into()).kind(), "ConnectionError");
        assert_eq!(
            EngineError::Server {
                status: 500,
                body: String::new()
            }
            .kind(),
            "ServerError"
        );
        assert_eq!(EngineError::NoActionFound.kind(), "NoActionFound");
        assert_eq!(EngineError::MaxStepsExceeded(5).kind(), "MaxStepsExceeded");
    }

    #[test]
    fn test_server_display_hides_body() {
        let err = EngineError::Server {
            status: 502,
            body: "<html>bad gateway internals</html>".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("502"));
        assert!(!rendered.contains("internals"));
    }

    #[test]
    fn test_not_found_hint() {
        let err = EngineError::Server {
            status: 404,
            body: String::new(),
        };
        assert!(err.user_hint().contains("Pull the model"));
    }

    #[test]
    fn test_recoverability() {
        assert!(EngineError::argument("num1", "expected a number").is_recoverable());
        assert!(EngineError::execution("division by zero").is_recoverable());
        assert!(!EngineError::NoActionFound.is_recoverable());
        assert!(!EngineError::Timeout(60).is_recoverable());
        assert!(!EngineError::Decode("eof".into()).is_recoverable());
    }

    #[test]
    fn test_io_error_converts() {
        let err = EngineError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "stdin closed",
        ));
        assert_eq!(err.kind(), "IoError");
        assert!(err.to_string().contains("stdin closed"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_argument_display() {
        let err = EngineError::argument("operation", "missing");
        assert_eq!(err.to_string(), "Invalid argument 'operation': missing");
    }
}
