//! LLM Provider Abstraction Layer
//!
//! The `LLMProvider` trait is the seam between the agent loop and the model
//! endpoint. The loop hands a fully built prompt to the provider and gets the
//! raw completion text back; interpreting that text is the agent's job, not
//! the provider's.

use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod ollama;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Cannot connect to {0}")]
    Connection(String),

    #[error("Server returned HTTP {status}")]
    Server { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Timeout after {0}s")]
    Timeout(u64),
}

impl From<LLMError> for EngineError {
    fn from(e: LLMError) -> Self {
        match e {
            LLMError::Connection(msg) => EngineError::Connection(msg),
            LLMError::Server { status, body } => EngineError::Server { status, body },
            LLMError::Decode(msg) => EngineError::Decode(msg),
            LLMError::Timeout(secs) => EngineError::Timeout(secs),
        }
    }
}

/// Which Ollama endpoint the provider talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiStyle {
    /// `POST /api/generate` with a single prompt string
    #[default]
    Generate,

    /// `POST /api/chat` with a message list
    Chat,
}

impl fmt::Display for ApiStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiStyle::Generate => write!(f, "generate"),
            ApiStyle::Chat => write!(f, "chat"),
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama")
    fn name(&self) -> &str;

    /// Returns the model identifier requests are sent for
    fn model(&self) -> &str;

    /// Send one prompt and return the model's full text response
    ///
    /// # Returns
    /// * `Ok(String)` - The complete completion text, streamed chunks joined
    /// * `Err(LLMError)` - Connection, server, decode or timeout failure
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is currently reachable
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}
