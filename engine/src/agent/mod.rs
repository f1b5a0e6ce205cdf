//! Agent Loop Core
//!
//! This module implements the agent loop that answers one request through
//! an iterative prompt → model → interpret → act cycle. Conversation state
//! lives in a caller-owned `Session` persisted by the `HistoryStore`.

pub mod core;
pub mod history;
pub mod interpreter;
pub mod prompt;
pub mod shortcut;

pub use core::{AgentConfig, AgentCore, AgentStep, RunOutcome};
pub use history::{ConversationHistory, HistoryFormat, HistoryStore, Role, Session, Turn};
pub use interpreter::{ActionParser, Decision, FencedActionParser, JsonActionParser, ParserKind};
pub use prompt::PromptBuilder;
pub use shortcut::Shortcut;
