//! lagent SDK
//!
//! Shared types for the lagent engine: the error taxonomy and the tool
//! data model (descriptors, invocations, results).

/// Error types and handling
pub mod errors;

/// Tool descriptor, invocation and result types
pub mod types;

// Re-export commonly used types
pub use errors::{AgentErrorExt, EngineError};
pub use types::{ToolDescriptor, ToolError, ToolInvocation, ToolParameter, ToolResult, ToolStatus};
