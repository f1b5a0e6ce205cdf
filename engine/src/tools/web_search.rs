//! Web Search Tool
//!
//! Offline stand-in for a search backend. Returns a canned result that
//! echoes the query so the agent loop can be exercised without network
//! access.

use sdk::errors::EngineError;
use sdk::types::{ToolDescriptor, ToolInvocation, ToolResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct WebSearchTool;

impl WebSearchTool {
    pub const NAME: &'static str = "web_search";

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, "Search the web for current information")
            .with_param("query", "string")
    }

    pub fn execute(&self, call: &ToolInvocation) -> Result<ToolResult, EngineError> {
        let query = call.param_str("query")?.trim();
        if query.is_empty() {
            return Err(EngineError::argument("query", "must not be empty"));
        }

        Ok(ToolResult::success(format!(
            "Search results for '{}': The weather is currently 75°F and sunny.",
            query
        )))
    }
}
