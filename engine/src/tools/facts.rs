//! Facts Tool
//!
//! Answers from a fixed subject → fact table loaded from configuration.
//! A subject matches when its name appears in the query, case-insensitively;
//! the longest matching subject wins.

use sdk::errors::EngineError;
use sdk::types::{ToolDescriptor, ToolInvocation, ToolResult};
use std::collections::BTreeMap;

/// Reply for subjects not in the table
pub const UNKNOWN_SUBJECT: &str = "I cannot provide information about this subject.";

#[derive(Debug, Clone, Default)]
pub struct FactsTool {
    /// Lowercased subject → fact
    facts: BTreeMap<String, String>,
}

impl FactsTool {
    pub const NAME: &'static str = "facts";

    pub fn new(facts: &BTreeMap<String, String>) -> Self {
        Self {
            facts: facts
                .iter()
                .map(|(subject, fact)| (subject.trim().to_lowercase(), fact.clone()))
                .filter(|(subject, _)| !subject.is_empty())
                .collect(),
        }
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        let subjects: Vec<&str> = self.facts.keys().map(String::as_str).collect();
        let description = if subjects.is_empty() {
            "Look up fixed facts about known subjects".to_string()
        } else {
            format!(
                "Look up fixed facts about known subjects: {}",
                subjects.join(", ")
            )
        };
        ToolDescriptor::new(Self::NAME, description).with_param("query", "string")
    }

    /// Fact for the longest subject named in `query`
    pub fn lookup(&self, query: &str) -> Option<&str> {
        let query = query.to_lowercase();
        self.facts
            .iter()
            .filter(|(subject, _)| query.contains(subject.as_str()))
            .max_by_key(|(subject, _)| subject.len())
            .map(|(_, fact)| fact.as_str())
    }

    pub fn execute(&self, call: &ToolInvocation) -> Result<ToolResult, EngineError> {
        let query = call.param_str("query")?;
        let answer = self.lookup(query).unwrap_or(UNKNOWN_SUBJECT);
        Ok(ToolResult::success(answer))
    }
}
