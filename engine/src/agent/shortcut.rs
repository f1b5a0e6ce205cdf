//! Trigger-phrase shortcut
//!
//! Routes raw user input straight to one tool, skipping the model, when the
//! input contains a configured phrase. Matching is a case-insensitive
//! substring test.

use regex::{Regex, RegexBuilder};
use sdk::errors::EngineError;
use sdk::types::ToolInvocation;
use serde_json::Value;

use crate::config::ShortcutConfig;

#[derive(Debug, Clone)]
pub struct Shortcut {
    tool: String,
    triggers: Vec<(String, Regex)>,
}

impl Shortcut {
    pub fn new(tool: impl Into<String>, triggers: &[String]) -> Result<Self, EngineError> {
        let triggers = triggers
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| {
                RegexBuilder::new(&regex::escape(t))
                    .case_insensitive(true)
                    .build()
                    .map(|re| (t.to_string(), re))
                    .map_err(|e| EngineError::Config(format!("Invalid shortcut trigger '{}': {}", t, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            tool: tool.into(),
            triggers,
        })
    }

    /// Build the shortcut from config; `None` when disabled or without triggers
    pub fn from_config(config: &ShortcutConfig) -> Result<Option<Self>, EngineError> {
        if !config.enabled {
            return Ok(None);
        }
        let shortcut = Self::new(&config.tool, &config.triggers)?;
        if shortcut.triggers.is_empty() {
            return Ok(None);
        }
        Ok(Some(shortcut))
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// The first trigger found in `input`
    pub fn matches(&self, input: &str) -> Option<&str> {
        self.triggers
            .iter()
            .find(|(_, re)| re.is_match(input))
            .map(|(phrase, _)| phrase.as_str())
    }

    /// The invocation sent for `input`
    pub fn invocation(&self, input: &str) -> ToolInvocation {
        ToolInvocation::new(&self.tool).with_arg("query", Value::String(input.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shortcut() -> Shortcut {
        Shortcut::new("facts", &["tell me about ollama".to_string(), "C++ (lang)".to_string()]).unwrap()
    }

    #[test]
    fn test_case_insensitive_substring() {
        let s = shortcut();
        assert_eq!(
            s.matches("Please TELL ME ABOUT Ollama now"),
            Some("tell me about ollama")
        );
        assert_eq!(s.matches("what is ollama"), None);
    }

    #[test]
    fn test_triggers_are_literal() {
        let s = shortcut();
        assert!(s.matches("about c++ (LANG) please").is_some());
        assert!(s.matches("c lang").is_none());
    }

    #[test]
    fn test_invocation_carries_raw_input() {
        let call = shortcut().invocation("Tell me about Ollama");
        assert_eq!(call.name, "facts");
        assert_eq!(call.param_str("query").unwrap(), "Tell me about Ollama");
    }

    #[test]
    fn test_disabled_or_empty_is_none() {
        let disabled = ShortcutConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(Shortcut::from_config(&disabled).unwrap().is_none());

        let empty = ShortcutConfig {
            triggers: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(Shortcut::from_config(&empty).unwrap().is_none());
        assert!(Shortcut::from_config(&ShortcutConfig::default()).unwrap().is_some());
    }
}
