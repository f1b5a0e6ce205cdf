pub mod calculator;
pub mod command;
pub mod facts;
pub mod web_search;

pub use calculator::CalculatorTool;
pub use command::CommandTool;
pub use facts::FactsTool;
pub use web_search::WebSearchTool;

use sdk::errors::EngineError;
use sdk::types::{ToolDescriptor, ToolInvocation, ToolResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::command_executor::CommandExecutor;
use crate::config::ToolsConfig;

/// Ceiling for one invocation when none is configured
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// The closed set of tool capabilities the agent can dispatch to.
#[derive(Debug, Clone)]
pub enum BuiltinTool {
    Calculator(CalculatorTool),
    WebSearch(WebSearchTool),
    Facts(FactsTool),
    Command(CommandTool),
}

impl BuiltinTool {
    pub fn descriptor(&self) -> ToolDescriptor {
        match self {
            BuiltinTool::Calculator(t) => t.descriptor(),
            BuiltinTool::WebSearch(t) => t.descriptor(),
            BuiltinTool::Facts(t) => t.descriptor(),
            BuiltinTool::Command(t) => t.descriptor().clone(),
        }
    }

    pub fn name(&self) -> String {
        self.descriptor().name
    }

    /// Validate the arguments and run the tool
    pub async fn execute(&self, call: &ToolInvocation) -> Result<ToolResult, EngineError> {
        match self {
            BuiltinTool::Calculator(t) => t.execute(call),
            BuiltinTool::WebSearch(t) => t.execute(call),
            BuiltinTool::Facts(t) => t.execute(call),
            BuiltinTool::Command(t) => t.execute(call).await,
        }
    }
}

/// Registry of available tools that can be dispatched by the agent.
///
/// Names are unique and the set is fixed once construction finishes; the
/// registry is shared read-only behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, BuiltinTool>,
    timeout: Duration,
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn empty() -> Self {
        Self {
            tools: BTreeMap::new(),
            timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
        }
    }

    /// Set the per-invocation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a tool. A second tool with the same name is a configuration error.
    pub fn register(&mut self, tool: BuiltinTool) -> Result<(), EngineError> {
        let name = tool.name();
        if self.tools.contains_key(&name) {
            return Err(EngineError::Config(format!("Duplicate tool name '{}'", name)));
        }
        debug!("Registered tool '{}'", name);
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Build the registry described by the `[tools]` section
    pub fn from_config(config: &ToolsConfig) -> Result<Self, EngineError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let executor = Arc::new(
            CommandExecutor::with_allowlist(config.allowlist.clone()).with_timeout(timeout),
        );

        let mut registry = Self::empty().with_timeout(timeout);
        for name in &config.enabled {
            let tool = match name.as_str() {
                CalculatorTool::NAME => BuiltinTool::Calculator(CalculatorTool),
                WebSearchTool::NAME => BuiltinTool::WebSearch(WebSearchTool),
                FactsTool::NAME => BuiltinTool::Facts(FactsTool::new(&config.facts)),
                other => {
                    let template = config
                        .commands
                        .iter()
                        .find(|c| c.name == other)
                        .ok_or_else(|| {
                            EngineError::Config(format!("tools.enabled names unknown tool '{}'", other))
                        })?;
                    BuiltinTool::Command(CommandTool::new(template, Arc::clone(&executor))?)
                }
            };
            registry.register(tool)?;
        }
        Ok(registry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptors in name order
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(BuiltinTool::descriptor).collect()
    }

    /// Return the names of all registered tools, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up and run one invocation, bounded by the registry timeout
    pub async fn invoke(&self, call: &ToolInvocation) -> Result<ToolResult, EngineError> {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!("Unknown tool requested: {}", call.name);
            return Err(EngineError::UnknownTool(format!(
                "'{}'. Available tools: {}",
                call.name,
                self.names().join(", ")
            )));
        };

        debug!("Dispatching tool '{}' with args: {:?}", call.name, call.arguments);
        match tokio::time::timeout(self.timeout, tool.execute(call)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::execution(format!(
                "tool '{}' timed out after {}s",
                call.name,
                self.timeout.as_secs()
            ))),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config_registry() {
        let registry = ToolRegistry::from_config(&ToolsConfig::default()).unwrap();
        assert_eq!(
            registry.names(),
            ["calculator", "disk_free", "disk_usage", "facts", "web_search"]
        );
        let descriptors = registry.descriptors();
        assert_eq!(descriptors[0].name, "calculator");
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ToolRegistry::empty();
        registry.register(BuiltinTool::Calculator(CalculatorTool)).unwrap();
        let err = registry
            .register(BuiltinTool::Calculator(CalculatorTool))
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_disabled_tools_not_registered() {
        let config = ToolsConfig {
            enabled: vec!["calculator".to_string()],
            ..Default::default()
        };
        let registry = ToolRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("disk_usage"));
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = ToolRegistry::empty();
        let err = registry
            .invoke(&ToolInvocation::new("weather"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn test_invoke_calculator() {
        let mut registry = ToolRegistry::empty();
        registry.register(BuiltinTool::Calculator(CalculatorTool)).unwrap();

        let call = ToolInvocation::new("calculator")
            .with_arg("operation", json!("multiply"))
            .with_arg("num1", json!(6))
            .with_arg("num2", json!(7));
        let result = registry.invoke(&call).await.unwrap();
        assert_eq!(result.output, "42.00");
    }
}
