//! Command Template Tool
//!
//! Runs a pre-declared program with a fixed argv. The model never supplies
//! a command line: it only fills `{param}` slots, and each slot becomes one
//! whole argv element. Execution is routed through `CommandExecutor` for
//! allowlist validation, metacharacter rejection and the timeout.

use sdk::errors::EngineError;
use sdk::types::{ToolDescriptor, ToolInvocation, ToolResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::command_executor::{check_substituted_value, CommandError, CommandExecutor};
use crate::config::CommandTemplate;

/// Longest output handed back to the model
const MAX_OUTPUT_CHARS: usize = 4000;

/// One argv element of a template
#[derive(Debug, Clone, PartialEq, Eq)]
enum ArgSlot {
    Literal(String),
    Param(String),
}

impl ArgSlot {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            Some(name) if !name.is_empty() && !name.contains(['{', '}']) => {
                ArgSlot::Param(name.to_string())
            }
            _ => ArgSlot::Literal(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandTool {
    descriptor: ToolDescriptor,
    program: String,
    slots: Vec<ArgSlot>,
    executor: Arc<CommandExecutor>,
}

impl CommandTool {
    pub fn new(template: &CommandTemplate, executor: Arc<CommandExecutor>) -> Result<Self, EngineError> {
        if !executor.is_allowed(&template.program) {
            return Err(EngineError::Config(format!(
                "Command '{}' runs '{}', which is not allow-listed",
                template.name, template.program
            )));
        }

        let slots: Vec<ArgSlot> = template.args.iter().map(|a| ArgSlot::parse(a)).collect();

        let mut descriptor = ToolDescriptor::new(&template.name, &template.description);
        for slot in &slots {
            if let ArgSlot::Param(name) = slot {
                if !descriptor.parameters.iter().any(|p| &p.name == name) {
                    descriptor = descriptor.with_param(name, "string");
                }
            }
        }

        Ok(Self {
            descriptor,
            program: template.program.clone(),
            slots,
            executor,
        })
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Fill the template slots from the invocation arguments
    fn build_argv(&self, call: &ToolInvocation) -> Result<Vec<String>, EngineError> {
        let mut argv = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            match slot {
                ArgSlot::Literal(arg) => argv.push(arg.clone()),
                ArgSlot::Param(name) => {
                    let value = call.param_str(name)?;
                    check_substituted_value(value)
                        .map_err(|e| EngineError::argument(name.as_str(), e.to_string()))?;
                    argv.push(value.to_string());
                }
            }
        }
        Ok(argv)
    }

    /// Execute the template through the secure CommandExecutor
    pub async fn execute(&self, call: &ToolInvocation) -> Result<ToolResult, EngineError> {
        let argv = self.build_argv(call)?;
        info!("Running command tool '{}': {} {:?}", self.descriptor.name, self.program, argv);

        let output = self
            .executor
            .execute(&self.program, &argv)
            .await
            .map_err(|e| match e {
                CommandError::TimedOut(secs) => {
                    EngineError::execution(format!("command timed out after {}s", secs))
                }
                other => EngineError::execution(other.to_string()),
            })?;

        if output.success() {
            debug!("Command succeeded");
            let text = if output.stdout.trim().is_empty() {
                output.stderr.trim()
            } else {
                output.stdout.trim()
            };
            return Ok(ToolResult::success(truncate(text)).with_code(0));
        }

        let message = match output.stderr.trim() {
            "" => match output.code {
                Some(code) => format!("{} exited with status {}", self.program, code),
                None => format!("{} was terminated by a signal", self.program),
            },
            stderr => truncate(stderr),
        };
        warn!("Command failed: {}", message);
        Err(EngineError::ToolExecution {
            message,
            code: output.code,
        })
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_OUTPUT_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_OUTPUT_CHARS).collect();
    cut.push_str("\n... (output truncated)");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_tool() -> CommandTool {
        let executor = Arc::new(CommandExecutor::with_allowlist(vec!["echo".to_string()]));
        let template = CommandTemplate {
            name: "echo_path".to_string(),
            description: "Echo a path".to_string(),
            program: "echo".to_string(),
            args: vec!["-n".to_string(), "{path}".to_string()],
        };
        CommandTool::new(&template, executor).unwrap()
    }

    #[test]
    fn test_slot_parsing() {
        assert_eq!(ArgSlot::parse("{path}"), ArgSlot::Param("path".to_string()));
        assert_eq!(ArgSlot::parse("-sh"), ArgSlot::Literal("-sh".to_string()));
        assert_eq!(ArgSlot::parse("{}"), ArgSlot::Literal("{}".to_string()));
        assert_eq!(
            ArgSlot::parse("--file={path}"),
            ArgSlot::Literal("--file={path}".to_string())
        );
    }

    #[test]
    fn test_descriptor_from_placeholders() {
        let tool = echo_tool();
        assert_eq!(tool.descriptor().name, "echo_path");
        assert_eq!(tool.descriptor().parameters.len(), 1);
        assert_eq!(tool.descriptor().parameters[0].name, "path");
    }

    #[test]
    fn test_program_must_be_allowed() {
        let executor = Arc::new(CommandExecutor::with_allowlist(vec![]));
        let template = CommandTemplate {
            name: "x".to_string(),
            description: String::new(),
            program: "rm".to_string(),
            args: vec![],
        };
        assert!(matches!(
            CommandTool::new(&template, executor),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_value_is_one_argv_element() {
        let call = ToolInvocation::new("echo_path").with_arg("path", json!("my dir/a b"));
        let argv = echo_tool().build_argv(&call).unwrap();
        assert_eq!(argv, vec!["-n".to_string(), "my dir/a b".to_string()]);
    }

    #[test]
    fn test_injection_rejected_as_argument_error() {
        let tool = echo_tool();
        for bad in ["/tmp; rm -rf /", "--version", "$(id)", ""] {
            let call = ToolInvocation::new("echo_path").with_arg("path", json!(bad));
            assert!(
                matches!(tool.build_argv(&call), Err(EngineError::Argument { ref field, .. }) if field == "path"),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_execute_returns_stdout() {
        let call = ToolInvocation::new("echo_path").with_arg("path", json!("/tmp"));
        let result = echo_tool().execute(&call).await.unwrap();
        assert_eq!(result.output, "/tmp");
        assert_eq!(result.code, Some(0));
    }

    #[test]
    fn test_truncate_long_output() {
        let long = "x".repeat(MAX_OUTPUT_CHARS + 10);
        assert!(truncate(&long).ends_with("(output truncated)"));
        assert_eq!(truncate("short"), "short");
    }
}
