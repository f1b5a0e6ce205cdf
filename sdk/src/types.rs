//! Tool descriptor, invocation and result types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::EngineError;

/// One entry of a tool's argument schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Argument name as the model must spell it
    pub name: String,

    /// Free-form type description shown to the model (e.g. "number")
    pub kind: String,
}

/// Static description of a tool: what it is called and what it accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Parameters in declaration order
    pub parameters: Vec<ToolParameter>,
}

impl ToolDescriptor {
    /// Create a descriptor without parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter to the schema
    pub fn with_param(mut self, name: impl Into<String>, kind: impl Into<String>) -> Self {
        self.parameters.push(ToolParameter {
            name: name.into(),
            kind: kind.into(),
        });
        self
    }
}

/// A tool call decoded from model output
///
/// Serializes to the canonical wire shape `{"name": ..., "arguments": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    /// Create a new invocation with no arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    /// Add an argument
    pub fn with_arg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }

    /// Get a required string argument
    pub fn param_str(&self, key: &str) -> Result<&str, ToolError> {
        match self.arguments.get(key) {
            None | Some(Value::Null) => Err(ToolError::MissingParameter(key.to_string())),
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ToolError::InvalidParameter {
                field: key.to_string(),
                expected: "string",
            }),
        }
    }

    /// Get a required numeric argument
    ///
    /// Only JSON numbers are accepted; numeric strings are rejected.
    pub fn param_f64(&self, key: &str) -> Result<f64, ToolError> {
        match self.arguments.get(key) {
            None | Some(Value::Null) => Err(ToolError::MissingParameter(key.to_string())),
            Some(v) => v.as_f64().ok_or_else(|| ToolError::InvalidParameter {
                field: key.to_string(),
                expected: "number",
            }),
        }
    }

    /// Canonical single-line JSON rendering
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"name\":\"{}\"}}", self.name))
    }
}

/// Outcome status of a tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Failure,
}

/// Output from a tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub output: String,
    /// Process exit code for command-backed tools
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

impl ToolResult {
    /// Create a successful result with text
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            output: output.into(),
            code: None,
        }
    }

    /// Attach an exit code
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Create a failed result from an error
    pub fn failure(error: &EngineError) -> Self {
        let code = match error {
            EngineError::ToolExecution { code, .. } => *code,
            _ => None,
        };
        Self {
            status: ToolStatus::Failure,
            output: error.to_string(),
            code,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// Text folded into the conversation as an observation
    pub fn observation(&self) -> String {
        match self.status {
            ToolStatus::Success => self.output.clone(),
            ToolStatus::Failure => format!("error {}", self.output),
        }
    }
}

/// Argument validation errors raised by tools
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter {field}: expected {expected}")]
    InvalidParameter { field: String, expected: &'static str },
}

impl From<ToolError> for EngineError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::MissingParameter(field) => EngineError::argument(field, "missing"),
            ToolError::InvalidParameter { field, expected } => {
                EngineError::argument(field, format!("expected {}", expected))
            }
        }
    }
}
