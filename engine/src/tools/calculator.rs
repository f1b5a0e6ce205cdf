//! Calculator Tool
//!
//! Four-function arithmetic on two numbers. Results are always rendered
//! with two decimals so the model sees a stable format.

use sdk::errors::EngineError;
use sdk::types::{ToolDescriptor, ToolInvocation, ToolResult};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub const NAME: &'static str = "calculator";

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            "Perform basic arithmetic. operation is one of add, subtract, multiply, divide",
        )
        .with_param("operation", "string")
        .with_param("num1", "number")
        .with_param("num2", "number")
    }

    pub fn execute(&self, call: &ToolInvocation) -> Result<ToolResult, EngineError> {
        let operation = call.param_str("operation")?;
        let num1 = call.param_f64("num1")?;
        let num2 = call.param_f64("num2")?;

        let value = match operation.to_ascii_lowercase().as_str() {
            "add" => num1 + num2,
            "subtract" => num1 - num2,
            "multiply" => num1 * num2,
            "divide" => {
                if num2 == 0.0 {
                    return Err(EngineError::execution("division by zero"));
                }
                num1 / num2
            }
            other => {
                return Err(EngineError::argument(
                    "operation",
                    format!("unsupported operation '{}'", other),
                ))
            }
        };

        if !value.is_finite() {
            return Err(EngineError::execution("result is not a finite number"));
        }

        debug!("calculator: {} {} {} = {}", num1, operation, num2, value);
        Ok(ToolResult::success(format!("{:.2}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::errors::AgentErrorExt;
    use serde_json::json;

    fn call(op: &str, a: serde_json::Value, b: serde_json::Value) -> ToolInvocation {
        ToolInvocation::new("calculator")
            .with_arg("operation", json!(op))
            .with_arg("num1", a)
            .with_arg("num2", b)
    }

    #[test]
    fn test_add_two_decimals() {
        let result = CalculatorTool.execute(&call("add", json!(2), json!(3))).unwrap();
        assert!(result.is_success());
        assert_eq!(result.output, "5.00");
    }

    #[test]
    fn test_all_operations() {
        let cases = [
            ("subtract", 10.0, 4.5, "5.50"),
            ("multiply", 1.5, 3.0, "4.50"),
            ("divide", 1.0, 3.0, "0.33"),
            ("ADD", -1.0, 1.0, "0.00"),
        ];
        for (op, a, b, expected) in cases {
            let result = CalculatorTool.execute(&call(op, json!(a), json!(b))).unwrap();
            assert_eq!(result.output, expected, "{op}");
        }
    }

    #[test]
    fn test_division_by_zero() {
        let err = CalculatorTool
            .execute(&call("divide", json!(1), json!(0)))
            .unwrap_err();
        assert_eq!(err.kind(), "ToolExecutionError");
        assert!(err.to_string().contains("division by zero"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unsupported_operation() {
        let err = CalculatorTool
            .execute(&call("modulo", json!(1), json!(2)))
            .unwrap_err();
        assert!(matches!(err, EngineError::Argument { ref field, .. } if field == "operation"));
    }

    #[test]
    fn test_missing_and_mistyped_numbers() {
        let missing = ToolInvocation::new("calculator").with_arg("operation", json!("add"));
        assert!(matches!(
            CalculatorTool.execute(&missing),
            Err(EngineError::Argument { ref field, .. }) if field == "num1"
        ));

        let stringly = call("add", json!("2"), json!(3));
        assert!(matches!(
            CalculatorTool.execute(&stringly),
            Err(EngineError::Argument { .. })
        ));
    }

    #[test]
    fn test_descriptor_schema_order() {
        let d = CalculatorTool.descriptor();
        let names: Vec<_> = d.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["operation", "num1", "num2"]);
    }
}
