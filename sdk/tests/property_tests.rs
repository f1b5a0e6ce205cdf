use proptest::prelude::*;
use sdk::errors::{AgentErrorExt, EngineError};
use sdk::types::{ToolInvocation, ToolResult};

// Every error yields a non-empty, static hint and a stable kind name.
proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "\\PC*", status in 100u16..600) {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::History(error_str.clone()),
            EngineError::Connection(error_str.clone()),
            EngineError::Server { status, body: error_str.clone() },
            EngineError::Decode(error_str.clone()),
            EngineError::UnknownTool(error_str.clone()),
            EngineError::argument(error_str.clone(), error_str.clone()),
            EngineError::execution(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            prop_assert!(!err.kind().is_empty());
            // hints are fixed text and never echo the raw payload
            if error_str.len() > 8 {
                prop_assert!(!hint.contains(&error_str));
            }
        }
    }
}

// Only tool failures are folded back into the conversation.
proptest! {
    #[test]
    fn test_tool_failures_are_recoverable(message in "\\PC*", code in proptest::option::of(-1i32..256)) {
        let err = EngineError::ToolExecution { message: message.clone(), code };
        prop_assert!(err.is_recoverable());

        let result = ToolResult::failure(&err);
        prop_assert_eq!(result.code, code);
        prop_assert!(result.observation().contains(&message));
    }
}

proptest! {
    #[test]
    fn test_invocation_parses_any_tool_name(name in "[a-z_]{1,24}", query in "\\PC*") {
        let raw = serde_json::json!({"name": name, "arguments": {"query": query}}).to_string();
        let call: ToolInvocation = serde_json::from_str(&raw).expect("valid invocation JSON");
        prop_assert_eq!(&call.name, &name);
        prop_assert_eq!(call.param_str("query").expect("query present"), query.as_str());
    }
}
