//! Prompt assembly
//!
//! Builds the single prompt string sent to the model on every step. The
//! output is a pure function of its inputs: tools render in name order and
//! parameters in declaration order, so identical inputs give identical
//! prompts.

use sdk::types::ToolDescriptor;
use std::fmt::Write;

use super::history::Turn;

const PREAMBLE: &str = "You are a helpful assistant. You have access to the following tools:";

const INSTRUCTIONS: &str = "\
The user has given you a task. Think step-by-step, then either use exactly one tool or respond with the final answer.

To use a tool, reply with a single line of JSON in this format and nothing else:
{\"name\": \"tool_name\", \"arguments\": {\"arg1\": \"value1\"}}
The result will be given back to you as an Observation.

When you know the answer, reply with a line that starts with 'Final Answer:' followed by the answer.";

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    tools: Vec<ToolDescriptor>,
}

impl PromptBuilder {
    pub fn new(mut tools: Vec<ToolDescriptor>) -> Self {
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        Self { tools }
    }

    /// Render the tool catalogue
    pub fn tools_section(&self) -> String {
        let mut out = String::from("AVAILABLE TOOLS:\n");
        if self.tools.is_empty() {
            out.push_str("(none)\n");
            return out;
        }
        for tool in &self.tools {
            let _ = writeln!(out, "Name: {}", tool.name);
            let _ = writeln!(out, "Description: {}", tool.description);
            let _ = writeln!(out, "Arguments: {}", render_schema(tool));
            out.push('\n');
        }
        out
    }

    /// Assemble the full prompt
    ///
    /// * `history` - turns from earlier runs of the session
    /// * `input` - the new user request, included verbatim
    /// * `scratchpad` - actions and observations produced so far in this run
    pub fn build(&self, history: &[Turn], input: &str, scratchpad: &[Turn]) -> String {
        let mut prompt = String::new();
        prompt.push_str(PREAMBLE);
        prompt.push_str("\n\n");
        prompt.push_str(&self.tools_section());
        prompt.push('\n');
        prompt.push_str(INSTRUCTIONS);
        prompt.push_str("\n\nCurrent conversation history:\n");

        if history.is_empty() {
            prompt.push_str("(none)\n");
        }
        for turn in history {
            render_turn(&mut prompt, turn);
        }

        prompt.push('\n');
        let _ = writeln!(prompt, "User: {}", input);
        for turn in scratchpad {
            render_turn(&mut prompt, turn);
        }
        prompt
    }
}

fn render_turn(out: &mut String, turn: &Turn) {
    let _ = writeln!(out, "{}: {}", turn.role.label(), turn.content);
}

/// `{"param": "type", ...}` in declaration order
fn render_schema(tool: &ToolDescriptor) -> String {
    let fields: Vec<String> = tool
        .parameters
        .iter()
        .map(|p| {
            format!(
                "{}: {}",
                serde_json::Value::from(p.name.as_str()),
                serde_json::Value::from(p.kind.as_str())
            )
        })
        .collect();
    format!("{{{}}}", fields.join(", "))
}
