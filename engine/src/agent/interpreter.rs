//! Response interpretation
//!
//! Turns one raw model response into a `Decision`: either a final answer or
//! a tool call. Parsing is a pluggable strategy (`ActionParser`) so the
//! agent loop does not care how strict the format check is.
//!
//! Both shipped parsers share the same rules:
//! 1. A leading `<think>...</think>` block and leading whitespace are dropped.
//! 2. Text starting with `Final Answer:` is final; the payload is the trimmed rest.
//! 3. Otherwise the first JSON object of shape `{"name": string, "arguments": object}`
//!    is the tool call. Candidates that do not parse are skipped, never repaired.
//! 4. Otherwise the response is rejected with `NoActionFound`.

use sdk::errors::EngineError;
use sdk::types::ToolInvocation;
use serde::{Deserialize, Serialize};

/// Prefix that marks a terminal answer
pub const FINAL_ANSWER_PREFIX: &str = "Final Answer:";

/// What the model asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Terminal answer with its payload (may be empty)
    Final(String),
    /// Tool call to execute before asking again
    ToolCall(ToolInvocation),
}

/// Strategy for classifying a model response
pub trait ActionParser: Send + Sync {
    /// Short name used in logs and `doctor` output
    fn name(&self) -> &'static str;

    /// Classify one response
    fn parse(&self, response: &str) -> Result<Decision, EngineError>;
}

/// Which parser the agent uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// Tool call JSON may appear anywhere in the response
    #[default]
    Json,
    /// Tool call JSON must sit inside a fenced code block
    Fenced,
}

impl ParserKind {
    pub fn build(self) -> Box<dyn ActionParser> {
        match self {
            ParserKind::Json => Box::new(JsonActionParser),
            ParserKind::Fenced => Box::new(FencedActionParser),
        }
    }
}

/// Default parser: embedded JSON anywhere in the text
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonActionParser;

impl ActionParser for JsonActionParser {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, response: &str) -> Result<Decision, EngineError> {
        let text = strip_reasoning(response);
        if let Some(answer) = final_answer(text) {
            return Ok(Decision::Final(answer));
        }

        // Fences are plain text here; the earliest valid call wins
        first_invocation(text)
            .map(Decision::ToolCall)
            .ok_or(EngineError::NoActionFound)
    }
}

/// Strict parser: only JSON inside ```` ``` ```` fences counts
#[derive(Debug, Clone, Copy, Default)]
pub struct FencedActionParser;

impl ActionParser for FencedActionParser {
    fn name(&self) -> &'static str {
        "fenced"
    }

    fn parse(&self, response: &str) -> Result<Decision, EngineError> {
        let text = strip_reasoning(response);
        if let Some(answer) = final_answer(text) {
            return Ok(Decision::Final(answer));
        }

        let mut rest = text;
        while let Some((body, after)) = next_fenced_block(rest) {
            if let Some(call) = first_invocation(body) {
                return Ok(Decision::ToolCall(call));
            }
            rest = after;
        }
        Err(EngineError::NoActionFound)
    }
}

/// Drop leading whitespace and one leading `<think>...</think>` block.
///
/// Reasoning models emit their chain of thought inside that tag before the
/// answer. An unterminated block is left alone.
pub fn strip_reasoning(response: &str) -> &str {
    let trimmed = response.trim_start();
    if let Some(after_open) = trimmed.strip_prefix("<think>") {
        if let Some(close) = after_open.find("</think>") {
            return after_open[close + "</think>".len()..].trim_start();
        }
    }
    trimmed
}

fn final_answer(text: &str) -> Option<String> {
    text.strip_prefix(FINAL_ANSWER_PREFIX)
        .map(|rest| rest.trim().to_string())
}

/// Scan `text` for the first balanced `{...}` that decodes as an invocation.
fn first_invocation(text: &str) -> Option<ToolInvocation> {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find('{') {
        let start = offset + pos;
        if let Some(candidate) = extract_balanced_json(&text[start..]) {
            if let Some(call) = try_parse_invocation(candidate) {
                return Some(call);
            }
        }
        offset = start + 1;
    }
    None
}

/// Accept only `{"name": string, "arguments": object}`.
fn try_parse_invocation(s: &str) -> Option<ToolInvocation> {
    let json: serde_json::Value = serde_json::from_str(s).ok()?;
    let name = json.get("name")?.as_str()?;
    let arguments = json.get("arguments")?.as_object()?;
    if name.trim().is_empty() {
        return None;
    }
    Some(ToolInvocation {
        name: name.to_string(),
        arguments: arguments.clone(),
    })
}

/// Find the next markdown code fence and return its body and the text after it.
///
/// The language tag line (e.g. "json") is skipped.
fn next_fenced_block(content: &str) -> Option<(&str, &str)> {
    // Find opening fence
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line
    let body_start = after_opening.find('\n')? + 1;
    let body_and_rest = &after_opening[body_start..];

    // Find closing fence after the body starts
    let closing = body_and_rest.find("```")?;
    Some((&body_and_rest[..closing], &body_and_rest[closing + 3..]))
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
