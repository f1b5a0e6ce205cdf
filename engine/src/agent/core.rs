//! Agent Core
//!
//! This module implements the core agent loop that drives one user request
//! through a bounded prompt → model → interpret → act cycle:
//!
//! 1. Check the shortcut triggers; a match answers from one tool directly
//! 2. Build the prompt from history, the input and this run's scratchpad
//! 3. Call the model (bounded by the model timeout)
//! 4. Interpret the response (final answer or tool call)
//! 5. If tool call: execute it, append action and observation, continue
//! 6. If final answer: append it and return
//!
//! Tool failures become observations so the model can adapt; every other
//! failure ends the run. Running out of steps is `MaxStepsExceeded`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sdk::errors::{AgentErrorExt, EngineError};
use sdk::types::{ToolInvocation, ToolResult};
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::history::{HistoryStore, Session, Turn};
use super::interpreter::{ActionParser, Decision, JsonActionParser};
use super::prompt::PromptBuilder;
use super::shortcut::Shortcut;
use crate::config::Config;
use crate::llm::LLMProvider;
use crate::tools::ToolRegistry;

/// Default number of model calls per run
const MAX_ITERATIONS: usize = 5;

/// Default timeout for each model call in seconds
const LLM_TIMEOUT_SECS: u64 = 60;

/// Loop limits
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_steps: usize,
    pub model_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: MAX_ITERATIONS,
            model_timeout: Duration::from_secs(LLM_TIMEOUT_SECS),
        }
    }
}

impl From<&Config> for AgentConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_steps: config.agent.max_steps,
            model_timeout: Duration::from_secs(config.llm.timeout_secs),
        }
    }
}

/// One iteration of the loop, returned to the caller for inspection
#[derive(Debug, Clone, Serialize)]
pub struct AgentStep {
    /// 1-based step number
    pub index: usize,
    pub prompt: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation: Option<ToolInvocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub session_id: String,
    pub answer: String,
    pub steps: Vec<AgentStep>,
    /// Answered by the shortcut without calling the model
    pub via_shortcut: bool,
    pub duration_ms: u64,
}

impl RunOutcome {
    /// Number of model calls made
    pub fn iterations(&self) -> usize {
        self.steps.len()
    }
}

/// Agent Core that orchestrates the agent loop
pub struct AgentCore {
    provider: Arc<dyn LLMProvider>,

    /// Tool registry for dispatching tool calls
    tools: Arc<ToolRegistry>,

    parser: Box<dyn ActionParser>,

    prompt: PromptBuilder,

    shortcut: Option<Shortcut>,

    /// Where sessions are saved after every step; in-memory only when unset
    store: Option<HistoryStore>,

    config: AgentConfig,
}

impl AgentCore {
    /// Create a new agent core with the default parser and no shortcut
    pub fn new(provider: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        let prompt = PromptBuilder::new(tools.descriptors());
        Self {
            provider,
            tools,
            parser: Box::new(JsonActionParser),
            prompt,
            shortcut: None,
            store: None,
            config,
        }
    }

    pub fn with_parser(mut self, parser: Box<dyn ActionParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_shortcut(mut self, shortcut: Option<Shortcut>) -> Self {
        self.shortcut = shortcut;
        self
    }

    pub fn with_history_store(mut self, store: HistoryStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Drive one user request to a final answer
    ///
    /// The session is only appended to: the user turn first, then action and
    /// observation turns, then the assistant's answer. It is saved after
    /// every completed step when a history store is attached. A failed run
    /// rolls the session back to its turns from before the run.
    pub async fn run(&self, session: &mut Session, input: &str) -> Result<RunOutcome, EngineError> {
        let span = info_span!(
            "agent_run",
            session = %session.id,
            model = %self.provider.model()
        );
        let base = session.history.len();
        let result = self.run_inner(session, input).instrument(span).await;

        if result.is_err() && session.history.len() > base {
            debug!("Rolling session '{}' back to {} turns", session.id, base);
            session.truncate(base);
            if let Err(e) = self.save(session) {
                warn!("Could not save rolled back session '{}': {}", session.id, e);
            }
        }
        result
    }

    async fn run_inner(&self, session: &mut Session, input: &str) -> Result<RunOutcome, EngineError> {
        let start_time = Instant::now();
        info!("Starting run: {}", input);

        // Turns before this index belong to earlier runs
        let base = session.history.len();
        session.model = Some(self.provider.model().to_string());
        session.append(Turn::user(input));

        if let Some(shortcut) = &self.shortcut {
            if let Some(trigger) = shortcut.matches(input) {
                info!("Input matched shortcut trigger '{}', calling '{}'", trigger, shortcut.tool());
                let result = self.tools.invoke(&shortcut.invocation(input)).await.map_err(|e| {
                    error!("Shortcut tool failed: {}", e);
                    e
                })?;

                session.append(Turn::assistant(&result.output));
                self.save(session)?;
                return Ok(RunOutcome {
                    session_id: session.id.clone(),
                    answer: result.output,
                    steps: Vec::new(),
                    via_shortcut: true,
                    duration_ms: elapsed_ms(start_time),
                });
            }
        }

        let mut steps = Vec::new();
        for index in 1..=self.config.max_steps {
            debug!("Step {}/{}", index, self.config.max_steps);

            let turns = session.turns();
            let prompt = self.prompt.build(&turns[..base], input, &turns[base + 1..]);
            debug!("Prompt ({} chars):\n{}", prompt.len(), prompt);

            let response = self.call_model(&prompt).await?;
            debug!("Response:\n{}", response);

            let decision = self.parser.parse(&response).map_err(|e| {
                warn!("{} parser found no action in response: {:?}", self.parser.name(), response);
                e
            })?;

            match decision {
                Decision::Final(answer) => {
                    info!("Final answer after {} step(s)", index);
                    session.append(Turn::assistant(&answer));
                    steps.push(AgentStep {
                        index,
                        prompt,
                        response,
                        invocation: None,
                        observation: None,
                    });
                    self.save(session)?;

                    let duration_ms = elapsed_ms(start_time);
                    info!("Run completed in {}ms", duration_ms);
                    return Ok(RunOutcome {
                        session_id: session.id.clone(),
                        answer,
                        steps,
                        via_shortcut: false,
                        duration_ms,
                    });
                }
                Decision::ToolCall(call) => {
                    info!("Tool call: {}", call.name);
                    session.append(Turn::action(call.to_json()));

                    let observation = self.observe(&call).await?;
                    debug!("Observation: {}", observation);
                    session.append(Turn::observation(&observation));

                    steps.push(AgentStep {
                        index,
                        prompt,
                        response,
                        invocation: Some(call),
                        observation: Some(observation),
                    });
                    self.save(session)?;
                }
            }
        }

        warn!("No final answer within {} steps", self.config.max_steps);
        Err(EngineError::MaxStepsExceeded(self.config.max_steps))
    }

    async fn call_model(&self, prompt: &str) -> Result<String, EngineError> {
        match timeout(self.config.model_timeout, self.provider.complete(prompt)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                error!("LLM call failed: {}", e);
                Err(e.into())
            }
            Err(_) => {
                let secs = self.config.model_timeout.as_secs();
                error!("LLM call timed out after {}s", secs);
                Err(EngineError::Timeout(secs))
            }
        }
    }

    /// Run a tool call, turning recoverable failures into observation text
    async fn observe(&self, call: &ToolInvocation) -> Result<String, EngineError> {
        match self.tools.invoke(call).await {
            Ok(result) => Ok(result.observation()),
            Err(e) if e.is_recoverable() => {
                warn!("Tool '{}' failed ({}): {}", call.name, e.kind(), e);
                Ok(ToolResult::failure(&e).observation())
            }
            Err(e) => Err(e),
        }
    }

    fn save(&self, session: &Session) -> Result<(), EngineError> {
        match &self.store {
            Some(store) => store.save(session),
            None => Ok(()),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
