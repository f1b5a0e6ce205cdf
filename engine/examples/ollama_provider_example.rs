//! Example demonstrating the Ollama LLM provider and the agent loop
//!
//! Prerequisites:
//! - Ollama must be installed and running (https://ollama.ai)
//! - A model must be pulled (e.g., `ollama pull deepseek-r1:1.5b`)
//!
//! Run with: cargo run --example ollama_provider_example

use std::sync::Arc;

use lagent_engine::agent::{AgentConfig, AgentCore, Session};
use lagent_engine::config::ToolsConfig;
use lagent_engine::llm::{ollama::OllamaProvider, LLMProvider};
use lagent_engine::tools::ToolRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Ollama Provider Example ===\n");

    let provider = Arc::new(OllamaProvider::new(
        "http://localhost:11434",
        "deepseek-r1:1.5b",
    ));

    println!("Provider: {}", provider.name());
    println!("Model: {}\n", provider.model());

    println!("Checking if Ollama is available...");
    if !provider.check_health().await {
        println!("✗ Ollama is not reachable");
        println!("\nTo use this example:");
        println!("  1. Install Ollama: https://ollama.ai");
        println!("  2. Start Ollama: ollama serve");
        println!("  3. Pull a model: ollama pull deepseek-r1:1.5b");
        return Ok(());
    }
    println!("✓ Ollama is running\n");

    // Raw completion
    let text = provider.complete("Reply with one word: hello").await?;
    println!("Raw completion:\n{}\n", text);

    // Same provider driving the agent loop with the built-in tools
    let tools = Arc::new(ToolRegistry::from_config(&ToolsConfig::default())?);
    println!("Tools: {}\n", tools.names().join(", "));

    let agent = AgentCore::new(provider, tools, AgentConfig::default());
    let mut session = Session::new("example")?;

    let question = "What is 12.5 multiplied by 4?";
    println!("User: {}", question);
    let outcome = agent.run(&mut session, question).await?;

    for step in &outcome.steps {
        if let Some(call) = &step.invocation {
            println!(
                "  step {}: {} -> {}",
                step.index,
                call.to_json(),
                step.observation.as_deref().unwrap_or("")
            );
        }
    }
    println!("Answer: {}", outcome.answer);
    println!("({} model calls, {}ms)", outcome.iterations(), outcome.duration_ms);

    Ok(())
}
