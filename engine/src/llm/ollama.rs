//! Ollama LLM Provider
//!
//! This module implements the LLMProvider trait for Ollama, a local LLM provider.
//! Ollama runs models locally on the user's machine, typically at http://localhost:11434.
//!
//! Key features:
//! - `/api/generate` (prompt) and `/api/chat` (messages) request styles
//! - Non-streaming by default; streamed NDJSON chunks are joined into one string
//! - Error mapping to distinct connection / server / decode / timeout kinds

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ApiStyle, LLMError, LLMProvider, Result};

/// Default request ceiling when none is configured
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Request tuning for the Ollama provider
#[derive(Debug, Clone)]
pub struct OllamaOptions {
    /// Endpoint style (`generate` or `chat`)
    pub api: ApiStyle,

    /// Ask the server to stream chunks instead of one JSON body
    pub stream: bool,

    /// Ceiling for a single HTTP exchange
    pub timeout: Duration,

    /// Sampling temperature forwarded in `options`
    pub temperature: Option<f32>,
}

impl Default for OllamaOptions {
    fn default() -> Self {
        Self {
            api: ApiStyle::Generate,
            stream: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temperature: None,
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Base URL for Ollama API (typically http://localhost:11434)
    base_url: String,

    /// Model name to use (e.g., "deepseek-r1:1.5b")
    model: String,

    options: OllamaOptions,

    /// HTTP client for API requests
    client: Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider with default options
    ///
    /// # Arguments
    /// * `base_url` - Base URL for Ollama API (e.g., "http://localhost:11434")
    /// * `model` - Model name to use (e.g., "llama3.1:8b")
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_options(base_url, model, OllamaOptions::default())
    }

    /// Create a new Ollama provider with explicit request options
    pub fn with_options(
        base_url: impl Into<String>,
        model: impl Into<String>,
        options: OllamaOptions,
    ) -> Self {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            options,
            client,
        }
    }

    fn endpoint(&self) -> String {
        match self.options.api {
            ApiStyle::Generate => format!("{}/api/generate", self.base_url),
            ApiStyle::Chat => format!("{}/api/chat", self.base_url),
        }
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let options = self
            .options
            .temperature
            .map(|temperature| RequestOptions { temperature });

        let body = match self.options.api {
            ApiStyle::Generate => serde_json::to_value(GenerateRequest {
                model: &self.model,
                prompt,
                stream: self.options.stream,
                options,
            }),
            ApiStyle::Chat => serde_json::to_value(ChatRequest {
                model: &self.model,
                messages: vec![OllamaMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                }],
                stream: self.options.stream,
                options,
            }),
        };
        body.unwrap_or_default()
    }

    fn map_send_error(&self, e: reqwest::Error) -> LLMError {
        if e.is_timeout() {
            LLMError::Timeout(self.options.timeout.as_secs())
        } else if e.is_connect() {
            LLMError::Connection(format!("Ollama at {}. Is Ollama running?", self.base_url))
        } else {
            LLMError::Connection(format!("{}: {}", self.base_url, e))
        }
    }

    /// Decode a single (non-streamed) response body
    fn decode_body(&self, text: &str) -> Result<String> {
        match self.options.api {
            ApiStyle::Generate => serde_json::from_str::<GenerateResponse>(text)
                .map(|r| r.response)
                .map_err(|e| LLMError::Decode(format!("generate response: {}", e))),
            ApiStyle::Chat => serde_json::from_str::<ChatResponse>(text)
                .map(|r| r.message.content)
                .map_err(|e| LLMError::Decode(format!("chat response: {}", e))),
        }
    }

    /// Join a streamed NDJSON response into one string
    async fn collect_stream(&self, response: reqwest::Response) -> Result<String> {
        let mut bytes_stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut collector = StreamCollector::default();

        while let Some(chunk_result) = bytes_stream.next().await {
            let bytes = chunk_result.map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout(self.options.timeout.as_secs())
                } else {
                    LLMError::Decode(format!("stream interrupted: {}", e))
                }
            })?;
            buffer.extend_from_slice(&bytes);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                collector.push_line(&line)?;
            }
            if collector.done {
                return Ok(collector.text);
            }
        }

        // Last chunk may arrive without a trailing newline
        collector.push_line(&buffer)?;
        collector.finish()
    }
}

/// Accumulates streamed chunks until one reports `done: true`
#[derive(Debug, Default)]
struct StreamCollector {
    text: String,
    chunks: usize,
    done: bool,
}

impl StreamCollector {
    fn push_line(&mut self, line: &[u8]) -> Result<()> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let chunk: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| LLMError::Decode(format!("stream chunk: {}", e)))?;

        if let Some(error) = chunk.get("error").and_then(|v| v.as_str()) {
            return Err(LLMError::Decode(format!("model reported: {}", error)));
        }

        let token = chunk
            .get("response")
            .and_then(|v| v.as_str())
            .or_else(|| chunk.pointer("/message/content").and_then(|v| v.as_str()));
        if let Some(token) = token {
            self.text.push_str(token);
        }

        self.chunks += 1;
        if chunk.get("done").and_then(|v| v.as_bool()) == Some(true) {
            self.done = true;
        }
        Ok(())
    }

    fn finish(self) -> Result<String> {
        if self.chunks == 0 {
            return Err(LLMError::Decode("empty stream".to_string()));
        }
        Ok(self.text)
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = self.endpoint();
        let body = self.request_body(prompt);

        tracing::debug!(
            "Ollama request: url={}, model={}, stream={}, prompt_chars={}",
            url,
            self.model,
            self.options.stream,
            prompt.len()
        );

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        // Check response status
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Ollama API error ({}): {}", status, body);
            return Err(LLMError::Server { status, body });
        }

        let content = if self.options.stream {
            self.collect_stream(response).await?
        } else {
            let text = response.text().await.map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout(self.options.timeout.as_secs())
                } else {
                    LLMError::Decode(format!("reading body: {}", e))
                }
            })?;
            self.decode_body(&text)?
        };

        tracing::info!(
            "Ollama response received in {:.1}s ({} chars)",
            start.elapsed().as_secs_f64(),
            content.len()
        );

        Ok(content)
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!("Ollama health check failed: {}", e);
                false
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    temperature: f32,
}

/// `/api/generate` request format
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<RequestOptions>,
}

/// `/api/chat` request format
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<RequestOptions>,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

/// `/api/generate` response format
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[allow(dead_code)]
    #[serde(default)]
    done: bool,
}

/// `/api/chat` response format
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: OllamaMessage,
    #[allow(dead_code)]
    #[serde(default)]
    done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_provider() -> OllamaProvider {
        OllamaProvider::with_options(
            "http://localhost:11434/",
            "llama3.1:8b",
            OllamaOptions {
                api: ApiStyle::Chat,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_ollama_provider_properties() {
        let provider = OllamaProvider::new("http://localhost:11434", "deepseek-r1:1.5b");

        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "deepseek-r1:1.5b");
        assert_eq!(provider.endpoint(), "http://localhost:11434/api/generate");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        assert_eq!(chat_provider().endpoint(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_generate_body() {
        let provider = OllamaProvider::new("http://localhost:11434", "m");
        let body = provider.request_body("hello");

        assert_eq!(body["model"], "m");
        assert_eq!(body["prompt"], "hello");
        assert_eq!(body["stream"], false);
        assert!(body.get("options").is_none());
    }

    #[test]
    fn test_chat_body_wraps_prompt_in_user_message() {
        let body = chat_provider().request_body("hello");

        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert!(body.get("prompt").is_none());
    }

    #[test]
    fn test_temperature_forwarded() {
        let provider = OllamaProvider::with_options(
            "http://localhost:11434",
            "m",
            OllamaOptions {
                temperature: Some(0.0),
                ..Default::default()
            },
        );
        assert_eq!(provider.request_body("x")["options"]["temperature"], 0.0);
    }

    #[test]
    fn test_decode_body_missing_field() {
        let provider = OllamaProvider::new("http://localhost:11434", "m");
        let err = provider.decode_body(r#"{"done": true}"#).unwrap_err();
        assert!(matches!(err, LLMError::Decode(_)));

        let ok = provider
            .decode_body(r#"{"response": "Final Answer: 4", "done": true}"#)
            .unwrap();
        assert_eq!(ok, "Final Answer: 4");
    }

    #[test]
    fn test_stream_collector_joins_tokens() {
        let mut collector = StreamCollector::default();
        collector.push_line(br#"{"response": "Final ", "done": false}"#).unwrap();
        collector.push_line(b"\n").unwrap();
        collector.push_line(br#"{"response": "Answer: 4", "done": true}"#).unwrap();

        assert!(collector.done);
        assert_eq!(collector.finish().unwrap(), "Final Answer: 4");
    }

    #[test]
    fn test_stream_collector_chat_chunks() {
        let mut collector = StreamCollector::default();
        collector
            .push_line(br#"{"message": {"role": "assistant", "content": "hi"}, "done": true}"#)
            .unwrap();
        assert_eq!(collector.finish().unwrap(), "hi");
    }

    #[test]
    fn test_stream_collector_error_chunk() {
        let mut collector = StreamCollector::default();
        let err = collector
            .push_line(br#"{"error": "model not loaded"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("model not loaded"));
    }

    #[test]
    fn test_empty_stream_is_decode_error() {
        let collector = StreamCollector::default();
        assert!(matches!(collector.finish(), Err(LLMError::Decode(_))));
    }
}
