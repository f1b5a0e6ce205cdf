//! Integration tests for the Ollama provider
//!
//! These tests run against a wiremock server standing in for Ollama, so no
//! local model is required.

use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use lagent_engine::llm::ollama::{OllamaOptions, OllamaProvider};
use lagent_engine::llm::{ApiStyle, LLMError, LLMProvider};

fn options(api: ApiStyle, stream: bool) -> OllamaOptions {
    OllamaOptions {
        api,
        stream,
        ..OllamaOptions::default()
    }
}

#[tokio::test]
async fn test_generate_request_and_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "deepseek-r1:1.5b",
            "prompt": "Say hi",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "deepseek-r1:1.5b",
            "response": "Final Answer: hi",
            "done": true
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OllamaProvider::new(mock_server.uri(), "deepseek-r1:1.5b");
    assert_eq!(provider.name(), "ollama");
    assert_eq!(provider.model(), "deepseek-r1:1.5b");

    let text = provider.complete("Say hi").await.unwrap();
    assert_eq!(text, "Final Answer: hi");
}

#[tokio::test]
async fn test_chat_request_wraps_prompt_as_user_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": "Say hi"}],
            "options": {"temperature": 0.5}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "m",
            "message": {"role": "assistant", "content": "hello there"},
            "done": true
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = OllamaProvider::with_options(
        mock_server.uri(),
        "m",
        OllamaOptions {
            temperature: Some(0.5),
            ..options(ApiStyle::Chat, false)
        },
    );

    assert_eq!(provider.complete("Say hi").await.unwrap(), "hello there");
}

#[tokio::test]
async fn test_streamed_generate_is_joined() {
    let mock_server = MockServer::start().await;

    let body = [
        json!({"response": "Final ", "done": false}),
        json!({"response": "Answer: ", "done": false}),
        json!({"response": "42", "done": false}),
        json!({"response": "", "done": true}),
    ]
    .iter()
    .map(|v| v.to_string())
    .collect::<Vec<_>>()
    .join("\n");

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let provider =
        OllamaProvider::with_options(mock_server.uri(), "m", options(ApiStyle::Generate, true));
    assert_eq!(provider.complete("q").await.unwrap(), "Final Answer: 42");
}

#[tokio::test]
async fn test_streamed_chat_is_joined() {
    let mock_server = MockServer::start().await;

    let body = format!(
        "{}\n{}\n",
        json!({"message": {"role": "assistant", "content": "Final Answer: "}, "done": false}),
        json!({"message": {"role": "assistant", "content": "ok"}, "done": true}),
    );

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let provider =
        OllamaProvider::with_options(mock_server.uri(), "m", options(ApiStyle::Chat, true));
    assert_eq!(provider.complete("q").await.unwrap(), "Final Answer: ok");
}

#[tokio::test]
async fn test_stream_error_chunk() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"error\":\"out of memory\"}\n"))
        .mount(&mock_server)
        .await;

    let provider =
        OllamaProvider::with_options(mock_server.uri(), "m", options(ApiStyle::Generate, true));
    match provider.complete("q").await {
        Err(LLMError::Decode(msg)) => assert!(msg.contains("out of memory")),
        other => panic!("Expected Decode error, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_non_success_status_is_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string("{\"error\":\"model 'm' not found\"}"),
        )
        .mount(&mock_server)
        .await;

    let provider = OllamaProvider::new(mock_server.uri(), "m");
    match provider.complete("q").await {
        Err(LLMError::Server { status, body }) => {
            assert_eq!(status, 404);
            assert!(body.contains("not found"));
        }
        other => panic!("Expected Server error, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&mock_server)
        .await;

    let provider = OllamaProvider::new(mock_server.uri(), "m");
    assert!(matches!(
        provider.complete("q").await,
        Err(LLMError::Decode(_))
    ));
}

#[tokio::test]
async fn test_http_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "late", "done": true}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let provider = OllamaProvider::with_options(
        mock_server.uri(),
        "m",
        OllamaOptions {
            timeout: Duration::from_millis(200),
            ..OllamaOptions::default()
        },
    );
    assert!(matches!(
        provider.complete("q").await,
        Err(LLMError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_ollama_connection_error() {
    // Nothing listens on port 1
    let provider = OllamaProvider::new("http://127.0.0.1:1", "m");

    match provider.complete("Hello").await {
        Err(LLMError::Connection(msg)) => assert!(msg.contains("127.0.0.1:1")),
        other => panic!("Expected Connection error, got: {:?}", other),
    }
    assert!(!provider.check_health().await);
}

#[tokio::test]
async fn test_check_health() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .mount(&mock_server)
        .await;

    let provider = OllamaProvider::new(format!("{}/", mock_server.uri()), "m");
    assert!(provider.check_health().await);
}
