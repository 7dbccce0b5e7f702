use serde_json::json;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use oraculo::config::LlmConfig;
use oraculo::error::OraculoError;
use oraculo::llm::{LlmApiClient, LlmBackend, LlmProvider, ModelClient};

fn llm_config(model: &str) -> LlmConfig {
    LlmConfig {
        model: model.to_string(),
        api_key: Some("test-key".to_string()),
        base_url: None,
        timeout_secs: 30,
        max_retries: 3,
    }
}

fn llm_config_with_base_url(model: &str, base_url: String, max_retries: u32) -> LlmConfig {
    LlmConfig {
        model: model.to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url),
        timeout_secs: 5,
        max_retries,
    }
}

fn completion_body(content: &str, finish_reason: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4o-mini",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": finish_reason
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

fn api_error_body(message: &str, error_type: &str, code: &str) -> serde_json::Value {
    json!({
        "error": {
            "message": message,
            "type": error_type,
            "param": serde_json::Value::Null,
            "code": code
        }
    })
}

#[test]
fn test_openai_provider_detection() {
    let provider = LlmProvider::new(Some(&llm_config("openai/gpt-4o")));

    assert_eq!(provider.backend(), &LlmBackend::OpenAI);
    assert_eq!(provider.base_url(), Some("https://api.openai.com/v1"));
    assert_eq!(provider.name(), "openai/gpt-4o");
}

#[test]
fn test_gemini_provider_uses_openai_compatible_endpoint() {
    let provider = LlmProvider::new(Some(&llm_config("gemini/gemini-1.5-flash")));

    assert_eq!(provider.backend(), &LlmBackend::Gemini);
    assert_eq!(
        provider.base_url(),
        Some("https://generativelanguage.googleapis.com/v1beta/openai")
    );
}

#[test]
fn test_unknown_provider_with_base_url_is_openai_compatible() {
    let mut config = llm_config("my-model");
    config.base_url = Some("http://localhost:8080/v1".to_string());
    let provider = LlmProvider::new(Some(&config));

    assert!(matches!(
        provider.backend(),
        LlmBackend::OpenAICompatible { .. }
    ));
    assert!(provider.is_available());
}

#[test]
fn test_unknown_provider_without_base_url_is_unavailable() {
    let provider = LlmProvider::new(Some(&llm_config("my-model")));

    assert!(!provider.is_available());
    assert_eq!(provider.backend().label(), "unavailable");
}

#[test]
fn test_missing_api_key_disables_provider() {
    let mut config = llm_config("openai/gpt-4o");
    config.api_key = None;
    let provider = LlmProvider::new(Some(&config));

    assert!(!provider.is_available());
    assert!(provider.config().is_some());
}

#[test]
fn test_ollama_needs_no_api_key() {
    let mut config = llm_config("ollama/llama3.2");
    config.api_key = None;

    assert!(LlmApiClient::new(&config).is_ok());
}

#[tokio::test]
async fn test_unavailable_provider_fails_fast() {
    let provider = LlmProvider::new(None);

    let result = provider.complete("Hola", 200).await;

    assert!(matches!(result, Err(OraculoError::LlmUnavailable(_))));
}

#[tokio::test]
async fn test_complete_returns_finished_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "max_tokens": 400 })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body("Todo irá bien", "stop")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = llm_config_with_base_url("openai/gpt-4o-mini", format!("{}/v1", server.uri()), 1);
    let provider = LlmProvider::new(Some(&config));

    let completion = provider.complete("¿Cómo me irá?", 400).await;

    match completion {
        Ok(value) => {
            assert_eq!(value.text, "Todo irá bien");
            assert!(!value.truncated);
        }
        Err(error) => panic!("Expected completion to succeed, got: {error}"),
    }
}

#[tokio::test]
async fn test_length_finish_reason_marks_truncation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion_body("Venus entra en", "length")),
        )
        .mount(&server)
        .await;

    let config = llm_config_with_base_url("openai/gpt-4o-mini", format!("{}/v1", server.uri()), 1);
    let provider = LlmProvider::new(Some(&config));

    let completion = provider.complete("Amor", 200).await.unwrap();

    assert!(completion.truncated);
    assert_eq!(completion.text, "Venus entra en");
}

#[tokio::test]
async fn test_retry_on_server_error() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_mock = Arc::clone(&attempts);

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(move |_request: &Request| {
            if attempts_for_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(500).set_body_string("upstream temporary failure")
            } else {
                ResponseTemplate::new(200).set_body_json(completion_body("Recuperado", "stop"))
            }
        })
        .mount(&server)
        .await;

    let config = llm_config_with_base_url("openai/gpt-4o-mini", format!("{}/v1", server.uri()), 2);
    let provider = LlmProvider::new(Some(&config));

    let result = provider.complete("Retry", 200).await;

    match result {
        Ok(value) => assert_eq!(value.text, "Recuperado"),
        Err(error) => panic!("Expected retry completion to succeed, got: {error}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rate_limit_surfaces_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(api_error_body(
            "Rate limit reached for requests",
            "requests",
            "rate_limit_exceeded",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = llm_config_with_base_url("openai/gpt-4o-mini", format!("{}/v1", server.uri()), 3);
    let provider = LlmProvider::new(Some(&config));

    let result = provider.complete("Rate limit", 200).await;

    assert!(matches!(
        result,
        Err(OraculoError::LlmRateLimit { retry_after: None })
    ));
}

#[tokio::test]
async fn test_insufficient_quota_is_a_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(api_error_body(
            "You exceeded your current quota",
            "insufficient_quota",
            "insufficient_quota",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = llm_config_with_base_url("openai/gpt-4o-mini", format!("{}/v1", server.uri()), 3);
    let provider = LlmProvider::new(Some(&config));

    let result = provider.complete("Quota", 200).await;

    assert!(matches!(result, Err(OraculoError::LlmRateLimit { .. })));
}

#[tokio::test]
async fn test_auth_error_returns_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(api_error_body(
            "Invalid API key",
            "invalid_request_error",
            "invalid_api_key",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = llm_config_with_base_url("openai/gpt-4o-mini", format!("{}/v1", server.uri()), 3);
    let provider = LlmProvider::new(Some(&config));

    let result = provider.complete("Auth", 200).await;

    match result {
        Err(OraculoError::Llm(message)) => {
            assert!(message.to_lowercase().contains("authentication failed"));
        }
        other => panic!("Expected Llm auth error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_content_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("  ", "stop")))
        .mount(&server)
        .await;

    let config = llm_config_with_base_url("openai/gpt-4o-mini", format!("{}/v1", server.uri()), 1);
    let provider = LlmProvider::new(Some(&config));

    let result = provider.complete("Vacío", 200).await;

    assert!(matches!(result, Err(OraculoError::Llm(_))));
}
