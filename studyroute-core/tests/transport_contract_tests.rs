//! Wire contract of the provider transports against a mock HTTP server

use serde_json::json;
use std::time::Duration;
use studyroute_core::config::SecretString;
use studyroute_core::http::HttpClient;
use studyroute_core::protocol::Provider;
use studyroute_core::providers::{
    AnthropicClient, OpenRouterClient, TransportClient, TransportError, TransportRequest,
};
use test_case::test_case;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(model: &str) -> TransportRequest {
    TransportRequest {
        model: model.to_string(),
        api_key: SecretString::new("sk-test"),
        system_prompt: "system prompt".to_string(),
        user_prompt: "user prompt".to_string(),
        max_output_tokens: 1024,
        temperature: 0.5,
        timeout: Duration::from_secs(5),
    }
}

fn anthropic(server: &MockServer) -> AnthropicClient {
    AnthropicClient::with_base_url(HttpClient::new().unwrap(), server.uri())
}

fn openrouter(server: &MockServer) -> OpenRouterClient {
    OpenRouterClient::with_base_url(HttpClient::new().unwrap(), server.uri())
}

async fn mount_status(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_anthropic_request_shape_and_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-sonnet-latest",
            "max_tokens": 1024,
            "temperature": 0.5,
            "system": "system prompt",
            "messages": [{"role": "user", "content": "user prompt"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                {"type": "text", "text": "{\"title\":"},
                {"type": "text", "text": "\"X\"}\n"}
            ],
            "usage": {"input_tokens": 12, "output_tokens": 7}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = anthropic(&server)
        .generate(&request("claude-3-5-sonnet-latest"))
        .await
        .unwrap();

    assert_eq!(response.output_text, "{\"title\":\"X\"}");
    assert_eq!(response.input_tokens, Some(12));
    assert_eq!(response.output_tokens, Some(7));
}

#[tokio::test]
async fn test_openrouter_request_shape_and_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "model": "openai/gpt-4o-mini",
            "temperature": 0.5,
            "messages": [
                {"role": "system", "content": "system prompt"},
                {"role": "user", "content": "user prompt"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"ok\":true}"}}],
            "usage": {"prompt_tokens": 30, "completion_tokens": 4}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = openrouter(&server)
        .generate(&request("openai/gpt-4o-mini"))
        .await
        .unwrap();

    assert_eq!(response.output_text, "{\"ok\":true}");
    assert_eq!(response.input_tokens, Some(30));
    assert_eq!(response.output_tokens, Some(4));
}

#[tokio::test]
async fn test_missing_or_malformed_usage_is_tolerated() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "/api/v1/chat/completions",
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "hi"}}],
            "usage": {"prompt_tokens": -3, "completion_tokens": "many"}
        })),
    )
    .await;

    let response = openrouter(&server)
        .generate(&request("openai/gpt-4o-mini"))
        .await
        .unwrap();

    assert_eq!(response.input_tokens, None);
    assert_eq!(response.output_tokens, None);
}

#[test_case(429, "rate_limited" ; "too many requests")]
#[test_case(500, "server_error" ; "internal error")]
#[test_case(503, "server_error" ; "unavailable")]
#[test_case(400, "rejected" ; "bad request")]
#[test_case(401, "rejected" ; "unauthorized")]
#[test_case(404, "rejected" ; "not found")]
#[tokio::test]
async fn test_anthropic_status_classification(status: u16, kind: &str) {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "/v1/messages",
        ResponseTemplate::new(status)
            .set_body_json(json!({"error": {"type": "x", "message": "boom"}})),
    )
    .await;

    let err = anthropic(&server)
        .generate(&request("claude-3-5-sonnet-latest"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), kind);
    assert_eq!(err.provider(), Provider::Anthropic);
    assert_eq!(
        err.to_string(),
        format!("anthropic request failed with status={}. detail=boom", status)
    );
}

#[tokio::test]
async fn test_openrouter_data_policy_detail_is_preserved() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "/api/v1/chat/completions",
        ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "No endpoints found matching your data policy", "code": 404}
        })),
    )
    .await;

    let err = openrouter(&server)
        .generate(&request("openai/gpt-4o-mini"))
        .await
        .unwrap_err();

    match err {
        TransportError::Rejected {
            provider,
            status_code,
            message,
        } => {
            assert_eq!(provider, Provider::OpenRouter);
            assert_eq!(status_code, 404);
            assert!(message.ends_with("detail=No endpoints found matching your data policy"));
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_long_error_detail_is_truncated() {
    let server = MockServer::start().await;
    let detail = "x".repeat(1_000);
    mount_status(
        &server,
        "/v1/messages",
        ResponseTemplate::new(400).set_body_string(detail),
    )
    .await;

    let err = anthropic(&server)
        .generate(&request("claude-3-5-sonnet-latest"))
        .await
        .unwrap_err();

    let message = err.to_string();
    let (_, shown) = message.split_once("detail=").unwrap();
    assert_eq!(shown.chars().count(), 303);
    assert!(shown.ends_with("..."));
}

#[tokio::test]
async fn test_error_without_body_has_no_detail() {
    let server = MockServer::start().await;
    mount_status(&server, "/v1/messages", ResponseTemplate::new(502)).await;

    let err = anthropic(&server)
        .generate(&request("claude-3-5-sonnet-latest"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "anthropic request failed with status=502.");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_invalid_json_success_body_is_invalid_response() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "/v1/messages",
        ResponseTemplate::new(200).set_body_string("<html>oops</html>"),
    )
    .await;

    let err = anthropic(&server)
        .generate(&request("claude-3-5-sonnet-latest"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_response");
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("invalid JSON payload"));
}

#[tokio::test]
async fn test_non_object_root_is_invalid_response() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "/api/v1/chat/completions",
        ResponseTemplate::new(200).set_body_json(json!(["not", "an", "object"])),
    )
    .await;

    let err = openrouter(&server)
        .generate(&request("openai/gpt-4o-mini"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("root must be a JSON object"));
}

#[tokio::test]
async fn test_empty_openrouter_content_is_invalid_response() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "/api/v1/chat/completions",
        ResponseTemplate::new(200)
            .set_body_json(json!({"choices": [{"message": {"content": ""}}]})),
    )
    .await;

    let err = openrouter(&server)
        .generate(&request("openai/gpt-4o-mini"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_response");
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        "/v1/messages",
        ResponseTemplate::new(200)
            .set_body_json(json!({"content": [{"type": "text", "text": "late"}]}))
            .set_delay(Duration::from_millis(500)),
    )
    .await;

    let mut slow = request("claude-3-5-sonnet-latest");
    slow.timeout = Duration::from_millis(50);

    let err = anthropic(&server).generate(&slow).await.unwrap_err();

    assert!(matches!(
        err,
        TransportError::Timeout {
            provider: Provider::Anthropic
        }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_host_is_connection_error() {
    // Nothing listens on port 9 (discard) in the test environment
    let client = AnthropicClient::with_base_url(HttpClient::new().unwrap(), "http://127.0.0.1:9");

    let err = client
        .generate(&request("claude-3-5-sonnet-latest"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "connection");
    assert!(err.is_retryable());
}
