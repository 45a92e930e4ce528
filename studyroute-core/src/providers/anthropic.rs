//! Anthropic transport client
//!
//! Talks to the Messages API: the system prompt travels in its own field and
//! the user prompt is the single user message. Output text is the
//! concatenation of every `text` content block.

use crate::http::HttpClient;
use crate::protocol::Provider;
use crate::providers::adapter::{
    extract_usage_tokens, TransportClient, TransportRequest, TransportResponse,
};
use crate::providers::error::{TransportError, TransportResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Default Anthropic API base URL
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value sent with every request
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const MESSAGES_PATH: &str = "/v1/messages";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Anthropic Messages API client
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: HttpClient,
    base_url: String,
}

impl AnthropicClient {
    /// Create a client against the public API
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, DEFAULT_ANTHROPIC_BASE_URL)
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_body(request: &TransportRequest) -> MessagesRequest<'_> {
        MessagesRequest {
            model: &request.model,
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            system: &request.system_prompt,
            messages: [UserMessage {
                role: "user",
                content: &request.user_prompt,
            }],
        }
    }
}

/// Concatenate the `text` content blocks of a Messages API payload
pub(crate) fn extract_anthropic_text(payload: &Map<String, Value>) -> TransportResult<String> {
    let content = payload
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            TransportError::invalid_response(
                Provider::Anthropic,
                "anthropic response is missing content array.",
            )
        })?;

    let combined: String = content
        .iter()
        .filter_map(Value::as_object)
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();

    let combined = combined.trim();
    if combined.is_empty() {
        return Err(TransportError::invalid_response(
            Provider::Anthropic,
            "anthropic response contains no text content.",
        ));
    }
    Ok(combined.to_string())
}

#[async_trait]
impl TransportClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate(&self, request: &TransportRequest) -> TransportResult<TransportResponse> {
        let body = Self::build_body(request);
        let headers = [
            ("x-api-key", request.api_key.expose_secret().to_string()),
            ("anthropic-version", ANTHROPIC_VERSION.to_string()),
        ];
        let url = format!("{}{}", self.base_url, MESSAGES_PATH);

        let payload = self
            .http
            .post_json(Provider::Anthropic, &url, &headers, &body, request.timeout)
            .await?;

        let output_text = extract_anthropic_text(&payload)?;
        let (input_tokens, output_tokens) =
            extract_usage_tokens(payload.get("usage"), "input_tokens", "output_tokens");

        Ok(TransportResponse {
            output_text,
            input_tokens,
            output_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecretString;
    use serde_json::json;
    use std::time::Duration;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let request = TransportRequest {
            model: "claude-3-5-sonnet-latest".to_string(),
            api_key: SecretString::new("key"),
            system_prompt: "sys".to_string(),
            user_prompt: "usr".to_string(),
            max_output_tokens: 512,
            temperature: 0.5,
            timeout: Duration::from_secs(5),
        };

        let body = serde_json::to_value(AnthropicClient::build_body(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "claude-3-5-sonnet-latest",
                "max_tokens": 512,
                "temperature": 0.5,
                "system": "sys",
                "messages": [{"role": "user", "content": "usr"}]
            })
        );
    }

    #[test]
    fn test_text_blocks_are_concatenated() {
        let payload = object(json!({
            "content": [
                {"type": "text", "text": "  {\"a\":"},
                {"type": "tool_use", "text": "ignored"},
                "not an object",
                {"type": "text", "text": " 1}  "}
            ]
        }));
        assert_eq!(extract_anthropic_text(&payload).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_missing_or_empty_content_is_invalid() {
        let err = extract_anthropic_text(&object(json!({"id": "x"}))).unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse { .. }));

        let err = extract_anthropic_text(&object(json!({
            "content": [{"type": "text", "text": "   "}]
        })))
        .unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse { .. }));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client =
            AnthropicClient::with_base_url(HttpClient::new().unwrap(), "http://localhost:9/");
        assert_eq!(client.base_url(), "http://localhost:9");
    }
}
