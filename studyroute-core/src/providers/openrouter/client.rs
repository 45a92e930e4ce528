//! OpenRouter client implementation

use super::types::ChatCompletionRequest;
use crate::http::HttpClient;
use crate::protocol::Provider;
use crate::providers::adapter::{
    extract_usage_tokens, TransportClient, TransportRequest, TransportResponse,
};
use crate::providers::error::{TransportError, TransportResult};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Default OpenRouter API base URL
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai";

const CHAT_COMPLETIONS_PATH: &str = "/api/v1/chat/completions";

/// OpenRouter chat-completions client
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: HttpClient,
    base_url: String,
}

impl OpenRouterClient {
    /// Create a client against the public API
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, DEFAULT_OPENROUTER_BASE_URL)
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
}

fn invalid(message: &str) -> TransportError {
    TransportError::invalid_response(Provider::OpenRouter, message)
}

/// Read `choices[0].message.content` from a chat-completions payload
pub(crate) fn extract_openrouter_text(payload: &Map<String, Value>) -> TransportResult<String> {
    let first_choice = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| invalid("openrouter response is missing choices."))?;

    let first_choice = first_choice
        .as_object()
        .ok_or_else(|| invalid("openrouter first choice has unexpected type."))?;

    let message = first_choice
        .get("message")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("openrouter first choice is missing message object."))?;

    match message.get("content").and_then(Value::as_str) {
        Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
        _ => Err(invalid("openrouter message content is empty or invalid.")),
    }
}

#[async_trait]
impl TransportClient for OpenRouterClient {
    fn provider(&self) -> Provider {
        Provider::OpenRouter
    }

    async fn generate(&self, request: &TransportRequest) -> TransportResult<TransportResponse> {
        let body = ChatCompletionRequest::new(
            &request.model,
            request.temperature,
            &request.system_prompt,
            &request.user_prompt,
        );
        let headers = [
            (
                "authorization",
                format!("Bearer {}", request.api_key.expose_secret()),
            ),
        ];
        let url = format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH);

        let payload = self
            .http
            .post_json(Provider::OpenRouter, &url, &headers, &body, request.timeout)
            .await?;

        let output_text = extract_openrouter_text(&payload)?;
        let (input_tokens, output_tokens) =
            extract_usage_tokens(payload.get("usage"), "prompt_tokens", "completion_tokens");

        Ok(TransportResponse {
            output_text,
            input_tokens,
            output_tokens,
        })
    }
}
