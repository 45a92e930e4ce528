//! HTTP error mapping utilities

use crate::protocol::Provider;
use crate::providers::error::TransportError;
use reqwest::StatusCode;
use serde_json::Value;

/// Longest error detail carried into a transport error message
pub const MAX_ERROR_DETAIL_CHARS: usize = 300;

/// Map a non-success HTTP status and its body to a [`TransportError`]
pub fn map_http_error(provider: Provider, status: StatusCode, body: Option<&str>) -> TransportError {
    let status_code = status.as_u16();
    let mut message = format!("{} request failed with status={}.", provider, status_code);
    if let Some(detail) = body.and_then(extract_error_detail) {
        message = format!("{} detail={}", message, detail);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => TransportError::RateLimited { provider, message },
        status if status.is_server_error() => TransportError::ServerError {
            provider,
            status_code,
            message,
        },
        _ => TransportError::Rejected {
            provider,
            status_code,
            message,
        },
    }
}

/// Extract a human-readable detail from an error response body
///
/// JSON bodies are searched for an `error` string, `error.message`,
/// `error.type`, then a top-level `message`. A body that is not JSON is used
/// as-is after trimming. The detail is truncated to
/// [`MAX_ERROR_DETAIL_CHARS`] characters.
pub fn extract_error_detail(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(payload)) => {
            read_message_from_error_payload(&payload).map(|detail| truncate_detail(&detail))
        }
        Ok(_) => None,
        Err(_) => {
            let text = body.trim();
            if text.is_empty() {
                None
            } else {
                Some(truncate_detail(text))
            }
        }
    }
}

fn read_message_from_error_payload(payload: &serde_json::Map<String, Value>) -> Option<String> {
    fn non_blank(value: Option<&Value>) -> Option<String> {
        value
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }

    match payload.get("error") {
        Some(error @ Value::String(_)) => {
            if let Some(detail) = non_blank(Some(error)) {
                return Some(detail);
            }
        }
        Some(Value::Object(error)) => {
            if let Some(detail) = non_blank(error.get("message")).or_else(|| non_blank(error.get("type"))) {
                return Some(detail);
            }
        }
        _ => {}
    }

    non_blank(payload.get("message"))
}

fn truncate_detail(value: &str) -> String {
    match value.char_indices().nth(MAX_ERROR_DETAIL_CHARS) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}
