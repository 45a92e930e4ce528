//! OpenRouter chat-completions wire types
//!
//! Only the request is typed; responses are read field by field so a
//! malformed payload maps to a precise error message.

use serde::Serialize;

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub messages: [ChatMessage<'a>; 2],
}

/// Chat message
#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> ChatCompletionRequest<'a> {
    pub fn new(model: &'a str, temperature: f32, system: &'a str, user: &'a str) -> Self {
        Self {
            model,
            temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        }
    }
}
