//! OpenRouter provider
//!
//! Chat-completions style API: the system and user prompts are sent as two
//! messages and the output is the content of the first choice.

mod client;
mod types;

pub use client::{OpenRouterClient, DEFAULT_OPENROUTER_BASE_URL};

/// Detail fragment OpenRouter returns when no endpoint satisfies the account's data policy
pub const DATA_POLICY_MISMATCH_DETAIL: &str = "no endpoints found matching your data policy";
