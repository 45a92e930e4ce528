//! Provider transport layer
//!
//! This module contains everything between the router and the provider HTTP
//! APIs:
//! - The [`TransportClient`] port and its Anthropic and OpenRouter implementations
//! - The transport error taxonomy
//! - Bounded exponential-backoff retry
//! - The compliance-checked routing policy

pub mod adapter;
pub mod anthropic;
pub mod error;
pub mod openrouter;
pub mod retry;
pub mod routing;

pub use adapter::{TransportClient, TransportRequest, TransportResponse};
pub use anthropic::AnthropicClient;
pub use error::{TransportError, TransportResult};
pub use openrouter::OpenRouterClient;
pub use retry::{RetryError, RetryExecutor, RetryPolicy, Sleeper, TokioSleeper};
pub use routing::{default_routes, required_provider, Route, RoutingPolicy};
