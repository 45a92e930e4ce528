//! Studyroute Core Library
//!
//! Policy-routed LLM calls with retry, strict output validation through a
//! bounded repair loop, and an audit trail of every invocation.

pub mod audit;
pub mod config;
pub mod domain;
pub mod http;
pub mod keys;
pub mod logging;
pub mod protocol;
pub mod providers;
pub mod router;
pub mod structured;
pub mod workflows;

pub use protocol::{CallRequest, CallResponse, Provider, TaskType};
pub use router::{LlmRouter, Router, RouterBuilder, RouterError};
pub use structured::{StructuredOutput, SchemaViolation};

/// Returns the version of the Studyroute Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
