//! Protocol module for routed LLM calls
//!
//! This module defines the caller-facing data model of the router:
//! - Closed task and provider enumerations that drive routing policy
//! - The generic call request carrying the expected output schema
//! - The validated call response returned to callers

pub mod types;

pub use types::{CallRequest, CallResponse, Provider, TaskType, UnknownVariant};
