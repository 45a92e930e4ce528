//! Core protocol types for routed LLM calls
//!
//! The design prioritizes:
//! - Closed enumerations so routing policy exhaustiveness is checked by the compiler
//! - A request type parameterized by the expected output schema
//! - Stable wire names shared by configuration files and audit storage

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Default upper bound on generated tokens for one call
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

/// Default sampling temperature for one call
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Category of caller intent used to select the policy-mandated provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskType {
    /// Decompose imported course text into a structured plan
    #[serde(rename = "course_parse")]
    CourseParse,
    /// Generate practice task candidates for one module
    #[serde(rename = "practice_gen")]
    PracticeGenerate,
    /// Grade a submitted practice answer
    #[serde(rename = "practice_grade")]
    PracticeGrade,
    /// Produce a curator message for the learner
    #[serde(rename = "curator_msg")]
    CuratorMessage,
}

impl TaskType {
    /// Every task type, in declaration order
    pub const ALL: [TaskType; 4] = [
        TaskType::CourseParse,
        TaskType::PracticeGenerate,
        TaskType::PracticeGrade,
        TaskType::CuratorMessage,
    ];

    /// Stable wire name used in configuration and audit rows
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::CourseParse => "course_parse",
            TaskType::PracticeGenerate => "practice_gen",
            TaskType::PracticeGrade => "practice_grade",
            TaskType::CuratorMessage => "curator_msg",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .into_iter()
            .find(|task| task.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("task type", s))
    }
}

/// LLM provider reachable through a transport client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Message-style API (`/v1/messages`)
    Anthropic,
    /// Chat-completions style API (`/api/v1/chat/completions`)
    OpenRouter,
}

impl Provider {
    /// Every provider, in declaration order
    pub const ALL: [Provider; 2] = [Provider::Anthropic, Provider::OpenRouter];

    /// Stable wire name used in configuration and audit rows
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|provider| provider.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("provider", s))
    }
}

/// Error returned when parsing a closed enumeration from its wire name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    /// Name of the enumeration being parsed
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Routed LLM call with the expected output schema as type parameter `T`
#[derive(Debug, Clone)]
pub struct CallRequest<T> {
    /// Task type that selects provider and model
    pub task_type: TaskType,

    /// System prompt sent to the provider
    pub system_prompt: String,

    /// User prompt sent to the provider
    pub user_prompt: String,

    /// Caller-supplied identifier threading one user action across logs
    pub correlation_id: String,

    /// Course the call belongs to (audit correlation only)
    pub course_id: Option<String>,

    /// Module the call belongs to (audit correlation only)
    pub module_id: Option<String>,

    /// Upper bound on generated tokens
    pub max_output_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    schema: PhantomData<fn() -> T>,
}

impl<T> CallRequest<T> {
    /// Create a request with default limits
    pub fn new(
        task_type: TaskType,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            task_type,
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            correlation_id: correlation_id.into(),
            course_id: None,
            module_id: None,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            schema: PhantomData,
        }
    }

    /// Attach the course identifier
    pub fn with_course_id(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    /// Attach the module identifier
    pub fn with_module_id(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }

    /// Set the output token limit
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Schema-validated result of one router invocation
#[derive(Debug, Clone)]
pub struct CallResponse<T> {
    /// Identifier of the router invocation (shared by its audit record)
    pub call_id: Uuid,

    /// Provider that served the call
    pub provider: Provider,

    /// Model that served the call
    pub model: String,

    /// Deterministic digest of the system and user prompts
    pub prompt_hash: String,

    /// Wall time spent in the provider call, including retries
    pub latency_ms: u64,

    /// Validated payload
    pub parsed: T,

    /// Raw model output
    pub output_text: String,

    /// Prompt tokens reported by the provider
    pub input_tokens: Option<u64>,

    /// Completion tokens reported by the provider
    pub output_tokens: Option<u64>,
}
