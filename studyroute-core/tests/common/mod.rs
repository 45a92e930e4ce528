//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use studyroute_core::audit::{AuditPayloadPolicy, AuditSink, InMemoryAuditSink};
use studyroute_core::config::env::default_model;
use studyroute_core::keys::InMemoryKeyStore;
use studyroute_core::protocol::{CallRequest, CallResponse, Provider, TaskType};
use studyroute_core::providers::routing::{default_routes_with, Route, RoutingPolicy};
use studyroute_core::providers::{
    RetryPolicy, Sleeper, TransportClient, TransportError, TransportRequest, TransportResponse,
    TransportResult,
};
use studyroute_core::router::{LlmRouter, Router, RouterError};
use studyroute_core::structured::{parse_structured, StructuredOutput};
use uuid::Uuid;

pub const COURSE_PLAN_JSON: &str = r#"{"title":"X","modules":[{"order":1,"title":"Intro","estimated_hours":2},{"order":2,"title":"Ownership","goals":["moves"],"estimated_hours":3.5}]}"#;

/// Sleeper that records requested delays instead of sleeping
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

/// Transport replaying a fixed script of outcomes
pub struct ScriptedTransport {
    provider: Provider,
    script: Mutex<VecDeque<TransportResult<TransportResponse>>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new(provider: Provider, script: Vec<TransportResult<TransportResponse>>) -> Self {
        Self {
            provider,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransportClient for ScriptedTransport {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn generate(&self, request: &TransportRequest) -> TransportResult<TransportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("transport script exhausted"))
    }
}

pub fn text(output: &str) -> TransportResult<TransportResponse> {
    Ok(TransportResponse {
        output_text: output.to_string(),
        input_tokens: Some(120),
        output_tokens: Some(45),
    })
}

pub fn server_error(provider: Provider) -> TransportResult<TransportResponse> {
    Err(TransportError::ServerError {
        provider,
        status_code: 503,
        message: format!("{} request failed with status=503.", provider),
    })
}

pub fn rate_limited(provider: Provider) -> TransportResult<TransportResponse> {
    Err(TransportError::RateLimited {
        provider,
        message: format!("{} request failed with status=429.", provider),
    })
}

pub fn rejected(provider: Provider, detail: &str) -> TransportResult<TransportResponse> {
    Err(TransportError::Rejected {
        provider,
        status_code: 404,
        message: format!("{} request failed with status=404. detail={}", provider, detail),
    })
}

/// Routing policy with built-in models, independent of the environment
pub fn builtin_policy() -> RoutingPolicy {
    RoutingPolicy::new(builtin_routes()).unwrap()
}

pub fn builtin_routes() -> HashMap<TaskType, Route> {
    default_routes_with(|provider| default_model(provider).to_string())
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay_ms: 100,
        max_delay_ms: 2_000,
        backoff_multiplier: 2.0,
        jitter_factor: 0.0,
    }
}

/// Router over one scripted transport with keys for both providers
pub struct Harness {
    pub router: Router,
    pub transport: Arc<ScriptedTransport>,
    pub audit: InMemoryAuditSink,
    pub sleeper: Arc<RecordingSleeper>,
}

pub fn harness(provider: Provider, script: Vec<TransportResult<TransportResponse>>) -> Harness {
    harness_with(provider, script, InMemoryAuditSink::new(), true)
}

pub fn harness_with(
    provider: Provider,
    script: Vec<TransportResult<TransportResponse>>,
    audit: InMemoryAuditSink,
    with_keys: bool,
) -> Harness {
    let transport = Arc::new(ScriptedTransport::new(provider, script));
    let sleeper = Arc::new(RecordingSleeper::default());
    let key_store = if with_keys {
        InMemoryKeyStore::new()
            .with_key(Provider::Anthropic, "sk-ant-test-key")
            .with_key(Provider::OpenRouter, "sk-or-test-key")
    } else {
        InMemoryKeyStore::new()
    };

    let router = Router::builder(builtin_policy())
        .with_transport(transport.clone())
        .with_key_store(Arc::new(key_store))
        .with_audit_sink(Arc::new(audit.clone()) as Arc<dyn AuditSink>)
        .with_retry_policy(fast_retry())
        .with_sleeper(sleeper.clone())
        .with_payload_policy(AuditPayloadPolicy::new(true))
        .build()
        .unwrap();

    Harness {
        router,
        transport,
        audit,
        sleeper,
    }
}

/// Outcome scripted for one [`ScriptedRouter`] invocation
pub enum Step {
    /// The model answers with this text; it is validated like the real router does
    Output(String),
    MissingCredential(Provider),
    Rejected(String),
    Unavailable,
}

/// What a [`ScriptedRouter`] was asked to do
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub task_type: TaskType,
    pub system_prompt: String,
    pub user_prompt: String,
    pub correlation_id: String,
    pub course_id: Option<String>,
    pub module_id: Option<String>,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Router stand-in for workflow tests
#[derive(Default)]
pub struct ScriptedRouter {
    steps: Mutex<VecDeque<Step>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedRouter {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn invocations(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmRouter for ScriptedRouter {
    async fn execute<T: StructuredOutput>(
        &self,
        request: CallRequest<T>,
    ) -> Result<CallResponse<T>, RouterError> {
        self.seen.lock().unwrap().push(SeenRequest {
            task_type: request.task_type,
            system_prompt: request.system_prompt.clone(),
            user_prompt: request.user_prompt.clone(),
            correlation_id: request.correlation_id.clone(),
            course_id: request.course_id.clone(),
            module_id: request.module_id.clone(),
            max_output_tokens: request.max_output_tokens,
            temperature: request.temperature,
        });

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("router script exhausted"));
        let call_id = Uuid::new_v4();

        match step {
            Step::Output(output_text) => match parse_structured::<T>(&output_text) {
                Ok(parsed) => Ok(CallResponse {
                    call_id,
                    provider: Provider::Anthropic,
                    model: "scripted".to_string(),
                    prompt_hash: String::new(),
                    latency_ms: 0,
                    parsed,
                    output_text,
                    input_tokens: None,
                    output_tokens: None,
                }),
                Err(violation) => Err(RouterError::SchemaInvalid {
                    call_id,
                    repair_prompt: violation.repair_prompt,
                    diagnostics: violation.diagnostics,
                    invalid_output: violation.invalid_output,
                }),
            },
            Step::MissingCredential(provider) => Err(RouterError::MissingCredential { provider }),
            Step::Rejected(message) => Err(RouterError::ProviderRejected {
                call_id,
                provider: Provider::OpenRouter,
                message,
            }),
            Step::Unavailable => Err(RouterError::ProviderUnavailable {
                call_id,
                provider: Provider::OpenRouter,
            }),
        }
    }
}
