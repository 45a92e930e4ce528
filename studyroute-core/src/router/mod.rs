//! Policy-routed, schema-validated LLM calls
//!
//! [`Router::execute`] runs one invocation end to end:
//! 1. Resolve the route for the task type and the transport for its provider
//! 2. Resolve the provider credential (a missing key fails before any network call)
//! 3. Call the provider under the retry policy
//! 4. Validate the output against the expected schema
//! 5. Write exactly one audit record, containing any audit failure
//!
//! Retries inside one invocation share its call id and are not audited
//! separately.

mod clock;
mod error;

pub use clock::{latency_ms, Clock, SystemClock};
pub use error::{rejected_message, RouterError};

use crate::audit::{
    write_record, AuditPayloadPolicy, AuditRecord, AuditSink, AuditStatus,
};
use crate::config::{ConfigError, ConfigValidator, RouterConfig, DEFAULT_TIMEOUT_SECS};
use crate::http::HttpClient;
use crate::keys::KeyStore;
use crate::protocol::{CallRequest, CallResponse, Provider};
use crate::providers::routing::{Route, RoutingPolicy};
use crate::providers::{
    AnthropicClient, OpenRouterClient, RetryError, RetryExecutor, RetryPolicy, Sleeper,
    TransportClient, TransportError, TransportRequest,
};
use crate::structured::{parse_structured, StructuredOutput};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Separator placed between system and user prompt when hashing
const PROMPT_HASH_SEPARATOR: &[u8] = b"\n---\n";

/// Deterministic SHA-256 hex digest of a prompt pair
pub fn prompt_hash(system_prompt: &str, user_prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(system_prompt.as_bytes());
    hasher.update(PROMPT_HASH_SEPARATOR);
    hasher.update(user_prompt.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Executes routed LLM calls
///
/// Implemented by [`Router`]; the repair-loop workflows depend on this trait
/// so they can be driven by a scripted router in tests.
#[async_trait]
pub trait LlmRouter: Send + Sync {
    async fn execute<T: StructuredOutput>(
        &self,
        request: CallRequest<T>,
    ) -> Result<CallResponse<T>, RouterError>;
}

/// Identity and measurements shared by every outcome of one invocation
struct Invocation<'a> {
    call_id: Uuid,
    route: &'a Route,
    prompt_hash: String,
    correlation_id: &'a str,
    course_id: Option<&'a str>,
    module_id: Option<&'a str>,
}

/// Policy-enforcing LLM router
pub struct Router {
    policy: RoutingPolicy,
    transports: HashMap<Provider, Arc<dyn TransportClient>>,
    key_store: Arc<dyn KeyStore>,
    audit_sink: Arc<dyn AuditSink>,
    retry: RetryExecutor,
    clock: Arc<dyn Clock>,
    payload_policy: AuditPayloadPolicy,
    timeout: Duration,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<_> = self.transports.keys().collect();
        providers.sort();
        f.debug_struct("Router")
            .field("policy", &self.policy)
            .field("transports", &providers)
            .field("retry", &self.retry)
            .field("payload_policy", &self.payload_policy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Start building a router over a validated routing policy
    pub fn builder(policy: RoutingPolicy) -> RouterBuilder {
        RouterBuilder::new(policy)
    }

    /// Build a router with HTTP transports for both providers from configuration
    pub fn from_config(
        config: &RouterConfig,
        key_store: Arc<dyn KeyStore>,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Result<Self, ConfigError> {
        ConfigValidator::new().validate(config)?;

        let http = HttpClient::new().map_err(|e| ConfigError::Invalid {
            message: format!("failed to create HTTP client: {}", e),
        })?;
        let anthropic =
            AnthropicClient::with_base_url(http.clone(), config.endpoints.anthropic.clone());
        let openrouter =
            OpenRouterClient::with_base_url(http, config.endpoints.openrouter.clone());

        Router::builder(RoutingPolicy::new(config.route_table())?)
            .with_transport(Arc::new(anthropic))
            .with_transport(Arc::new(openrouter))
            .with_key_store(key_store)
            .with_audit_sink(audit_sink)
            .with_retry_policy(config.retry_policy.clone())
            .with_timeout(config.timeout())
            .with_payload_policy(AuditPayloadPolicy::new(config.store_output()))
            .build()
    }

    /// The routing policy in force
    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// Run one routed call
    pub async fn execute<T: StructuredOutput>(
        &self,
        request: CallRequest<T>,
    ) -> Result<CallResponse<T>, RouterError> {
        let route = self.policy.resolve(request.task_type)?;
        let transport = self
            .transports
            .get(&route.provider)
            .ok_or(ConfigError::MissingTransport {
                provider: route.provider,
            })?;

        let api_key = match self.key_store.get_key(route.provider) {
            Ok(Some(key)) if !key.is_blank() => key,
            Ok(_) => {
                warn!(
                    correlation_id = %request.correlation_id,
                    provider = %route.provider,
                    "LLM call aborted: missing API key"
                );
                return Err(RouterError::MissingCredential {
                    provider: route.provider,
                });
            }
            Err(source) => {
                error!(
                    correlation_id = %request.correlation_id,
                    provider = %route.provider,
                    "LLM call aborted: key store failed: {}",
                    source
                );
                return Err(RouterError::KeyStore {
                    provider: route.provider,
                    source,
                });
            }
        };

        let invocation = Invocation {
            call_id: Uuid::new_v4(),
            route,
            prompt_hash: prompt_hash(&request.system_prompt, &request.user_prompt),
            correlation_id: &request.correlation_id,
            course_id: request.course_id.as_deref(),
            module_id: request.module_id.as_deref(),
        };

        let transport_request = TransportRequest {
            model: route.model.clone(),
            api_key,
            system_prompt: request.system_prompt.clone(),
            user_prompt: request.user_prompt.clone(),
            max_output_tokens: request.max_output_tokens,
            temperature: request.temperature,
            timeout: self.timeout,
        };

        let started = self.clock.monotonic();
        let result = self
            .retry
            .run(|| transport.generate(&transport_request))
            .await;
        let latency = latency_ms(started, self.clock.monotonic());

        let response = match result {
            Ok(response) => response,
            Err(err) => return Err(self.fail_transport(&invocation, &request, latency, err).await),
        };

        match parse_structured::<T>(&response.output_text) {
            Ok(parsed) => {
                let record = self.build_record(
                    &invocation,
                    &request,
                    AuditStatus::Success,
                    latency,
                    (response.input_tokens, response.output_tokens),
                    Some(&response.output_text),
                    None,
                );
                self.persist_audit(record).await;

                info!(
                    correlation_id = %invocation.correlation_id,
                    course_id = invocation.course_id.unwrap_or("-"),
                    module_id = invocation.module_id.unwrap_or("-"),
                    llm_call_id = %invocation.call_id,
                    provider = %route.provider,
                    model = %route.model,
                    prompt_hash = %invocation.prompt_hash,
                    latency_ms = latency,
                    input_tokens = ?response.input_tokens,
                    output_tokens = ?response.output_tokens,
                    "LLM call succeeded"
                );

                Ok(CallResponse {
                    call_id: invocation.call_id,
                    provider: route.provider,
                    model: route.model.clone(),
                    prompt_hash: invocation.prompt_hash,
                    latency_ms: latency,
                    parsed,
                    output_text: response.output_text,
                    input_tokens: response.input_tokens,
                    output_tokens: response.output_tokens,
                })
            }
            Err(violation) => {
                let record = self.build_record(
                    &invocation,
                    &request,
                    AuditStatus::SchemaInvalid,
                    latency,
                    (response.input_tokens, response.output_tokens),
                    Some(&violation.invalid_output),
                    Some(&violation.diagnostics),
                );
                self.persist_audit(record).await;

                warn!(
                    correlation_id = %invocation.correlation_id,
                    course_id = invocation.course_id.unwrap_or("-"),
                    module_id = invocation.module_id.unwrap_or("-"),
                    llm_call_id = %invocation.call_id,
                    provider = %route.provider,
                    model = %route.model,
                    prompt_hash = %invocation.prompt_hash,
                    latency_ms = latency,
                    "LLM output failed schema validation"
                );

                Err(RouterError::SchemaInvalid {
                    call_id: invocation.call_id,
                    repair_prompt: violation.repair_prompt,
                    diagnostics: violation.diagnostics,
                    invalid_output: violation.invalid_output,
                })
            }
        }
    }

    /// Audit and translate a transport failure
    async fn fail_transport<T>(
        &self,
        invocation: &Invocation<'_>,
        request: &CallRequest<T>,
        latency: u64,
        err: RetryError<TransportError>,
    ) -> RouterError {
        let provider = invocation.route.provider;
        let attempts = match &err {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Permanent(_) => 1,
        };
        let cause = err.into_inner();

        let (status, router_error) = match &cause {
            TransportError::Rejected { .. } => (
                AuditStatus::ProviderRejected,
                RouterError::ProviderRejected {
                    call_id: invocation.call_id,
                    provider,
                    message: rejected_message(provider, &cause),
                },
            ),
            _ => (
                AuditStatus::ProviderUnavailable,
                RouterError::ProviderUnavailable {
                    call_id: invocation.call_id,
                    provider,
                },
            ),
        };

        let record = self.build_record(invocation, request, status, latency, (None, None), None, None);
        self.persist_audit(record).await;

        warn!(
            correlation_id = %invocation.correlation_id,
            course_id = invocation.course_id.unwrap_or("-"),
            module_id = invocation.module_id.unwrap_or("-"),
            llm_call_id = %invocation.call_id,
            provider = %provider,
            model = %invocation.route.model,
            prompt_hash = %invocation.prompt_hash,
            latency_ms = latency,
            attempts,
            status = %status,
            error_kind = cause.kind(),
            "LLM call failed: {}",
            cause
        );

        router_error
    }

    #[allow(clippy::too_many_arguments)]
    fn build_record<T>(
        &self,
        invocation: &Invocation<'_>,
        request: &CallRequest<T>,
        status: AuditStatus,
        latency: u64,
        (input_tokens, output_tokens): (Option<u64>, Option<u64>),
        output_text: Option<&str>,
        validation_errors: Option<&str>,
    ) -> AuditRecord {
        let mut record = AuditRecord {
            call_id: invocation.call_id,
            task_type: request.task_type,
            provider: invocation.route.provider,
            model: invocation.route.model.clone(),
            prompt_hash: invocation.prompt_hash.clone(),
            status,
            latency_ms: latency,
            input_tokens,
            output_tokens,
            correlation_id: request.correlation_id.clone(),
            course_id: request.course_id.clone(),
            module_id: request.module_id.clone(),
            output_hash: None,
            output_length: None,
            output_text: None,
            validation_errors: None,
            created_at: self.clock.now(),
        };
        self.payload_policy
            .apply(&mut record, output_text, validation_errors);
        record
    }

    /// Write the record on the blocking pool; failures are logged and dropped
    async fn persist_audit(&self, record: AuditRecord) {
        let sink = Arc::clone(&self.audit_sink);
        let call_id = record.call_id;
        let status = record.status;
        let correlation_id = record.correlation_id.clone();

        let outcome =
            tokio::task::spawn_blocking(move || write_record(sink.as_ref(), &record)).await;

        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err.to_string(),
            Err(join_err) => format!("audit task failed: {}", join_err),
        };
        error!(
            correlation_id = %correlation_id,
            llm_call_id = %call_id,
            status = %status,
            "Failed to persist LLM audit record: {}",
            failure
        );
    }
}

#[async_trait]
impl LlmRouter for Router {
    async fn execute<T: StructuredOutput>(
        &self,
        request: CallRequest<T>,
    ) -> Result<CallResponse<T>, RouterError> {
        Router::execute(self, request).await
    }
}

#[async_trait]
impl<R: LlmRouter> LlmRouter for &R {
    async fn execute<T: StructuredOutput>(
        &self,
        request: CallRequest<T>,
    ) -> Result<CallResponse<T>, RouterError> {
        (**self).execute(request).await
    }
}

#[async_trait]
impl<R: LlmRouter> LlmRouter for Arc<R> {
    async fn execute<T: StructuredOutput>(
        &self,
        request: CallRequest<T>,
    ) -> Result<CallResponse<T>, RouterError> {
        self.as_ref().execute(request).await
    }
}

/// Builder for [`Router`]
pub struct RouterBuilder {
    policy: RoutingPolicy,
    transports: HashMap<Provider, Arc<dyn TransportClient>>,
    key_store: Option<Arc<dyn KeyStore>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    retry_policy: RetryPolicy,
    sleeper: Option<Arc<dyn Sleeper>>,
    clock: Arc<dyn Clock>,
    payload_policy: Option<AuditPayloadPolicy>,
    timeout: Duration,
}

impl RouterBuilder {
    pub fn new(policy: RoutingPolicy) -> Self {
        Self {
            policy,
            transports: HashMap::new(),
            key_store: None,
            audit_sink: None,
            retry_policy: RetryPolicy::default(),
            sleeper: None,
            clock: Arc::new(SystemClock),
            payload_policy: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Register the transport for its provider, replacing any previous one
    pub fn with_transport(mut self, transport: Arc<dyn TransportClient>) -> Self {
        self.transports.insert(transport.provider(), transport);
        self
    }

    pub fn with_key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self {
        self.key_store = Some(key_store);
        self
    }

    pub fn with_audit_sink(mut self, audit_sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(audit_sink);
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Sleeper used for backoff; defaults to the tokio timer
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Audit payload policy; defaults to the environment toggle
    pub fn with_payload_policy(mut self, payload_policy: AuditPayloadPolicy) -> Self {
        self.payload_policy = Some(payload_policy);
        self
    }

    /// Per-call transport timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Router, ConfigError> {
        let key_store = self.key_store.ok_or_else(|| ConfigError::Invalid {
            message: "router requires a key store".to_string(),
        })?;
        let audit_sink = self.audit_sink.ok_or_else(|| ConfigError::Invalid {
            message: "router requires an audit sink".to_string(),
        })?;
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                message: "transport timeout must be greater than zero".to_string(),
            });
        }

        let retry = match self.sleeper {
            Some(sleeper) => RetryExecutor::with_sleeper(self.retry_policy, sleeper)?,
            None => RetryExecutor::new(self.retry_policy)?,
        };

        Ok(Router {
            policy: self.policy,
            transports: self.transports,
            key_store,
            audit_sink,
            retry,
            clock: self.clock,
            payload_policy: self.payload_policy.unwrap_or_else(AuditPayloadPolicy::from_env),
            timeout: self.timeout,
        })
    }
}
