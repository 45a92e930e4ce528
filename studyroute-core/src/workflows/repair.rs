//! Bounded repair loop shared by the workflows

use super::error::WorkflowError;
use crate::protocol::{CallRequest, CallResponse};
use crate::router::{LlmRouter, RouterError};
use crate::structured::StructuredOutput;
use tracing::{info, warn};
use uuid::Uuid;

/// Application-level judgement of a schema-valid response
#[derive(Debug)]
pub enum Verdict<V> {
    /// The response is usable
    Accept(V),
    /// The response must be repaired, with diagnostics for the model
    Reject {
        invalid_output: String,
        diagnostics: String,
    },
}

/// Accepted value together with the invocation that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired<V> {
    pub value: V,
    pub call_id: Uuid,
    /// 1-based number of the successful attempt
    pub attempts: u32,
}

/// Repair loop over a router
///
/// Makes at most `max_repair_attempts + 1` router invocations.
pub struct RepairLoop<'a, R: ?Sized> {
    router: &'a R,
    workflow: &'static str,
    correlation_id: &'a str,
    max_attempts: u32,
}

impl<'a, R: LlmRouter + ?Sized> RepairLoop<'a, R> {
    pub fn new(
        router: &'a R,
        workflow: &'static str,
        correlation_id: &'a str,
        max_repair_attempts: u32,
    ) -> Self {
        Self {
            router,
            workflow,
            correlation_id,
            max_attempts: max_repair_attempts.saturating_add(1),
        }
    }

    /// Total router invocations allowed
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Drive the loop
    ///
    /// `build_request` turns the prompt of the current attempt into a call,
    /// `judge` inspects every schema-valid response and `repair_prompt` builds
    /// the next prompt from the invalid output and its diagnostics.
    pub async fn run<T, V, B, J, P>(
        &self,
        initial_prompt: String,
        mut build_request: B,
        mut judge: J,
        mut repair_prompt: P,
    ) -> Result<Repaired<V>, WorkflowError>
    where
        T: StructuredOutput,
        B: FnMut(String) -> CallRequest<T> + Send,
        J: FnMut(CallResponse<T>) -> Verdict<V> + Send,
        P: FnMut(&str, &str) -> String + Send,
    {
        let mut prompt = initial_prompt;

        for attempt in 1..=self.max_attempts {
            let (call_id, invalid_output, diagnostics) =
                match self.router.execute(build_request(prompt)).await {
                    Ok(response) => {
                        let call_id = response.call_id;
                        match judge(response) {
                            Verdict::Accept(value) => {
                                info!(
                                    correlation_id = %self.correlation_id,
                                    llm_call_id = %call_id,
                                    workflow = self.workflow,
                                    attempt,
                                    "Workflow produced a valid result"
                                );
                                return Ok(Repaired {
                                    value,
                                    call_id,
                                    attempts: attempt,
                                });
                            }
                            Verdict::Reject {
                                invalid_output,
                                diagnostics,
                            } => (call_id, invalid_output, diagnostics),
                        }
                    }
                    Err(RouterError::SchemaInvalid {
                        call_id,
                        invalid_output,
                        diagnostics,
                        ..
                    }) => (call_id, invalid_output, diagnostics),
                    Err(err) => {
                        let err = WorkflowError::from(err);
                        warn!(
                            correlation_id = %self.correlation_id,
                            workflow = self.workflow,
                            attempt,
                            error_kind = err.kind(),
                            "Workflow aborted: {}",
                            err
                        );
                        return Err(err);
                    }
                };

            warn!(
                correlation_id = %self.correlation_id,
                llm_call_id = %call_id,
                workflow = self.workflow,
                attempt,
                max_attempts = self.max_attempts,
                "Workflow attempt produced invalid output: {}",
                diagnostics
            );

            if attempt >= self.max_attempts {
                return Err(WorkflowError::Exhausted {
                    workflow: self.workflow,
                    attempts: attempt,
                    diagnostics,
                });
            }
            prompt = repair_prompt(&invalid_output, &diagnostics);
        }

        // max_attempts is at least 1, so the loop always returns
        Err(WorkflowError::Exhausted {
            workflow: self.workflow,
            attempts: self.max_attempts,
            diagnostics: String::new(),
        })
    }
}
