//! Course decomposition into a [`CoursePlan`]

use super::error::WorkflowError;
use super::repair::{RepairLoop, Verdict};
use crate::domain::CoursePlan;
use crate::protocol::{CallRequest, TaskType};
use crate::router::LlmRouter;
use crate::structured::schema_json;
use tracing::info;
use uuid::Uuid;

/// Output token limit for course parsing
pub const COURSE_PARSE_MAX_OUTPUT_TOKENS: u32 = 4096;

/// Sampling temperature for course parsing
pub const COURSE_PARSE_TEMPERATURE: f32 = 0.1;

/// Default number of repair attempts after the first call
pub const DEFAULT_COURSE_PARSE_REPAIR_ATTEMPTS: u32 = 2;

const WORKFLOW: &str = "course parse";

/// Prompt wording for course parsing
pub trait CourseParsePrompts: Send + Sync {
    fn system_prompt(&self) -> String;

    /// First-attempt prompt built from the imported course text
    fn user_prompt(&self, source_text: &str) -> String;

    /// Follow-up prompt asking the model to fix its previous answer
    fn repair_prompt(&self, invalid_output: &str, diagnostics: &str) -> String;
}

/// Built-in prompt wording
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCourseParsePrompts;

impl CourseParsePrompts for DefaultCourseParsePrompts {
    fn system_prompt(&self) -> String {
        "You parse course material. Return only valid JSON matching the course plan schema. \
         Do not add markdown, comments or extra fields."
            .to_string()
    }

    fn user_prompt(&self, source_text: &str) -> String {
        format!(
            "Decompose the course text into a course plan.\n\
             - Top-level keys: title, description, start_date, modules, deadlines.\n\
             - Module order starts at 1 and is unique; estimated_hours > 0.\n\
             - goals and topics are arrays of strings.\n\
             - deadline.module_ref refers to a module order; use null for unknown dates.\n\n\
             JSON schema:\n{}\n\n\
             Course text:\n{}",
            schema_json::<CoursePlan>(),
            source_text
        )
    }

    fn repair_prompt(&self, invalid_output: &str, diagnostics: &str) -> String {
        crate::structured::build_repair_prompt::<CoursePlan>(invalid_output, diagnostics)
    }
}

/// Request to parse one imported course text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseParseCommand {
    pub course_id: String,
    /// Normalized course text; importing it is the caller's job
    pub source_text: String,
    pub max_repair_attempts: u32,
    /// Correlation id to reuse; a fresh one is generated when absent
    pub correlation_id: Option<String>,
}

impl CourseParseCommand {
    pub fn new(course_id: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            source_text: source_text.into(),
            max_repair_attempts: DEFAULT_COURSE_PARSE_REPAIR_ATTEMPTS,
            correlation_id: None,
        }
    }

    pub fn with_max_repair_attempts(mut self, max_repair_attempts: u32) -> Self {
        self.max_repair_attempts = max_repair_attempts;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    fn validate(&self) -> Result<(), WorkflowError> {
        if self.course_id.trim().is_empty() {
            return Err(WorkflowError::invalid("course_id is required"));
        }
        if self.source_text.trim().is_empty() {
            return Err(WorkflowError::invalid("source_text must not be empty"));
        }
        Ok(())
    }
}

/// Validated course plan and the invocation that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct CourseParseOutcome {
    pub course_id: String,
    pub plan: CoursePlan,
    pub call_id: Uuid,
    pub attempts: u32,
}

/// Course parsing workflow
pub struct CourseParseWorkflow<R, P = DefaultCourseParsePrompts> {
    router: R,
    prompts: P,
}

impl<R: LlmRouter> CourseParseWorkflow<R, DefaultCourseParsePrompts> {
    pub fn new(router: R) -> Self {
        Self::with_prompts(router, DefaultCourseParsePrompts)
    }
}

impl<R: LlmRouter, P: CourseParsePrompts> CourseParseWorkflow<R, P> {
    pub fn with_prompts(router: R, prompts: P) -> Self {
        Self { router, prompts }
    }

    /// Parse the command's course text into a validated plan
    pub async fn run(&self, command: CourseParseCommand) -> Result<CourseParseOutcome, WorkflowError> {
        command.validate()?;
        let correlation_id = command
            .correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        info!(
            correlation_id = %correlation_id,
            course_id = %command.course_id,
            source_length = command.source_text.chars().count(),
            max_repair_attempts = command.max_repair_attempts,
            "Course parse started"
        );

        let system_prompt = self.prompts.system_prompt();
        let repair_loop = RepairLoop::new(
            &self.router,
            WORKFLOW,
            &correlation_id,
            command.max_repair_attempts,
        );

        let repaired = repair_loop
            .run(
                self.prompts.user_prompt(&command.source_text),
                |user_prompt| {
                    CallRequest::<CoursePlan>::new(
                        TaskType::CourseParse,
                        system_prompt.clone(),
                        user_prompt,
                        correlation_id.clone(),
                    )
                    .with_course_id(command.course_id.clone())
                    .with_max_output_tokens(COURSE_PARSE_MAX_OUTPUT_TOKENS)
                    .with_temperature(COURSE_PARSE_TEMPERATURE)
                },
                |response| Verdict::Accept(response.parsed),
                |invalid_output, diagnostics| self.prompts.repair_prompt(invalid_output, diagnostics),
            )
            .await?;

        info!(
            correlation_id = %correlation_id,
            course_id = %command.course_id,
            llm_call_id = %repaired.call_id,
            attempt = repaired.attempts,
            modules_count = repaired.value.modules.len(),
            deadlines_count = repaired.value.deadlines.len(),
            "Course parse completed"
        );

        Ok(CourseParseOutcome {
            course_id: command.course_id,
            plan: repaired.value,
            call_id: repaired.call_id,
            attempts: repaired.attempts,
        })
    }
}
