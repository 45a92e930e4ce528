//! Practice task generation for one module

use super::error::WorkflowError;
use super::repair::{RepairLoop, Verdict};
use crate::domain::{PracticeDifficulty, PracticeGeneration, PracticeTaskDraft};
use crate::protocol::{CallRequest, TaskType};
use crate::router::LlmRouter;
use crate::structured::{build_repair_prompt, schema_json};
use tracing::{info, warn};
use uuid::Uuid;

/// Output token limit for practice generation
pub const PRACTICE_MAX_OUTPUT_TOKENS: u32 = 4096;

/// Sampling temperature for practice generation
pub const PRACTICE_TEMPERATURE: f32 = 0.3;

pub const DEFAULT_CANDIDATE_COUNT: u32 = 3;

pub const DEFAULT_PRACTICE_REPAIR_ATTEMPTS: u32 = 2;

const WORKFLOW: &str = "practice generation";

/// Module data the generation prompt is built from
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeModuleContext {
    pub course_id: String,
    pub module_id: String,
    pub course_title: Option<String>,
    pub module_title: String,
    pub module_order: u32,
    pub goals: Vec<String>,
    pub topics: Vec<String>,
    pub estimated_hours: Option<f64>,
}

/// Prompt wording for practice generation
pub trait PracticePrompts: Send + Sync {
    fn system_prompt(&self) -> String;

    fn user_prompt(
        &self,
        module: &PracticeModuleContext,
        difficulty: PracticeDifficulty,
        candidate_count: u32,
    ) -> String;

    fn repair_prompt(&self, invalid_output: &str, diagnostics: &str, candidate_count: u32) -> String;
}

/// Built-in prompt wording
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPracticePrompts;

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

impl PracticePrompts for DefaultPracticePrompts {
    fn system_prompt(&self) -> String {
        "You write practice tasks for a course module. Return only valid JSON matching the \
         practice generation schema, with no markdown or commentary."
            .to_string()
    }

    fn user_prompt(
        &self,
        module: &PracticeModuleContext,
        difficulty: PracticeDifficulty,
        candidate_count: u32,
    ) -> String {
        let hours = module
            .estimated_hours
            .map(|hours| hours.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "Generate exactly {count} distinct practice task candidates of difficulty \"{difficulty}\".\n\
             Course: {course}\n\
             Module {order}: {title}\n\
             Estimated hours: {hours}\n\
             Goals:\n{goals}\n\
             Topics:\n{topics}\n\n\
             JSON schema:\n{schema}",
            count = candidate_count,
            difficulty = difficulty,
            course = module.course_title.as_deref().unwrap_or("-"),
            order = module.module_order,
            title = module.module_title,
            hours = hours,
            goals = bullet_list(&module.goals),
            topics = bullet_list(&module.topics),
            schema = schema_json::<PracticeGeneration>(),
        )
    }

    fn repair_prompt(&self, invalid_output: &str, diagnostics: &str, candidate_count: u32) -> String {
        format!(
            "{}\n\nReturn exactly {} candidates.",
            build_repair_prompt::<PracticeGeneration>(invalid_output, diagnostics),
            candidate_count
        )
    }
}

/// Request to generate practice candidates for one module
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeGenerateCommand {
    pub module: PracticeModuleContext,
    pub difficulty: PracticeDifficulty,
    pub candidate_count: u32,
    pub max_repair_attempts: u32,
    pub correlation_id: Option<String>,
}

impl PracticeGenerateCommand {
    pub fn new(module: PracticeModuleContext, difficulty: PracticeDifficulty) -> Self {
        Self {
            module,
            difficulty,
            candidate_count: DEFAULT_CANDIDATE_COUNT,
            max_repair_attempts: DEFAULT_PRACTICE_REPAIR_ATTEMPTS,
            correlation_id: None,
        }
    }

    pub fn with_candidate_count(mut self, candidate_count: u32) -> Self {
        self.candidate_count = candidate_count;
        self
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
        if self.module.module_id.trim().is_empty() {
            return Err(WorkflowError::invalid("module_id is required"));
        }
        if self.module.course_id.trim().is_empty() {
            return Err(WorkflowError::invalid("course_id is required"));
        }
        if self.candidate_count < 1 {
            return Err(WorkflowError::invalid("candidate_count must be >= 1"));
        }
        Ok(())
    }
}

/// Accepted candidates and the invocation that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeGenerateOutcome {
    pub course_id: String,
    pub module_id: String,
    pub difficulty: PracticeDifficulty,
    /// Module title as echoed by the model
    pub module_title: String,
    /// Exactly `candidate_count` drafts, numbered from 1
    pub drafts: Vec<PracticeTaskDraft>,
    pub call_id: Uuid,
    pub attempts: u32,
}

/// Practice generation workflow
pub struct PracticeGenerateWorkflow<R, P = DefaultPracticePrompts> {
    router: R,
    prompts: P,
}

impl<R: LlmRouter> PracticeGenerateWorkflow<R, DefaultPracticePrompts> {
    pub fn new(router: R) -> Self {
        Self::with_prompts(router, DefaultPracticePrompts)
    }
}

impl<R: LlmRouter, P: PracticePrompts> PracticeGenerateWorkflow<R, P> {
    pub fn with_prompts(router: R, prompts: P) -> Self {
        Self { router, prompts }
    }

    /// Generate `candidate_count` validated candidates
    ///
    /// A schema-valid response with too few candidates is repaired like a
    /// schema failure; extra candidates are dropped.
    pub async fn run(
        &self,
        command: PracticeGenerateCommand,
    ) -> Result<PracticeGenerateOutcome, WorkflowError> {
        command.validate()?;
        let correlation_id = command
            .correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let module = &command.module;
        let candidate_count = command.candidate_count;

        info!(
            correlation_id = %correlation_id,
            course_id = %module.course_id,
            module_id = %module.module_id,
            difficulty = %command.difficulty,
            candidate_count,
            "Practice generation started"
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
                self.prompts
                    .user_prompt(module, command.difficulty, candidate_count),
                |user_prompt| {
                    CallRequest::<PracticeGeneration>::new(
                        TaskType::PracticeGenerate,
                        system_prompt.clone(),
                        user_prompt,
                        correlation_id.clone(),
                    )
                    .with_course_id(module.course_id.clone())
                    .with_module_id(module.module_id.clone())
                    .with_max_output_tokens(PRACTICE_MAX_OUTPUT_TOKENS)
                    .with_temperature(PRACTICE_TEMPERATURE)
                },
                |response| match response.parsed.take_drafts(candidate_count as usize) {
                    Some(drafts) => Verdict::Accept((response.parsed.module_title, drafts)),
                    None => {
                        let diagnostics = format!(
                            "Too few candidates: expected {}, got {}.",
                            candidate_count,
                            response.parsed.candidates.len()
                        );
                        warn!(
                            correlation_id = %correlation_id,
                            module_id = %module.module_id,
                            llm_call_id = %response.call_id,
                            "Practice generation returned too few candidates"
                        );
                        Verdict::Reject {
                            invalid_output: response.output_text,
                            diagnostics,
                        }
                    }
                },
                |invalid_output, diagnostics| {
                    self.prompts
                        .repair_prompt(invalid_output, diagnostics, candidate_count)
                },
            )
            .await?;

        let (module_title, drafts) = repaired.value;
        info!(
            correlation_id = %correlation_id,
            course_id = %module.course_id,
            module_id = %module.module_id,
            llm_call_id = %repaired.call_id,
            attempt = repaired.attempts,
            generated_count = drafts.len(),
            "Practice generation completed"
        );

        Ok(PracticeGenerateOutcome {
            course_id: module.course_id.clone(),
            module_id: module.module_id.clone(),
            difficulty: command.difficulty,
            module_title,
            drafts,
            call_id: repaired.call_id,
            attempts: repaired.attempts,
        })
    }
}
