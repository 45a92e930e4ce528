//! Compliance-checked routing of task types to providers and models
//!
//! Every [`TaskType`] is bound to exactly one provider by policy. The route
//! table may only choose the model; a table that names another provider, or
//! leaves a task unmapped, is rejected when the policy is built.

use crate::config::{env, ConfigError};
use crate::protocol::{Provider, TaskType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Provider and model bound to a task type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Provider that serves the task
    pub provider: Provider,
    /// Model name passed to the provider
    pub model: String,
}

impl Route {
    /// Create a route
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// Provider mandated by data-handling policy for a task type
pub fn required_provider(task_type: TaskType) -> Provider {
    match task_type {
        TaskType::CourseParse => Provider::Anthropic,
        TaskType::PracticeGrade => Provider::Anthropic,
        TaskType::PracticeGenerate => Provider::OpenRouter,
        TaskType::CuratorMessage => Provider::OpenRouter,
    }
}

/// Build the compliant route table with models supplied by `model_for`
pub fn default_routes_with<F>(mut model_for: F) -> HashMap<TaskType, Route>
where
    F: FnMut(Provider) -> String,
{
    let anthropic_model = model_for(Provider::Anthropic);
    let openrouter_model = model_for(Provider::OpenRouter);

    TaskType::ALL
        .into_iter()
        .map(|task_type| {
            let provider = required_provider(task_type);
            let model = match provider {
                Provider::Anthropic => anthropic_model.clone(),
                Provider::OpenRouter => openrouter_model.clone(),
            };
            (task_type, Route::new(provider, model))
        })
        .collect()
}

/// Build the compliant route table, honoring model overrides from the environment
pub fn default_routes() -> HashMap<TaskType, Route> {
    default_routes_with(env::model_from_env)
}

/// Check a route table against the compliance table
pub fn validate_routes(routes: &HashMap<TaskType, Route>) -> Result<(), ConfigError> {
    for task_type in TaskType::ALL {
        let route = routes
            .get(&task_type)
            .ok_or(ConfigError::MissingRoute { task_type })?;

        let expected = required_provider(task_type);
        if route.provider != expected {
            return Err(ConfigError::PolicyViolation {
                task_type,
                expected,
                actual: route.provider,
            });
        }

        if route.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: format!("route for {} has a blank model", task_type),
            });
        }
    }
    Ok(())
}

/// Immutable, validated mapping from task type to route
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    routes: HashMap<TaskType, Route>,
}

impl RoutingPolicy {
    /// Validate the route table and build the policy
    pub fn new(routes: HashMap<TaskType, Route>) -> Result<Self, ConfigError> {
        validate_routes(&routes)?;
        Ok(Self { routes })
    }

    /// Policy over [`default_routes`]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(default_routes())
    }

    /// Route for a task type
    pub fn resolve(&self, task_type: TaskType) -> Result<&Route, ConfigError> {
        self.routes
            .get(&task_type)
            .ok_or(ConfigError::MissingRoute { task_type })
    }

    /// All routes, keyed by task type
    pub fn routes(&self) -> &HashMap<TaskType, Route> {
        &self.routes
    }
}
