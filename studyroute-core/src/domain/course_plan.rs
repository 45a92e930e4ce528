//! Course plan decomposed from imported course text

use crate::structured::StructuredOutput;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Structured plan of a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CoursePlan {
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Course start, when the source states one
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    pub modules: Vec<CourseModule>,

    #[serde(default)]
    pub deadlines: Vec<CourseDeadline>,
}

/// One module of the course, ordered from 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CourseModule {
    pub order: u32,
    pub title: String,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Expected workload in hours; must be positive
    pub estimated_hours: f64,
}

/// A dated milestone bound to a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CourseDeadline {
    pub order: u32,
    /// `order` of the module this deadline belongs to
    pub module_ref: u32,
    #[serde(default)]
    pub due_at: Option<NaiveDate>,
    #[serde(default = "default_deadline_kind")]
    pub kind: String,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_deadline_kind() -> String {
    "deadline".to_string()
}

impl StructuredOutput for CoursePlan {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("title: must not be blank".to_string());
        }
        if self.modules.is_empty() {
            errors.push("modules: at least one module is required".to_string());
        }

        let mut module_orders = HashSet::new();
        for (index, module) in self.modules.iter().enumerate() {
            let path = format!("modules[{}]", index);
            if module.order < 1 {
                errors.push(format!("{}.order: must be >= 1", path));
            }
            if !module_orders.insert(module.order) {
                errors.push(format!("{}.order: duplicate order {}", path, module.order));
            }
            if module.title.trim().is_empty() {
                errors.push(format!("{}.title: must not be blank", path));
            }
            if !(module.estimated_hours.is_finite() && module.estimated_hours > 0.0) {
                errors.push(format!("{}.estimated_hours: must be > 0", path));
            }
        }

        let mut deadline_orders = HashSet::new();
        for (index, deadline) in self.deadlines.iter().enumerate() {
            let path = format!("deadlines[{}]", index);
            if deadline.order < 1 {
                errors.push(format!("{}.order: must be >= 1", path));
            }
            if !deadline_orders.insert(deadline.order) {
                errors.push(format!("{}.order: duplicate order {}", path, deadline.order));
            }
            if !module_orders.contains(&deadline.module_ref) {
                errors.push(format!(
                    "{}.module_ref: no module with order {}",
                    path, deadline.module_ref
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structured::parse_structured;

    #[test]
    fn test_minimal_plan_is_valid() {
        let plan: CoursePlan = parse_structured(
            r#"{"title":"X","modules":[{"order":1,"title":"Intro","estimated_hours":2}]}"#,
        )
        .unwrap();
        assert_eq!(plan.modules.len(), 1);
        assert!(plan.deadlines.is_empty());
        assert!(plan.modules[0].goals.is_empty());
    }

    #[test]
    fn test_full_plan_is_valid() {
        let plan: CoursePlan = parse_structured(
            r#"{
                "title": "Rust",
                "description": "Systems programming",
                "start_date": "2026-09-01",
                "modules": [
                    {"order": 1, "title": "Ownership", "goals": ["borrowing"], "topics": ["moves"], "estimated_hours": 4.5},
                    {"order": 2, "title": "Traits", "estimated_hours": 3}
                ],
                "deadlines": [
                    {"order": 1, "module_ref": 2, "due_at": "2026-09-20", "notes": null}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(plan.deadlines[0].kind, "deadline");
        assert_eq!(plan.start_date, NaiveDate::from_ymd_opt(2026, 9, 1));
    }

    #[test]
    fn test_semantic_errors_are_collected() {
        let violation = parse_structured::<CoursePlan>(
            r#"{
                "title": " ",
                "modules": [
                    {"order": 1, "title": "A", "estimated_hours": 0},
                    {"order": 1, "title": "B", "estimated_hours": 1}
                ],
                "deadlines": [{"order": 1, "module_ref": 7}]
            }"#,
        )
        .unwrap_err();

        let diagnostics = violation.diagnostics;
        assert!(diagnostics.contains("title: must not be blank"));
        assert!(diagnostics.contains("modules[0].estimated_hours"));
        assert!(diagnostics.contains("modules[1].order: duplicate order 1"));
        assert!(diagnostics.contains("deadlines[0].module_ref"));
    }

    #[test]
    fn test_unknown_module_field_is_rejected() {
        let result = parse_structured::<CoursePlan>(
            r#"{"title":"X","modules":[{"order":1,"title":"A","description":"no","estimated_hours":1}]}"#,
        );
        assert!(result.is_err());
    }
}
