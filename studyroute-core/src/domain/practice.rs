//! Practice task candidates generated for one module

use crate::structured::StructuredOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

const MAX_MODULE_TITLE_CHARS: usize = 255;
const MAX_STATEMENT_CHARS: usize = 8_000;
const MAX_OUTLINE_CHARS: usize = 4_000;

/// Most candidates a single generation may return
pub const MAX_CANDIDATES: usize = 10;

/// Difficulty of generated practice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PracticeDifficulty {
    Easy,
    Medium,
    Hard,
}

impl PracticeDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            PracticeDifficulty::Easy => "easy",
            PracticeDifficulty::Medium => "medium",
            PracticeDifficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for PracticeDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One practice task proposed by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PracticeCandidate {
    pub statement: String,
    pub expected_outline: String,
}

/// Practice generation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PracticeGeneration {
    pub module_title: String,
    pub difficulty: PracticeDifficulty,
    pub candidates: Vec<PracticeCandidate>,
}

/// Accepted candidate, numbered from 1 in the order the model returned it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeTaskDraft {
    pub candidate_index: u32,
    pub statement: String,
    pub expected_outline: String,
}

fn check_length(errors: &mut Vec<String>, path: &str, value: &str, max_chars: usize) {
    let len = value.trim().chars().count();
    if len == 0 {
        errors.push(format!("{}: must not be blank", path));
    } else if len > max_chars {
        errors.push(format!("{}: at most {} characters, got {}", path, max_chars, len));
    }
}

impl StructuredOutput for PracticeGeneration {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        check_length(&mut errors, "module_title", &self.module_title, MAX_MODULE_TITLE_CHARS);

        if self.candidates.is_empty() || self.candidates.len() > MAX_CANDIDATES {
            errors.push(format!(
                "candidates: expected 1 to {} items, got {}",
                MAX_CANDIDATES,
                self.candidates.len()
            ));
        }

        let mut seen = HashSet::new();
        for (index, candidate) in self.candidates.iter().enumerate() {
            let path = format!("candidates[{}]", index);
            check_length(
                &mut errors,
                &format!("{}.statement", path),
                &candidate.statement,
                MAX_STATEMENT_CHARS,
            );
            check_length(
                &mut errors,
                &format!("{}.expected_outline", path),
                &candidate.expected_outline,
                MAX_OUTLINE_CHARS,
            );
            if !seen.insert(candidate.statement.trim().to_lowercase()) {
                errors.push(format!("{}.statement: candidates must be distinct", path));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl PracticeGeneration {
    /// First `count` candidates as drafts, or `None` when fewer were returned
    pub fn take_drafts(&self, count: usize) -> Option<Vec<PracticeTaskDraft>> {
        if self.candidates.len() < count {
            return None;
        }
        Some(
            self.candidates
                .iter()
                .take(count)
                .zip(1u32..)
                .map(|(candidate, candidate_index)| PracticeTaskDraft {
                    candidate_index,
                    statement: candidate.statement.trim().to_string(),
                    expected_outline: candidate.expected_outline.trim().to_string(),
                })
                .collect(),
        )
    }
}
