//! Audit trail of router invocations
//!
//! Every router invocation that reaches the transport stage produces exactly
//! one [`AuditRecord`]. Records are written through an [`AuditSink`], which
//! hands out an [`AuditUnitOfWork`] per write. A unit of work that is dropped
//! without [`AuditUnitOfWork::commit`] rolls back.

mod memory;
mod sqlite;

pub use memory::InMemoryAuditSink;
pub use sqlite::SqliteAuditSink;

use crate::protocol::{Provider, TaskType, UnknownVariant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Longest stored copy of model output, in characters
pub const MAX_STORED_OUTPUT_CHARS: usize = 16_000;

/// Longest stored copy of validation diagnostics, in characters
pub const MAX_STORED_VALIDATION_ERRORS_CHARS: usize = 8_000;

const TRUNCATION_SUFFIX: &str = "...[truncated]";

/// Outcome of one router invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    SchemaInvalid,
    ProviderRejected,
    ProviderUnavailable,
}

impl AuditStatus {
    pub const ALL: [AuditStatus; 4] = [
        AuditStatus::Success,
        AuditStatus::SchemaInvalid,
        AuditStatus::ProviderRejected,
        AuditStatus::ProviderUnavailable,
    ];

    /// Stable name stored in audit rows
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::SchemaInvalid => "schema_invalid",
            AuditStatus::ProviderRejected => "provider_rejected",
            AuditStatus::ProviderUnavailable => "provider_unavailable",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("audit status", s))
    }
}

/// Write-once record of a router invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub call_id: Uuid,
    pub task_type: TaskType,
    pub provider: Provider,
    pub model: String,
    pub prompt_hash: String,
    pub status: AuditStatus,
    pub latency_ms: u64,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub correlation_id: String,
    pub course_id: Option<String>,
    pub module_id: Option<String>,
    /// SHA-256 hex digest of the full model output
    pub output_hash: Option<String>,
    /// Character count of the full model output
    pub output_length: Option<u64>,
    /// Possibly truncated copy of the model output
    pub output_text: Option<String>,
    /// Possibly truncated copy of the validation diagnostics
    pub validation_errors: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Whether audit records keep copies of output text and diagnostics
///
/// The output hash and length are recorded regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditPayloadPolicy {
    pub store_output: bool,
}

impl Default for AuditPayloadPolicy {
    fn default() -> Self {
        Self { store_output: true }
    }
}

impl AuditPayloadPolicy {
    pub fn new(store_output: bool) -> Self {
        Self { store_output }
    }

    /// Policy read from the process environment
    pub fn from_env() -> Self {
        Self::new(crate::config::env::store_output_from_env())
    }

    /// Fill the output fields of `record` according to this policy
    pub fn apply(
        &self,
        record: &mut AuditRecord,
        output_text: Option<&str>,
        validation_errors: Option<&str>,
    ) {
        if let Some(output) = output_text {
            record.output_hash = Some(sha256_hex(output));
            record.output_length = Some(output.chars().count() as u64);
            if self.store_output {
                record.output_text = Some(truncate_text(output, MAX_STORED_OUTPUT_CHARS));
            }
        }
        if let Some(errors) = validation_errors {
            if self.store_output {
                record.validation_errors =
                    Some(truncate_text(errors, MAX_STORED_VALIDATION_ERRORS_CHARS));
            }
        }
    }
}

/// Lowercase hex SHA-256 of a UTF-8 string
pub fn sha256_hex(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Cut `value` to `max_chars` characters, marking the cut
pub fn truncate_text(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &value[..cut], TRUNCATION_SUFFIX),
        None => value.to_string(),
    }
}

/// Errors raised while persisting audit records
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("audit storage error: {message}")]
    Storage { message: String },

    #[error("audit record is corrupt: {message}")]
    Corrupt { message: String },
}

/// Transactional scope for one audit write
///
/// Dropping the unit of work without calling `commit` discards everything
/// saved through it.
pub trait AuditUnitOfWork: Send {
    /// Stage a record inside the transaction
    fn save(&mut self, record: &AuditRecord) -> Result<(), AuditError>;

    /// Make the staged records durable
    fn commit(self: Box<Self>) -> Result<(), AuditError>;
}

/// Port handing out audit units of work
pub trait AuditSink: Send + Sync {
    /// Open a new unit of work
    fn begin(&self) -> Result<Box<dyn AuditUnitOfWork>, AuditError>;
}

/// Persist one record in its own unit of work
pub fn write_record(sink: &dyn AuditSink, record: &AuditRecord) -> Result<(), AuditError> {
    let mut unit_of_work = sink.begin()?;
    unit_of_work.save(record)?;
    unit_of_work.commit()
}

#[cfg(test)]
pub(crate) fn sample_record(status: AuditStatus) -> AuditRecord {
    AuditRecord {
        call_id: Uuid::new_v4(),
        task_type: TaskType::CourseParse,
        provider: Provider::Anthropic,
        model: "claude-3-5-sonnet-latest".to_string(),
        prompt_hash: sha256_hex("sys\n---\nusr"),
        status,
        latency_ms: 42,
        input_tokens: Some(10),
        output_tokens: None,
        correlation_id: "corr-1".to_string(),
        course_id: Some("course-1".to_string()),
        module_id: None,
        output_hash: None,
        output_length: None,
        output_text: None,
        validation_errors: None,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(AuditStatus::Success, "success")]
    #[test_case(AuditStatus::SchemaInvalid, "schema_invalid")]
    #[test_case(AuditStatus::ProviderRejected, "provider_rejected")]
    #[test_case(AuditStatus::ProviderUnavailable, "provider_unavailable")]
    fn test_status_wire_names(status: AuditStatus, name: &str) {
        assert_eq!(status.as_str(), name);
        assert_eq!(name.parse::<AuditStatus>().unwrap(), status);
        assert_eq!(serde_json::to_value(status).unwrap(), name);
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_truncate_text_counts_characters() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("ééééé", 5), "ééééé");
        assert_eq!(truncate_text("ééééé", 2), "éé...[truncated]");
    }

    #[test]
    fn test_payload_policy_stores_truncated_copies() {
        let output = "x".repeat(MAX_STORED_OUTPUT_CHARS + 5);
        let mut record = sample_record(AuditStatus::SchemaInvalid);
        AuditPayloadPolicy::new(true).apply(&mut record, Some(&output), Some("bad field"));

        assert_eq!(record.output_hash.as_deref(), Some(sha256_hex(&output).as_str()));
        assert_eq!(record.output_length, Some(output.len() as u64));
        let stored = record.output_text.unwrap();
        assert!(stored.ends_with("...[truncated]"));
        assert_eq!(stored.len(), MAX_STORED_OUTPUT_CHARS + "...[truncated]".len());
        assert_eq!(record.validation_errors.as_deref(), Some("bad field"));
    }

    #[test]
    fn test_payload_policy_disabled_keeps_only_digest() {
        let mut record = sample_record(AuditStatus::SchemaInvalid);
        AuditPayloadPolicy::new(false).apply(&mut record, Some("not-json"), Some("expected value"));

        assert!(record.output_hash.is_some());
        assert_eq!(record.output_length, Some(8));
        assert!(record.output_text.is_none());
        assert!(record.validation_errors.is_none());
    }

    #[test]
    fn test_payload_policy_without_output() {
        let mut record = sample_record(AuditStatus::ProviderUnavailable);
        AuditPayloadPolicy::default().apply(&mut record, None, None);
        assert!(record.output_hash.is_none());
        assert!(record.output_length.is_none());
    }
}
