//! SQLite-backed audit sink
//!
//! Each unit of work opens its own connection and an immediate transaction,
//! so concurrent router invocations never share connection state.

use super::{AuditError, AuditRecord, AuditSink, AuditStatus, AuditUnitOfWork};
use crate::protocol::{Provider, TaskType};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS llm_calls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    llm_call_id TEXT NOT NULL,
    task_type TEXT NOT NULL,
    provider TEXT NOT NULL,
    model TEXT NOT NULL,
    prompt_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    latency_ms INTEGER NOT NULL,
    input_tokens INTEGER,
    output_tokens INTEGER,
    correlation_id TEXT NOT NULL,
    course_id TEXT,
    module_id TEXT,
    output_hash TEXT,
    output_length INTEGER,
    output_text TEXT,
    validation_errors TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_llm_calls_call_id ON llm_calls (llm_call_id);
";

const SELECT_COLUMNS: &str = "llm_call_id, task_type, provider, model, prompt_hash, status,
    latency_ms, input_tokens, output_tokens, correlation_id, course_id, module_id,
    output_hash, output_length, output_text, validation_errors, created_at";

/// Audit sink persisting records into the `llm_calls` table of a SQLite file
#[derive(Debug, Clone)]
pub struct SqliteAuditSink {
    path: PathBuf,
}

impl SqliteAuditSink {
    /// Open (creating if needed) the database at `path` and ensure the table exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let sink = Self {
            path: path.as_ref().to_path_buf(),
        };
        let conn = sink.connect()?;
        conn.execute_batch(CREATE_TABLE_SQL)?;
        Ok(sink)
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, AuditError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Records for one invocation, oldest first
    pub fn list_by_call_id(&self, call_id: Uuid) -> Result<Vec<AuditRecord>, AuditError> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {} FROM llm_calls WHERE llm_call_id = ?1 ORDER BY id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([call_id.to_string()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(map_audit_row(row)?);
        }
        Ok(out)
    }

    /// Every record, oldest first
    pub fn list_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        let conn = self.connect()?;
        let sql = format!("SELECT {} FROM llm_calls ORDER BY id", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(map_audit_row(row)?);
        }
        Ok(out)
    }

    /// Number of stored records
    pub fn count(&self) -> Result<u64, AuditError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM llm_calls", [], |row| row.get(0))?;
        Ok(from_sql_int(count))
    }
}

impl AuditSink for SqliteAuditSink {
    fn begin(&self) -> Result<Box<dyn AuditUnitOfWork>, AuditError> {
        let conn = self.connect()?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Box::new(SqliteUnitOfWork {
            conn,
            finished: false,
        }))
    }
}

struct SqliteUnitOfWork {
    conn: Connection,
    finished: bool,
}

impl AuditUnitOfWork for SqliteUnitOfWork {
    fn save(&mut self, record: &AuditRecord) -> Result<(), AuditError> {
        self.conn.execute(
            "INSERT INTO llm_calls (
                llm_call_id, task_type, provider, model, prompt_hash, status,
                latency_ms, input_tokens, output_tokens, correlation_id, course_id, module_id,
                output_hash, output_length, output_text, validation_errors, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                record.call_id.to_string(),
                record.task_type.as_str(),
                record.provider.as_str(),
                &record.model,
                &record.prompt_hash,
                record.status.as_str(),
                to_sql_int(record.latency_ms),
                record.input_tokens.map(to_sql_int),
                record.output_tokens.map(to_sql_int),
                &record.correlation_id,
                &record.course_id,
                &record.module_id,
                &record.output_hash,
                record.output_length.map(to_sql_int),
                &record.output_text,
                &record.validation_errors,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), AuditError> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for SqliteUnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                warn!("Audit rollback failed: {}", err);
            }
        }
    }
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_sql_int(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn corrupt(message: String) -> AuditError {
    AuditError::Corrupt { message }
}

fn map_audit_row(row: &Row<'_>) -> Result<AuditRecord, AuditError> {
    let call_id: String = row.get(0)?;
    let task_type: String = row.get(1)?;
    let provider: String = row.get(2)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(16)?;

    Ok(AuditRecord {
        call_id: Uuid::parse_str(&call_id)
            .map_err(|e| corrupt(format!("llm_call_id '{}': {}", call_id, e)))?,
        task_type: task_type
            .parse::<TaskType>()
            .map_err(|e| corrupt(e.to_string()))?,
        provider: provider
            .parse::<Provider>()
            .map_err(|e| corrupt(e.to_string()))?,
        model: row.get(3)?,
        prompt_hash: row.get(4)?,
        status: status
            .parse::<AuditStatus>()
            .map_err(|e| corrupt(e.to_string()))?,
        latency_ms: from_sql_int(row.get(6)?),
        input_tokens: row.get::<_, Option<i64>>(7)?.map(from_sql_int),
        output_tokens: row.get::<_, Option<i64>>(8)?.map(from_sql_int),
        correlation_id: row.get(9)?,
        course_id: row.get(10)?,
        module_id: row.get(11)?,
        output_hash: row.get(12)?,
        output_length: row.get::<_, Option<i64>>(13)?.map(from_sql_int),
        output_text: row.get(14)?,
        validation_errors: row.get(15)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| corrupt(format!("created_at '{}': {}", created_at, e)))?
            .with_timezone(&Utc),
    })
}
