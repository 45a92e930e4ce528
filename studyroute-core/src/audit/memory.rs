//! In-memory audit sink

use super::{AuditError, AuditRecord, AuditSink, AuditUnitOfWork};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Shared {
    records: Mutex<Vec<AuditRecord>>,
    write_attempts: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// Audit sink keeping committed records in memory
///
/// A sink built with [`InMemoryAuditSink::failing`] rejects every commit,
/// which lets callers observe that audit failures stay contained.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditSink {
    shared: Arc<Shared>,
    failure: Option<String>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose commits always fail with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            shared: Arc::default(),
            failure: Some(message.into()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AuditRecord>> {
        self.shared
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of committed records, oldest first
    pub fn records(&self) -> Vec<AuditRecord> {
        self.lock().clone()
    }

    /// Committed records for one invocation
    pub fn find(&self, call_id: Uuid) -> Vec<AuditRecord> {
        self.lock()
            .iter()
            .filter(|record| record.call_id == call_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of units of work opened so far, committed or not
    pub fn write_attempts(&self) -> usize {
        self.shared.write_attempts.load(Ordering::SeqCst)
    }

    /// Number of units of work dropped without a successful commit
    pub fn rollbacks(&self) -> usize {
        self.shared.rollbacks.load(Ordering::SeqCst)
    }
}

impl AuditSink for InMemoryAuditSink {
    fn begin(&self) -> Result<Box<dyn AuditUnitOfWork>, AuditError> {
        self.shared.write_attempts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryUnitOfWork {
            sink: self.clone(),
            staged: Vec::new(),
            committed: false,
        }))
    }
}

struct InMemoryUnitOfWork {
    sink: InMemoryAuditSink,
    staged: Vec<AuditRecord>,
    committed: bool,
}

impl AuditUnitOfWork for InMemoryUnitOfWork {
    fn save(&mut self, record: &AuditRecord) -> Result<(), AuditError> {
        self.staged.push(record.clone());
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), AuditError> {
        if let Some(message) = &self.sink.failure {
            return Err(AuditError::Storage {
                message: message.clone(),
            });
        }
        let staged = std::mem::take(&mut self.staged);
        self.sink.lock().extend(staged);
        self.committed = true;
        Ok(())
    }
}

impl Drop for InMemoryUnitOfWork {
    fn drop(&mut self) {
        if !self.committed {
            self.staged.clear();
            self.sink.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        }
    }
}
