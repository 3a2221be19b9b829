//! In-memory audit sink.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::AuditSink;
use crate::domain::AuditRecord;
use crate::error::WriteError;

/// Keeps records in memory. Useful for hosts testing their integration.
///
/// `fail_next` makes the following appends fail, to exercise the
/// pipeline's handling of a broken sink.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
    failures_pending: AtomicUsize,
    stopped: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` appends fail.
    pub fn fail_next(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// All records rendered as the file sink would write them.
    pub fn rendered(&self) -> String {
        self.records().iter().map(ToString::to_string).collect()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl AuditSink for MemorySink {
    fn append(&self, record: &AuditRecord) -> Result<(), WriteError> {
        if self.is_stopped() {
            return Err(WriteError::Closed);
        }
        let should_fail = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(WriteError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no space left on device",
            )));
        }

        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        Ok(())
    }

    fn on_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}
