//! Audit sink module.
//!
//! This module defines the `AuditSink` trait and provides a file-backed
//! implementation plus an in-memory one for embedding tests.

mod file_sink;
mod memory_sink;

pub use file_sink::FileAuditSink;
pub use memory_sink::MemorySink;

use crate::domain::AuditRecord;
use crate::error::WriteError;

/// Append-only recorder for audit records.
///
/// Shared by every pipeline stage, possibly from several host worker
/// threads at once. Each `append` must land as one contiguous unit.
pub trait AuditSink: Send + Sync {
    /// Append one record.
    fn append(&self, record: &AuditRecord) -> Result<(), WriteError>;

    /// Called once when the hook unloads. Flushes whatever is buffered.
    fn on_stop(&self);
}
