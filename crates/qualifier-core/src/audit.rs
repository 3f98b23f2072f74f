//! Append-only audit trail of a qualifier run.
//!
//! Gates push entries into an [`AuditLog`]; the pipeline drains the entries
//! nobody has persisted yet into a [`crate::sink::LogSink`]. Every entry is
//! also emitted as a tracing event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Module tag stored with each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub i32);

impl OperationId {
    /// Entries written by the qualifier gates.
    pub const QUALIFIER: OperationId = OperationId(60);
    /// Run lifecycle entries (abort, failure, success).
    pub const RUN_STATUS: OperationId = OperationId(11);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Error = 0,
    Diagnostic = 1,
}

impl ActionType {
    pub fn id(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusType {
    Failed = 0,
    Succeeded = 1,
    Aborted = 2,
}

impl StatusType {
    pub fn id(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub operation_id: OperationId,
    pub details: String,
    pub action_type: ActionType,
    pub status_type: StatusType,
    pub inserted_at: DateTime<Utc>,
}

/// Entries of one run, in insertion order.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Vec<AuditLogEntry>,
    persisted: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        operation_id: OperationId,
        details: impl Into<String>,
        action_type: ActionType,
        status_type: StatusType,
    ) {
        let entry = AuditLogEntry {
            operation_id,
            details: details.into(),
            action_type,
            status_type,
            inserted_at: Utc::now(),
        };

        match (entry.action_type, entry.status_type) {
            (ActionType::Error, _) => error!(
                event = "audit.entry",
                operation_id = entry.operation_id.0,
                status = ?entry.status_type,
                "{}",
                entry.details
            ),
            (_, StatusType::Succeeded) => info!(
                event = "audit.entry",
                operation_id = entry.operation_id.0,
                "{}",
                entry.details
            ),
            _ => warn!(
                event = "audit.entry",
                operation_id = entry.operation_id.0,
                status = ?entry.status_type,
                "{}",
                entry.details
            ),
        }

        self.entries.push(entry);
    }

    /// Gate check passed.
    pub fn gate_succeeded(&mut self, details: impl Into<String>) {
        self.record(
            OperationId::QUALIFIER,
            details,
            ActionType::Diagnostic,
            StatusType::Succeeded,
        );
    }

    /// Gate check failed; the run may or may not continue.
    pub fn gate_failed(&mut self, details: impl Into<String>) {
        self.record(
            OperationId::QUALIFIER,
            details,
            ActionType::Diagnostic,
            StatusType::Failed,
        );
    }

    /// A gate ended the run early.
    pub fn aborted(&mut self) {
        self.record(
            OperationId::RUN_STATUS,
            "Abort qualifier",
            ActionType::Error,
            StatusType::Aborted,
        );
    }

    /// Fatal error; no outcome will be written.
    pub fn run_failed(&mut self, details: impl Into<String>) {
        self.record(
            OperationId::RUN_STATUS,
            details,
            ActionType::Error,
            StatusType::Failed,
        );
        self.record(
            OperationId::RUN_STATUS,
            "Qualifier failed",
            ActionType::Error,
            StatusType::Failed,
        );
    }

    pub fn run_succeeded(&mut self) {
        self.record(
            OperationId::RUN_STATUS,
            "Qualifier success",
            ActionType::Diagnostic,
            StatusType::Succeeded,
        );
    }

    pub fn entries(&self) -> &[AuditLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries not yet handed to a sink. Marks them as persisted.
    pub fn take_pending(&mut self) -> &[AuditLogEntry] {
        let start = self.persisted;
        self.persisted = self.entries.len();
        &self.entries[start..]
    }

    pub fn into_entries(self) -> Vec<AuditLogEntry> {
        self.entries
    }
}
