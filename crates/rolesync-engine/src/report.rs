//! Apply reports.
//!
//! Every operation in a delta ends up in exactly one bucket: granted,
//! revoked, skipped (idempotent no-op), or failed.

use std::fmt;

use serde::Serialize;

use rolesync_connector::types::Assignment;

/// The two mutation primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Grant,
    Revoke,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Grant => write!(f, "grant"),
            OperationKind::Revoke => write!(f, "revoke"),
        }
    }
}

/// An operation that turned out to be a no-op (idempotent success).
#[derive(Debug, Clone, Serialize)]
pub struct SkippedOperation {
    pub operation: OperationKind,
    pub assignment: Assignment,
    pub reason: String,
}

/// An operation that failed after exhausting its retry budget.
#[derive(Debug, Clone, Serialize)]
pub struct FailedOperation {
    pub operation: OperationKind,
    pub assignment: Assignment,
    /// Connector error code (e.g. `AUTH_FAILED`).
    pub error_code: String,
    pub message: String,
}

/// Outcome of applying one delta.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    /// Assignments created, including their new provider-side object ids.
    pub granted: Vec<Assignment>,
    /// Assignments removed.
    pub revoked: Vec<Assignment>,
    /// Idempotent no-ops.
    pub skipped: Vec<SkippedOperation>,
    /// Operations that failed; one entry per assignment.
    pub failed: Vec<FailedOperation>,
}

impl ApplyReport {
    /// Total operations accounted for.
    #[must_use]
    pub fn total(&self) -> usize {
        self.granted.len() + self.revoked.len() + self.skipped.len() + self.failed.len()
    }

    /// True when at least one operation failed.
    #[must_use]
    pub fn is_partial_failure(&self) -> bool {
        !self.failed.is_empty()
    }

    /// One-line counts for logs.
    #[must_use]
    pub fn counts_line(&self) -> String {
        format!(
            "granted={} revoked={} skipped={} failed={}",
            self.granted.len(),
            self.revoked.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}
