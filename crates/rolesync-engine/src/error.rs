//! Engine error taxonomy.

use thiserror::Error;

use rolesync_connector::error::ConnectorError;

use crate::orchestrator::RunPhase;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can fail a reconciliation run.
///
/// Everything here is fatal to the run as a whole; per-operation apply
/// failures are reported in [`ApplyReport::failed`](crate::report::ApplyReport)
/// instead and do not surface as a `SyncError`.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Desired-state input is missing or invalid. Raised before any fetch.
    #[error("desired-state configuration error: {0}")]
    Config(String),

    /// Credential problem. Raised before any mutation.
    #[error("authentication failed before any change was applied")]
    Auth(#[source] ConnectorError),

    /// Could not fetch directory state. Raised before any mutation.
    #[error("failed to fetch directory state")]
    Fetch(#[source] ConnectorError),

    /// Another run holds the lock for this application.
    #[error("a reconciliation run is already in progress for application {app_id}")]
    AlreadyRunning { app_id: String },

    /// Empty desired state would revoke everything; requires explicit
    /// confirmation.
    #[error("refusing to revoke all {count} current assignments without --allow-full-revoke")]
    FullRevokeRefused { count: usize },

    /// Run was cancelled before entering the apply phase.
    #[error("run cancelled before applying changes")]
    Cancelled,

    /// Internal state machine violation.
    #[error("invalid run state transition: {from} -> {to}")]
    InvalidTransition { from: RunPhase, to: RunPhase },
}

impl SyncError {
    /// Classify a fetch-side connector error: credential problems become
    /// [`SyncError::Auth`], everything else [`SyncError::Fetch`].
    pub fn from_fetch(e: ConnectorError) -> Self {
        if e.is_auth() {
            SyncError::Auth(e)
        } else {
            SyncError::Fetch(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fetch_classifies_auth() {
        let err = SyncError::from_fetch(ConnectorError::AuthenticationFailed);
        assert!(matches!(err, SyncError::Auth(_)));

        let err = SyncError::from_fetch(ConnectorError::network("down"));
        assert!(matches!(err, SyncError::Fetch(_)));
    }
}
