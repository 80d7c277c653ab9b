//! CLI error types and exit codes

use thiserror::Error;

use rolesync_connector::error::ConnectorError;
use rolesync_engine::SyncError;

/// Exit codes for the CLI
/// - 0: Full success (including "nothing to do")
/// - 1: Fatal error (configuration, authentication, fetch)
/// - 2: Partial failure (the run completed but some operations failed)
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("{failed} of {total} operations failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::PartialFailure { .. } => 2,
            _ => 1,
        }
    }

    /// Print the error and its source chain to stderr.
    pub fn print(&self) {
        eprintln!("Error: {self}");

        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
    }
}
