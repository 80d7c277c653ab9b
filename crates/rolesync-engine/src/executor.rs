//! Reconciliation executor.
//!
//! Applies a delta operation by operation: every grant/revoke is attempted
//! independently, transient failures are retried with bounded exponential
//! backoff, and idempotency signals from the provider are folded into
//! no-op successes. One failure never aborts the batch.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use rolesync_connector::error::ConnectorError;
use rolesync_connector::resilience::{RetryConfig, RetryExecutor};
use rolesync_connector::traits::DirectoryProvider;
use rolesync_connector::types::{Assignment, ServicePrincipalRef};

use crate::diff::Delta;
use crate::report::{ApplyReport, FailedOperation, OperationKind, SkippedOperation};

/// Executor tuning.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum in-flight grant/revoke calls. Operations within one delta
    /// are disjoint by construction, so they commute.
    pub max_concurrency: usize,
    /// Per-operation retry budget for transient failures.
    pub retry: RetryConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            retry: RetryConfig::default(),
        }
    }
}

/// Outcome of a single operation, before aggregation.
enum OpOutcome {
    Granted(Assignment),
    Revoked(Assignment),
    Skipped(SkippedOperation),
    Failed(FailedOperation),
}

/// Applies deltas against a directory provider.
pub struct ReconciliationExecutor<P> {
    provider: Arc<P>,
    config: ExecutorConfig,
}

impl<P: DirectoryProvider> ReconciliationExecutor<P> {
    /// Create an executor with default tuning.
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_config(provider, ExecutorConfig::default())
    }

    /// Create an executor with custom tuning.
    pub fn with_config(provider: Arc<P>, config: ExecutorConfig) -> Self {
        Self { provider, config }
    }

    /// Apply a delta and report per-operation outcomes.
    ///
    /// Safe to re-run: re-granting an existing assignment or re-revoking a
    /// missing one lands in `skipped`.
    #[instrument(skip(self, delta), fields(sp = %sp.object_id, operations = delta.len()))]
    pub async fn apply(&self, sp: &ServicePrincipalRef, delta: &Delta) -> ApplyReport {
        let retry = RetryExecutor::new(self.config.retry.clone());

        let operations: Vec<(OperationKind, Assignment)> = delta
            .to_grant
            .iter()
            .cloned()
            .map(|a| (OperationKind::Grant, a))
            .chain(
                delta
                    .to_revoke
                    .iter()
                    .cloned()
                    .map(|a| (OperationKind::Revoke, a)),
            )
            .collect();

        let outcomes: Vec<OpOutcome> = stream::iter(operations)
            .map(|(kind, assignment)| {
                let provider = Arc::clone(&self.provider);
                let retry = retry.clone();
                let sp = sp.clone();
                async move { execute_one(provider.as_ref(), &retry, &sp, kind, assignment).await }
            })
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        let mut report = ApplyReport::default();
        for outcome in outcomes {
            match outcome {
                OpOutcome::Granted(a) => report.granted.push(a),
                OpOutcome::Revoked(a) => report.revoked.push(a),
                OpOutcome::Skipped(s) => report.skipped.push(s),
                OpOutcome::Failed(f) => report.failed.push(f),
            }
        }

        // buffer_unordered yields in completion order; keep the report
        // deterministic for logs and tests.
        report.granted.sort();
        report.revoked.sort();
        report
            .skipped
            .sort_by(|a, b| (a.operation, &a.assignment).cmp(&(b.operation, &b.assignment)));
        report
            .failed
            .sort_by(|a, b| (a.operation, &a.assignment).cmp(&(b.operation, &b.assignment)));

        info!("Apply finished: {}", report.counts_line());

        report
    }
}

async fn execute_one<P: DirectoryProvider>(
    provider: &P,
    retry: &RetryExecutor,
    sp: &ServicePrincipalRef,
    kind: OperationKind,
    assignment: Assignment,
) -> OpOutcome {
    match kind {
        OperationKind::Grant => {
            match retry.execute(|| provider.grant(sp, &assignment)).await {
                Ok(granted) => OpOutcome::Granted(granted),
                Err(ConnectorError::AlreadyAssigned { .. }) => OpOutcome::Skipped(SkippedOperation {
                    operation: kind,
                    assignment,
                    reason: "assignment already exists".to_string(),
                }),
                Err(e) => OpOutcome::Failed(failed(kind, assignment, &e)),
            }
        }
        OperationKind::Revoke => {
            match retry.execute(|| provider.revoke(sp, &assignment)).await {
                Ok(()) => OpOutcome::Revoked(assignment),
                Err(ConnectorError::NotFound { .. }) => OpOutcome::Skipped(SkippedOperation {
                    operation: kind,
                    assignment,
                    reason: "assignment already absent".to_string(),
                }),
                Err(e) => OpOutcome::Failed(failed(kind, assignment, &e)),
            }
        }
    }
}

fn failed(kind: OperationKind, assignment: Assignment, error: &ConnectorError) -> FailedOperation {
    warn!(
        operation = %kind,
        assignment = %assignment,
        error = %error,
        "Operation failed"
    );
    FailedOperation {
        operation: kind,
        assignment,
        error_code: error.error_code().to_string(),
        message: error.to_string(),
    }
}
