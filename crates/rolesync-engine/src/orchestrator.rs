//! Sync orchestrator.
//!
//! Drives a run through `Idle -> Fetching -> Diffing -> Applying ->
//! Done | Failed`, holding a per-application lock so no two runs mutate
//! the same service principal concurrently.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use rolesync_connector::resilience::RetryExecutor;
use rolesync_connector::traits::{DirectoryProvider, GroupExpansion};
use rolesync_connector::types::{AssignmentSet, ServicePrincipalRef};

use crate::desired::DesiredStateSource;
use crate::diff::{diff, Delta};
use crate::error::{SyncError, SyncResult};
use crate::executor::{ExecutorConfig, ReconciliationExecutor};
use crate::report::ApplyReport;

/// Phases of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Fetching,
    Diffing,
    Applying,
    Done,
    Failed,
}

impl RunPhase {
    /// True for phases a run cannot leave.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }

    /// Valid transitions of the run state machine.
    #[must_use]
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        match (self, next) {
            (RunPhase::Idle, RunPhase::Fetching) => true,
            (RunPhase::Fetching, RunPhase::Diffing | RunPhase::Failed) => true,
            (RunPhase::Diffing, RunPhase::Applying | RunPhase::Done | RunPhase::Failed) => true,
            (RunPhase::Applying, RunPhase::Done | RunPhase::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::Idle => "idle",
            RunPhase::Fetching => "fetching",
            RunPhase::Diffing => "diffing",
            RunPhase::Applying => "applying",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Internal run state with validated transitions.
#[derive(Debug)]
struct RunState {
    phase: RunPhase,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
        }
    }

    fn at(phase: RunPhase) -> Self {
        Self { phase }
    }

    fn advance(&mut self, next: RunPhase) -> SyncResult<()> {
        if !self.phase.can_transition_to(next) {
            return Err(SyncError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }
}

/// How a run proceeds from the computed delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Compute and display the delta; apply only after explicit
    /// confirmation ([`SyncOrchestrator::plan`] then
    /// [`SyncOrchestrator::apply_plan`]).
    Manual,
    /// Proceed directly from diffing to applying.
    Automatic,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Manual => write!(f, "manual"),
            SyncMode::Automatic => write!(f, "auto"),
        }
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "manual" => Ok(SyncMode::Manual),
            "auto" | "automatic" => Ok(SyncMode::Automatic),
            other => Err(format!("unknown sync mode: {other}")),
        }
    }
}

/// Per-run options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: SyncMode,
    /// Permit a run whose desired state is empty to revoke every current
    /// assignment.
    pub allow_full_revoke: bool,
    /// Cooperative cancellation, checked before entering the apply phase.
    /// In-flight directory calls are not interrupted.
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: SyncMode::Automatic,
            allow_full_revoke: false,
            cancel: CancellationToken::new(),
        }
    }
}

/// A computed plan: immutable snapshots plus the delta between them.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub service_principal: ServicePrincipalRef,
    pub current: AssignmentSet,
    pub desired: AssignmentSet,
    pub delta: Delta,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub app_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_principal: Option<String>,
    pub mode: SyncMode,
    pub phase: RunPhase,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub current_count: usize,
    pub desired_count: usize,
    pub report: ApplyReport,
}

impl RunSummary {
    /// True when the run completed but some operations failed.
    #[must_use]
    pub fn is_partial_failure(&self) -> bool {
        self.report.is_partial_failure()
    }
}

/// Run-level mutual exclusion keyed by application id.
#[derive(Debug, Default)]
struct RunLockRegistry {
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RunLockRegistry {
    fn try_acquire(&self, app_id: &str) -> SyncResult<tokio::sync::OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(app_id.to_string()).or_default())
        };

        lock.try_lock_owned()
            .map_err(|_| SyncError::AlreadyRunning {
                app_id: app_id.to_string(),
            })
    }
}

/// Coordinates fetch -> diff -> apply for one directory provider.
pub struct SyncOrchestrator<P> {
    provider: Arc<P>,
    executor: ReconciliationExecutor<P>,
    fetch_retry: RetryExecutor,
    locks: RunLockRegistry,
}

impl<P: GroupExpansion> SyncOrchestrator<P> {
    /// Create an orchestrator with default executor tuning.
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_config(provider, ExecutorConfig::default())
    }

    /// Create an orchestrator with custom executor tuning.
    pub fn with_config(provider: Arc<P>, config: ExecutorConfig) -> Self {
        let fetch_retry = RetryExecutor::new(config.retry.clone());
        let executor = ReconciliationExecutor::with_config(Arc::clone(&provider), config);
        Self {
            provider,
            executor,
            fetch_retry,
            locks: RunLockRegistry::default(),
        }
    }

    /// The underlying provider handle.
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Fetch both snapshots and compute the delta without applying
    /// anything. This is the read-only half of manual mode.
    #[instrument(skip(self, source))]
    pub async fn plan(
        &self,
        app_id: &str,
        source: &DesiredStateSource,
    ) -> SyncResult<SyncPlan> {
        let mut state = RunState::new();

        // Desired-state input problems abort before any directory call.
        let desired = source.load(self.provider.as_ref()).await?;

        state.advance(RunPhase::Fetching)?;

        info!(app_id, "Fetching current assignment state");

        let sp = self
            .fetch_retry
            .execute(|| self.provider.resolve_application(app_id))
            .await
            .map_err(SyncError::from_fetch)?;

        let current: AssignmentSet = self
            .fetch_retry
            .execute(|| self.provider.list_assignments(&sp))
            .await
            .map_err(SyncError::from_fetch)?
            .into_iter()
            .collect();

        state.advance(RunPhase::Diffing)?;
        let delta = diff(&current, &desired);

        info!(
            current = current.len(),
            desired = desired.len(),
            to_grant = delta.to_grant.len(),
            to_revoke = delta.to_revoke.len(),
            "Computed delta"
        );

        Ok(SyncPlan {
            service_principal: sp,
            current,
            desired,
            delta,
        })
    }

    /// Apply a previously computed plan (the confirmation half of manual
    /// mode). Takes the run lock for the plan's application.
    pub async fn apply_plan(
        &self,
        plan: &SyncPlan,
        options: &RunOptions,
    ) -> SyncResult<RunSummary> {
        let _guard = self.locks.try_acquire(&plan.service_principal.app_id)?;
        self.apply_locked(plan, options, Utc::now()).await
    }

    /// Full run: fetch, diff, and apply under one lock. Fetch failures
    /// abort with no side effects; per-operation apply failures end the
    /// run in `Done` with the failures surfaced in the report.
    #[instrument(skip(self, source, options), fields(mode = %options.mode))]
    pub async fn run(
        &self,
        app_id: &str,
        source: &DesiredStateSource,
        options: &RunOptions,
    ) -> SyncResult<RunSummary> {
        let _guard = self.locks.try_acquire(app_id)?;
        let started_at = Utc::now();
        let plan = self.plan(app_id, source).await?;
        self.apply_locked(&plan, options, started_at).await
    }

    async fn apply_locked(
        &self,
        plan: &SyncPlan,
        options: &RunOptions,
        started_at: DateTime<Utc>,
    ) -> SyncResult<RunSummary> {
        let mut state = RunState::at(RunPhase::Diffing);

        if plan.desired.is_empty() && !plan.current.is_empty() && !options.allow_full_revoke {
            return Err(SyncError::FullRevokeRefused {
                count: plan.current.len(),
            });
        }

        if options.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let report = if plan.delta.is_empty() {
            info!("Nothing to apply, state already converged");
            state.advance(RunPhase::Done)?;
            ApplyReport::default()
        } else {
            state.advance(RunPhase::Applying)?;
            let report = self
                .executor
                .apply(&plan.service_principal, &plan.delta)
                .await;
            // Partial failure is not a fatal run outcome; it is surfaced
            // through the report.
            state.advance(RunPhase::Done)?;
            report
        };

        Ok(RunSummary {
            app_id: plan.service_principal.app_id.clone(),
            service_principal: plan.service_principal.display_name.clone(),
            mode: options.mode,
            phase: state.phase,
            started_at,
            completed_at: Utc::now(),
            current_count: plan.current.len(),
            desired_count: plan.desired.len(),
            report,
        })
    }
}
