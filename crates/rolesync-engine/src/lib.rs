//! # Reconciliation Engine
//!
//! Core of rolesync: fetch the current app-role assignments of a service
//! principal, diff them against a declared desired state, and apply the
//! minimal set of grants and revokes.
//!
//! A run is stateless and moves strictly through
//! `Idle -> Fetching -> Diffing -> Applying -> Done | Failed`. Fetch
//! failures abort before any mutation; apply failures are per-operation
//! and never abort the batch.
//!
//! ## Crate Organization
//!
//! - [`diff`] - Pure set differ producing a [`diff::Delta`]
//! - [`desired`] - Desired-state sources (file, directory group)
//! - [`executor`] - Partial-failure apply with retry and bounded concurrency
//! - [`orchestrator`] - Run state machine, locking, cancellation
//! - [`expand`] - Effective-user expansion of group assignments
//! - [`report`] - Apply reports and run summaries
//! - [`error`] - Engine error taxonomy

pub mod desired;
pub mod diff;
pub mod error;
pub mod executor;
pub mod expand;
pub mod orchestrator;
pub mod report;

pub use desired::DesiredStateSource;
pub use diff::{diff, Delta};
pub use error::{SyncError, SyncResult};
pub use executor::{ExecutorConfig, ReconciliationExecutor};
pub use expand::{effective_users, EffectiveUser};
pub use orchestrator::{RunOptions, RunPhase, RunSummary, SyncMode, SyncOrchestrator, SyncPlan};
pub use report::{ApplyReport, FailedOperation, OperationKind, SkippedOperation};
