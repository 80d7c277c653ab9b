//! Connector Framework traits
//!
//! Capability-based trait definitions for directory providers.

use async_trait::async_trait;

use crate::error::ConnectorResult;
use crate::types::{AppRole, Assignment, DirectoryUser, ServicePrincipalRef};

/// Base capability: reading and mutating app-role assignments on an
/// application's service principal.
///
/// Implementations own all network concerns (auth, paging, timeouts) and
/// surface failures as classified [`ConnectorError`](crate::error::ConnectorError)s;
/// they hold no reconciliation state of their own.
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// Human-readable provider name for logs and reports.
    fn provider_name(&self) -> &str;

    /// Test that the provider is reachable and the credentials work.
    ///
    /// Returns `Ok(())` if a token could be acquired, or an error
    /// describing what went wrong.
    async fn test_connection(&self) -> ConnectorResult<()>;

    /// Resolve the service principal fronting the given application
    /// (client) id.
    async fn resolve_application(&self, app_id: &str) -> ConnectorResult<ServicePrincipalRef>;

    /// List all current app-role assignments on the service principal.
    ///
    /// Only `User` and `Group` principals are returned; other principal
    /// kinds are skipped.
    async fn list_assignments(
        &self,
        sp: &ServicePrincipalRef,
    ) -> ConnectorResult<Vec<Assignment>>;

    /// List the app roles the application exposes.
    async fn list_app_roles(&self, sp: &ServicePrincipalRef) -> ConnectorResult<Vec<AppRole>>;

    /// Grant an assignment.
    ///
    /// Returns the created assignment including its provider-side object
    /// id. Granting an assignment that already exists fails with
    /// `AlreadyAssigned`, which callers treat as an idempotent success.
    async fn grant(
        &self,
        sp: &ServicePrincipalRef,
        assignment: &Assignment,
    ) -> ConnectorResult<Assignment>;

    /// Revoke an assignment.
    ///
    /// If the assignment carries no provider-side object id the
    /// implementation must resolve it from live state first. Revoking an
    /// assignment that no longer exists fails with `NotFound`, which
    /// callers treat as an idempotent success.
    async fn revoke(
        &self,
        sp: &ServicePrincipalRef,
        assignment: &Assignment,
    ) -> ConnectorResult<()>;
}

/// Capability for expanding group principals into their user members.
///
/// Used by group-backed desired-state sources and by effective-user
/// reporting; not every provider has to support it.
#[async_trait]
pub trait GroupExpansion: DirectoryProvider {
    /// List the user members of a group.
    async fn list_group_members(&self, group_id: &str) -> ConnectorResult<Vec<DirectoryUser>>;

    /// Look up a single user by directory object id.
    ///
    /// Returns `Ok(None)` when the user does not exist.
    async fn get_user(&self, user_id: &str) -> ConnectorResult<Option<DirectoryUser>>;
}
