//! In-memory fake directory provider for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use rolesync_connector::error::{ConnectorError, ConnectorResult};
use rolesync_connector::traits::{DirectoryProvider, GroupExpansion};
use rolesync_connector::types::{
    AppRole, Assignment, DirectoryUser, ServicePrincipalRef,
};

pub const APP_ID: &str = "app-under-test";
pub const SP_OBJECT_ID: &str = "sp-under-test";

/// Scripted failure behavior for a specific (principal, role) grant.
pub enum FailureMode {
    /// Permanent permission error; never retried.
    Authorization,
    /// Fail this many times with a transient error, then succeed.
    Transient(usize),
}

/// In-memory directory with scriptable failures and call counters.
pub struct FakeDirectory {
    sp: ServicePrincipalRef,
    state: Mutex<Vec<Assignment>>,
    next_external_id: AtomicUsize,
    groups: Mutex<HashMap<String, Vec<DirectoryUser>>>,
    users: Mutex<HashMap<String, DirectoryUser>>,
    grant_failures: Mutex<HashMap<(String, String), FailureMode>>,
    fail_list_auth: AtomicBool,
    list_delay: Mutex<Option<Duration>>,
    pub grant_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self {
            sp: ServicePrincipalRef {
                object_id: SP_OBJECT_ID.to_string(),
                app_id: APP_ID.to_string(),
                display_name: Some("App Under Test".to_string()),
            },
            state: Mutex::new(Vec::new()),
            next_external_id: AtomicUsize::new(1),
            groups: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            grant_failures: Mutex::new(HashMap::new()),
            fail_list_auth: AtomicBool::new(false),
            list_delay: Mutex::new(None),
            grant_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
        }
    }

    /// Seed a current assignment, assigning it an external id.
    pub fn seed_assignment(&self, assignment: Assignment) {
        let id = self.next_external_id.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .push(assignment.with_external_id(format!("ext-{id}")));
    }

    pub fn add_group(&self, group_id: &str, members: Vec<DirectoryUser>) {
        self.groups
            .lock()
            .unwrap()
            .insert(group_id.to_string(), members);
    }

    pub fn add_user(&self, user: DirectoryUser) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn fail_grant(&self, principal_id: &str, role_id: &str, mode: FailureMode) {
        self.grant_failures
            .lock()
            .unwrap()
            .insert((principal_id.to_string(), role_id.to_string()), mode);
    }

    pub fn fail_listing_with_auth_error(&self) {
        self.fail_list_auth.store(true, Ordering::SeqCst);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    /// Snapshot of the fake's live assignments.
    pub fn assignments(&self) -> Vec<Assignment> {
        self.state.lock().unwrap().clone()
    }
}

pub fn member(id: &str, upn: &str) -> DirectoryUser {
    DirectoryUser {
        id: id.to_string(),
        user_principal_name: upn.to_string(),
        display_name: Some(format!("Member {id}")),
        account_enabled: true,
    }
}

#[async_trait]
impl DirectoryProvider for FakeDirectory {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }

    async fn resolve_application(&self, app_id: &str) -> ConnectorResult<ServicePrincipalRef> {
        if app_id == self.sp.app_id {
            Ok(self.sp.clone())
        } else {
            Err(ConnectorError::ServicePrincipalNotFound {
                app_id: app_id.to_string(),
            })
        }
    }

    async fn list_assignments(
        &self,
        _sp: &ServicePrincipalRef,
    ) -> ConnectorResult<Vec<Assignment>> {
        if self.fail_list_auth.load(Ordering::SeqCst) {
            return Err(ConnectorError::AuthenticationFailed);
        }

        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self.assignments())
    }

    async fn list_app_roles(&self, _sp: &ServicePrincipalRef) -> ConnectorResult<Vec<AppRole>> {
        Ok(Vec::new())
    }

    async fn grant(
        &self,
        _sp: &ServicePrincipalRef,
        assignment: &Assignment,
    ) -> ConnectorResult<Assignment> {
        self.grant_calls.fetch_add(1, Ordering::SeqCst);

        let key = (
            assignment.principal_id.clone(),
            assignment.role_id.clone(),
        );
        {
            let mut failures = self.grant_failures.lock().unwrap();
            match failures.get_mut(&key) {
                Some(FailureMode::Authorization) => {
                    return Err(ConnectorError::AuthorizationFailed {
                        operation: "grant".to_string(),
                    });
                }
                Some(FailureMode::Transient(remaining)) => {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(ConnectorError::TargetUnavailable {
                            message: "scripted transient failure".to_string(),
                        });
                    }
                    failures.remove(&key);
                }
                None => {}
            }
        }

        let mut state = self.state.lock().unwrap();
        if state.iter().any(|a| a == assignment) {
            return Err(ConnectorError::AlreadyAssigned {
                principal_id: assignment.principal_id.clone(),
                role_id: assignment.role_id.clone(),
            });
        }

        let id = self.next_external_id.fetch_add(1, Ordering::SeqCst);
        let granted = assignment.clone().with_external_id(format!("ext-{id}"));
        state.push(granted.clone());
        Ok(granted)
    }

    async fn revoke(
        &self,
        _sp: &ServicePrincipalRef,
        assignment: &Assignment,
    ) -> ConnectorResult<()> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock().unwrap();
        let before = state.len();
        state.retain(|a| a != assignment);

        if state.len() == before {
            return Err(ConnectorError::not_found(format!(
                "appRoleAssignment for principal {} role {}",
                assignment.principal_id, assignment.role_id
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl GroupExpansion for FakeDirectory {
    async fn list_group_members(&self, group_id: &str) -> ConnectorResult<Vec<DirectoryUser>> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .get(group_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_user(&self, user_id: &str) -> ConnectorResult<Option<DirectoryUser>> {
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }
}
