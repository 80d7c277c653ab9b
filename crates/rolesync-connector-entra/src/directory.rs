//! Graph-backed implementation of the directory provider traits.
//!
//! URL shapes and `$select` lists follow the service principal surface of
//! Microsoft Graph: the service principal is resolved from the application
//! (client) id, assignments live under `appRoleAssignedTo`, and the roles
//! themselves are the `appRoles` collection of the service principal.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use rolesync_connector::error::{ConnectorError, ConnectorResult};
use rolesync_connector::traits::{DirectoryProvider, GroupExpansion};
use rolesync_connector::types::{
    AppRole, Assignment, DirectoryUser, PrincipalKind, ServicePrincipalRef,
};

use crate::auth::TokenCache;
use crate::client::GraphClient;
use crate::config::{EntraConfig, EntraCredentials};

const ASSIGNMENT_SELECT_FIELDS: &str = "id,principalId,principalDisplayName,principalType,appRoleId";
const MEMBER_SELECT_FIELDS: &str = "id,displayName,userPrincipalName,accountEnabled";

/// Request body for creating an app role assignment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppRoleAssignmentRequest<'a> {
    principal_id: &'a str,
    resource_id: &'a str,
    app_role_id: &'a str,
}

/// Created app role assignment response.
#[derive(Debug, Deserialize)]
struct CreatedAssignment {
    id: String,
    #[serde(rename = "principalDisplayName")]
    principal_display_name: Option<String>,
}

/// Microsoft Entra ID directory provider.
#[derive(Debug)]
pub struct EntraDirectory {
    config: EntraConfig,
    client: GraphClient,
    token_cache: Arc<TokenCache>,
}

impl EntraDirectory {
    /// Creates a provider from configuration and credentials.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the HTTP client cannot be built.
    pub fn new(config: EntraConfig, credentials: EntraCredentials) -> ConnectorResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                ConnectorError::invalid_config(format!("failed to create HTTP client: {e}"))
            })?;

        let token_cache = Arc::new(TokenCache::new(
            &config,
            credentials,
            http_client.clone(),
        ));
        let client = GraphClient::new(&config, http_client, Arc::clone(&token_cache));

        Ok(Self {
            config,
            client,
            token_cache,
        })
    }

    /// Provider configuration.
    #[must_use]
    pub fn config(&self) -> &EntraConfig {
        &self.config
    }

    fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Finds the live assignment object id for a (principal, role) pair.
    async fn resolve_assignment_id(
        &self,
        sp: &ServicePrincipalRef,
        assignment: &Assignment,
    ) -> ConnectorResult<Option<String>> {
        let current = self.list_assignments(sp).await?;
        Ok(current
            .into_iter()
            .find(|a| a == assignment)
            .and_then(|a| a.external_id))
    }
}

#[async_trait]
impl DirectoryProvider for EntraDirectory {
    fn provider_name(&self) -> &str {
        "entra"
    }

    #[instrument(skip(self))]
    async fn test_connection(&self) -> ConnectorResult<()> {
        self.token_cache.get_token().await.map(|_| ())
    }

    #[instrument(skip(self))]
    async fn resolve_application(&self, app_id: &str) -> ConnectorResult<ServicePrincipalRef> {
        info!("Resolving service principal for application {}", app_id);

        let filter = format!("appId eq '{}'", escape_odata_literal(app_id));
        let url = format!(
            "{}/servicePrincipals?$filter={}&$select=id,appId,displayName",
            self.base_url(),
            urlencoding::encode(&filter)
        );

        let response: crate::client::ODataResponse<serde_json::Value> =
            self.client.get(&url).await?;

        let first = response.value.into_iter().next().ok_or_else(|| {
            ConnectorError::ServicePrincipalNotFound {
                app_id: app_id.to_string(),
            }
        })?;

        let object_id = first
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConnectorError::serialization("servicePrincipal missing id"))?
            .to_string();

        let sp = ServicePrincipalRef {
            object_id,
            app_id: app_id.to_string(),
            display_name: first
                .get("displayName")
                .and_then(|v| v.as_str())
                .map(String::from),
        };

        info!(
            "Service principal found: {} ({})",
            sp.display_name.as_deref().unwrap_or("-"),
            sp.object_id
        );

        Ok(sp)
    }

    #[instrument(skip(self), fields(sp = %sp.object_id))]
    async fn list_assignments(
        &self,
        sp: &ServicePrincipalRef,
    ) -> ConnectorResult<Vec<Assignment>> {
        info!("Fetching app role assignments");

        let url = format!(
            "{}/servicePrincipals/{}/appRoleAssignedTo?$select={}&$top={}",
            self.base_url(),
            sp.object_id,
            ASSIGNMENT_SELECT_FIELDS,
            self.config.page_size
        );

        let mut assignments = Vec::new();

        self.client
            .get_paginated(&url, |page: Vec<serde_json::Value>| {
                for value in page {
                    match assignment_from_json(&value) {
                        Some(assignment) => assignments.push(assignment),
                        None => {
                            debug!(
                                principal_type = value
                                    .get("principalType")
                                    .and_then(|v| v.as_str())
                                    .unwrap_or("-"),
                                "Skipping assignment with unsupported principal type"
                            );
                        }
                    }
                }
                Ok(())
            })
            .await?;

        info!("Found {} assignments", assignments.len());

        Ok(assignments)
    }

    #[instrument(skip(self), fields(sp = %sp.object_id))]
    async fn list_app_roles(&self, sp: &ServicePrincipalRef) -> ConnectorResult<Vec<AppRole>> {
        info!("Fetching app roles");

        let url = format!(
            "{}/servicePrincipals/{}?$select=appRoles",
            self.base_url(),
            sp.object_id
        );

        let response: serde_json::Value = self.client.get(&url).await?;

        let roles: Vec<AppRole> = response
            .get("appRoles")
            .and_then(|v| v.as_array())
            .map(|values| values.iter().filter_map(app_role_from_json).collect())
            .unwrap_or_default();

        info!("Found {} app roles", roles.len());

        Ok(roles)
    }

    #[instrument(skip(self, assignment), fields(sp = %sp.object_id, assignment = %assignment))]
    async fn grant(
        &self,
        sp: &ServicePrincipalRef,
        assignment: &Assignment,
    ) -> ConnectorResult<Assignment> {
        info!("Granting assignment");

        let url = format!(
            "{}/servicePrincipals/{}/appRoleAssignedTo",
            self.base_url(),
            sp.object_id
        );

        let body = AppRoleAssignmentRequest {
            principal_id: &assignment.principal_id,
            resource_id: &sp.object_id,
            app_role_id: &assignment.role_id,
        };

        let created: CreatedAssignment = match self.client.post(&url, &body).await {
            Ok(created) => created,
            // Graph reports an existing (principal, role) pair as a bad
            // request with an "already exists" message rather than a 409.
            Err(ConnectorError::OperationFailed { message, .. })
                if message.to_ascii_lowercase().contains("already exists") =>
            {
                return Err(ConnectorError::AlreadyAssigned {
                    principal_id: assignment.principal_id.clone(),
                    role_id: assignment.role_id.clone(),
                });
            }
            Err(e) => return Err(e),
        };

        info!("Assignment created with id {}", created.id);

        let mut granted = assignment.clone().with_external_id(created.id);
        if granted.principal_display_name.is_none() {
            granted.principal_display_name = created.principal_display_name;
        }

        Ok(granted)
    }

    #[instrument(skip(self, assignment), fields(sp = %sp.object_id, assignment = %assignment))]
    async fn revoke(
        &self,
        sp: &ServicePrincipalRef,
        assignment: &Assignment,
    ) -> ConnectorResult<()> {
        info!("Revoking assignment");

        let external_id = match assignment.external_id.clone() {
            Some(id) => id,
            None => self
                .resolve_assignment_id(sp, assignment)
                .await?
                .ok_or_else(|| {
                    ConnectorError::not_found(format!(
                        "appRoleAssignment for principal {} role {}",
                        assignment.principal_id, assignment.role_id
                    ))
                })?,
        };

        let url = format!(
            "{}/servicePrincipals/{}/appRoleAssignedTo/{}",
            self.base_url(),
            sp.object_id,
            external_id
        );

        self.client.delete(&url).await?;

        info!("Assignment revoked");

        Ok(())
    }
}

#[async_trait]
impl GroupExpansion for EntraDirectory {
    #[instrument(skip(self))]
    async fn list_group_members(&self, group_id: &str) -> ConnectorResult<Vec<DirectoryUser>> {
        info!("Fetching members of group {}", group_id);

        let url = format!(
            "{}/groups/{}/members?$select={}&$top={}",
            self.base_url(),
            group_id,
            MEMBER_SELECT_FIELDS,
            self.config.page_size
        );

        let mut members = Vec::new();

        self.client
            .get_paginated(&url, |page: Vec<serde_json::Value>| {
                for value in page {
                    if let Some(user) = user_from_json(&value) {
                        members.push(user);
                    }
                }
                Ok(())
            })
            .await?;

        info!("Found {} user members", members.len());

        Ok(members)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> ConnectorResult<Option<DirectoryUser>> {
        let url = format!(
            "{}/users/{}?$select={}",
            self.base_url(),
            user_id,
            MEMBER_SELECT_FIELDS
        );

        match self.client.get::<serde_json::Value>(&url).await {
            Ok(value) => Ok(user_from_json(&value)),
            Err(ConnectorError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Doubles single quotes for use inside an `OData` string literal.
fn escape_odata_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Maps an `appRoleAssignedTo` entry to an [`Assignment`].
///
/// Returns `None` for principal types other than User/Group.
fn assignment_from_json(value: &serde_json::Value) -> Option<Assignment> {
    let principal_id = value.get("principalId")?.as_str()?;
    let role_id = value.get("appRoleId")?.as_str()?;
    let kind = match value.get("principalType")?.as_str()? {
        "User" => PrincipalKind::User,
        "Group" => PrincipalKind::Group,
        _ => return None,
    };

    let mut assignment = Assignment::new(principal_id, kind, role_id);
    if let Some(name) = value.get("principalDisplayName").and_then(|v| v.as_str()) {
        assignment = assignment.with_display_name(name);
    }
    if let Some(id) = value.get("id").and_then(|v| v.as_str()) {
        assignment = assignment.with_external_id(id);
    }

    Some(assignment)
}

/// Maps an `appRoles` entry to an [`AppRole`].
fn app_role_from_json(value: &serde_json::Value) -> Option<AppRole> {
    Some(AppRole {
        id: value.get("id")?.as_str()?.to_string(),
        value: value
            .get("value")
            .and_then(|v| v.as_str())
            .map(String::from),
        display_name: value
            .get("displayName")
            .and_then(|v| v.as_str())
            .map(String::from),
        description: value
            .get("description")
            .and_then(|v| v.as_str())
            .map(String::from),
        enabled: value
            .get("isEnabled")
            .and_then(|v| v.as_bool())
            .unwrap_or(true),
    })
}

/// Maps a directory object to a [`DirectoryUser`], skipping non-users.
fn user_from_json(value: &serde_json::Value) -> Option<DirectoryUser> {
    Some(DirectoryUser {
        id: value.get("id")?.as_str()?.to_string(),
        user_principal_name: value.get("userPrincipalName")?.as_str()?.to_string(),
        display_name: value
            .get("displayName")
            .and_then(|v| v.as_str())
            .map(String::from),
        account_enabled: value
            .get("accountEnabled")
            .and_then(|v| v.as_bool())
            .unwrap_or(true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assignment_from_json_user() {
        let value = json!({
            "id": "assignment-1",
            "principalId": "user-1",
            "principalDisplayName": "Alice",
            "principalType": "User",
            "appRoleId": "role-1"
        });

        let assignment = assignment_from_json(&value).unwrap();
        assert_eq!(assignment.principal_id, "user-1");
        assert_eq!(assignment.principal_kind, PrincipalKind::User);
        assert_eq!(assignment.role_id, "role-1");
        assert_eq!(assignment.external_id.as_deref(), Some("assignment-1"));
        assert_eq!(assignment.principal_display_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_assignment_from_json_group() {
        let value = json!({
            "id": "assignment-2",
            "principalId": "group-1",
            "principalDisplayName": "Engineers",
            "principalType": "Group",
            "appRoleId": "role-1"
        });

        let assignment = assignment_from_json(&value).unwrap();
        assert_eq!(assignment.principal_kind, PrincipalKind::Group);
    }

    #[test]
    fn test_assignment_from_json_skips_other_kinds() {
        let value = json!({
            "id": "assignment-3",
            "principalId": "sp-1",
            "principalType": "ServicePrincipal",
            "appRoleId": "role-1"
        });

        assert!(assignment_from_json(&value).is_none());
    }

    #[test]
    fn test_app_role_from_json() {
        let value = json!({
            "id": "role-1",
            "displayName": "Reader",
            "description": "Read-only access",
            "value": "App.Read",
            "isEnabled": true
        });

        let role = app_role_from_json(&value).unwrap();
        assert_eq!(role.id, "role-1");
        assert_eq!(role.value.as_deref(), Some("App.Read"));
        assert!(role.enabled);
    }

    #[test]
    fn test_user_from_json_requires_upn() {
        let user = json!({
            "id": "user-1",
            "displayName": "Alice",
            "userPrincipalName": "alice@example.com",
            "accountEnabled": false
        });
        let parsed = user_from_json(&user).unwrap();
        assert_eq!(parsed.user_principal_name, "alice@example.com");
        assert!(!parsed.account_enabled);

        // Nested groups come back without a UPN and are skipped
        let group = json!({ "id": "group-1", "displayName": "Nested" });
        assert!(user_from_json(&group).is_none());
    }

    #[test]
    fn test_escape_odata_literal() {
        assert_eq!(escape_odata_literal("plain"), "plain");
        assert_eq!(escape_odata_literal("O'Brien"), "O''Brien");
    }
}
