//! Effective-user expansion.
//!
//! An assignment set can grant roles to groups; this module resolves the
//! group memberships so callers can see every user who effectively holds a
//! role, and through which path (direct assignment or group).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use rolesync_connector::traits::GroupExpansion;
use rolesync_connector::types::{AssignmentSet, PrincipalKind};

use crate::error::{SyncError, SyncResult};

/// Source label for a directly assigned role.
pub const DIRECT_SOURCE: &str = "direct";

/// A user who effectively holds at least one app role.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveUser {
    /// Directory object id.
    pub id: String,
    /// User principal name, when resolvable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_principal_name: Option<String>,
    /// Display name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether the account is enabled (defaults to true when unknown).
    pub account_enabled: bool,
    /// How the user got the roles: `direct` and/or group names.
    pub sources: BTreeSet<String>,
    /// All roles held via any path.
    pub role_ids: BTreeSet<String>,
}

/// Resolve the users effectively covered by an assignment set.
///
/// Direct user assignments are enriched with their UPN via user lookup;
/// group assignments are expanded into their user members. A user reached
/// through several paths gets the union of the roles and all source
/// labels.
pub async fn effective_users<P: GroupExpansion>(
    provider: &P,
    assignments: &AssignmentSet,
) -> SyncResult<Vec<EffectiveUser>> {
    let mut users: BTreeMap<String, EffectiveUser> = BTreeMap::new();

    for assignment in assignments {
        match assignment.principal_kind {
            PrincipalKind::User => {
                let entry = users
                    .entry(assignment.principal_id.clone())
                    .or_insert_with(|| EffectiveUser {
                        id: assignment.principal_id.clone(),
                        user_principal_name: None,
                        display_name: assignment.principal_display_name.clone(),
                        account_enabled: true,
                        sources: BTreeSet::new(),
                        role_ids: BTreeSet::new(),
                    });
                if !entry.sources.insert(DIRECT_SOURCE.to_string()) {
                    debug!(user = %assignment.principal_id, "User already recorded as direct");
                }
                entry.role_ids.insert(assignment.role_id.clone());
            }
            PrincipalKind::Group => {
                let members = provider
                    .list_group_members(&assignment.principal_id)
                    .await
                    .map_err(SyncError::from_fetch)?;

                let source = assignment
                    .principal_display_name
                    .clone()
                    .unwrap_or_else(|| assignment.principal_id.clone());

                for member in members {
                    let entry = users.entry(member.id.clone()).or_insert_with(|| {
                        EffectiveUser {
                            id: member.id.clone(),
                            user_principal_name: None,
                            display_name: None,
                            account_enabled: true,
                            sources: BTreeSet::new(),
                            role_ids: BTreeSet::new(),
                        }
                    });
                    if !entry.sources.is_empty() && !entry.sources.contains(&source) {
                        warn!(user = %member.id, "User holds roles through multiple paths");
                    }
                    entry.user_principal_name = Some(member.user_principal_name);
                    if entry.display_name.is_none() {
                        entry.display_name = member.display_name;
                    }
                    entry.account_enabled = member.account_enabled;
                    entry.sources.insert(source.clone());
                    entry.role_ids.insert(assignment.role_id.clone());
                }
            }
        }
    }

    // Fill in UPNs for users only seen as direct assignments.
    for user in users.values_mut() {
        if user.user_principal_name.is_none() {
            if let Some(found) = provider
                .get_user(&user.id)
                .await
                .map_err(SyncError::from_fetch)?
            {
                user.user_principal_name = Some(found.user_principal_name);
                if user.display_name.is_none() {
                    user.display_name = found.display_name;
                }
                user.account_enabled = found.account_enabled;
            }
        }
    }

    Ok(users.into_values().collect())
}
