//! Desired-state sources.
//!
//! The desired state is a value set of assignments declared outside the
//! directory: a JSON file, or a directory group whose members should all
//! hold a given role.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, warn};

use rolesync_connector::traits::GroupExpansion;
use rolesync_connector::types::{Assignment, AssignmentSet, PrincipalKind};

use crate::error::{SyncError, SyncResult};

/// One declared assignment in a desired-state file.
#[derive(Debug, Deserialize)]
struct DesiredEntry {
    principal_id: String,
    #[serde(default = "default_kind")]
    principal_kind: PrincipalKind,
    role_id: String,
}

fn default_kind() -> PrincipalKind {
    PrincipalKind::User
}

/// Where the desired state comes from.
#[derive(Debug, Clone)]
pub enum DesiredStateSource {
    /// JSON file containing a list of
    /// `{"principal_id", "principal_kind"?, "role_id"}` entries.
    /// An empty list is valid and means "revoke everything"; the
    /// orchestrator guards that case behind explicit confirmation.
    File(PathBuf),
    /// Every user member of the group should hold the role.
    Group { group_id: String, role_id: String },
}

impl DesiredStateSource {
    /// Load and validate the desired state.
    ///
    /// # Errors
    ///
    /// `SyncError::Config` for unreadable or invalid input; fetch errors
    /// for the group variant when the directory cannot be read.
    pub async fn load<P: GroupExpansion>(&self, provider: &P) -> SyncResult<AssignmentSet> {
        match self {
            DesiredStateSource::File(path) => load_file(path),
            DesiredStateSource::Group { group_id, role_id } => {
                load_group(provider, group_id, role_id).await
            }
        }
    }
}

fn load_file(path: &PathBuf) -> SyncResult<AssignmentSet> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        SyncError::Config(format!("cannot read {}: {e}", path.display()))
    })?;

    let entries: Vec<DesiredEntry> = serde_json::from_str(&raw).map_err(|e| {
        SyncError::Config(format!("cannot parse {}: {e}", path.display()))
    })?;

    let mut desired = AssignmentSet::new();
    for (index, entry) in entries.into_iter().enumerate() {
        if entry.principal_id.trim().is_empty() || entry.role_id.trim().is_empty() {
            return Err(SyncError::Config(format!(
                "entry {index} in {} has an empty principal_id or role_id",
                path.display()
            )));
        }

        let assignment = Assignment::new(entry.principal_id, entry.principal_kind, entry.role_id);
        if !desired.insert(assignment) {
            warn!(entry = index, "Duplicate desired assignment ignored");
        }
    }

    debug!(count = desired.len(), "Loaded desired state from file");

    Ok(desired)
}

async fn load_group<P: GroupExpansion>(
    provider: &P,
    group_id: &str,
    role_id: &str,
) -> SyncResult<AssignmentSet> {
    if group_id.trim().is_empty() || role_id.trim().is_empty() {
        return Err(SyncError::Config(
            "desired group_id and role_id must be non-empty".to_string(),
        ));
    }

    let members = provider
        .list_group_members(group_id)
        .await
        .map_err(SyncError::from_fetch)?;

    let desired: AssignmentSet = members
        .into_iter()
        .map(|user| {
            let mut assignment = Assignment::new(user.id, PrincipalKind::User, role_id);
            assignment.principal_display_name = user.display_name;
            assignment
        })
        .collect();

    debug!(
        group_id,
        count = desired.len(),
        "Loaded desired state from group membership"
    );

    Ok(desired)
}
