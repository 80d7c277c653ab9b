//! Domain types shared by the engine and provider implementations.
//!
//! Assignments have STRUCTURAL identity: two assignments are the same
//! assignment iff they bind the same principal to the same role, no matter
//! where either value came from. Display names and provider-side object ids
//! ride along for logging and revocation but never participate in equality,
//! hashing, or ordering.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of directory principal that can hold an app role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrincipalKind {
    /// A user account.
    User,
    /// A security or M365 group.
    Group,
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKind::User => write!(f, "User"),
            PrincipalKind::Group => write!(f, "Group"),
        }
    }
}

impl FromStr for PrincipalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(PrincipalKind::User),
            "group" => Ok(PrincipalKind::Group),
            other => Err(format!("unknown principal kind: {other}")),
        }
    }
}

/// A directory principal (user or group) referenced by an assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Directory object id.
    pub id: String,
    /// Principal kind.
    pub kind: PrincipalKind,
    /// Display name, when the directory returned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// An app role exposed by the application's service principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppRole {
    /// Role id (the `appRoleId` referenced by assignments).
    pub id: String,
    /// Machine-readable role value (claim value), when defined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the role is enabled on the application.
    pub enabled: bool,
}

/// Resolved service principal of the application under management.
///
/// Resolved once per run from the application (client) id; the `object_id`
/// is what every assignment operation is addressed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePrincipalRef {
    /// Directory object id of the service principal.
    pub object_id: String,
    /// Application (client) id it fronts.
    pub app_id: String,
    /// Display name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A user record returned by group expansion and user lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Directory object id.
    pub id: String,
    /// User principal name (usually email format).
    pub user_principal_name: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether the account is enabled.
    pub account_enabled: bool,
}

/// A grant of an app role to a principal on the service principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// Directory object id of the principal holding the role.
    pub principal_id: String,
    /// Kind of the principal.
    pub principal_kind: PrincipalKind,
    /// Id of the granted app role.
    pub role_id: String,
    /// Principal display name, for reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_display_name: Option<String>,
    /// Provider-side assignment object id; present only on fetched
    /// assignments, required to address a revoke.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl Assignment {
    /// Create an assignment from its identity parts.
    pub fn new(
        principal_id: impl Into<String>,
        principal_kind: PrincipalKind,
        role_id: impl Into<String>,
    ) -> Self {
        Self {
            principal_id: principal_id.into(),
            principal_kind,
            role_id: role_id.into(),
            principal_display_name: None,
            external_id: None,
        }
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.principal_display_name = Some(name.into());
        self
    }

    /// Attach the provider-side assignment object id.
    #[must_use]
    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// Structural identity key.
    pub fn key(&self) -> (&str, &str) {
        (&self.principal_id, &self.role_id)
    }
}

impl PartialEq for Assignment {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Assignment {}

impl Hash for Assignment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.principal_id.hash(state);
        self.role_id.hash(state);
    }
}

impl PartialOrd for Assignment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Assignment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.principal_display_name.as_deref() {
            Some(name) => write!(
                f,
                "{} {} ({}) -> role {}",
                self.principal_kind, name, self.principal_id, self.role_id
            ),
            None => write!(
                f,
                "{} {} -> role {}",
                self.principal_kind, self.principal_id, self.role_id
            ),
        }
    }
}

/// Value set of assignments with deterministic iteration order
/// (principal id, then role id).
pub type AssignmentSet = BTreeSet<Assignment>;
