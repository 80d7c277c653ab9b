//! Pure state differ.
//!
//! Computes the minimal change set between the live assignment snapshot and
//! the desired one: `to_grant = desired - current`,
//! `to_revoke = current - desired`, under structural assignment identity.

use serde::Serialize;

use rolesync_connector::types::AssignmentSet;

/// The change set a run must apply to converge current state to desired
/// state. Derived, never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Delta {
    /// Assignments to create.
    pub to_grant: AssignmentSet,
    /// Assignments to remove. Elements come from the current snapshot and
    /// therefore carry their provider-side object ids.
    pub to_revoke: AssignmentSet,
}

impl Delta {
    /// True when nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_grant.is_empty() && self.to_revoke.is_empty()
    }

    /// Total number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_grant.len() + self.to_revoke.len()
    }
}

/// Diff two assignment snapshots.
///
/// Inputs are unordered value sets; the output sets iterate
/// deterministically (principal id, then role id). For a principal whose
/// desired role differs from its current one the result is an independent
/// grant plus revoke; there is no "update" operation.
#[must_use]
pub fn diff(current: &AssignmentSet, desired: &AssignmentSet) -> Delta {
    Delta {
        to_grant: desired.difference(current).cloned().collect(),
        to_revoke: current.difference(desired).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolesync_connector::types::{Assignment, PrincipalKind};

    fn user(principal: &str, role: &str) -> Assignment {
        Assignment::new(principal, PrincipalKind::User, role)
    }

    fn set(assignments: &[Assignment]) -> AssignmentSet {
        assignments.iter().cloned().collect()
    }

    /// `desired == (current - to_revoke) ∪ to_grant` and the two output
    /// sets are disjoint.
    fn assert_delta_algebra(current: &AssignmentSet, desired: &AssignmentSet) {
        let delta = diff(current, desired);

        let reconstructed: AssignmentSet = current
            .difference(&delta.to_revoke)
            .cloned()
            .chain(delta.to_grant.iter().cloned())
            .collect();
        assert_eq!(&reconstructed, desired);

        assert!(delta.to_grant.is_disjoint(&delta.to_revoke));
    }

    #[test]
    fn test_grant_only() {
        let current = set(&[user("u1", "r1")]);
        let desired = set(&[user("u1", "r1"), user("u2", "r1")]);

        let delta = diff(&current, &desired);

        assert_eq!(delta.to_grant, set(&[user("u2", "r1")]));
        assert!(delta.to_revoke.is_empty());
        assert_delta_algebra(&current, &desired);
    }

    #[test]
    fn test_revoke_only() {
        let current = set(&[user("u1", "r1"), user("u2", "r1")]);
        let desired = set(&[user("u1", "r1")]);

        let delta = diff(&current, &desired);

        assert!(delta.to_grant.is_empty());
        assert_eq!(delta.to_revoke, set(&[user("u2", "r1")]));
        assert_delta_algebra(&current, &desired);
    }

    #[test]
    fn test_role_change_is_grant_plus_revoke() {
        let current = set(&[user("u1", "r1")]);
        let desired = set(&[user("u1", "r2")]);

        let delta = diff(&current, &desired);

        assert_eq!(delta.to_grant, set(&[user("u1", "r2")]));
        assert_eq!(delta.to_revoke, set(&[user("u1", "r1")]));
        assert_delta_algebra(&current, &desired);
    }

    #[test]
    fn test_converged_state_yields_empty_delta() {
        let current = set(&[user("u1", "r1"), user("u2", "r2")]);
        let delta = diff(&current, &current.clone());

        assert!(delta.is_empty());
        assert_eq!(delta.len(), 0);
    }

    #[test]
    fn test_empty_desired_revokes_everything() {
        let current = set(&[user("u1", "r1"), user("u2", "r1")]);
        let desired = AssignmentSet::new();

        let delta = diff(&current, &desired);

        assert_eq!(delta.to_revoke.len(), 2);
        assert!(delta.to_grant.is_empty());
        assert_delta_algebra(&current, &desired);
    }

    #[test]
    fn test_structural_identity_ignores_metadata() {
        // The fetched assignment carries an external id; the declared one
        // does not. They are the same assignment.
        let current = set(&[user("u1", "r1").with_external_id("ext-1")]);
        let desired = set(&[user("u1", "r1")]);

        assert!(diff(&current, &desired).is_empty());
    }

    #[test]
    fn test_revoke_side_keeps_external_ids() {
        let current = set(&[user("u1", "r1").with_external_id("ext-1")]);
        let desired = AssignmentSet::new();

        let delta = diff(&current, &desired);
        let revoked = delta.to_revoke.iter().next().unwrap();
        assert_eq!(revoked.external_id.as_deref(), Some("ext-1"));
    }

    #[test]
    fn test_algebra_over_mixed_snapshots() {
        let current = set(&[
            user("u1", "r1"),
            user("u2", "r1"),
            user("u3", "r2"),
            Assignment::new("g1", PrincipalKind::Group, "r1"),
        ]);
        let desired = set(&[
            user("u1", "r1"),
            user("u2", "r2"),
            user("u4", "r1"),
            Assignment::new("g1", PrincipalKind::Group, "r2"),
        ]);

        assert_delta_algebra(&current, &desired);

        let delta = diff(&current, &desired);
        assert_eq!(delta.to_grant.len(), 3);
        assert_eq!(delta.to_revoke.len(), 3);
    }
}
