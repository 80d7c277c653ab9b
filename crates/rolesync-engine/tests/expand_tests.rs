//! Tests for effective-user expansion of group assignments.

mod common;

use std::sync::Arc;

use common::*;

use rolesync_connector::types::{Assignment, AssignmentSet, PrincipalKind};
use rolesync_engine::expand::{effective_users, DIRECT_SOURCE};

#[tokio::test]
async fn test_direct_and_group_paths_are_merged() {
    let directory = Arc::new(FakeDirectory::new());
    directory.add_group(
        "g1",
        vec![member("u1", "u1@example.com"), member("u2", "u2@example.com")],
    );
    directory.add_user(member("u3", "u3@example.com"));

    let assignments: AssignmentSet = [
        // u1 also holds r2 directly
        Assignment::new("u1", PrincipalKind::User, "r2").with_display_name("Alice"),
        Assignment::new("u3", PrincipalKind::User, "r1"),
        Assignment::new("g1", PrincipalKind::Group, "r1").with_display_name("Engineers"),
    ]
    .into_iter()
    .collect();

    let users = effective_users(directory.as_ref(), &assignments)
        .await
        .unwrap();

    assert_eq!(users.len(), 3);

    let u1 = users.iter().find(|u| u.id == "u1").unwrap();
    assert!(u1.sources.contains(DIRECT_SOURCE));
    assert!(u1.sources.contains("Engineers"));
    assert!(u1.role_ids.contains("r1"));
    assert!(u1.role_ids.contains("r2"));
    assert_eq!(u1.user_principal_name.as_deref(), Some("u1@example.com"));

    let u2 = users.iter().find(|u| u.id == "u2").unwrap();
    assert_eq!(u2.sources.iter().collect::<Vec<_>>(), vec!["Engineers"]);
    assert_eq!(u2.role_ids.iter().collect::<Vec<_>>(), vec!["r1"]);

    // Direct-only user resolved through user lookup
    let u3 = users.iter().find(|u| u.id == "u3").unwrap();
    assert_eq!(u3.user_principal_name.as_deref(), Some("u3@example.com"));
    assert_eq!(u3.sources.iter().collect::<Vec<_>>(), vec![DIRECT_SOURCE]);
}

#[tokio::test]
async fn test_unknown_direct_user_keeps_assignment_metadata() {
    let directory = Arc::new(FakeDirectory::new());

    let assignments: AssignmentSet = [Assignment::new("ghost", PrincipalKind::User, "r1")
        .with_display_name("Ghost User")]
    .into_iter()
    .collect();

    let users = effective_users(directory.as_ref(), &assignments)
        .await
        .unwrap();

    assert_eq!(users.len(), 1);
    assert!(users[0].user_principal_name.is_none());
    assert_eq!(users[0].display_name.as_deref(), Some("Ghost User"));
}
