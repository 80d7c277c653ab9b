//! Table display helpers for CLI commands

use rolesync_connector::types::{AppRole, Assignment};
use rolesync_engine::expand::EffectiveUser;
use rolesync_engine::{RunSummary, SyncPlan};

/// Truncate a string for table display, handling Unicode safely.
///
/// If the string exceeds `max_len`, it is truncated with "..." appended.
/// Uses character boundaries to avoid panicking on multi-byte characters.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// Print the current assignment table.
pub fn print_assignment_table(assignments: &[Assignment]) {
    println!(
        "{:<7} {:<38} {:<25} {:<38}",
        "KIND", "PRINCIPAL ID", "DISPLAY NAME", "ROLE ID"
    );
    println!("{}", "-".repeat(110));

    for assignment in assignments {
        let display = assignment
            .principal_display_name
            .as_deref()
            .map(|n| truncate(n, 23))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<7} {:<38} {:<25} {:<38}",
            assignment.principal_kind.to_string(),
            assignment.principal_id,
            display,
            assignment.role_id
        );
    }
}

/// Print the effective-users table produced by group expansion.
pub fn print_effective_users_table(users: &[EffectiveUser]) {
    println!(
        "{:<38} {:<30} {:<8} {:<25} {:<10}",
        "USER ID", "UPN", "ENABLED", "SOURCES", "ROLES"
    );
    println!("{}", "-".repeat(115));

    for user in users {
        let upn = user
            .user_principal_name
            .as_deref()
            .map(|n| truncate(n, 28))
            .unwrap_or_else(|| "-".to_string());
        let sources = truncate(
            &user.sources.iter().cloned().collect::<Vec<_>>().join(","),
            23,
        );

        println!(
            "{:<38} {:<30} {:<8} {:<25} {:<10}",
            user.id,
            upn,
            user.account_enabled,
            sources,
            user.role_ids.len()
        );
    }
}

/// Print the app-role table.
pub fn print_role_table(roles: &[AppRole]) {
    println!(
        "{:<38} {:<20} {:<25} {:<8}",
        "ROLE ID", "VALUE", "DISPLAY NAME", "ENABLED"
    );
    println!("{}", "-".repeat(95));

    for role in roles {
        println!(
            "{:<38} {:<20} {:<25} {:<8}",
            role.id,
            role.value.as_deref().unwrap_or("-"),
            role.display_name
                .as_deref()
                .map(|n| truncate(n, 23))
                .unwrap_or_else(|| "-".to_string()),
            role.enabled
        );
    }
}

/// Print a computed plan before confirmation.
pub fn print_plan(plan: &SyncPlan) {
    let sp = &plan.service_principal;
    println!(
        "Planned changes for {} ({}):",
        sp.display_name.as_deref().unwrap_or("service principal"),
        sp.app_id
    );
    println!(
        "  current: {} assignment(s), desired: {} assignment(s)",
        plan.current.len(),
        plan.desired.len()
    );

    for assignment in &plan.delta.to_grant {
        println!("  + grant  {assignment}");
    }
    for assignment in &plan.delta.to_revoke {
        println!("  - revoke {assignment}");
    }

    if plan.delta.is_empty() {
        println!("  (no changes)");
    } else {
        println!(
            "{} operation(s): {} grant(s), {} revoke(s)",
            plan.delta.len(),
            plan.delta.to_grant.len(),
            plan.delta.to_revoke.len()
        );
    }
}

/// Print the run summary, with per-item failure detail.
pub fn print_summary(summary: &RunSummary) {
    println!(
        "Run {} for {} ({} mode): granted={} revoked={} skipped={} failed={}",
        summary.phase,
        summary.app_id,
        summary.mode,
        summary.report.granted.len(),
        summary.report.revoked.len(),
        summary.report.skipped.len(),
        summary.report.failed.len()
    );

    for skipped in &summary.report.skipped {
        println!(
            "  ~ {} {} skipped: {}",
            skipped.operation, skipped.assignment, skipped.reason
        );
    }

    for failure in &summary.report.failed {
        println!(
            "  ! {} {} failed [{}]: {}",
            failure.operation, failure.assignment, failure.error_code, failure.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_exact_length() {
        assert_eq!(truncate("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        let result = truncate("hello world this is long", 10);
        assert_eq!(result, "hello w...");
        assert_eq!(result.len(), 10);
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let result = truncate("héllo wörld éxtra löng", 10);
        assert!(result.ends_with("..."));
        assert_eq!(result.chars().count(), 10);
    }
}
