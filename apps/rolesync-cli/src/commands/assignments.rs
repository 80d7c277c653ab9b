//! `list-assignments` command.

use clap::Args;

use rolesync_connector::traits::DirectoryProvider;
use rolesync_connector::types::AssignmentSet;
use rolesync_engine::effective_users;

use crate::context::Context;
use crate::error::CliResult;
use crate::output;

#[derive(Args, Debug)]
pub struct ListAssignmentsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Resolve group assignments into their effective user members
    #[arg(long)]
    pub expand_groups: bool,

    /// Manage a different application than the client application
    #[arg(long, value_name = "APP_ID")]
    pub app_id: Option<String>,
}

pub async fn execute(args: ListAssignmentsArgs) -> CliResult<()> {
    let ctx = Context::from_env()?;
    let app_id = ctx.app_id(args.app_id.as_deref());
    let directory = ctx.directory(&app_id)?;

    let sp = directory.resolve_application(&app_id).await?;
    // Deterministic output order: principal id, then role id.
    let assignments: AssignmentSet = directory
        .list_assignments(&sp)
        .await?
        .into_iter()
        .collect();

    if args.expand_groups {
        let users = effective_users(&directory, &assignments).await?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&users)?);
        } else if users.is_empty() {
            println!("No effective users.");
        } else {
            output::print_effective_users_table(&users);
            println!();
            println!("{} effective user(s)", users.len());
        }

        return Ok(());
    }

    let assignments: Vec<_> = assignments.into_iter().collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&assignments)?);
    } else if assignments.is_empty() {
        println!("No assignments found.");
    } else {
        output::print_assignment_table(&assignments);
        println!();
        println!(
            "{} assignment(s) on {}",
            assignments.len(),
            sp.display_name.as_deref().unwrap_or(&sp.object_id)
        );
    }

    Ok(())
}
