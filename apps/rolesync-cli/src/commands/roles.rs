//! `list-roles` command.

use clap::Args;

use rolesync_connector::traits::DirectoryProvider;

use crate::context::Context;
use crate::error::CliResult;
use crate::output;

#[derive(Args, Debug)]
pub struct ListRolesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Manage a different application than the client application
    #[arg(long, value_name = "APP_ID")]
    pub app_id: Option<String>,
}

pub async fn execute(args: ListRolesArgs) -> CliResult<()> {
    let ctx = Context::from_env()?;
    let app_id = ctx.app_id(args.app_id.as_deref());
    let directory = ctx.directory(&app_id)?;

    let sp = directory.resolve_application(&app_id).await?;
    let mut roles = directory.list_app_roles(&sp).await?;
    roles.sort_by(|a, b| a.id.cmp(&b.id));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&roles)?);
    } else if roles.is_empty() {
        println!("No app roles defined.");
    } else {
        output::print_role_table(&roles);
        println!();
        println!(
            "{} app role(s) on {}",
            roles.len(),
            sp.display_name.as_deref().unwrap_or(&sp.object_id)
        );
    }

    Ok(())
}
