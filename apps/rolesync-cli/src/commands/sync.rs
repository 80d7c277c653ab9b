//! `sync` command: reconcile assignments against the desired state.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use rolesync_engine::{
    DesiredStateSource, ExecutorConfig, RunOptions, SyncMode, SyncOrchestrator,
};

use crate::context::Context;
use crate::error::{CliError, CliResult};
use crate::output;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Sync mode: manual shows the plan and asks for confirmation,
    /// auto applies directly
    #[arg(long, default_value = "manual")]
    pub mode: String,

    /// Desired state as a JSON file of {principal_id, principal_kind?, role_id}
    #[arg(long, value_name = "FILE", conflicts_with = "desired_group")]
    pub desired: Option<PathBuf>,

    /// Desired state from a directory group: every member should hold --role
    #[arg(long, value_name = "GROUP_ID", requires = "role")]
    pub desired_group: Option<String>,

    /// Role id granted to the members of --desired-group
    #[arg(long, value_name = "ROLE_ID")]
    pub role: Option<String>,

    /// Permit an empty desired state to revoke every current assignment
    #[arg(long)]
    pub allow_full_revoke: bool,

    /// Skip the confirmation prompt in manual mode
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Maximum in-flight grant/revoke calls
    #[arg(long, default_value = "4")]
    pub concurrency: usize,

    /// Manage a different application than the client application
    #[arg(long, value_name = "APP_ID")]
    pub app_id: Option<String>,

    /// Output the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: SyncArgs) -> CliResult<()> {
    let mode: SyncMode = args
        .mode
        .parse()
        .map_err(CliError::Validation)?;

    if args.concurrency == 0 {
        return Err(CliError::Validation(
            "concurrency must be at least 1".to_string(),
        ));
    }

    let source = desired_source(&args)?;

    let ctx = Context::from_env()?;
    let app_id = ctx.app_id(args.app_id.as_deref());
    let directory = ctx.directory(&app_id)?;

    let orchestrator = SyncOrchestrator::with_config(
        Arc::new(directory),
        ExecutorConfig {
            max_concurrency: args.concurrency,
            ..ExecutorConfig::default()
        },
    );

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let options = RunOptions {
        mode,
        allow_full_revoke: args.allow_full_revoke,
        cancel,
    };

    let summary = match mode {
        SyncMode::Automatic => orchestrator.run(&app_id, &source, &options).await?,
        SyncMode::Manual => {
            let plan = orchestrator.plan(&app_id, &source).await?;
            output::print_plan(&plan);

            if plan.delta.is_empty() {
                println!("Nothing to do.");
                return Ok(());
            }

            if !args.yes && !confirm("Apply these changes?")? {
                println!("Aborted; no changes applied.");
                return Ok(());
            }

            orchestrator.apply_plan(&plan, &options).await?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        output::print_summary(&summary);
    }

    if summary.is_partial_failure() {
        return Err(CliError::PartialFailure {
            failed: summary.report.failed.len(),
            total: summary.report.total(),
        });
    }

    Ok(())
}

fn desired_source(args: &SyncArgs) -> CliResult<DesiredStateSource> {
    match (&args.desired, &args.desired_group, &args.role) {
        (Some(path), None, _) => Ok(DesiredStateSource::File(path.clone())),
        (None, Some(group_id), Some(role_id)) => Ok(DesiredStateSource::Group {
            group_id: group_id.clone(),
            role_id: role_id.clone(),
        }),
        _ => Err(CliError::Validation(
            "provide either --desired FILE or --desired-group GROUP_ID with --role ROLE_ID"
                .to_string(),
        )),
    }
}

fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling before the apply phase");
            cancel.cancel();
        }
    });
}

fn confirm(prompt: &str) -> CliResult<bool> {
    use std::io::Write;

    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> SyncArgs {
        SyncArgs {
            mode: "manual".to_string(),
            desired: None,
            desired_group: None,
            role: None,
            allow_full_revoke: false,
            yes: false,
            concurrency: 4,
            app_id: None,
            json: false,
        }
    }

    #[test]
    fn test_desired_source_requires_exactly_one_source() {
        let err = desired_source(&base_args()).unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));

        let file_args = SyncArgs {
            desired: Some(PathBuf::from("desired.json")),
            ..base_args()
        };
        assert!(matches!(
            desired_source(&file_args).unwrap(),
            DesiredStateSource::File(_)
        ));

        let group_args = SyncArgs {
            desired_group: Some("g1".to_string()),
            role: Some("r1".to_string()),
            ..base_args()
        };
        assert!(matches!(
            desired_source(&group_args).unwrap(),
            DesiredStateSource::Group { .. }
        ));
    }

    #[test]
    fn test_group_source_requires_role() {
        let args = SyncArgs {
            desired_group: Some("g1".to_string()),
            ..base_args()
        };
        assert!(desired_source(&args).is_err());
    }
}
