//! rolesync CLI - reconcile app-role assignments on a service principal
//!
//! This CLI enables operators to:
//! - Reconcile assignments against a declared desired state (`sync`)
//! - Inspect current assignments, optionally expanding groups
//! - Inspect the app roles an application exposes
//!
//! Credentials come from the environment (or a `.env` file) and are never
//! printed.

use clap::{Parser, Subcommand};

mod commands;
mod context;
mod error;
mod output;

use error::CliResult;

/// rolesync - directory assignment reconciliation
#[derive(Parser)]
#[command(name = "rolesync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile current assignments against the desired state
    Sync(commands::sync::SyncArgs),

    /// List the current app role assignments of the service principal
    ListAssignments(commands::assignments::ListAssignmentsArgs),

    /// List the app roles the application exposes
    ListRoles(commands::roles::ListRolesArgs),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Sync(args) => commands::sync::execute(args).await,
        Commands::ListAssignments(args) => commands::assignments::execute(args).await,
        Commands::ListRoles(args) => commands::roles::execute(args).await,
    }
}
