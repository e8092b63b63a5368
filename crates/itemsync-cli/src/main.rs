//! itemsync CLI - offline-first records from the command line
//!
//! Edits land in the local store immediately; `itemsync sync` reconciles
//! them with the configured remote when it is reachable.

mod cli;
mod commands;
mod config_profiles;
mod error;


use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::{load_sync_config, resolve_db_path};
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::{run_conflicts, run_list};
use crate::commands::resolve::run_resolve;
use crate::commands::show::run_show;
use crate::commands::sync::run_sync;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "itemsync_core=info,itemsync_cli=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Config { command } => run_config(command, profile),
        command => run_store_command(command, cli.db_path, profile).await,
    }
}

async fn run_store_command(
    command: Commands,
    db_path: Option<PathBuf>,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let db_path = resolve_db_path(db_path)?;
    match command {
        Commands::Add { name, description } => run_add(&name, &description, &db_path).await?,
        Commands::List {
            status,
            limit,
            json,
        } => run_list(status.map(Into::into), limit, json, &db_path).await?,
        Commands::Show { id, json } => run_show(&id, json, &db_path).await?,
        Commands::Edit {
            id,
            name,
            description,
        } => run_edit(&id, name, description, &db_path).await?,
        Commands::Delete { id } => run_delete(&id, &db_path).await?,
        Commands::Sync { json } => {
            let sync_config = load_sync_config(profile)?;
            run_sync(&db_path, sync_config.as_ref(), json).await?;
        }
        Commands::Conflicts { json } => run_conflicts(json, &db_path).await?,
        Commands::Resolve { id, side } => {
            let sync_config = load_sync_config(profile)?;
            run_resolve(&id, side, &db_path, sync_config.as_ref()).await?;
        }
        Commands::Config { command } => run_config(command, profile)?,
    }

    Ok(())
}
