use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use itemsync_core::{Resolution, SyncStatus};

#[derive(Parser)]
#[command(name = "itemsync")]
#[command(about = "Offline-first records that sync when the remote is reachable")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for remote configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new record
    #[command(alias = "new")]
    Add {
        /// Record name (read from stdin when omitted)
        name: Vec<String>,
        /// Record description
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List records
    List {
        /// Only show records in this state (tombstones included when asked for)
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one record
    Show {
        /// Record ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing record (opens $EDITOR without --name/--description)
    Edit {
        /// Record ID or unique ID prefix
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Mark a record deleted (removed everywhere on next sync)
    Delete {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Reconcile local changes with the remote store
    Sync {
        /// Output the sync report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List records flagged as conflicts
    Conflicts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a conflicted record
    Resolve {
        /// Record ID or unique ID prefix
        id: String,
        /// Which side wins: local or remote
        #[arg(value_name = "SIDE", value_parser = parse_resolution)]
        side: Resolution,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusFilter {
    Synced,
    Modified,
    Deleted,
    Conflict,
}

impl From<StatusFilter> for SyncStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Synced => Self::Synced,
            StatusFilter::Modified => Self::Modified,
            StatusFilter::Deleted => Self::Deleted,
            StatusFilter::Conflict => Self::Conflict,
        }
    }
}

fn parse_resolution(value: &str) -> Result<Resolution, String> {
    value
        .parse::<Resolution>()
        .map_err(|error| error.to_string())
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Remote database URL (libsql://, https://, or a file path)
        #[arg(long, value_name = "URL")]
        remote_url: Option<String>,
        /// URL used to check connectivity before syncing
        #[arg(long, value_name = "URL")]
        probe_url: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the effective profile configuration
    Show {
        /// Profile name to show
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
