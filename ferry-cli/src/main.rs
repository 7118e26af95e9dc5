//! Ferry CLI tool

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "ferry")]
#[command(author, version, about = "Shard backfill coordination CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the work-item and session tables
    #[arg(long, env = "FERRY_STORE_DIR", default_value = ".ferry")]
    store_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the coordination HTTP API
    Serve {
        /// HTTP port
        #[arg(long, env = "PORT", default_value = "8080")]
        port: u16,
    },

    /// Manage migration sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Create work items for a session from a shard manifest (JSON array)
    Plan {
        /// Session name
        session: String,

        /// Path to the shard manifest file
        manifest: PathBuf,
    },

    /// List work items in a session
    Items {
        /// Session name
        session: String,
    },

    /// Show queue status for a session
    Status {
        /// Session name
        session: String,

        /// Also consult the shard-level derivation engine on the target
        /// cluster instead of only the work-item table
        #[arg(long)]
        deep: bool,

        /// Whether workers are currently scaled up (from the deployment
        /// backend; assumed active when unknown)
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        active_workers: bool,

        /// Print the raw JSON status object
        #[arg(long)]
        json: bool,
    },

    /// Reclaim expired leases in a session
    Cleanup {
        /// Session name
        session: String,
    },

    /// Back up the working-state index to a file and delete it
    Archive {
        /// Session name (empty uses the unsuffixed default index)
        #[arg(long, default_value = "")]
        session: String,

        /// Directory for the backup file
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Backup file name
        #[arg(long)]
        file: Option<String>,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Register a new migration session
    Create {
        /// Session name (letters, digits, '_' and '-')
        name: String,
    },

    /// List registered sessions
    List,

    /// Delete a session registration
    Delete {
        /// Session name
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config = config::Config::load(&cli.store_dir)?;

    match cli.command {
        Commands::Serve { port } => commands::serve::run(&config, port).await,
        Commands::Session { action } => match action {
            SessionAction::Create { name } => commands::session::create(&config, &name).await,
            SessionAction::List => commands::session::list(&config).await,
            SessionAction::Delete { name } => commands::session::delete(&config, &name).await,
        },
        Commands::Plan { session, manifest } => {
            commands::plan::run(&config, &session, &manifest).await
        }
        Commands::Items { session } => commands::items::run(&config, &session).await,
        Commands::Status {
            session,
            deep,
            active_workers,
            json,
        } => commands::status::run(&config, &session, deep, active_workers, json).await,
        Commands::Cleanup { session } => commands::cleanup::run(&config, &session).await,
        Commands::Archive { session, dir, file } => {
            commands::archive::run(&config, &session, dir.as_deref(), file.as_deref()).await
        }
    }
}
