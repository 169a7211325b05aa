//! Varnothsava CLI - Migrations, event listing and the festival shell.
//!
//! # Usage
//!
//! ```bash
//! # Run profile store migrations
//! vn-cli migrate
//!
//! # List cultural hobby-club events
//! vn-cli events --category cultural --track "hobby club"
//!
//! # Interactive shell: log in, register, fill the cart, check out
//! vn-cli shell
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations for the profile store
//! - `events` - List the event catalog, grouped by category
//! - `shell` - Interactive festival session

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use varnothsava_core::{CulturalTrack, EventCategory, EventFilter};

mod commands;

#[derive(Parser)]
#[command(name = "vn-cli")]
#[command(author, version, about = "Varnothsava festival portal tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run profile store migrations
    Migrate,
    /// List festival events
    Events {
        #[command(flatten)]
        filter: FilterArgs,

        /// Catalog JSON file (defaults to the bundled catalog)
        #[arg(long, env = "VARNOTHSAVA_CATALOG")]
        catalog: Option<PathBuf>,
    },
    /// Start an interactive festival session
    Shell,
}

/// Catalog filter flags, shared with the shell's `events` command.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Category: technical, cultural or gaming
    #[arg(short, long)]
    pub category: Option<EventCategory>,

    /// Cultural track: "hobby club", general or promotional
    #[arg(short, long)]
    pub track: Option<CulturalTrack>,

    /// Search title and description
    #[arg(short, long, default_value = "")]
    pub query: String,
}

impl From<FilterArgs> for EventFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            category: args.category,
            track: args.track,
            query: args.query,
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Events { filter, catalog } => {
            commands::events::list(catalog.as_deref(), &filter.into())?;
        }
        Commands::Shell => commands::shell::run().await?,
    }
    Ok(())
}
