//! StreamSync CLI
//!
//! Command-line front end for the reconciliation hub.
//!
//! # Commands
//!
//! - `diff` - Show discrepancies between the producer and its consumers
//! - `sync` - Schedule propagation of selected entries
//! - `search` - List doctypes available for reconciliation

mod commands;
mod fixture;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// StreamSync reconciliation tools.
#[derive(Parser)]
#[command(name = "streamsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the hub configuration (TOML)
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Path to the store fixture (JSON)
    #[arg(global = true, short, long)]
    store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show discrepancies for a reference doctype
    Diff {
        /// Reference doctype
        doctype: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Schedule propagation of selected entries
    Sync {
        /// Path to the sync payload (JSON)
        #[arg(short, long)]
        payload: PathBuf,

        /// Site the jobs run against
        #[arg(long, default_value = "default")]
        site: String,
    },

    /// List doctypes with manual rules
    Search {
        /// Text to match (case-insensitive)
        #[arg(default_value = "")]
        txt: String,

        /// Number of results to skip
        #[arg(long, default_value = "0")]
        start: usize,

        /// Maximum number of results
        #[arg(long, default_value = "20")]
        page_len: usize,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Diff { doctype, format } => {
            let config = cli.config.ok_or("Config path required for diff")?;
            let store = cli.store.ok_or("Store path required for diff")?;
            commands::diff::run(&config, &store, &doctype, &format)?;
        }
        Commands::Sync { payload, site } => {
            let config = cli.config.ok_or("Config path required for sync")?;
            let store = cli.store.ok_or("Store path required for sync")?;
            commands::sync::run(&config, &store, &payload, &site)?;
        }
        Commands::Search {
            txt,
            start,
            page_len,
        } => {
            let config = cli.config.ok_or("Config path required for search")?;
            commands::search::run(&config, &txt, start, page_len)?;
        }
        Commands::Version => {
            println!("StreamSync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
