//! tupledb CLI
//!
//! Command-line tools for a tupledb store.
//!
//! # Commands
//!
//! - `write` - Apply a JSON write request
//! - `read` - List live tuples, optionally at a past revision
//! - `history` - Dump stored rows with their revision stamps
//! - `verify` - Check the commit log and store invariants

mod commands;
mod request;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tupledb_core::{Revision, TupleKey};

/// tupledb command-line store tools.
#[derive(Parser)]
#[command(name = "tupledb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store's commit log file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON write request
    Write {
        /// Request file, or `-` for stdin
        #[arg(short, long)]
        request: PathBuf,
    },

    /// List live tuples
    Read {
        /// Revision to read at (default: latest)
        #[arg(short, long)]
        at: Option<Revision>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dump stored rows
    History {
        /// Only rows for this tuple
        #[arg(short, long)]
        tuple: Option<TupleKey>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify the commit log and store invariants
    Verify,

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
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Write { request } => {
            let path = cli.path.ok_or("Store path required for write")?;
            commands::write::run(&path, &request)?;
        }
        Commands::Read { at, format } => {
            let path = cli.path.ok_or("Store path required for read")?;
            commands::read::run(&path, at, &format)?;
        }
        Commands::History { tuple, format } => {
            let path = cli.path.ok_or("Store path required for history")?;
            commands::history::run(&path, tuple.as_ref(), &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Store path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Version => {
            println!("tupledb CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
