//! LiveDiff CLI
//!
//! Command-line tools for inspecting change notifications offline.
//!
//! # Commands
//!
//! - `diff` - Diff two snapshot files and print the change set
//! - `keypath` - Validate key paths against a schema file

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// LiveDiff command-line tools.
#[derive(Parser)]
#[command(name = "livediff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff two snapshots of one collection
    Diff {
        /// Snapshot file for the old state (JSON)
        old: PathBuf,

        /// Snapshot file for the new state (JSON)
        new: PathBuf,

        /// Dirty properties per entry (JSON)
        #[arg(short, long)]
        dirty: Option<PathBuf>,

        /// Schema file; required for explicit key paths
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Key path to observe (repeatable)
        #[arg(short = 'k', long = "key-path")]
        key_paths: Vec<String>,

        /// Report structural changes only
        #[arg(long, conflicts_with = "key_paths")]
        shallow: bool,

        /// Property hops observed without explicit key paths
        #[arg(long, default_value = "4")]
        depth: usize,

        /// Also print the collection-changed event
        #[arg(short, long)]
        adapter: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Validate key paths against a schema
    Keypath {
        /// Schema file (JSON)
        #[arg(short, long)]
        schema: PathBuf,

        /// Element type the paths start from
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Key paths to check
        #[arg(required = true)]
        paths: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
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
        Commands::Diff {
            old,
            new,
            dirty,
            schema,
            key_paths,
            shallow,
            depth,
            adapter,
            format,
        } => {
            let options = commands::diff::DiffOptions {
                old: &old,
                new: &new,
                dirty: dirty.as_deref(),
                schema: schema.as_deref(),
                key_paths: &key_paths,
                shallow,
                depth,
                adapter,
            };
            commands::diff::run(&options, &format)?;
        }
        Commands::Keypath {
            schema,
            type_name,
            paths,
            format,
        } => {
            commands::keypath::run(&schema, &type_name, &paths, &format)?;
        }
        Commands::Version => {
            println!("LiveDiff CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("LiveDiff Core v{}", livediff_core::VERSION);
        }
    }

    Ok(())
}
