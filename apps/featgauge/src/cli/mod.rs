//! # featgauge CLI Module
//!
//! ## Available Commands
//!
//! - `serve` - Run the HTTP API and the controller (default)
//! - `init` - Create an empty report database
//! - `reports` - List stored reports
//! - `submit` - Store a report for a node
//! - `remove` - Delete the report of a node
//! - `reconcile` - One-shot reconcile, prints the resulting exposition
//!
//! Offline commands (`reports`, `submit`, `remove`, `reconcile`) open the
//! database directly and fail while a server holds it. Stop the server first
//! (its startup reconcile publishes the change) or write through
//! `PUT`/`DELETE /reports/{node}` on the running server.

mod commands;

use crate::config::{Backend, Config};
use clap::{Parser, Subcommand};
use featgauge_core::GaugeError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// featgauge - cluster feature presence gauges
///
/// Aggregates the features every node reports into one gauge per feature,
/// exported in the Prometheus text format.
#[derive(Parser, Debug)]
#[command(name = "featgauge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to featgauge.toml
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the report database (overrides store.path)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides store.backend)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API and the controller
    Serve {
        /// Host to bind to (overrides server.host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty report database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// List stored reports
    Reports,

    /// Store the feature report of a node
    Submit {
        /// Node name
        #[arg(short, long)]
        node: String,

        /// Features (comma-separated, order preserved)
        #[arg(short, long, value_delimiter = ',')]
        features: Vec<String>,
    },

    /// Delete the report of a node
    Remove {
        /// Node name
        #[arg(short, long)]
        node: String,
    },

    /// Reconcile once against a fresh registry and print the result
    Reconcile,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Merge global flags over the loaded configuration.
pub fn resolve_config(cli: &Cli) -> Result<Config, GaugeError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = &cli.database {
        config.store.path.clone_from(path);
    }
    if let Some(backend) = cli.backend {
        config.store.backend = backend;
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), GaugeError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    if cli.verbose {
        tracing::debug!(?config, "Resolved configuration");
    }

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_serve(&config).await
        }
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Reports) => cmd_reports(&config, json_mode),
        Some(Commands::Submit { node, features }) => {
            cmd_submit(&config, json_mode, node, features)
        }
        Some(Commands::Remove { node }) => cmd_remove(&config, json_mode, node),
        Some(Commands::Reconcile) => cmd_reconcile(&config, json_mode),
        None => cmd_serve(&config).await,
    }
}
