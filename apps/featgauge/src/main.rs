//! # featgauge - Cluster Feature Gauges
//!
//! Node agents report which networking features they have applied; featgauge
//! publishes one Prometheus gauge per feature present on at least one node.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   apps/featgauge (THE BINARY)                │
//! │                                                              │
//! │  ┌────────────┐   ┌────────────┐   ┌─────────────────────┐   │
//! │  │    CLI     │   │  HTTP API  │──▶│  Controller task    │   │
//! │  │   (clap)   │   │   (axum)   │   │  (single writer)    │   │
//! │  └─────┬──────┘   └─────┬──────┘   └──────────┬──────────┘   │
//! │        └────────────────┼─────────────────────┘              │
//! │                         ▼                                    │
//! │                ┌─────────────────┐                           │
//! │                │ featgauge-core  │                           │
//! │                │   (THE LOGIC)   │                           │
//! │                └─────────────────┘                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the API and controller
//! featgauge serve --host 0.0.0.0 --port 9090
//!
//! # Offline operations (server stopped; they need the database to themselves)
//! featgauge submit --node worker-1 --features ipv6,bond
//! featgauge reports
//! featgauge reconcile
//! ```

use clap::Parser;
use featgauge::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // FEATGAUGE_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("FEATGAUGE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "featgauge=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  featgauge v{}
  cluster feature presence, one gauge per feature
"#,
        env!("CARGO_PKG_VERSION")
    );
}
