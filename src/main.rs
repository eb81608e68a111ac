//! # Graph Service CLI (`graph-service`)
//!
//! Runs the authenticated HTTP façade over a temporal knowledge-graph engine.
//!
//! ## Usage
//!
//! ```bash
//! API_TOKEN=s3cret graph-service --config ./config/graph-service.toml serve
//! ```
//!
//! Without `--config` the server binds `127.0.0.1:8000` with default
//! settings. `RUST_LOG` overrides `server.log_level`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use graph_service::auth::AuthGate;
use graph_service::config::{self, Config};
use graph_service::engine::memory::InMemoryEngine;
use graph_service::server;

/// Graph Service: ingestion and retrieval over a temporal knowledge graph.
#[derive(Parser)]
#[command(name = "graph-service", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// See `config/graph-service.example.toml`. Built-in defaults are used
    /// when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// The bearer token is read once from the environment variable named by
    /// `auth.token_env` (default `API_TOKEN`).
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::minimal(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.server.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve => {
            let gate = AuthGate::new(cfg.auth.read_token());
            let engine = Arc::new(InMemoryEngine::new());
            tracing::info!(
                chunk_size = cfg.ingest.document_chunk_size,
                "starting graph service with in-memory engine"
            );
            server::run_server(&cfg, engine, gate).await?;
        }
    }

    Ok(())
}
