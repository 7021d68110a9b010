//! Minirag CLI
//!
//! Main entry point for the minirag command-line tool. Provides document
//! ingestion, retrieval-augmented question answering, and service health
//! checks against the configured collaborators.

mod commands;

use clap::{Parser, Subcommand};
use commands::{HealthCommand, IngestCommand, QueryCommand};
use minirag_core::{logging, AppConfig};
use std::path::PathBuf;

/// Minirag CLI - retrieval-augmented question answering
#[derive(Parser, Debug)]
#[command(name = "minirag")]
#[command(about = "Retrieval-augmented question answering over your documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "MINIRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use deterministic in-process collaborators (no network, no keys)
    #[arg(long, global = true, env = "MINIRAG_OFFLINE")]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a document into the vector store
    Ingest(IngestCommand),

    /// Ask a question over the ingested documents
    Query(QueryCommand),

    /// Check vector store connectivity
    Health(HealthCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load base configuration, then apply CLI overrides
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };

    if cli.offline {
        config.offline = true;
    }
    if cli.verbose {
        config.log_level = Some("debug".to_string());
    } else if let Some(level) = cli.log_level {
        config.log_level = Some(level);
    }

    logging::init_logging(config.log_level.as_deref())?;
    config.validate()?;

    tracing::debug!(
        "Minirag CLI starting (collection: {}, offline: {})",
        config.collection,
        config.offline
    );

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Query(_) => "query",
        Commands::Health(_) => "health",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Health(cmd) => cmd.execute(&config).await,
    };

    if let Err(e) = &result {
        tracing::error!("Command failed: {}", e);
    }

    Ok(result?)
}
