//! Pulse Client CLI Entry Point
//!
//! This is the main entry point for the Pulse client binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pulse_client::cli::config::Config;
use pulse_client::connection::websocket::ConnectionManager;
use pulse_client::credentials::{CredentialStore, EnvCredentialStore, FileCredentialStore};

#[derive(Parser)]
#[command(name = "pulse-client")]
#[command(author, version, about = "Pulse Client - Persistent realtime channel client")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the client and keep the channel alive until interrupted
    Start,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            start_client(&cli).await?;
        }
        Commands::Version => {
            show_version();
        }
    }

    Ok(())
}

async fn start_client(cli: &Cli) -> Result<()> {
    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        config.logging.level.parse().unwrap_or(Level::INFO)
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Pulse client...");
    info!(
        host = %config.context.hostname,
        secure = config.context.secure,
        "Configuration loaded"
    );

    // Select the credential source
    let credentials: Arc<dyn CredentialStore> = match &config.credentials.dir {
        Some(dir) => Arc::new(FileCredentialStore::new(dir)),
        None => Arc::new(EnvCredentialStore::default()),
    };

    // Start the connection manager
    let manager = ConnectionManager::new(&config, credentials);
    manager.start();

    // Run until interrupted
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    manager.stop().await;

    Ok(())
}

fn show_version() {
    println!("pulse-client {}", env!("CARGO_PKG_VERSION"));
    println!("Persistent realtime channel client");
    println!();
    println!("Features:");
    println!("  - Dynamic endpoint resolution with local fallback");
    println!("  - WebSocket channel with auto-reconnection");
    println!("  - Accumulating inbound message log");
}
