use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bounty_server::{AppState, BountyConfig, demo, logging, router};

#[derive(Parser)]
#[command(name = "bounty", about = "Task-bounty ledger with escrow and reputation")]
struct Cli {
    /// Config file (default: <state_dir>/config.toml)
    #[arg(long, global = true, env = "BOUNTY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override the configured listen address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run a demo bounty lifecycle
    Demo,
    /// Print the effective configuration
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<BountyConfig> {
    match path {
        Some(path) => BountyConfig::load_file(path),
        None => BountyConfig::load(&bounty_server::default_state_dir()),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            logging::init_logging(&config)?;

            let state = AppState::bootstrap(&config).await?;
            let listener = tokio::net::TcpListener::bind(&config.bind_addr)
                .await
                .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
            tracing::info!(
                "Bounty server listening on {} (persist = {})",
                config.bind_addr,
                config.persist
            );
            axum::serve(listener, router(state))
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;
        }
        Commands::Demo => {
            logging::init_logging(&config)?;
            demo::run(config.rules).await?;
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}
