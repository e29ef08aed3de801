//! Tally daemon (`tallyd`)
//!
//! Serves the value-counting store over TCP until interrupted.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tally_server::{Server, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tallyd", version, about = "Value-counting key-value store with undo/redo")]
struct Args {
    /// JSON configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the configuration file)
    #[arg(long, short)]
    listen: Option<String>,

    /// Verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    tracing::info!("tallyd v{} starting...", env!("CARGO_PKG_VERSION"));

    let server = Server::bind(config.clone())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    server
        .run_until(async {
            match shutdown_signal().await {
                Ok(()) => tracing::info!("Shutdown signal received..."),
                Err(e) => {
                    // Without a signal handler, only killing the process stops it
                    tracing::error!(error = %e, "failed to install signal handlers");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await?;

    tracing::info!("tallyd stopped");
    Ok(())
}

fn init_tracing(verbosity: u8) {
    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}
