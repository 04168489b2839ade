//! Field-device gateway binary.
//!
//! Starts the status server and the poller as independent tasks, then waits
//! for a termination signal and shuts both down in order.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fieldgate::config::{GatewayConfig, LogFormat};
use fieldgate::forwarder::{BulletinForwarder, CloudForwarder, Forwarders};
use fieldgate::http::StatusServer;
use fieldgate::poller::Poller;
use fieldgate::reading::SharedState;
use fieldgate::transport::ModbusTransport;

/// Field-device gateway for a register-oriented controller.
#[derive(Parser, Debug)]
#[command(name = "fieldgate")]
#[command(about = "Polls controller registers and serves the latest reading over HTTP")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long, default_value = "gateway.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Override the status server listen address.
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = GatewayConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }

    // Initialize logging
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    info!("Starting fieldgate");
    info!("Loaded configuration from {:?}", args.config);

    let state = SharedState::new(&config.server.greeting);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Bind up front; an occupied port is fatal at startup.
    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.listen))?;

    let transport = ModbusTransport::new(&config.controller)
        .map_err(|e| anyhow::anyhow!("Invalid controller settings: {}", e))?;
    let forwarders = Forwarders::new(
        BulletinForwarder::new(config.bulletin.clone()),
        CloudForwarder::new(config.cloud.clone()),
    );
    let poller = Poller::new(transport, &config, state.clone(), forwarders);
    let server = StatusServer::new(state);

    // Start status server
    let server_shutdown = shutdown_rx.clone();
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.run(listener, server_shutdown).await {
            error!("Status server error: {}", e);
        }
    });

    // Start poller
    let poller_task = tokio::spawn(poller.run(shutdown_rx));

    info!(
        controller = %config.controller.host,
        listen = %config.server.listen,
        "Gateway running"
    );

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).unwrap();
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown; stop accepting HTTP first, then let the poller
    // finish its in-flight cycle.
    shutdown_tx.send(true)?;

    let _ = tokio::time::timeout(Duration::from_secs(5), server_task).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), poller_task).await;

    info!("Gateway stopped");
    Ok(())
}
