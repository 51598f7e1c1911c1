//! echo-gate
//!
//! A TCP echo server with a hard cap on concurrent connections and a
//! graceful shutdown that drains every in-flight connection.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌────────────────────────────────────────────────┐
//!                 │                    SERVER                      │
//!   Client        │  ┌─────────┐    ┌───────────┐    ┌──────────┐  │
//!   ──────────────┼─▶│ accept  │───▶│ admission │───▶│  echo    │  │
//!                 │  │  loop   │    │   gate    │    │ handler  │  │
//!   ◀─────────────┼──│         │    │ (refuse   │    │ (1 task  │  │
//!   (echo/close)  │  └────▲────┘    │  on full) │    │ per conn)│  │
//!                 │       │         └───────────┘    └────┬─────┘  │
//!                 │       │ stop                     join │        │
//!                 │  ┌────┴──────────────────────────────▼─────┐  │
//!                 │  │          shutdown coordinator            │  │
//!                 │  └──────────────────▲───────────────────────┘  │
//!                 └─────────────────────┼──────────────────────────┘
//!                                SIGINT / SIGTERM
//! ```

use std::path::PathBuf;

use clap::Parser;
use echo_gate::config::{read_config, validate_config, ConfigError};
use echo_gate::lifecycle::signals::shutdown_signal;
use echo_gate::observability::{logging, metrics};
use echo_gate::Server;

#[derive(Parser)]
#[command(name = "echo-gate")]
#[command(about = "TCP echo server with connection limits and graceful shutdown", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "configs/config.json")]
    config: PathBuf,

    /// Override the listen address.
    #[arg(short, long)]
    address: Option<String>,

    /// Override the maximum number of concurrent connections.
    #[arg(short, long)]
    max_connections: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = read_config(&cli.config)
        .map_err(|e| format!("Unable to load configuration {:?}: {}", cli.config, e))?;
    if let Some(address) = cli.address {
        config.server_address = address;
    }
    if let Some(max) = cli.max_connections {
        config.max_connections = max;
    }
    validate_config(&config).map_err(|errors| {
        format!(
            "Invalid configuration {:?}: {}",
            cli.config,
            ConfigError::Validation(errors)
        )
    })?;

    logging::init_logging(&config.log_filter);

    tracing::info!(
        bind_address = %config.server_address,
        max_connections = config.max_connections,
        idle_timeout_secs = ?config.idle_timeout_secs,
        "Configuration loaded"
    );

    if let Some(addr) = &config.metrics_address {
        match addr.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => {
                tracing::error!(metrics_address = %addr, "Failed to parse metrics address");
            }
        }
    }

    let server = Server::new(config);

    let on_signal = server.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return;
        }
        on_signal.shutdown().await;
    });

    server
        .start()
        .await
        .map_err(|e| format!("Error starting server: {}", e))?;

    tracing::info!("Shutdown complete");
    Ok(())
}
