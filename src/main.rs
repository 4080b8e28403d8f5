//! circuit-lb
//!
//! An HTTP load balancer with per-backend circuit breakers.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────────┐
//!                      │                   CIRCUIT-LB                        │
//!                      │                                                     │
//!   Client Request     │  ┌─────────┐    ┌──────────┐    ┌──────────────┐   │
//!   ───────────────────┼─▶│  http   │───▶│  proxy   │───▶│load_balancer │   │
//!                      │  │ server  │    │ attempts │    │ pool+strategy│   │
//!                      │  └─────────┘    └────┬─────┘    └──────┬───────┘   │
//!                      │                      │                 │           │
//!                      │                      ▼                 ▼           │
//!   Client Response    │               ┌────────────┐    ┌──────────────┐   │
//!   ◀──────────────────┼───────────────│ transport  │    │   circuit    │   │
//!                      │               │  + sink    │    │   breakers   │   │
//!                      │               └─────┬──────┘    └──────▲───────┘   │
//!                      │                     │                  │           │
//!                      │                     ▼                  │           │
//!                      │               Backend servers ◀── health prober    │
//!                      │                                                     │
//!                      │  config · observability · lifecycle                 │
//!                      └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use circuit_lb::config;
use circuit_lb::lifecycle::startup;
use circuit_lb::observability::logging;

#[derive(Parser)]
#[command(name = "circuit-lb")]
#[command(about = "HTTP load balancer with per-backend circuit breakers", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init("info")?;
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    logging::init(&config.observability.log_level)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.listener.port,
        strategy = %config.balancer.strategy,
        backends = ?config.balancer.backends,
        "circuit-lb starting"
    );

    if let Err(e) = startup::run(config).await {
        tracing::error!(error = %e, "Load balancer failed");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
