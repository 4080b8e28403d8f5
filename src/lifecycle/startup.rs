//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (health prober, metrics)
//! - Bind the listener and begin accepting traffic
//! - Drain background tasks once the server stops
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::future::Future;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::health::HealthProber;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::load_balancer::{BackendPool, BalancerError};
use crate::observability::metrics;

/// How long background tasks get to stop after the server exits.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build backend pool: {0}")]
    Balancer(#[from] BalancerError),

    #[error("invalid metrics address: {0}")]
    MetricsAddress(#[from] AddrParseError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the balancer until SIGINT or SIGTERM.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let pool = build_pool(&config).await?;

    let address = config.listener.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    serve(config, pool, listener, signals::wait_for_signal()).await
}

/// Build the backend pool described by `config`.
pub async fn build_pool(config: &ProxyConfig) -> Result<Arc<BackendPool>, StartupError> {
    let pool = BackendPool::build(
        config.balancer.strategy,
        &config.balancer.backends,
        config.circuit_breaker.breaker_config(),
    )
    .await?;

    tracing::info!(
        strategy = %pool.kind(),
        backends = ?config.balancer.backends,
        failure_threshold = config.circuit_breaker.failure_threshold,
        cooldown = %humantime::format_duration(config.circuit_breaker.cooldown),
        "Backend pool ready"
    );
    Ok(Arc::new(pool))
}

/// Serve on `listener` until `signal` resolves, then drain background tasks.
pub async fn serve<F>(
    config: ProxyConfig,
    pool: Arc<BackendPool>,
    listener: TcpListener,
    signal: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut shutdown = Shutdown::new();

    let prober = HealthProber::new(Arc::clone(&pool), config.health_check.clone());
    shutdown.spawn("health-prober", prober.run(shutdown.subscribe()));

    let server = HttpServer::new(&config, pool);
    let result = server.run(listener, signal).await;

    if !shutdown.drain(DRAIN_TIMEOUT).await {
        tracing::warn!("Shutdown completed with aborted background tasks");
    }
    result.map_err(StartupError::Serve)
}
