//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe backends whose breaker reports unavailable
//! - Signal recovery into the breaker on a 2xx probe

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::http::request::upstream_uri;
use crate::load_balancer::{Backend, BackendPool};
use crate::observability::metrics;

pub const USER_AGENT: &str = "circuit-lb-health-check";

/// Counts from one probing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// Backends that were unavailable and got probed.
    pub probed: usize,
    /// Probes answered with a 2xx status.
    pub healthy: usize,
}

pub struct HealthProber {
    pool: Arc<BackendPool>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthProber {
    pub fn new(pool: Arc<BackendPool>, config: HealthCheckConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.timeout()));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            pool,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            "Health prober starting"
        );

        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; backends start closed.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_unavailable().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every backend that is currently unavailable, concurrently.
    pub async fn probe_unavailable(&self) -> ProbeReport {
        let mut probes = JoinSet::new();
        for backend in self.pool.backends() {
            if backend.is_available() {
                continue;
            }
            let uri = match self.probe_uri(backend) {
                Ok(uri) => uri,
                Err(e) => {
                    tracing::error!(backend = %backend, error = %e, "Failed to build health check URI");
                    continue;
                }
            };
            let backend = Arc::clone(backend);
            let client = self.client.clone();
            let timeout = self.config.timeout();
            probes.spawn(async move {
                let healthy = probe(&client, &backend, uri, timeout).await;
                metrics::record_probe(backend.address(), healthy);
                if healthy {
                    tracing::info!(backend = %backend, "Backend recovered");
                    backend.record_success();
                }
                healthy
            });
        }

        let mut report = ProbeReport::default();
        while let Some(joined) = probes.join_next().await {
            report.probed += 1;
            match joined {
                Ok(true) => report.healthy += 1,
                Ok(false) => {}
                Err(e) => tracing::error!(error = %e, "Health probe task failed"),
            }
        }
        report
    }

    fn probe_uri(&self, backend: &Backend) -> Result<Uri, axum::http::Error> {
        let path: Uri = self.config.path.parse()?;
        upstream_uri(backend.url(), &path)
    }
}

async fn probe(
    client: &Client<HttpConnector, Body>,
    backend: &Backend,
    uri: Uri,
    timeout: Duration,
) -> bool {
    let request = match Request::get(uri)
        .header(header::USER_AGENT, USER_AGENT)
        .body(Body::empty())
    {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(backend = %backend, error = %e, "Failed to build health check request");
            return false;
        }
    };

    match time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) => {
            let success = response.status().is_success();
            if !success {
                tracing::debug!(backend = %backend, status = %response.status(), "Health check failed: non-success status");
            }
            success
        }
        Ok(Err(e)) => {
            tracing::debug!(backend = %backend, error = %e, "Health check failed: connection error");
            false
        }
        Err(_) => {
            tracing::debug!(backend = %backend, "Health check failed: timeout");
            false
        }
    }
}
