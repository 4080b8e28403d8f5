//! Proxy orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (body buffered once)
//!     → pool.next_backend()            ── none available → 503, no retry
//!     → request.rs (upstream request for this backend)
//!     → transport.rs (forward, deadline, client cancellation)
//!     → sink.rs (first write decides: commit 2xx / reject other)
//!     → classify attempt
//!         - client gone      → 499, breaker untouched, stop
//!         - success          → breaker success, return committed response
//!         - failure          → breaker failure, next attempt
//!     → attempts exhausted   → 503
//! ```
//!
//! # Design Decisions
//! - Each attempt touches exactly one breaker: the one of the backend it used
//! - Nothing reaches the client before an attempt is decided
//! - Client cancellation is observed when an attempt completes

pub mod outcome;
pub mod sink;
pub mod transport;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use tokio_util::sync::CancellationToken;

use crate::config::ProxyConfig;
use crate::http::request::build_upstream_request;
use crate::load_balancer::BackendPool;
use crate::observability::metrics;
use crate::resilience::retries::{AttemptOutcome, RetryPolicy};
use crate::resilience::timeouts::with_deadline;

pub use outcome::ProxyOutcome;
pub use sink::AttemptSink;
pub use transport::{HttpTransport, Transport, TransportError};

/// Tunables of the attempt loop.
#[derive(Debug, Clone, Copy)]
pub struct ProxySettings {
    pub retry: RetryPolicy,
    /// Deadline of a single attempt.
    pub attempt_timeout: Duration,
    /// Largest inbound body buffered for replay.
    pub max_body_bytes: usize,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            attempt_timeout: Duration::from_secs(30),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl From<&ProxyConfig> for ProxySettings {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            retry: RetryPolicy::new(config.retries.max_attempts),
            attempt_timeout: Duration::from_secs(config.timeouts.request_secs),
            max_body_bytes: config.limits.max_body_bytes,
        }
    }
}

/// Turns one inbound request into exactly one client response.
#[derive(Debug)]
pub struct ProxyService<T> {
    pool: Arc<BackendPool>,
    transport: T,
    settings: ProxySettings,
}

impl<T: Transport> ProxyService<T> {
    pub fn new(pool: Arc<BackendPool>, transport: T, settings: ProxySettings) -> Self {
        Self {
            pool,
            transport,
            settings,
        }
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Proxy `request`, retrying across backends as allowed.
    ///
    /// `cancel` fires when the client goes away. The returned response always
    /// carries its [`ProxyOutcome`] in the extensions.
    pub async fn handle(
        &self,
        request: Request<Body>,
        client_ip: Option<IpAddr>,
        cancel: CancellationToken,
    ) -> Response<Body> {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let (parts, body) = request.into_parts();
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            read = axum::body::to_bytes(body, self.settings.max_body_bytes) => Some(read),
        };
        let body = match read {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) if !cancel.is_cancelled() => {
                tracing::warn!(
                    request_id = %request_id,
                    limit = self.settings.max_body_bytes,
                    error = %e,
                    "Rejecting request body"
                );
                return ProxyOutcome::BodyRejected.into_failure_response();
            }
            _ => {
                tracing::info!(request_id = %request_id, "Client closed request while sending body");
                return ProxyOutcome::ClientClosed { backend: None, attempts: 0 }
                    .into_failure_response();
            }
        };

        let mut attempts = 0;
        while self.settings.retry.allows(attempts) {
            let backend = match self.pool.next_backend() {
                Ok(backend) => backend,
                Err(e) => {
                    tracing::warn!(
                        request_id = %request_id,
                        attempts,
                        error = %e,
                        "No available backends"
                    );
                    return ProxyOutcome::NoAvailableBackends { attempts }.into_failure_response();
                }
            };

            tracing::debug!(
                request_id = %request_id,
                attempt = attempts + 1,
                backend = %backend,
                method = %parts.method,
                path = %parts.uri.path(),
                "Forwarding request"
            );

            let mut sink = AttemptSink::new();
            let result = match build_upstream_request(&parts, &body, backend.url(), client_ip) {
                Ok(upstream) => {
                    let forward = with_deadline(
                        self.settings.attempt_timeout,
                        self.transport.forward(upstream, &mut sink),
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(TransportError::Cancelled),
                        result = forward => result,
                    }
                }
                Err(e) => Err(TransportError::InvalidRequest(e)),
            };

            let outcome = AttemptOutcome::classify(result.is_err(), cancel.is_cancelled(), sink.status());
            metrics::record_attempt(backend.address(), outcome.as_str());
            attempts += 1;

            match outcome {
                AttemptOutcome::ClientGone => {
                    tracing::info!(
                        request_id = %request_id,
                        backend = %backend,
                        "Client closed request, not penalizing backend"
                    );
                    return ProxyOutcome::ClientClosed {
                        backend: Some(backend.address().to_string()),
                        attempts,
                    }
                    .into_failure_response();
                }
                AttemptOutcome::Success(_) => {
                    backend.record_success();
                    let response = sink.into_committed().unwrap_or_default();
                    return ProxyOutcome::Success {
                        backend: backend.address().to_string(),
                        attempts,
                    }
                    .attach(response);
                }
                failure => {
                    if failure.is_backend_failure() {
                        backend.record_failure();
                    }
                    match (&result, failure) {
                        (Err(e), _) => tracing::warn!(
                            request_id = %request_id,
                            attempt = attempts,
                            backend = %backend,
                            connect_error = e.is_connect(),
                            error = %e,
                            "Backend request failed"
                        ),
                        (Ok(()), AttemptOutcome::BadStatus(status)) => tracing::warn!(
                            request_id = %request_id,
                            attempt = attempts,
                            backend = %backend,
                            status = %status,
                            "Backend returned non-2xx status"
                        ),
                        (Ok(()), _) => tracing::warn!(
                            request_id = %request_id,
                            attempt = attempts,
                            backend = %backend,
                            "Backend did not write a response"
                        ),
                    }
                }
            }

            if cancel.is_cancelled() {
                tracing::info!(request_id = %request_id, "Aborting retries, client closed request");
                return ProxyOutcome::ClientClosed { backend: None, attempts }.into_failure_response();
            }
        }

        tracing::warn!(
            request_id = %request_id,
            attempts,
            "All attempts failed"
        );
        ProxyOutcome::Exhausted { attempts }.into_failure_response()
    }
}
