//! Access logging.
//!
//! Emits one structured event per client request once its response is
//! decided, and records the request metrics. The proxy outcome attached to
//! the response tells apart failures that share a status code.
//!
//! The entry is finished inside the proxy task rather than in a layer, so a
//! request whose client disconnected is still logged and counted.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Method, Request, Response};

use crate::observability::metrics;
use crate::proxy::ProxyOutcome;

/// Request details captured before the request is handed to the proxy.
#[derive(Debug)]
pub struct AccessLog {
    start_time: Instant,
    method: Method,
    path: String,
    query: String,
    request_id: String,
}

impl AccessLog {
    pub fn begin(request: &Request<Body>) -> Self {
        Self {
            start_time: Instant::now(),
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            query: request.uri().query().unwrap_or_default().to_string(),
            request_id: request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string(),
        }
    }

    /// Log and count the request against the response it produced.
    pub fn finish(self, response: &Response<Body>) {
        let status = response.status();
        let outcome = response.extensions().get::<ProxyOutcome>();
        let label = outcome.map(ProxyOutcome::as_str).unwrap_or("internal");
        let backend = outcome.and_then(ProxyOutcome::backend).unwrap_or("-");
        let attempts = outcome.map(ProxyOutcome::attempts).unwrap_or_default();

        metrics::record_request(label, status.as_u16(), self.start_time);

        tracing::info!(
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            query = %self.query,
            status = status.as_u16(),
            backend = %backend,
            outcome = label,
            attempts,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Request completed"
        );
    }
}
