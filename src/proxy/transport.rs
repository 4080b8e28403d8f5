//! Outbound transport.
//!
//! # Responsibilities
//! - Send a fully formed upstream request to a backend
//! - Hand the backend response to the attempt's sink
//! - Report connect/reset/protocol failures as [`TransportError`]
//!
//! # Design Decisions
//! - Deadlines and client cancellation are applied by the caller, not here
//! - Response bodies are streamed, never buffered

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::http::response::strip_hop_by_hop;
use crate::proxy::sink::AttemptSink;

/// Failure of a single forward call.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error("request cancelled by client")]
    Cancelled,

    #[error("failed to build upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),
}

impl TransportError {
    /// Connection could not be established at all.
    pub fn is_connect(&self) -> bool {
        match self {
            TransportError::Upstream(e) => e.is_connect(),
            TransportError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

/// Byte-forwarding primitive the orchestrator delegates to.
pub trait Transport: Send + Sync + 'static {
    /// Send `request` and write the backend's response into `sink`.
    fn forward(
        &self,
        request: Request<Body>,
        sink: &mut AttemptSink,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// HTTP/1.1 transport over a pooled hyper client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Body>,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

impl Transport for HttpTransport {
    async fn forward(
        &self,
        request: Request<Body>,
        sink: &mut AttemptSink,
    ) -> Result<(), TransportError> {
        let response = self.client.request(request).await?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);

        // A fresh sink never refuses the first write.
        let _ = sink.write(Response::from_parts(parts, Body::new(body)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn one_shot_backend(raw_response: &'static str) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(raw_response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        addr
    }

    fn get(addr: std::net::SocketAddr) -> Request<Body> {
        Request::builder()
            .uri(format!("http://{}/ping", addr))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn writes_backend_response_into_sink() {
        let addr = one_shot_backend(
            "HTTP/1.1 200 OK\r\nContent-Length: 4\r\nKeep-Alive: timeout=5\r\nConnection: close\r\n\r\npong",
        )
        .await;
        let transport = HttpTransport::new(Duration::from_secs(1));
        let mut sink = AttemptSink::new();

        transport.forward(get(addr), &mut sink).await.unwrap();

        let response = sink.into_committed().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("keep-alive").is_none());
        assert!(response.headers().get("connection").is_none());
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"pong");
    }

    #[tokio::test]
    async fn closed_connection_is_transport_error() {
        let addr = one_shot_backend("").await;
        let transport = HttpTransport::new(Duration::from_secs(1));
        let mut sink = AttemptSink::new();

        let result = transport.forward(get(addr), &mut sink).await;
        assert!(result.is_err());
        assert_eq!(sink.status(), None);
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(Duration::from_secs(1));
        let mut sink = AttemptSink::new();
        let err = transport.forward(get(addr), &mut sink).await.unwrap_err();
        assert!(err.is_connect(), "expected connect error, got {:?}", err);
    }
}
