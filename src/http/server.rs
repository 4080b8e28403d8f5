//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener with graceful shutdown
//! - Tie each request's lifetime to a cancellation token

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::http::access_log::AccessLog;
use crate::load_balancer::BackendPool;
use crate::proxy::{HttpTransport, ProxyService, ProxySettings};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ProxyService<HttpTransport>>,
}

/// HTTP front end of the balancer.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ProxyConfig, pool: Arc<BackendPool>) -> Self {
        let transport = HttpTransport::new(config.timeouts.connect());
        let proxy = ProxyService::new(pool, transport, ProxySettings::from(config));

        let state = AppState {
            proxy: Arc::new(proxy),
        };

        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `signal` resolves, then finish in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, signal: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler.
///
/// The proxy runs in its own task. If the client connection goes away,
/// hyper drops this future, the drop guard cancels the token and the task
/// sees the cancellation instead of being silently dropped mid-attempt.
/// The access log entry is finished in that task so it survives the drop.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let entry = AccessLog::begin(&request);
    let proxy = Arc::clone(&state.proxy);
    let task = tokio::spawn(
        async move {
            let response = proxy.handle(request, client_ip, cancel).await;
            entry.finish(&response);
            response
        }
        .in_current_span(),
    );

    let response = match task.await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Proxy task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal proxy error").into_response()
        }
    };
    guard.disarm();
    response
}
