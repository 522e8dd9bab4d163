//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Dispatch requests to the rewrite rules
//! - Run each proxy operation and stream its result back
//! - Observability (metrics, correlation IDs)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ProxyConfig, ServerConfig};
use crate::http::request::{HttpInbound, X_REQUEST_ID};
use crate::http::response::{error_response, error_status, StreamingResponse};
use crate::lifecycle::shutdown::wait_for_signal;
use crate::observability::metrics;
use crate::proxy::USE_PROXY_ATTRIBUTE;
use crate::routing::Router as RuleRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<RuleRouter>,
    pub server: Arc<ServerConfig>,
    pub local_addr: SocketAddr,
}

/// HTTP server for the rewrite proxy.
pub struct HttpServer {
    config: ProxyConfig,
    rules: Arc<RuleRouter>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let rules = Arc::new(RuleRouter::from_config(&config));
        tracing::info!(rules = rules.len(), "Rewrite rules compiled");
        Self { config, rules }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires or Ctrl+C is received.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let state = AppState {
            rules: self.rules.clone(),
            server: Arc::new(self.config.server.clone()),
            local_addr: addr,
        };
        let app = Self::build_router(&self.config, state)
            .into_make_service_with_connect_info::<SocketAddr>();

        // Serve with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Looks up the rule, then runs the proxy operation in its own task so the
/// response head can be returned while the body is still streaming.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);

    let Some((rule, target)) = state.rules.route(&path, query.as_deref()) else {
        tracing::warn!(path = %path, "No rule matched");
        metrics::record_request(&method, 404, start_time);
        return (StatusCode::NOT_FOUND, "No matching rule found").into_response();
    };

    let (parts, body) = request.into_parts();
    let mut inbound = match HttpInbound::new(parts, body, peer, state.local_addr, &state.server) {
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Request rejected");
            metrics::record_request(&method, error_status(&e).as_u16(), start_time);
            return error_response(&e);
        }
    };
    if let Some(use_proxy) = &rule.use_proxy {
        inbound.set_attribute(USE_PROXY_ATTRIBUTE, use_proxy.clone());
    }

    let request_id = inbound.request_id().unwrap_or("unknown").to_string();
    tracing::debug!(
        request_id = %request_id,
        rule = %rule.name,
        target = %target,
        "Dispatching to rule"
    );

    let proxy = rule.proxy.clone();
    let (mut response, pending) = StreamingResponse::channel();
    let task_method = method.clone();
    tokio::spawn(async move {
        match proxy.execute(&target, &mut inbound, &mut response).await {
            Ok(bytes) => {
                tracing::debug!(request_id = %request_id, bytes, "Proxy operation complete");
                response.finish();
            }
            Err(e) => {
                metrics::record_upstream_error(e.kind());
                if let Some(e) = response.fail(e) {
                    tracing::error!(
                        request_id = %request_id,
                        method = %task_method,
                        error = %e,
                        "Upstream body interrupted after response was committed; aborting client stream"
                    );
                }
            }
        }
    });

    match pending.into_response().await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), start_time);
            response
        }
        Err(e) => {
            if e.is_pre_flight() {
                tracing::warn!(path = %path, error = %e, "Request rejected before forwarding");
            } else {
                tracing::error!(path = %path, error = %e, "Proxy operation failed");
            }
            metrics::record_request(&method, error_status(&e).as_u16(), start_time);
            error_response(&e)
        }
    }
}
