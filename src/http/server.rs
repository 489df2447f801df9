//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router for the business or upstream-facing endpoint
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Decode JSON requests, hand them to the service, encode the answer
//! - Serve until the shutdown signal fires

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{request_id, UuidRequestId};
use crate::proxy::error::ProxyError;
use crate::service::{HotelSupply, RateBreakdownRequest, RateBreakdownResponse};

/// Path of the business endpoint.
pub const RATE_BREAKDOWN_PATH: &str = "/rate_breakdown";

/// Path upstream instances serve, and the default proxy target path.
pub const UPSTREAM_RATE_BREAKDOWN_PATH: &str = "/ean/rate_breakdown";

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Slack between the handler deadline and the router-wide timeout, which
/// only backstops routes without a deadline of their own.
const TIMEOUT_BACKSTOP: Duration = Duration::from_secs(1);

/// Service shared with handlers.
pub type SharedSupply = Arc<dyn HotelSupply>;

#[derive(Clone)]
struct AppState {
    service: SharedSupply,
    request_timeout: Duration,
}

/// HTTP server exposing one [`HotelSupply`] under a rate breakdown path.
pub struct HttpServer {
    router: Router,
    name: &'static str,
}

impl HttpServer {
    /// The business endpoint: `/rate_breakdown`.
    pub fn business(config: &ProxyConfig, service: SharedSupply) -> Self {
        Self::new("business", RATE_BREAKDOWN_PATH, config, service)
    }

    /// The upstream-facing endpoint: `/ean/rate_breakdown`.
    pub fn upstream(config: &ProxyConfig, service: SharedSupply) -> Self {
        Self::new("upstream", UPSTREAM_RATE_BREAKDOWN_PATH, config, service)
    }

    fn new(name: &'static str, path: &str, config: &ProxyConfig, service: SharedSupply) -> Self {
        let router = Self::build_router(path, config, service);
        Self { router, name }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(path: &str, config: &ProxyConfig, service: SharedSupply) -> Router {
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let state = AppState {
            service,
            request_timeout,
        };

        Router::new()
            .route(path, get(rate_breakdown_handler).post(rate_breakdown_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(TimeoutLayer::new(request_timeout + TIMEOUT_BACKSTOP))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The router, for serving it elsewhere or driving it in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(server = self.name, address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!(server = self.name, "HTTP server stopped");
        Ok(())
    }
}

async fn rate_breakdown_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RateBreakdownRequest>,
) -> Result<Json<RateBreakdownResponse>, ProxyError> {
    tracing::debug!(
        request_id = %request_id(&headers),
        service = state.service.name(),
        arrival = %request.arrival,
        departure = %request.departure,
        "Rate breakdown requested"
    );

    let deadline = Instant::now() + state.request_timeout;
    let response = state.service.rate_breakdown_until(request, deadline).await?;
    Ok(Json(response))
}

async fn health_handler(State(state): State<AppState>) -> StatusCode {
    if state.service.health_check().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
