//! # featgauge HTTP API Module
//!
//! Node agents publish their feature reports here; Prometheus scrapes the
//! resulting gauges from `/metrics`.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Controller and store status
//! - `GET /reports` - List every stored report
//! - `GET /reports/{node}` - Fetch one report
//! - `PUT /reports/{node}` - Create or replace a report
//! - `DELETE /reports/{node}` - Delete a report
//! - `GET /metrics` - Prometheus text exposition
//!
//! ## Security Configuration
//!
//! - `FEATGAUGE_API_KEY`: If set, requires Bearer token authentication
//!   (`/health` and `/metrics` stay open for probes and scrapers)
//! - `security.rate_limit` / `FEATGAUGE_RATE_LIMIT`: Requests per second (0 disables)

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{API_KEY_ENV, get_api_key_from_env};
pub use handlers::{
    delete_report_handler, get_report_handler, health_handler, list_reports_handler,
    metrics_handler, put_report_handler, status_handler,
};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    ErrorResponse, HealthResponse, ReportListResponse, ReportRequest, ReportResponse,
    StatusResponse, WriteResponse,
};

use crate::controller::ControllerHandle;
use axum::{Router, middleware as axum_middleware, routing::get};
use featgauge_core::{GaugeError, PrometheusRegistry, ReconcileContext, ReportStore};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Request bodies are tiny feature lists.
const MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// Report storage written by the handlers.
    pub store: Arc<dyn ReportStore>,
    /// The registry the controller publishes into, exposed on `/metrics`.
    pub registry: Arc<PrometheusRegistry>,
    /// Event queue into the controller.
    pub controller: ControllerHandle,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn ReportStore>,
        registry: Arc<PrometheusRegistry>,
        controller: ControllerHandle,
    ) -> Self {
        Self {
            store,
            registry,
            controller,
        }
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. Rate Limiting - if `rate_limit > 0`
/// 3. Authentication - if `FEATGAUGE_API_KEY` is set
pub fn create_router(state: AppState, rate_limit: u32) -> Router {
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED, any client can write reports. \
             Set {} to enable authentication.",
            API_KEY_ENV
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/reports", get(handlers::list_reports_handler))
        .route(
            "/reports/{node}",
            get(handlers::get_report_handler)
                .put(handlers::put_report_handler)
                .delete(handlers::delete_report_handler),
        )
        .route("/metrics", get(handlers::metrics_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve the API until Ctrl+C, then cancel `ctx` and drain connections.
pub async fn run_server(
    addr: &str,
    state: AppState,
    rate_limit: u32,
    ctx: ReconcileContext,
) -> Result<(), GaugeError> {
    let router = create_router(state, rate_limit);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GaugeError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("featgauge HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(ctx))
        .await
        .map_err(|e| GaugeError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal(ctx: ReconcileContext) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
    ctx.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::controller::Controller;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use featgauge_core::MemoryReportStore;
    use tower::ServiceExt;

    fn state() -> AppState {
        let store: Arc<dyn ReportStore> = Arc::new(MemoryReportStore::new());
        let registry = Arc::new(PrometheusRegistry::new("test_features_applied").expect("registry"));
        let (_controller, handle) = Controller::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            &ControllerConfig::default(),
            ReconcileContext::new(),
        )
        .expect("controller");
        AppState::new(store, registry, handle)
    }

    #[tokio::test]
    async fn metrics_route_served_without_controller_activity() {
        let router = create_router(state(), 0);

        let response = router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn write_to_stopped_controller_still_stores() {
        let state = state();
        let store = Arc::clone(&state.store);
        let router = create_router(state, 0);

        let response = router
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/reports/node1")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"features":["ipv6"]}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.report_count().expect("count"), 1);
    }
}
