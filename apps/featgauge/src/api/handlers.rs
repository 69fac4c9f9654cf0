//! # API Endpoint Handlers
//!
//! Writes go to the store first, then the matching watch event is queued for
//! the controller. Handlers never touch the gauges themselves.

use super::{
    AppState,
    types::{
        ErrorResponse, HealthResponse, ReportListResponse, ReportRequest, ReportResponse,
        StatusResponse, WriteResponse,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use featgauge_core::{GaugeError, NodeName, WatchEvent};

/// Content type of the Prometheus text format.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

fn internal_error(e: &GaugeError) -> Response {
    tracing::error!(error = %e, "Store operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(e.to_string())),
    )
        .into_response()
}

/// Hand an event to the controller. The write already succeeded, so a
/// stopped controller is logged rather than reported to the client.
async fn notify(state: &AppState, event: WatchEvent) {
    let kind = event.kind();
    if let Err(e) = state.controller.notify(event).await {
        tracing::error!(kind, error = %e, "Watch event dropped");
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Controller snapshot plus live registry and store numbers.
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let reports = match state.store.report_count() {
        Ok(count) => count,
        Err(e) => return internal_error(&e),
    };
    let status = state.controller.status();

    let response = StatusResponse {
        reports,
        active_features: state.registry.active(),
        remembered_features: status.remembered,
        reconciles: status.reconciles,
        failures: status.failures,
        events_filtered: status.events_filtered,
        last_outcome: status.last_outcome,
    };

    (StatusCode::OK, Json(response)).into_response()
}

// =============================================================================
// REPORT HANDLERS
// =============================================================================

/// List every stored report.
pub async fn list_reports_handler(State(state): State<AppState>) -> Response {
    match state.store.list_reports() {
        Ok(reports) => {
            let response = ReportListResponse {
                reports: reports.into_iter().map(ReportResponse::from).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => internal_error(&e),
    }
}

/// Fetch the report of one node.
pub async fn get_report_handler(
    State(state): State<AppState>,
    Path(node): Path<String>,
) -> Response {
    match state.store.get_report(&NodeName::new(node.clone())) {
        Ok(Some(report)) => (StatusCode::OK, Json(ReportResponse::from(report))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                GaugeError::ReportNotFound(node).to_string(),
            )),
        )
            .into_response(),
        Err(e) => internal_error(&e),
    }
}

/// Create or replace the report of one node.
///
/// Emits `created` for a new node and `updated` (with the previous report)
/// otherwise. Whether an update triggers a reconcile is the controller's call.
pub async fn put_report_handler(
    State(state): State<AppState>,
    Path(node): Path<String>,
    Json(request): Json<ReportRequest>,
) -> impl IntoResponse {
    let report = request.into_report(node.clone());

    match state.store.upsert_report(report.clone()) {
        Ok(previous) => {
            let event = match previous {
                None => WatchEvent::created(report),
                Some(old) => WatchEvent::updated(old, report),
            };
            let kind = event.kind();
            notify(&state, event).await;
            (StatusCode::OK, Json(WriteResponse::success(node, kind)))
        }
        Err(GaugeError::InvalidReport(reason)) => (
            StatusCode::BAD_REQUEST,
            Json(WriteResponse::error(
                node,
                format!("Invalid report: {}", reason),
            )),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Report write failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WriteResponse::error(node, e.to_string())),
            )
        }
    }
}

/// Delete the report of one node.
pub async fn delete_report_handler(
    State(state): State<AppState>,
    Path(node): Path<String>,
) -> impl IntoResponse {
    match state.store.remove_report(&NodeName::new(node.clone())) {
        Ok(Some(removed)) => {
            notify(&state, WatchEvent::deleted(removed)).await;
            (StatusCode::OK, Json(WriteResponse::success(node, "deleted")))
        }
        Ok(None) => {
            let message = GaugeError::ReportNotFound(node.clone()).to_string();
            (StatusCode::NOT_FOUND, Json(WriteResponse::error(node, message)))
        }
        Err(e) => {
            tracing::error!(error = %e, "Report delete failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WriteResponse::error(node, e.to_string())),
            )
        }
    }
}

// =============================================================================
// METRICS HANDLER
// =============================================================================

/// Prometheus scrape endpoint.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.registry.encode_text() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => internal_error(&e),
    }
}
