//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use featgauge::api::{HealthResponse, ReportRequest, ReportResponse, StatusResponse, WriteResponse};
use featgauge::controller::ReconcileOutcome;
use featgauge_core::Report;

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_health_response_deserialization() {
    let json = r#"{"status":"ok","version":"1.0.0"}"#;
    let health: HealthResponse = serde_json::from_str(json).unwrap();

    assert_eq!(health.status, "ok");
    assert_eq!(health.version, "1.0.0");
}

// =============================================================================
// REPORT TESTS
// =============================================================================

#[test]
fn test_report_request_keeps_order_and_duplicates() {
    let request: ReportRequest =
        serde_json::from_str(r#"{"features":["ipv6","bond","ipv6"]}"#).unwrap();

    let report = request.into_report("node1".to_string());

    assert_eq!(report, Report::from_strs("node1", &["ipv6", "bond", "ipv6"]));
}

#[test]
fn test_report_request_missing_features_rejected() {
    let result = serde_json::from_str::<ReportRequest>(r#"{"node":"node1"}"#);
    assert!(result.is_err());
}

#[test]
fn test_report_response_from_report() {
    let response = ReportResponse::from(Report::from_strs("node1", &["vrf", "lldp"]));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["node"], "node1");
    assert_eq!(json["features"], serde_json::json!(["vrf", "lldp"]));
}

// =============================================================================
// WRITE RESPONSE TESTS
// =============================================================================

#[test]
fn test_write_response_success_omits_error() {
    let json = serde_json::to_string(&WriteResponse::success("node1", "created")).unwrap();

    assert!(json.contains("\"success\":true"));
    assert!(json.contains("\"event\":\"created\""));
    assert!(!json.contains("error"));
}

#[test]
fn test_write_response_error_omits_event() {
    let json = serde_json::to_string(&WriteResponse::error("node1", "boom")).unwrap();

    assert!(json.contains("\"success\":false"));
    assert!(json.contains("\"error\":\"boom\""));
    assert!(!json.contains("event"));
}

// =============================================================================
// STATUS RESPONSE TESTS
// =============================================================================

#[test]
fn test_status_outcome_is_tagged() {
    let status = StatusResponse {
        reports: 2,
        active_features: vec!["ipv6".to_string()],
        remembered_features: vec!["ipv6".to_string()],
        reconciles: 3,
        failures: 1,
        events_filtered: 0,
        last_outcome: Some(ReconcileOutcome::Failed {
            error: "Failed to list reports: timeout".to_string(),
            retry_in_ms: 400,
        }),
    };

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["last_outcome"]["result"], "failed");
    assert_eq!(json["last_outcome"]["retry_in_ms"], 400);

    let back: StatusResponse = serde_json::from_value(json).unwrap();
    assert_eq!(back.last_outcome, status.last_outcome);
}
