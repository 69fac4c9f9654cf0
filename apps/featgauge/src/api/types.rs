//! # API Request/Response Types
//!
//! JSON bodies of the HTTP API.

use crate::controller::ReconcileOutcome;
use featgauge_core::{FeatureName, NodeName, Report};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Controller and store status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Reports currently stored.
    pub reports: usize,
    /// Gauges present in the registry right now.
    pub active_features: Vec<String>,
    /// Union committed by the last successful reconcile.
    pub remembered_features: Vec<String>,
    pub reconciles: u64,
    pub failures: u64,
    pub events_filtered: u64,
    pub last_outcome: Option<ReconcileOutcome>,
}

// =============================================================================
// REPORTS
// =============================================================================

/// Body of `PUT /reports/{node}`. Order is preserved as sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub features: Vec<String>,
}

impl ReportRequest {
    /// Attach the node name from the path.
    #[must_use]
    pub fn into_report(self, node: String) -> Report {
        Report::new(
            NodeName::new(node),
            self.features.into_iter().map(FeatureName::new).collect(),
        )
    }
}

/// One stored report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub node: String,
    pub features: Vec<String>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            node: report.node.0,
            features: report.features.into_iter().map(|f| f.0).collect(),
        }
    }
}

/// Every stored report, ordered by node name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportListResponse {
    pub reports: Vec<ReportResponse>,
}

/// Result of a write (`PUT` or `DELETE`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteResponse {
    pub success: bool,
    pub node: String,
    /// Watch event emitted: `created`, `updated` or `deleted`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WriteResponse {
    #[must_use]
    pub fn success(node: impl Into<String>, event: &str) -> Self {
        Self {
            success: true,
            node: node.into(),
            event: Some(event.to_string()),
            error: None,
        }
    }

    #[must_use]
    pub fn error(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            node: node.into(),
            event: None,
            error: Some(message.into()),
        }
    }
}

/// Generic error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
