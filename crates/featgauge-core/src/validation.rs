//! # Report Validation
//!
//! Checks applied to a report before it is accepted into a store.
//!
//! - Reject malformed input at write time
//! - Never run during a reconcile: the union computer stays total
//! - No normalization: accepted reports are stored exactly as published

use crate::primitives::{MAX_FEATURE_NAME_LENGTH, MAX_FEATURES_PER_REPORT, MAX_NODE_NAME_LENGTH};
use crate::{GaugeError, Report};

/// Validates reports on their way into a `ReportStore`.
pub struct ReportValidator;

impl ReportValidator {
    /// Validate a report.
    ///
    /// A report is valid if:
    /// - The node name is non-empty and within length limits
    /// - The feature list is within the per-report limit
    /// - Every feature name is non-empty and within length limits
    ///
    /// Duplicate feature names are allowed; they collapse in the union.
    ///
    /// Returns `GaugeError::InvalidReport` if validation fails.
    pub fn validate(report: &Report) -> Result<(), GaugeError> {
        let node = report.node.as_str();

        if node.is_empty() {
            return Err(GaugeError::InvalidReport("node name is empty".to_string()));
        }

        if node.len() > MAX_NODE_NAME_LENGTH {
            return Err(GaugeError::InvalidReport(format!(
                "node name exceeds {} bytes",
                MAX_NODE_NAME_LENGTH
            )));
        }

        if report.features.len() > MAX_FEATURES_PER_REPORT {
            return Err(GaugeError::InvalidReport(format!(
                "report for {} lists {} features, limit is {}",
                node,
                report.features.len(),
                MAX_FEATURES_PER_REPORT
            )));
        }

        for feature in &report.features {
            let name = feature.as_str();
            if name.is_empty() {
                return Err(GaugeError::InvalidReport(format!(
                    "report for {} contains an empty feature name",
                    node
                )));
            }
            if name.len() > MAX_FEATURE_NAME_LENGTH {
                return Err(GaugeError::InvalidReport(format!(
                    "feature name exceeds {} bytes",
                    MAX_FEATURE_NAME_LENGTH
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
