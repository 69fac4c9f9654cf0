//! In-memory report store.

use super::{ReportSource, ReportStore};
use crate::validation::ReportValidator;
use crate::{GaugeError, NodeName, Report};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Volatile report store.
///
/// Reports are keyed by node name in a `BTreeMap`, so `list_reports`
/// returns them in node order.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: RwLock<BTreeMap<NodeName, Report>>,
}

impl MemoryReportStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with reports, skipping validation.
    #[must_use]
    pub fn with_reports(reports: impl IntoIterator<Item = Report>) -> Self {
        Self {
            reports: RwLock::new(reports.into_iter().map(|r| (r.node.clone(), r)).collect()),
        }
    }
}

fn poisoned(e: impl std::fmt::Display) -> GaugeError {
    GaugeError::IoError(format!("report store lock poisoned: {}", e))
}

impl ReportSource for MemoryReportStore {
    fn list_reports(&self) -> Result<Vec<Report>, GaugeError> {
        let reports = self
            .reports
            .read()
            .map_err(|e| GaugeError::ReadFailed(e.to_string()))?;
        Ok(reports.values().cloned().collect())
    }
}

impl ReportStore for MemoryReportStore {
    fn get_report(&self, node: &NodeName) -> Result<Option<Report>, GaugeError> {
        let reports = self.reports.read().map_err(poisoned)?;
        Ok(reports.get(node).cloned())
    }

    fn upsert_report(&self, report: Report) -> Result<Option<Report>, GaugeError> {
        ReportValidator::validate(&report)?;
        let mut reports = self.reports.write().map_err(poisoned)?;
        Ok(reports.insert(report.node.clone(), report))
    }

    fn remove_report(&self, node: &NodeName) -> Result<Option<Report>, GaugeError> {
        let mut reports = self.reports.write().map_err(poisoned)?;
        Ok(reports.remove(node))
    }

    fn report_count(&self) -> Result<usize, GaugeError> {
        Ok(self.reports.read().map_err(poisoned)?.len())
    }
}
