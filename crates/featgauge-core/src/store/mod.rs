//! # Report Stores
//!
//! The read side of a reconcile, plus the write operations node agents use.
//!
//! - `ReportSource`: the only capability a reconcile needs, "list everything"
//! - `ReportStore`: keyed reads and validated writes on top of that
//!
//! Backends:
//! - `MemoryReportStore`: `BTreeMap` behind a lock (volatile)
//! - `RedbReportStore`: redb table of postcard-encoded reports (persistent)

mod memory;
mod redb_store;

pub use memory::MemoryReportStore;
pub use redb_store::RedbReportStore;

use crate::{GaugeError, NodeName, Report};

/// The report read interface consumed by the `Reconciler`.
pub trait ReportSource {
    /// Return the complete current collection of reports, or fail.
    ///
    /// Partial results are never acceptable: a reconcile acts on whatever
    /// this returns as if it were the whole cluster.
    fn list_reports(&self) -> Result<Vec<Report>, GaugeError>;
}

/// A keyed store of one report per node.
///
/// All fallible operations return `Result<T, GaugeError>` so in-memory and
/// persistent backends can be swapped behind `Arc<dyn ReportStore>`.
pub trait ReportStore: ReportSource + Send + Sync {
    /// Fetch the report for one node.
    fn get_report(&self, node: &NodeName) -> Result<Option<Report>, GaugeError>;

    /// Validate and store a report, replacing any report for the same node.
    ///
    /// Returns the report it replaced, if any.
    fn upsert_report(&self, report: Report) -> Result<Option<Report>, GaugeError>;

    /// Delete the report for one node. Returns the removed report, if any.
    fn remove_report(&self, node: &NodeName) -> Result<Option<Report>, GaugeError>;

    /// Number of stored reports.
    fn report_count(&self) -> Result<usize, GaugeError> {
        Ok(self.list_reports()?.len())
    }
}
