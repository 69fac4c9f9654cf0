//! # Feature Union
//!
//! Folds every node report into the set of distinct feature names
//! reported anywhere in the cluster.

use crate::{FeatureSet, Report};

/// The Feature Union Computer.
///
/// Pure: no side effects and no error conditions. Errors can only come from
/// reading the reports, which happens before this is called.
pub struct FeatureUnion;

impl FeatureUnion {
    /// Compute the union of every report's feature list.
    ///
    /// Zero reports and reports with no features both contribute nothing.
    #[must_use]
    pub fn compute(reports: &[Report]) -> FeatureSet {
        reports
            .iter()
            .flat_map(|report| report.features.iter().cloned())
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
