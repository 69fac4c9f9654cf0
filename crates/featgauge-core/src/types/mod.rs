//! # Core Type Definitions
//!
//! This module contains all core types for feature presence aggregation:
//! - Identifiers (`NodeName`, `FeatureName`)
//! - The per-node status report (`Report`)
//! - The deduplicated feature set (`FeatureSet`)
//! - Error types (`GaugeError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Keep report feature order exactly as published by the node

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Name of the node that owns a report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeName(pub String);

impl NodeName {
    /// Create a new node name from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the node name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a network configuration feature, e.g. `dhcpv4` or `bond`.
/// This is also the label value of the feature's gauge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureName(pub String);

impl FeatureName {
    /// Create a new feature name from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the feature name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// A node's self-declared list of currently enabled features.
///
/// The feature sequence keeps the order the node published. Aggregation
/// ignores order; change detection does not (see `TriggerFilter`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// The node this report belongs to.
    pub node: NodeName,
    /// Enabled features, in published order. May contain duplicates.
    pub features: Vec<FeatureName>,
}

impl Report {
    /// Create a new report.
    #[must_use]
    pub fn new(node: NodeName, features: Vec<FeatureName>) -> Self {
        Self { node, features }
    }

    /// Convenience constructor from plain strings.
    #[must_use]
    pub fn from_strs(node: &str, features: &[&str]) -> Self {
        Self {
            node: NodeName::new(node),
            features: features.iter().map(|f| FeatureName::new(*f)).collect(),
        }
    }

    /// Whether two reports publish the exact same feature sequence.
    ///
    /// Element-wise comparison: a reordering counts as a difference.
    #[must_use]
    pub fn same_features(&self, other: &Self) -> bool {
        self.features == other.features
    }
}

// =============================================================================
// FEATURE SET
// =============================================================================

/// A set of unique feature names.
///
/// Backed by a `BTreeSet` so iteration order is stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    features: BTreeSet<FeatureName>,
}

impl FeatureSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feature. Returns `true` if it was not present.
    pub fn insert(&mut self, feature: FeatureName) -> bool {
        self.features.insert(feature)
    }

    /// Check membership.
    #[must_use]
    pub fn contains(&self, feature: &FeatureName) -> bool {
        self.features.contains(feature)
    }

    /// Number of distinct features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// True when no feature is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterate in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureName> {
        self.features.iter()
    }

    /// Features in `self` that are not in `other`, ascending.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Vec<FeatureName> {
        self.features.difference(&other.features).cloned().collect()
    }

    /// Feature names as owned strings, ascending.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.features.iter().map(|f| f.0.clone()).collect()
    }
}

impl FromIterator<FeatureName> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = FeatureName>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FeatureSet {
    type Item = FeatureName;
    type IntoIter = std::collections::btree_set::IntoIter<FeatureName>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in featgauge.
///
/// - No silent failures
/// - Every failure is returned to the caller, which decides whether to retry
/// - The CORE never panics
#[derive(Debug, Error)]
pub enum GaugeError {
    /// A report failed validation and was not stored.
    #[error("Invalid report: {0}")]
    InvalidReport(String),

    /// No report exists for the requested node.
    #[error("Report not found for node: {0}")]
    ReportNotFound(String),

    /// The report collection could not be listed.
    #[error("Failed to list reports: {0}")]
    ReadFailed(String),

    /// A gauge could not be set or deleted.
    #[error("Registry write failed for feature '{feature}': {reason}")]
    RegistryWrite { feature: String, reason: String },

    /// The reconcile context was cancelled before the attempt could commit.
    #[error("Reconcile cancelled")]
    Cancelled,

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The report database is held open by another process.
    #[error("Report database {0} is locked by another process")]
    StoreLocked(String),

    /// The configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// =============================================================================
// TESTS
// =============================================================================
