//! # Primitives
//!
//! Hardcoded constants for featgauge.
//!
//! These values are compiled into the binary. The gauge name can be
//! overridden by the app configuration; everything else is fixed.

/// Default name of the feature presence gauge family.
pub const DEFAULT_GAUGE_NAME: &str = "kubernetes_nmstate_features_applied";

/// Help text attached to the gauge family.
pub const GAUGE_HELP: &str = "Number of nmstate features applied labeled by its name";

/// The single label that keys a gauge entry. Its value is the feature name.
pub const FEATURE_LABEL: &str = "name";

/// Value of a present gauge. Presence only, never a count.
pub const GAUGE_ACTIVE: i64 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for node names (a DNS subdomain).
pub const MAX_NODE_NAME_LENGTH: usize = 253;

/// Maximum length for a single feature name.
///
/// Feature names become label values; this bounds label size.
pub const MAX_FEATURE_NAME_LENGTH: usize = 128;

/// Maximum number of feature entries in one report.
pub const MAX_FEATURES_PER_REPORT: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_constants() {
        assert_eq!(GAUGE_ACTIVE, 1);
        assert_eq!(FEATURE_LABEL, "name");
        assert!(DEFAULT_GAUGE_NAME.ends_with("_applied"));
    }
}
