//! # Gauge Lifecycle
//!
//! Keeps a `MetricRegistry` converged on the latest feature union.
//!
//! The manager remembers the union it last published. Given a new union `U`
//! and the remembered set `R` it issues:
//! - `set_active(f)` for every `f` in `U` (including ones already active)
//! - `remove_active(f)` for every `f` in `R \ U`
//!
//! Activation runs before removal, so a feature that stays in the union is
//! never deleted and recreated. `R` is replaced by `U` only after every
//! registry call has succeeded; on any failure `R` is untouched and the next
//! attempt computes the same diff again.

use crate::registry::MetricRegistry;
use crate::{FeatureName, FeatureSet, GaugeError};
use serde::Serialize;

/// The registry operations one reconcile needs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GaugePlan {
    /// Features whose gauge is (re)asserted to 1. Always the full new union.
    pub to_activate: Vec<FeatureName>,
    /// Remembered features that left the union. Disjoint from `to_activate`.
    pub to_remove: Vec<FeatureName>,
}

impl GaugePlan {
    /// True when the plan issues no registry call at all.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_activate.is_empty() && self.to_remove.is_empty()
    }
}

/// The Gauge Lifecycle Manager.
///
/// Owns the remembered set. It starts empty and is not persisted: after a
/// restart every active feature is simply set again on the first reconcile.
///
/// Not safe for concurrent use. All mutation goes through `&mut self`, so
/// the owner must serialize reconciles (or wrap this in a lock).
#[derive(Debug, Clone, Default)]
pub struct GaugeLifecycle {
    remembered: FeatureSet,
}

impl GaugeLifecycle {
    /// Create a manager with an empty remembered set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The union as of the last successful `apply`.
    #[must_use]
    pub fn remembered(&self) -> &FeatureSet {
        &self.remembered
    }

    /// Diff `union` against the remembered set without touching anything.
    #[must_use]
    pub fn plan(&self, union: &FeatureSet) -> GaugePlan {
        GaugePlan {
            to_activate: union.iter().cloned().collect(),
            to_remove: self.remembered.difference(union),
        }
    }

    /// Converge `registry` on `union` and remember it.
    ///
    /// Returns the executed plan. On error the remembered set is unchanged;
    /// the registry may hold a prefix of the plan, which the retry repeats.
    pub fn apply<R>(&mut self, union: FeatureSet, registry: &R) -> Result<GaugePlan, GaugeError>
    where
        R: MetricRegistry + ?Sized,
    {
        let plan = self.plan(&union);

        for feature in &plan.to_activate {
            registry.set_active(feature.as_str())?;
        }
        for feature in &plan.to_remove {
            registry.remove_active(feature.as_str())?;
        }

        self.remembered = union;
        Ok(plan)
    }
}

// =============================================================================
// TESTS
// =============================================================================
