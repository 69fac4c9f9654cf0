//! # Metric Registries
//!
//! The write side of the gauge lifecycle.
//!
//! A `MetricRegistry` is a set of gauges keyed by one label, the feature
//! name. It only needs two idempotent operations:
//! - `set_active`: create the gauge if missing, set it to 1
//! - `remove_active`: delete the gauge, no-op when already absent
//!
//! Two implementations live here:
//! - `PrometheusRegistry`: an `IntGaugeVec` in its own `prometheus::Registry`,
//!   rendered in the text exposition format for scraping
//! - `MemoryRegistry`: a plain map with an operation log, for tooling and tests

use crate::primitives::{FEATURE_LABEL, GAUGE_ACTIVE, GAUGE_HELP};
use crate::GaugeError;
use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, RwLock};

// =============================================================================
// METRIC REGISTRY TRAIT
// =============================================================================

/// The registry write interface used by `GaugeLifecycle`.
///
/// Both operations must be idempotent so a failed reconcile can be retried
/// as a whole.
pub trait MetricRegistry {
    /// Set the gauge for `feature` to 1, creating it if needed.
    fn set_active(&self, feature: &str) -> Result<(), GaugeError>;

    /// Delete the gauge for `feature`. Absent gauges are not an error.
    fn remove_active(&self, feature: &str) -> Result<(), GaugeError>;
}

fn write_error(feature: &str, reason: impl ToString) -> GaugeError {
    GaugeError::RegistryWrite {
        feature: feature.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// PROMETHEUS REGISTRY
// =============================================================================

/// Feature gauges backed by the `prometheus` crate.
///
/// Label values currently present are mirrored in `present` so removal of an
/// absent gauge can be answered without inspecting the collector.
pub struct PrometheusRegistry {
    registry: Registry,
    gauge: IntGaugeVec,
    present: Mutex<BTreeSet<String>>,
}

impl std::fmt::Debug for PrometheusRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusRegistry")
            .field("active", &self.active())
            .finish_non_exhaustive()
    }
}

impl PrometheusRegistry {
    /// Create a registry with a gauge family called `gauge_name`.
    ///
    /// Returns `GaugeError::ConfigError` if the name is not a valid metric name.
    pub fn new(gauge_name: &str) -> Result<Self, GaugeError> {
        Self::with_registry(Registry::new(), gauge_name)
    }

    /// Create the gauge family inside an existing `prometheus::Registry`.
    pub fn with_registry(registry: Registry, gauge_name: &str) -> Result<Self, GaugeError> {
        let gauge = IntGaugeVec::new(Opts::new(gauge_name, GAUGE_HELP), &[FEATURE_LABEL])
            .map_err(|e| GaugeError::ConfigError(format!("invalid gauge '{}': {}", gauge_name, e)))?;
        registry
            .register(Box::new(gauge.clone()))
            .map_err(|e| GaugeError::ConfigError(format!("cannot register gauge: {}", e)))?;

        Ok(Self {
            registry,
            gauge,
            present: Mutex::new(BTreeSet::new()),
        })
    }

    /// The underlying registry, for registering additional collectors.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Feature names with a gauge currently present, ascending.
    #[must_use]
    pub fn active(&self) -> Vec<String> {
        self.present
            .lock()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Render every metric in the registry in the Prometheus text format.
    pub fn encode_text(&self) -> Result<String, GaugeError> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| GaugeError::SerializationError(format!("metrics encoding: {}", e)))?;
        String::from_utf8(buffer)
            .map_err(|e| GaugeError::SerializationError(format!("metrics encoding: {}", e)))
    }
}

impl MetricRegistry for PrometheusRegistry {
    fn set_active(&self, feature: &str) -> Result<(), GaugeError> {
        let mut present = self
            .present
            .lock()
            .map_err(|e| write_error(feature, e))?;
        let gauge = self
            .gauge
            .get_metric_with_label_values(&[feature])
            .map_err(|e| write_error(feature, e))?;
        gauge.set(GAUGE_ACTIVE);
        present.insert(feature.to_string());
        Ok(())
    }

    fn remove_active(&self, feature: &str) -> Result<(), GaugeError> {
        let mut present = self
            .present
            .lock()
            .map_err(|e| write_error(feature, e))?;
        if !present.contains(feature) {
            return Ok(());
        }
        self.gauge
            .remove_label_values(&[feature])
            .map_err(|e| write_error(feature, e))?;
        present.remove(feature);
        Ok(())
    }
}

// =============================================================================
// MEMORY REGISTRY
// =============================================================================

/// A registry write, as recorded by `MemoryRegistry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryOp {
    /// `set_active` was called.
    Set(String),
    /// `remove_active` was called on a present gauge.
    Remove(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    gauges: BTreeMap<String, i64>,
    log: Vec<RegistryOp>,
}

/// In-memory registry.
///
/// Keeps gauge values in a `BTreeMap` and logs every effective write.
/// Removing an absent gauge is a no-op and is not logged.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    state: RwLock<MemoryState>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feature names with a gauge present, ascending.
    #[must_use]
    pub fn active(&self) -> Vec<String> {
        self.state
            .read()
            .map(|s| s.gauges.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Value of one gauge, if present.
    #[must_use]
    pub fn value(&self, feature: &str) -> Option<i64> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.gauges.get(feature).copied())
    }

    /// Every effective write so far, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<RegistryOp> {
        self.state
            .read()
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }
}

impl MetricRegistry for MemoryRegistry {
    fn set_active(&self, feature: &str) -> Result<(), GaugeError> {
        let mut state = self.state.write().map_err(|e| write_error(feature, e))?;
        state.gauges.insert(feature.to_string(), GAUGE_ACTIVE);
        state.log.push(RegistryOp::Set(feature.to_string()));
        Ok(())
    }

    fn remove_active(&self, feature: &str) -> Result<(), GaugeError> {
        let mut state = self.state.write().map_err(|e| write_error(feature, e))?;
        if state.gauges.remove(feature).is_some() {
            state.log.push(RegistryOp::Remove(feature.to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
