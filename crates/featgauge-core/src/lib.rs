//! # featgauge-core
//!
//! Cluster-wide feature presence aggregation - THE LOGIC.
//!
//! Every node in a cluster publishes a report listing the network
//! configuration features it currently has enabled. This crate folds all of
//! those reports into a single set of feature names and keeps a gauge
//! registry in step with it: one gauge at value 1 per feature that at least
//! one node reports, and no gauge for anything else.
//!
//! ## Reconcile Pipeline
//!
//! ```text
//! ReportSource::list_reports ──► FeatureUnion::compute ──► GaugeLifecycle::apply ──► MetricRegistry
//!                                                               │
//!                                                     remembered FeatureSet
//! ```
//!
//! ## Architectural Constraints
//!
//! - NO async runtime, NO network dependencies (pure Rust)
//! - Every reconcile rescans the full report collection
//! - The remembered set is owned by one `Reconciler` and mutated through
//!   `&mut self` only; callers serialize reconciles
//! - A failed reconcile commits nothing

// =============================================================================
// MODULES
// =============================================================================

pub mod lifecycle;
pub mod primitives;
pub mod reconciler;
pub mod registry;
pub mod store;
pub mod trigger;
pub mod types;
pub mod union;
pub mod validation;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{FeatureName, FeatureSet, GaugeError, NodeName, Report};

// =============================================================================
// RE-EXPORTS: Aggregation
// =============================================================================

pub use lifecycle::{GaugeLifecycle, GaugePlan};
pub use reconciler::{Cancelled, ReconcileContext, ReconcileReport, Reconciler};
pub use trigger::{TriggerFilter, WatchEvent};
pub use union::FeatureUnion;
pub use validation::ReportValidator;

// =============================================================================
// RE-EXPORTS: Collaborators
// =============================================================================

pub use registry::{MemoryRegistry, MetricRegistry, PrometheusRegistry};
pub use store::{MemoryReportStore, RedbReportStore, ReportSource, ReportStore};
