//! # Reconcile Trigger
//!
//! Decides which watch events are worth a reconcile.
//!
//! - Creation and deletion of a report always trigger
//! - An update triggers only if the feature sequence changed element-wise
//!   (a reordering is a change)
//! - Generic events never trigger
//!
//! Event payloads are type-erased. The filter downcasts them to `Report`
//! and treats anything else on an update as "no trigger", never as an error.

use crate::Report;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A type-erased object carried by a watch event.
pub type WatchObject = Arc<dyn Any + Send + Sync>;

/// A change notification from whatever watches the report store.
#[derive(Clone)]
pub enum WatchEvent {
    /// An object was created.
    Created(WatchObject),
    /// An object was replaced.
    Updated {
        /// The object before the change.
        old: WatchObject,
        /// The object after the change.
        new: WatchObject,
    },
    /// An object was deleted. Carries its last known state.
    Deleted(WatchObject),
    /// Anything else the watcher chose to forward.
    Generic(WatchObject),
}

impl WatchEvent {
    /// A report was created.
    #[must_use]
    pub fn created(report: Report) -> Self {
        Self::Created(Arc::new(report))
    }

    /// A report was replaced.
    #[must_use]
    pub fn updated(old: Report, new: Report) -> Self {
        Self::Updated {
            old: Arc::new(old),
            new: Arc::new(new),
        }
    }

    /// A report was deleted.
    #[must_use]
    pub fn deleted(report: Report) -> Self {
        Self::Deleted(Arc::new(report))
    }

    /// Short name of the event kind, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated { .. } => "updated",
            Self::Deleted(_) => "deleted",
            Self::Generic(_) => "generic",
        }
    }

    /// The most recent payload, if it is a `Report`.
    #[must_use]
    pub fn report(&self) -> Option<&Report> {
        let object = match self {
            Self::Created(o) | Self::Deleted(o) | Self::Generic(o) => o,
            Self::Updated { new, .. } => new,
        };
        object.downcast_ref::<Report>()
    }
}

impl fmt::Debug for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchEvent")
            .field("kind", &self.kind())
            .field("node", &self.report().map(|r| r.node.as_str()))
            .finish()
    }
}

/// Event filter in front of the reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerFilter;

impl TriggerFilter {
    /// Create the filter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Whether `event` should cause a reconcile.
    #[must_use]
    pub fn should_reconcile(&self, event: &WatchEvent) -> bool {
        match event {
            WatchEvent::Created(_) | WatchEvent::Deleted(_) => true,
            WatchEvent::Updated { old, new } => {
                match (old.downcast_ref::<Report>(), new.downcast_ref::<Report>()) {
                    (Some(old), Some(new)) => !old.same_features(new),
                    _ => false,
                }
            }
            WatchEvent::Generic(_) => false,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
