//! # Reconciler
//!
//! The single entry point a controller calls when something changed.
//!
//! A reconcile is all-or-nothing with respect to the remembered set:
//! 1. bail out if the context is already cancelled
//! 2. list every report (a failure here writes nothing)
//! 3. bail out if the context was cancelled during the read
//! 4. fold the reports into a union and hand it to `GaugeLifecycle::apply`
//!
//! No retry happens here. Every error goes back to the caller, which
//! schedules the next attempt.

use crate::lifecycle::GaugeLifecycle;
use crate::registry::MetricRegistry;
use crate::store::ReportSource;
use crate::union::FeatureUnion;
use crate::{FeatureName, FeatureSet, GaugeError};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

// =============================================================================
// RECONCILE CONTEXT
// =============================================================================

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    waiters: Mutex<Vec<Waker>>,
}

impl CancelState {
    fn waiters(&self) -> MutexGuard<'_, Vec<Waker>> {
        // A waker list is valid even if a holder panicked.
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cancellation handle for reconcile attempts.
///
/// Clones share the same flag. Whoever owns the process lifecycle keeps one
/// clone and calls `cancel()`; the reconciler observes it before and after
/// reading reports, and async owners can await `cancelled()`.
#[derive(Debug, Clone, Default)]
pub struct ReconcileContext {
    state: Arc<CancelState>,
}

impl ReconcileContext {
    /// A fresh, not-cancelled context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every attempt using this context (or a clone of it) and wake
    /// every pending `cancelled()` future.
    pub fn cancel(&self) {
        if !self.state.cancelled.swap(true, Ordering::SeqCst) {
            let waiters = std::mem::take(&mut *self.state.waiters());
            for waker in waiters {
                waker.wake();
            }
        }
    }

    /// Whether `cancel()` has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// A future that resolves once the context is cancelled.
    ///
    /// Works on any executor; it only needs the task's `Waker`.
    #[must_use]
    pub fn cancelled(&self) -> Cancelled<'_> {
        Cancelled { ctx: self }
    }
}

/// Future returned by [`ReconcileContext::cancelled`].
#[derive(Debug)]
pub struct Cancelled<'a> {
    ctx: &'a ReconcileContext,
}

impl Future for Cancelled<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.ctx.is_cancelled() {
            return Poll::Ready(());
        }

        {
            let mut waiters = self.ctx.state.waiters();
            if !waiters.iter().any(|w| w.will_wake(cx.waker())) {
                waiters.push(cx.waker().clone());
            }
        }

        // cancel() may have drained the list before the push above.
        if self.ctx.is_cancelled() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

// =============================================================================
// RECONCILE REPORT
// =============================================================================

/// What a successful reconcile did.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReconcileReport {
    /// Number of node reports read.
    pub reports_scanned: usize,
    /// Features whose gauge was set to 1 (the full union).
    pub activated: Vec<FeatureName>,
    /// Features whose gauge was deleted.
    pub removed: Vec<FeatureName>,
}

// =============================================================================
// RECONCILER
// =============================================================================

/// Owns the gauge lifecycle state and runs reconciles against it.
///
/// `reconcile` takes `&mut self`: two reconciles on the same instance can
/// never overlap.
#[derive(Debug, Default)]
pub struct Reconciler {
    lifecycle: GaugeLifecycle,
}

impl Reconciler {
    /// A reconciler with an empty remembered set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The union published by the last successful reconcile.
    #[must_use]
    pub fn remembered(&self) -> &FeatureSet {
        self.lifecycle.remembered()
    }

    /// Run one reconcile attempt.
    ///
    /// # Errors
    /// - `GaugeError::Cancelled` if `ctx` is cancelled before the read
    ///   completes; nothing is written
    /// - `GaugeError::ReadFailed` if reports cannot be listed; nothing is written
    /// - `GaugeError::RegistryWrite` if a gauge call fails; the remembered set
    ///   is unchanged
    pub fn reconcile<S, R>(
        &mut self,
        ctx: &ReconcileContext,
        source: &S,
        registry: &R,
    ) -> Result<ReconcileReport, GaugeError>
    where
        S: ReportSource + ?Sized,
        R: MetricRegistry + ?Sized,
    {
        if ctx.is_cancelled() {
            return Err(GaugeError::Cancelled);
        }

        let reports = source.list_reports().map_err(|e| match e {
            GaugeError::ReadFailed(_) | GaugeError::Cancelled => e,
            other => GaugeError::ReadFailed(other.to_string()),
        })?;

        if ctx.is_cancelled() {
            return Err(GaugeError::Cancelled);
        }

        let union = FeatureUnion::compute(&reports);
        let plan = self.lifecycle.apply(union, registry)?;

        Ok(ReconcileReport {
            reports_scanned: reports.len(),
            activated: plan.to_activate,
            removed: plan.to_remove,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;
    use crate::store::MemoryReportStore;
    use crate::Report;

    /// Source that cancels the context while "reading".
    struct CancelsDuringRead {
        ctx: ReconcileContext,
        reports: Vec<Report>,
    }

    impl ReportSource for CancelsDuringRead {
        fn list_reports(&self) -> Result<Vec<Report>, GaugeError> {
            self.ctx.cancel();
            Ok(self.reports.clone())
        }
    }

    /// Source whose read fails with a non-read error.
    struct Corrupt;

    impl ReportSource for Corrupt {
        fn list_reports(&self) -> Result<Vec<Report>, GaugeError> {
            Err(GaugeError::SerializationError("bad row".to_string()))
        }
    }

    #[test]
    fn reconcile_publishes_union() {
        let store = MemoryReportStore::with_reports(vec![
            Report::from_strs("node1", &["ipv6", "bonding"]),
            Report::from_strs("node2", &["ipv6"]),
        ]);
        let registry = MemoryRegistry::new();
        let mut reconciler = Reconciler::new();

        let report = reconciler
            .reconcile(&ReconcileContext::new(), &store, &registry)
            .expect("reconcile");

        assert_eq!(report.reports_scanned, 2);
        assert_eq!(report.activated.len(), 2);
        assert!(report.removed.is_empty());
        assert_eq!(registry.active(), vec!["bonding", "ipv6"]);
        assert_eq!(reconciler.remembered().len(), 2);
    }

    #[test]
    fn cancelled_context_reads_nothing() {
        let store = MemoryReportStore::with_reports(vec![Report::from_strs("node1", &["ipv6"])]);
        let registry = MemoryRegistry::new();
        let ctx = ReconcileContext::new();
        ctx.cancel();

        let result = Reconciler::new().reconcile(&ctx, &store, &registry);

        assert!(matches!(result, Err(GaugeError::Cancelled)));
        assert!(registry.operations().is_empty());
    }

    #[test]
    fn cancellation_during_read_commits_nothing() {
        let ctx = ReconcileContext::new();
        let source = CancelsDuringRead {
            ctx: ctx.clone(),
            reports: vec![Report::from_strs("node1", &["ipv6"])],
        };
        let registry = MemoryRegistry::new();
        let mut reconciler = Reconciler::new();

        let result = reconciler.reconcile(&ctx, &source, &registry);

        assert!(matches!(result, Err(GaugeError::Cancelled)));
        assert!(registry.operations().is_empty());
        assert!(reconciler.remembered().is_empty());
    }

    #[test]
    fn source_errors_surface_as_read_failures() {
        let registry = MemoryRegistry::new();
        let result = Reconciler::new().reconcile(&ReconcileContext::new(), &Corrupt, &registry);

        assert!(matches!(result, Err(GaugeError::ReadFailed(_))));
        assert!(registry.operations().is_empty());
    }

    /// Waker that counts how often it was woken.
    struct CountingWaker(std::sync::atomic::AtomicUsize);

    impl std::task::Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn cancel_wakes_pending_future() {
        let ctx = ReconcileContext::new();
        let counter = Arc::new(CountingWaker(std::sync::atomic::AtomicUsize::new(0)));
        let waker = Waker::from(Arc::clone(&counter));
        let mut cx = Context::from_waker(&waker);

        let mut future = Box::pin(ctx.cancelled());
        assert!(future.as_mut().poll(&mut cx).is_pending());
        assert!(future.as_mut().poll(&mut cx).is_pending());

        ctx.clone().cancel();

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(future.as_mut().poll(&mut cx).is_ready());
        assert!(ctx.state.waiters().is_empty());
    }

    #[test]
    fn cancelled_future_is_ready_after_cancel() {
        let ctx = ReconcileContext::new();
        ctx.cancel();
        ctx.cancel();

        let waker = Waker::noop();
        let mut cx = Context::from_waker(waker);
        assert!(Box::pin(ctx.cancelled()).as_mut().poll(&mut cx).is_ready());
    }

    #[test]
    fn context_clones_share_cancellation() {
        let ctx = ReconcileContext::new();
        let clone = ctx.clone();
        assert!(!clone.is_cancelled());

        ctx.cancel();
        assert!(clone.is_cancelled());
    }
}
