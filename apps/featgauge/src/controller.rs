//! # Controller
//!
//! The single task that owns the `Reconciler` and is therefore the only
//! writer of the feature gauges.
//!
//! ```text
//!  API handlers ──WatchEvent──▶ mpsc queue ──▶ Controller::run
//!                                               │ filter
//!                                               │ coalesce pending events
//!                                               │ reconcile (full rescan)
//!                                               │ on error: retry with backoff
//!                                               ▼
//!                                       watch::Sender<ControllerStatus>
//! ```
//!
//! Every reconcile rescans the whole store, so any number of queued events
//! collapse into one attempt. A failed attempt is retried after an
//! exponentially growing delay; a new relevant event retries immediately.

use crate::config::ControllerConfig;
use featgauge_core::{
    FeatureName, GaugeError, PrometheusRegistry, ReconcileContext, ReconcileReport, Reconciler,
    ReportStore, TriggerFilter, WatchEvent,
};
use prometheus::{IntCounterVec, Opts};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Reconcile attempts counter, labeled by `result`.
pub const RECONCILE_COUNTER_NAME: &str = "featgauge_reconcile_total";

// =============================================================================
// STATUS
// =============================================================================

/// Result of the most recent reconcile attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Succeeded {
        reports_scanned: usize,
        activated: Vec<String>,
        removed: Vec<String>,
    },
    Failed {
        error: String,
        retry_in_ms: u64,
    },
    Cancelled,
}

/// Snapshot published after every controller step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStatus {
    /// Successful reconciles since start.
    pub reconciles: u64,
    /// Failed reconciles since start.
    pub failures: u64,
    /// Events dropped by the trigger filter.
    pub events_filtered: u64,
    /// Features the controller believes are currently published.
    pub remembered: Vec<String>,
    pub last_outcome: Option<ReconcileOutcome>,
}

// =============================================================================
// BACKOFF
// =============================================================================

/// Doubling retry delay, capped, reset on success.
#[derive(Debug, Clone)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    attempts: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms: max_ms.max(base_ms),
            attempts: 0,
        }
    }

    /// Delay before the next retry. Each call doubles the following one.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u64.checked_shl(self.attempts).unwrap_or(u64::MAX);
        let ms = self.base_ms.saturating_mul(factor).min(self.max_ms);
        self.attempts = self.attempts.saturating_add(1);
        Duration::from_millis(ms)
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Cloneable handle used by producers of watch events.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    events: mpsc::Sender<WatchEvent>,
    status: watch::Receiver<ControllerStatus>,
}

impl ControllerHandle {
    /// Queue an event for the controller.
    ///
    /// Waits while the queue is full. Fails only once the controller has stopped.
    pub async fn notify(&self, event: WatchEvent) -> Result<(), GaugeError> {
        self.events
            .send(event)
            .await
            .map_err(|_| GaugeError::IoError("controller is not running".to_string()))
    }

    /// Latest published status.
    #[must_use]
    pub fn status(&self) -> ControllerStatus {
        self.status.borrow().clone()
    }

    /// A receiver that can await status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ControllerStatus> {
        self.status.clone()
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

enum Wake {
    Event(WatchEvent),
    Retry,
    Closed,
    Cancelled,
}

impl From<Option<WatchEvent>> for Wake {
    fn from(event: Option<WatchEvent>) -> Self {
        event.map_or(Self::Closed, Self::Event)
    }
}

/// Serialized reconcile loop over a report store and a Prometheus registry.
pub struct Controller {
    reconciler: Reconciler,
    store: Arc<dyn ReportStore>,
    registry: Arc<PrometheusRegistry>,
    filter: TriggerFilter,
    ctx: ReconcileContext,
    events: mpsc::Receiver<WatchEvent>,
    status: watch::Sender<ControllerStatus>,
    backoff: Backoff,
    attempts: IntCounterVec,
}

impl Controller {
    /// Build a controller and the handle that feeds it.
    ///
    /// Registers the reconcile attempt counter in the gauge's registry, so it
    /// fails if a controller was already built on the same registry.
    pub fn new(
        store: Arc<dyn ReportStore>,
        registry: Arc<PrometheusRegistry>,
        config: &ControllerConfig,
        ctx: ReconcileContext,
    ) -> Result<(Self, ControllerHandle), GaugeError> {
        let attempts = IntCounterVec::new(
            Opts::new(RECONCILE_COUNTER_NAME, "Reconcile attempts by result"),
            &["result"],
        )
        .map_err(|e| GaugeError::ConfigError(e.to_string()))?;
        registry
            .registry()
            .register(Box::new(attempts.clone()))
            .map_err(|e| GaugeError::ConfigError(e.to_string()))?;

        let (events_tx, events_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (status_tx, status_rx) = watch::channel(ControllerStatus::default());

        let controller = Self {
            reconciler: Reconciler::new(),
            store,
            registry,
            filter: TriggerFilter::new(),
            ctx,
            events: events_rx,
            status: status_tx,
            backoff: Backoff::new(config.retry_base_ms, config.retry_max_ms),
            attempts,
        };
        let handle = ControllerHandle {
            events: events_tx,
            status: status_rx,
        };
        Ok((controller, handle))
    }

    /// Run until every handle is dropped or the context is cancelled.
    ///
    /// Starts with a full reconcile so reports stored before startup are
    /// published without waiting for an event.
    pub async fn run(mut self) {
        tracing::info!("Controller started");
        let mut retry_at = self.reconcile_once("startup");

        loop {
            let wake = match retry_at {
                Some(deadline) => tokio::select! {
                    biased;
                    () = self.ctx.cancelled() => Wake::Cancelled,
                    event = self.events.recv() => Wake::from(event),
                    () = tokio::time::sleep_until(deadline) => Wake::Retry,
                },
                None => tokio::select! {
                    biased;
                    () = self.ctx.cancelled() => Wake::Cancelled,
                    event = self.events.recv() => Wake::from(event),
                },
            };

            let reason = match wake {
                Wake::Closed | Wake::Cancelled => break,
                Wake::Retry => "retry",
                Wake::Event(event) => {
                    if !self.filter.should_reconcile(&event) {
                        tracing::debug!(kind = event.kind(), "Event skipped, features unchanged");
                        self.status
                            .send_modify(|s| s.events_filtered = s.events_filtered.saturating_add(1));
                        continue;
                    }
                    event.kind()
                }
            };

            let coalesced = self.drain_pending();
            if coalesced > 0 {
                tracing::debug!(coalesced, "Pending events folded into this reconcile");
            }
            retry_at = self.reconcile_once(reason);
        }

        tracing::info!("Controller stopped");
    }

    /// Drop queued events. The next reconcile rescans everything anyway.
    fn drain_pending(&mut self) -> usize {
        let mut count = 0usize;
        while self.events.try_recv().is_ok() {
            count = count.saturating_add(1);
        }
        count
    }

    /// One attempt. Returns when to retry, or `None` if no retry is needed.
    fn reconcile_once(&mut self, reason: &str) -> Option<Instant> {
        let started = Instant::now();
        let result =
            self.reconciler
                .reconcile(&self.ctx, self.store.as_ref(), self.registry.as_ref());
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(report) => {
                self.backoff.reset();
                self.attempts.with_label_values(&["success"]).inc();
                tracing::info!(
                    reason,
                    reports = report.reports_scanned,
                    active = report.activated.len(),
                    removed = report.removed.len(),
                    elapsed_ms,
                    "Reconcile succeeded"
                );
                for feature in &report.removed {
                    tracing::info!(feature = %feature, "Feature no longer reported, gauge deleted");
                }
                self.publish_success(&report);
                None
            }
            Err(GaugeError::Cancelled) => {
                tracing::info!(reason, "Reconcile cancelled");
                self.status
                    .send_modify(|s| s.last_outcome = Some(ReconcileOutcome::Cancelled));
                None
            }
            Err(e) => {
                let delay = self.backoff.next_delay();
                let retry_in_ms = delay.as_millis() as u64;
                self.attempts.with_label_values(&["error"]).inc();
                tracing::warn!(reason, error = %e, retry_in_ms, "Reconcile failed, will retry");
                self.status.send_modify(|s| {
                    s.failures = s.failures.saturating_add(1);
                    s.last_outcome = Some(ReconcileOutcome::Failed {
                        error: e.to_string(),
                        retry_in_ms,
                    });
                });
                Some(Instant::now() + delay)
            }
        }
    }

    fn publish_success(&self, report: &ReconcileReport) {
        let remembered = self.reconciler.remembered().to_strings();
        let outcome = ReconcileOutcome::Succeeded {
            reports_scanned: report.reports_scanned,
            activated: names(&report.activated),
            removed: names(&report.removed),
        };
        self.status.send_modify(|s| {
            s.reconciles = s.reconciles.saturating_add(1);
            s.remembered = remembered;
            s.last_outcome = Some(outcome);
        });
    }
}

fn names(features: &[FeatureName]) -> Vec<String> {
    features.iter().map(|f| f.as_str().to_string()).collect()
}

// =============================================================================
// TESTS
// =============================================================================
