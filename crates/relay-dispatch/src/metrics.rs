//! Metrics hooks for dispatch operations
//!
//! ## Usage
//!
//! ```ignore
//! use relay_dispatch::metrics::Metrics;
//!
//! let metrics = Arc::new(Metrics::new());
//! let dispatcher = Dispatcher::new(registry, store, executor, sink)
//!     .with_metrics(metrics.clone());
//!
//! // ... subscribe / trigger ...
//! let snapshot = metrics.snapshot();
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector for dispatch operations
#[derive(Default)]
pub struct Metrics {
    /// Subscriptions stored
    pub subscriptions_created: AtomicU64,
    /// Subscribe calls that returned an error
    pub subscriptions_rejected: AtomicU64,
    /// Channels removed (explicitly or by completion)
    pub unsubscribes: AtomicU64,
    /// Trigger calls that passed argument coercion
    pub triggers: AtomicU64,
    /// Channels enumerated across all triggers
    pub channels_matched: AtomicU64,
    /// Results handed to the sink
    pub deliveries: AtomicU64,
    /// Executions that asked for no delivery
    pub skips: AtomicU64,
    /// Executor faults (aborted or isolated)
    pub faults: AtomicU64,
    /// Triggers that hit the fan-out timeout
    pub timeouts: AtomicU64,
    /// Cumulative fan-out time in nanoseconds
    pub fanout_time_ns: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_subscribe(&self, accepted: bool) {
        if accepted {
            self.subscriptions_created.fetch_add(1, Ordering::Relaxed);
        } else {
            self.subscriptions_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_unsubscribe(&self) {
        self.unsubscribes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed fan-out
    ///
    /// # Arguments
    /// * `matched` - Channels indexed under the topic
    /// * `duration` - Time spent in the fan-out
    pub fn record_trigger(&self, matched: usize, duration: Duration) {
        self.triggers.fetch_add(1, Ordering::Relaxed);
        self.channels_matched.fetch_add(matched as u64, Ordering::Relaxed);
        self.fanout_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            subscriptions_created: self.subscriptions_created.load(Ordering::Relaxed),
            subscriptions_rejected: self.subscriptions_rejected.load(Ordering::Relaxed),
            unsubscribes: self.unsubscribes.load(Ordering::Relaxed),
            triggers: self.triggers.load(Ordering::Relaxed),
            channels_matched: self.channels_matched.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            skips: self.skips.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            avg_fanout_ns: self.avg_fanout_time_ns(),
        }
    }

    /// Calculate average fan-out time in nanoseconds
    pub fn avg_fanout_time_ns(&self) -> u64 {
        let total = self.fanout_time_ns.load(Ordering::Relaxed);
        let count = self.triggers.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.subscriptions_created.store(0, Ordering::Relaxed);
        self.subscriptions_rejected.store(0, Ordering::Relaxed);
        self.unsubscribes.store(0, Ordering::Relaxed);
        self.triggers.store(0, Ordering::Relaxed);
        self.channels_matched.store(0, Ordering::Relaxed);
        self.deliveries.store(0, Ordering::Relaxed);
        self.skips.store(0, Ordering::Relaxed);
        self.faults.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.fanout_time_ns.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub subscriptions_created: u64,
    pub subscriptions_rejected: u64,
    pub unsubscribes: u64,
    pub triggers: u64,
    pub channels_matched: u64,
    pub deliveries: u64,
    pub skips: u64,
    pub faults: u64,
    pub timeouts: u64,
    pub avg_fanout_ns: u64,
}

/// Trait for custom metrics recording implementations
///
/// Implement this trait to forward dispatch events to an external metrics
/// system.
pub trait MetricsRecorder: Send + Sync {
    fn record_subscribe(&self, accepted: bool);
    fn record_unsubscribe(&self);
    fn record_trigger(&self, matched: usize, duration: Duration);
    fn record_delivery(&self);
    fn record_skip(&self);
    fn record_fault(&self);
    fn record_timeout(&self);
}

/// No-op metrics recorder for when metrics are disabled
#[derive(Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_subscribe(&self, _: bool) {}
    fn record_unsubscribe(&self) {}
    fn record_trigger(&self, _: usize, _: Duration) {}
    fn record_delivery(&self) {}
    fn record_skip(&self) {}
    fn record_fault(&self) {}
    fn record_timeout(&self) {}
}

impl MetricsRecorder for Metrics {
    fn record_subscribe(&self, accepted: bool) {
        Metrics::record_subscribe(self, accepted);
    }

    fn record_unsubscribe(&self) {
        Metrics::record_unsubscribe(self);
    }

    fn record_trigger(&self, matched: usize, duration: Duration) {
        Metrics::record_trigger(self, matched, duration);
    }

    fn record_delivery(&self) {
        Metrics::record_delivery(self);
    }

    fn record_skip(&self) {
        Metrics::record_skip(self);
    }

    fn record_fault(&self) {
        Metrics::record_fault(self);
    }

    fn record_timeout(&self) {
        Metrics::record_timeout(self);
    }
}
