//! Session counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Session metrics.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// Results handed to the render sink.
    pub renders: AtomicU64,
    /// Row changes emitted across all renders.
    pub rows_changed: AtomicU64,
    /// Results dropped because a newer event arrived.
    pub superseded: AtomicU64,
    /// Edits whose text was not a valid amount.
    pub inputs_ignored: AtomicU64,
    /// Failed fetches that reached the display.
    pub fetch_failures: AtomicU64,
    /// Rebases rendered from the current table before any fetch.
    pub local_rebases: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a render of `changes` row changes.
    pub fn rendered(&self, changes: usize) {
        self.renders.fetch_add(1, Ordering::Relaxed);
        self.rows_changed.fetch_add(changes as u64, Ordering::Relaxed);
    }

    pub fn superseded(&self) {
        self.superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn input_ignored(&self) {
        self.inputs_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn local_rebase(&self) {
        self.local_rebases.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            renders: self.renders.load(Ordering::Relaxed),
            rows_changed: self.rows_changed.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            inputs_ignored: self.inputs_ignored.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            local_rebases: self.local_rebases.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus text format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let counters = [
            ("renders", "Results handed to the render sink", snapshot.renders),
            ("rows_changed", "Row changes emitted", snapshot.rows_changed),
            ("superseded", "Results dropped for a newer event", snapshot.superseded),
            ("inputs_ignored", "Edits that were not valid amounts", snapshot.inputs_ignored),
            ("fetch_failures", "Failed rate fetches", snapshot.fetch_failures),
            ("local_rebases", "Rebases rendered without a fetch", snapshot.local_rebases),
        ];

        let mut out = String::new();
        for (name, help, value) in counters {
            out.push_str(&format!(
                "# HELP converter_{name}_total {help}\n# TYPE converter_{name}_total counter\nconverter_{name}_total {value}\n\n"
            ));
        }
        out
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub renders: u64,
    pub rows_changed: u64,
    pub superseded: u64,
    pub inputs_ignored: u64,
    pub fetch_failures: u64,
    pub local_rebases: u64,
}

/// Shared metrics instance.
pub type SharedSessionMetrics = Arc<SessionMetrics>;
