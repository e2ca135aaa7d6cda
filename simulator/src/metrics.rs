//! Simulation metrics.

use std::collections::VecDeque;

use converter_session::{Outcome, SessionResult};

/// Simulation metrics.
#[derive(Debug, Clone)]
pub struct SimulationMetrics {
    /// Events dispatched to the session.
    pub total_events: u64,
    /// Events whose result was rendered.
    pub rendered: u64,
    /// Events overtaken by a newer one.
    pub superseded: u64,
    /// Edits with invalid text.
    pub ignored: u64,
    /// Events that ended in an error.
    pub failed: u64,
    /// Event latency samples (ms).
    latency_samples: VecDeque<u64>,
    /// Maximum samples to keep.
    max_samples: usize,
}

impl SimulationMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self {
            total_events: 0,
            rendered: 0,
            superseded: 0,
            ignored: 0,
            failed: 0,
            latency_samples: VecDeque::with_capacity(10000),
            max_samples: 10000,
        }
    }

    /// Record how an event ended and how long it took.
    pub fn record(&mut self, result: &SessionResult<Outcome>, latency_ms: u64) {
        self.total_events += 1;
        match result {
            Ok(Outcome::Rendered { .. }) => self.rendered += 1,
            Ok(Outcome::Superseded { .. }) => self.superseded += 1,
            Ok(Outcome::InputIgnored) => self.ignored += 1,
            Err(_) => self.failed += 1,
        }

        if self.latency_samples.len() >= self.max_samples {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(latency_ms);
    }

    /// Get average latency in ms.
    pub fn average_latency_ms(&self) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let sum: u64 = self.latency_samples.iter().sum();
        sum / self.latency_samples.len() as u64
    }

    /// Get p50 latency.
    pub fn p50_latency_ms(&self) -> u64 {
        self.percentile_latency(50)
    }

    /// Get p99 latency.
    pub fn p99_latency_ms(&self) -> u64 {
        self.percentile_latency(99)
    }

    fn percentile_latency(&self, percentile: usize) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let mut sorted: Vec<_> = self.latency_samples.iter().copied().collect();
        sorted.sort_unstable();

        let idx = (sorted.len() * percentile / 100).min(sorted.len() - 1);
        sorted[idx]
    }

    /// Share of events that were overtaken before rendering.
    pub fn superseded_rate(&self) -> f64 {
        if self.total_events == 0 {
            return 0.0;
        }

        self.superseded as f64 / self.total_events as f64
    }
}

impl Default for SimulationMetrics {
    fn default() -> Self {
        Self::new()
    }
}
