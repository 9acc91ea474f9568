use serde::Serialize;
use std::sync::Mutex;

/// Counters for the filter pipeline.
pub struct RecomputeMetrics {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Full recompute passes that ran.
    pub recomputes: usize,
    /// Filter updates refused because of invalid bounds.
    pub rejected: usize,
    /// Filter updates whose recompute was folded into a later one.
    pub deferred: usize,
}

impl RecomputeMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_recompute(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.recomputes += 1;
        }
    }

    pub fn record_rejected(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.rejected += 1;
        }
    }

    pub fn record_deferred(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.deferred += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for RecomputeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
