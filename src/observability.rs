//! Observability stubs (metrics, tracing)

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters over the conversion pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    conversions_accepted: AtomicU64,
    conversions_rejected: AtomicU64,
    conversions_failed: AtomicU64,
    artifacts_published: AtomicU64,
    artifacts_served: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversion_accepted(&self) {
        self.conversions_accepted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "conversions_accepted", "Metric incremented");
    }

    pub fn conversion_rejected(&self) {
        self.conversions_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "conversions_rejected", "Metric incremented");
    }

    pub fn conversion_failed(&self) {
        self.conversions_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "conversions_failed", "Metric incremented");
    }

    pub fn artifact_published(&self) {
        self.artifacts_published.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "artifacts_published", "Metric incremented");
    }

    pub fn artifact_served(&self) {
        self.artifacts_served.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "artifacts_served", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            conversions_accepted: self.conversions_accepted.load(Ordering::Relaxed),
            conversions_rejected: self.conversions_rejected.load(Ordering::Relaxed),
            conversions_failed: self.conversions_failed.load(Ordering::Relaxed),
            artifacts_published: self.artifacts_published.load(Ordering::Relaxed),
            artifacts_served: self.artifacts_served.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub conversions_accepted: u64,
    pub conversions_rejected: u64,
    pub conversions_failed: u64,
    pub artifacts_published: u64,
    pub artifacts_served: u64,
}
