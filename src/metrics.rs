use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Request and stream counters for the running process
///
/// Thread-safe atomic counters; one instance lives in the app state.
#[derive(Default)]
pub struct ProxyMetrics {
    /// Chat and generate requests received
    pub requests: AtomicU64,

    /// Requests rejected because the health probe failed
    pub health_rejections: AtomicU64,

    /// Backend calls that failed before a response body was produced
    pub backend_failures: AtomicU64,

    /// Streams handed to clients
    pub streams_started: AtomicU64,

    /// Streams that ended with a `done` frame
    pub streams_completed: AtomicU64,

    /// Streams that ended with an error frame
    pub stream_faults: AtomicU64,
}

impl ProxyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_health_rejection(&self) {
        self.health_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backend_failure(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_start(&self) {
        self.streams_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how a stream ended, based on its terminal frame
    pub fn record_stream_end(&self, errored: bool) {
        if errored {
            self.stream_faults.fetch_add(1, Ordering::Relaxed);
        } else {
            self.streams_completed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            health_rejections: self.health_rejections.load(Ordering::Relaxed),
            backend_failures: self.backend_failures.load(Ordering::Relaxed),
            streams_started: self.streams_started.load(Ordering::Relaxed),
            streams_completed: self.streams_completed.load(Ordering::Relaxed),
            stream_faults: self.stream_faults.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of metrics at a point in time
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub health_rejections: u64,
    pub backend_failures: u64,
    pub streams_started: u64,
    pub streams_completed: u64,
    pub stream_faults: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Proxy Metrics: {} requests ({} rejected by health probe, {} backend failures), \
             {} streams ({} completed, {} faulted)",
            self.requests,
            self.health_rejections,
            self.backend_failures,
            self.streams_started,
            self.streams_completed,
            self.stream_faults
        )
    }
}
