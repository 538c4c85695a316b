use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing parse activity.
#[derive(Default)]
pub struct ParseMetrics {
    documents_parsed: AtomicU64,
    documents_failed: AtomicU64,
    bytes_received: AtomicU64,
}

impl ParseMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a payload handed to the pipeline.
    pub fn record_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a document that was converted and exported successfully.
    pub fn record_success(&self) {
        self.documents_parsed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that ended without Markdown.
    pub fn record_failure(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_parsed: self.documents_parsed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of parse counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents converted to Markdown since startup.
    pub documents_parsed: u64,
    /// Parse requests that ended without Markdown since startup, rejected payloads included.
    pub documents_failed: u64,
    /// Total payload bytes staged for conversion.
    pub bytes_received: u64,
}
