//! Export statistics - the pipeline's metrics about itself

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Live export counters, updated by the scheduler
#[derive(Debug, Default)]
pub struct ExportStats {
    metric_exports: AtomicU64,
    metric_failures: AtomicU64,
    span_exports: AtomicU64,
    span_failures: AtomicU64,
    series_exported: AtomicU64,
    spans_exported: AtomicU64,
    last_success: RwLock<Option<DateTime<Utc>>>,
}

impl ExportStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_metrics_success(&self, series: usize) {
        self.metric_exports.fetch_add(1, Ordering::Relaxed);
        self.series_exported
            .fetch_add(series as u64, Ordering::Relaxed);
        *self.last_success.write() = Some(Utc::now());
    }

    pub fn record_metrics_failure(&self) {
        self.metric_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_spans_success(&self, spans: usize) {
        self.span_exports.fetch_add(1, Ordering::Relaxed);
        self.spans_exported.fetch_add(spans as u64, Ordering::Relaxed);
        *self.last_success.write() = Some(Utc::now());
    }

    pub fn record_spans_failure(&self) {
        self.span_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> ExportStatsSnapshot {
        ExportStatsSnapshot {
            metric_exports: self.metric_exports.load(Ordering::Relaxed),
            metric_failures: self.metric_failures.load(Ordering::Relaxed),
            span_exports: self.span_exports.load(Ordering::Relaxed),
            span_failures: self.span_failures.load(Ordering::Relaxed),
            series_exported: self.series_exported.load(Ordering::Relaxed),
            spans_exported: self.spans_exported.load(Ordering::Relaxed),
            last_success: *self.last_success.read(),
        }
    }
}

/// Snapshot of [`ExportStats`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportStatsSnapshot {
    /// Successful metric batch exports
    pub metric_exports: u64,
    /// Failed or timed out metric batch exports
    pub metric_failures: u64,
    /// Successful span batch exports
    pub span_exports: u64,
    /// Failed or timed out span batch exports
    pub span_failures: u64,
    /// Series delivered across all successful metric exports
    pub series_exported: u64,
    /// Spans delivered across all successful span exports
    pub spans_exported: u64,
    pub last_success: Option<DateTime<Utc>>,
}

impl ExportStatsSnapshot {
    pub fn total_failures(&self) -> u64 {
        self.metric_failures + self.span_failures
    }
}
