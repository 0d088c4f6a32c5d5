//! Periodic export scheduler
//!
//! A background task wakes on a fixed interval, collects every series from the
//! registry, drains finished spans, and hands both batches to the sink. Delivery is
//! at most once: a batch the sink rejects (or that times out) is logged, counted and
//! dropped, and the next tick carries on normally.
//!
//! ```text
//! Idle --start--> Running --tick--> Exporting --done--> Running
//!                    |                                     |
//!                    +-----------------stop----------------+--> Stopped
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::metrics::{ExportStats, ExportStatsSnapshot};
use super::registry::MetricsRegistry;
use super::resource::Resource;
use super::sink::{MetricsBatch, SpanBatch, TelemetrySink};
use super::trace::SpanTracker;
use crate::error::{TallyError, TallyResult};

/// Default export interval
pub const DEFAULT_EXPORT_INTERVAL: Duration = Duration::from_millis(5000);

/// Default bound on a single sink call
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Scheduler lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed, timer not started
    Idle,
    /// Waiting for the next tick
    Running,
    /// A collect-and-export pass is in progress
    Exporting,
    /// Stopped; terminal
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Exporting => write!(f, "exporting"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Timer settings for [`ExportScheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub export_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_EXPORT_INTERVAL,
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
        }
    }
}

/// Everything the export task needs, shared with the owning handle
struct Exporter {
    registry: Arc<MetricsRegistry>,
    tracker: SpanTracker,
    sink: Arc<dyn TelemetrySink>,
    resource: Resource,
    stats: Arc<ExportStats>,
    state: RwLock<SchedulerState>,
    export_timeout: Duration,
    // one export pass at a time, whether from a tick, a forced flush or stop
    export_lock: tokio::sync::Mutex<()>,
}

impl Exporter {
    fn set_state(&self, next: SchedulerState) {
        let mut state = self.state.write();
        if *state != SchedulerState::Stopped {
            *state = next;
        }
    }

    /// Collect, drain and export once. Returns the first sink failure, if any.
    async fn export_once(&self) -> TallyResult<()> {
        let _serial = self.export_lock.lock().await;
        self.set_state(SchedulerState::Exporting);

        let series = self.registry.collect();
        let spans = self.tracker.drain();
        let mut first_error = None;

        if !series.is_empty() {
            let batch = MetricsBatch::new(self.resource.clone(), series);
            match self.bounded(self.sink.export_metrics(&batch)).await {
                Ok(()) => {
                    debug!(series = batch.len(), sink = self.sink.name(), "Exported metrics");
                    self.stats.record_metrics_success(batch.len());
                }
                Err(e) => {
                    warn!(series = batch.len(), sink = self.sink.name(), "Dropping metrics batch: {}", e);
                    self.stats.record_metrics_failure();
                    first_error.get_or_insert(e);
                }
            }
        }

        if !spans.is_empty() {
            let batch = SpanBatch::new(self.resource.clone(), spans);
            match self.bounded(self.sink.export_spans(&batch)).await {
                Ok(()) => {
                    debug!(spans = batch.len(), sink = self.sink.name(), "Exported spans");
                    self.stats.record_spans_success(batch.len());
                }
                Err(e) => {
                    warn!(spans = batch.len(), sink = self.sink.name(), "Dropping span batch: {}", e);
                    self.stats.record_spans_failure();
                    first_error.get_or_insert(e);
                }
            }
        }

        self.set_state(SchedulerState::Running);
        first_error.map_or(Ok(()), Err)
    }

    /// Apply the export timeout to one sink call
    async fn bounded<F>(&self, export: F) -> TallyResult<()>
    where
        F: std::future::Future<Output = TallyResult<()>>,
    {
        match tokio::time::timeout(self.export_timeout, export).await {
            Ok(result) => result.map_err(|e| match e {
                e @ TallyError::ExportFailure { .. } => e,
                other => TallyError::export_failure_to(other.to_string(), self.sink.name()),
            }),
            Err(_) => Err(TallyError::export_failure_to(
                format!("export timed out after {} ms", self.export_timeout.as_millis()),
                self.sink.name(),
            )),
        }
    }

    async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    // failures are already logged and counted
                    let _ = self.export_once().await;
                }
            }
        }
        debug!("Export loop exited");
    }
}

/// Drives periodic export of a registry and span tracker into a sink
pub struct ExportScheduler {
    exporter: Arc<Exporter>,
    interval: Duration,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl ExportScheduler {
    pub fn new(
        registry: Arc<MetricsRegistry>,
        tracker: SpanTracker,
        sink: Arc<dyn TelemetrySink>,
        resource: Resource,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            exporter: Arc::new(Exporter {
                registry,
                tracker,
                sink,
                resource,
                stats: Arc::new(ExportStats::new()),
                state: RwLock::new(SchedulerState::Idle),
                export_timeout: config.export_timeout,
                export_lock: tokio::sync::Mutex::new(()),
            }),
            interval: config.interval,
            cancel: CancellationToken::new(),
            handle: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    /// Start the repeating timer. The first export fires one interval from now.
    ///
    /// Must be called inside a tokio runtime. Starting twice is a no-op.
    pub fn start(&self) -> TallyResult<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(TallyError::shutdown("start"));
        }
        if self.interval.is_zero() {
            return Err(TallyError::config("export interval must be greater than zero"));
        }

        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            TallyError::config_with_context(e.to_string(), "export scheduler needs a tokio runtime")
        })?;

        *self.exporter.state.write() = SchedulerState::Running;
        let exporter = Arc::clone(&self.exporter);
        *handle = Some(runtime.spawn(exporter.run(self.interval, self.cancel.clone())));

        info!(
            interval_ms = self.interval.as_millis() as u64,
            sink = self.exporter.sink.name(),
            "Export scheduler started"
        );
        Ok(())
    }

    pub fn state(&self) -> SchedulerState {
        *self.exporter.state.read()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stats(&self) -> ExportStatsSnapshot {
        self.exporter.stats.snapshot()
    }

    /// Export immediately instead of waiting for the next tick
    pub async fn force_flush(&self) -> TallyResult<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(TallyError::shutdown("force_flush"));
        }
        self.exporter.export_once().await
    }

    /// Stop recording, cancel the timer, run one final export and shut the sink down.
    ///
    /// Everything recorded before this call is in the final batch. Calling it again is a
    /// no-op.
    pub async fn stop(&self) -> TallyResult<()> {
        if self.stopped.swap(true, Ordering::AcqRel) {
            debug!("Export scheduler already stopped");
            return Ok(());
        }

        // closing waits for in-flight records, so the flush below sees all of them
        self.exporter.registry.shutdown();
        self.exporter.tracker.shutdown();
        self.cancel.cancel();

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Export task ended abnormally: {}", e);
            }
        }

        let flushed = self.exporter.export_once().await;
        if let Err(e) = &flushed {
            warn!("Final flush failed: {}", e);
        }
        if let Err(e) = self.exporter.sink.shutdown().await {
            warn!(sink = self.exporter.sink.name(), "Sink shutdown failed: {}", e);
        }

        *self.exporter.state.write() = SchedulerState::Stopped;

        let stats = self.exporter.stats.snapshot();
        info!(
            metric_exports = stats.metric_exports,
            span_exports = stats.span_exports,
            series_exported = stats.series_exported,
            spans_exported = stats.spans_exported,
            failures = stats.total_failures(),
            dropped_spans = self.exporter.tracker.dropped_count(),
            "Export scheduler stopped"
        );
        flushed
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ExportScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportScheduler")
            .field("state", &self.state())
            .field("interval", &self.interval)
            .field("sink", &self.exporter.sink.name())
            .finish()
    }
}

impl Drop for ExportScheduler {
    fn drop(&mut self) {
        if !self.stopped.load(Ordering::Acquire) {
            debug!("Export scheduler dropped without stop; pending telemetry is discarded");
        }
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
