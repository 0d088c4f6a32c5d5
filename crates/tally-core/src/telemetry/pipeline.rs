//! Explicitly constructed telemetry pipeline
//!
//! The application entry point builds one [`TelemetryPipeline`] and passes its
//! registry and tracker to the code that records. There is no process-wide provider.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use super::metrics::ExportStatsSnapshot;
use super::registry::MetricsRegistry;
use super::resource::Resource;
use super::scheduler::{ExportScheduler, SchedulerConfig, SchedulerState};
use super::sink::{HttpJsonSink, InMemorySink, LoggingSink, TelemetrySink};
use super::trace::{DEFAULT_MAX_QUEUE, SpanTracker};
use crate::config::{SinkKind, TelemetryConfig};
use crate::error::TallyResult;

/// Builder for [`TelemetryPipeline`]
pub struct PipelineBuilder {
    config: TelemetryConfig,
    sink: Option<Arc<dyn TelemetrySink>>,
    histogram_buckets: Option<Vec<f64>>,
    max_queued_spans: usize,
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field("sink", &self.sink.as_ref().map(|s| s.name()))
            .field("histogram_buckets", &self.histogram_buckets)
            .field("max_queued_spans", &self.max_queued_spans)
            .finish()
    }
}

impl PipelineBuilder {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            config,
            sink: None,
            histogram_buckets: None,
            max_queued_spans: DEFAULT_MAX_QUEUE,
        }
    }

    /// Use this sink instead of the one named by `config.sink`
    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_histogram_buckets(mut self, bounds: Vec<f64>) -> Self {
        self.histogram_buckets = Some(bounds);
        self
    }

    /// Bound on finished spans held between exports
    pub fn with_max_queued_spans(mut self, max: usize) -> Self {
        self.max_queued_spans = max;
        self
    }

    /// Assemble the pipeline without starting the export timer
    pub fn build(self) -> TallyResult<TelemetryPipeline> {
        self.config.validate()?;

        let mut registry = MetricsRegistry::with_temporality(self.config.temporality);
        if let Some(bounds) = self.histogram_buckets {
            registry = registry.with_histogram_buckets(bounds)?;
        }
        let registry = Arc::new(registry);
        let tracker = SpanTracker::with_max_queue(self.max_queued_spans);
        let resource = Resource::from(&self.config);

        let mut memory_sink = None;
        let sink: Arc<dyn TelemetrySink> = match self.sink {
            Some(sink) => sink,
            None => match self.config.sink {
                SinkKind::Http => Arc::new(HttpJsonSink::with_timeout(
                    self.config.otlp_endpoint.clone(),
                    self.config.export_timeout,
                )),
                SinkKind::Log => Arc::new(LoggingSink::new()),
                SinkKind::Memory => {
                    let sink = Arc::new(InMemorySink::new());
                    memory_sink = Some(Arc::clone(&sink));
                    sink
                }
            },
        };

        let scheduler = ExportScheduler::new(
            Arc::clone(&registry),
            tracker.clone(),
            sink,
            resource.clone(),
            SchedulerConfig {
                interval: self.config.export_interval,
                export_timeout: self.config.export_timeout,
            },
        );

        Ok(TelemetryPipeline {
            config: self.config,
            resource,
            registry,
            tracker,
            scheduler,
            memory_sink,
        })
    }

    /// Assemble the pipeline and start periodic export
    pub fn start(self) -> TallyResult<TelemetryPipeline> {
        let pipeline = self.build()?;
        pipeline.scheduler.start()?;
        info!(
            service = %pipeline.resource.service_name,
            version = %pipeline.resource.service_version,
            environment = %pipeline.resource.environment,
            "Telemetry pipeline started"
        );
        Ok(pipeline)
    }
}

/// Registry, span tracker and export scheduler wired to one sink
#[derive(Debug)]
pub struct TelemetryPipeline {
    config: TelemetryConfig,
    resource: Resource,
    registry: Arc<MetricsRegistry>,
    tracker: SpanTracker,
    scheduler: ExportScheduler,
    memory_sink: Option<Arc<InMemorySink>>,
}

impl TelemetryPipeline {
    pub fn builder(config: TelemetryConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Build with the configured sink and start exporting
    pub fn start(config: TelemetryConfig) -> TallyResult<Self> {
        PipelineBuilder::new(config).start()
    }

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    pub fn tracker(&self) -> &SpanTracker {
        &self.tracker
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn stats(&self) -> ExportStatsSnapshot {
        self.scheduler.stats()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// The in-memory sink, when the pipeline was built with `sink = memory`
    pub fn memory_sink(&self) -> Option<&Arc<InMemorySink>> {
        self.memory_sink.as_ref()
    }

    pub async fn force_flush(&self) -> TallyResult<()> {
        self.scheduler.force_flush().await
    }

    /// Stop recording, flush everything recorded so far and shut the sink down.
    /// Idempotent.
    pub async fn shutdown(&self) -> TallyResult<()> {
        self.scheduler.stop().await
    }

    pub fn is_shut_down(&self) -> bool {
        self.scheduler.is_stopped()
    }
}
