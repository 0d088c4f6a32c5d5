//! Metrics and tracing pipeline
//!
//! Application code records into instruments owned by a [`MetricsRegistry`] and opens
//! spans through a [`SpanTracker`]. An [`ExportScheduler`] periodically collects both
//! and hands the batches to a [`TelemetrySink`]. [`TelemetryPipeline`] wires the three
//! together from a [`crate::config::TelemetryConfig`].

pub mod attributes;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod resource;
pub mod scheduler;
pub mod sink;
pub mod trace;

pub use attributes::{AttributeSet, AttributeValue};
pub use metrics::{
    DEFAULT_BUCKETS, ExportStatsSnapshot, HistogramData, HistogramTimer, Instrument,
    InstrumentDescriptor, InstrumentKind, MetricValue, SeriesSnapshot, Temporality,
};
pub use pipeline::{PipelineBuilder, TelemetryPipeline};
pub use registry::{MetricsRegistry, validate_name};
pub use resource::Resource;
pub use scheduler::{ExportScheduler, SchedulerConfig, SchedulerState};
pub use sink::{HttpJsonSink, InMemorySink, LoggingSink, MetricsBatch, SpanBatch, TelemetrySink};
pub use trace::{Span, SpanContext, SpanData, SpanGuard, SpanId, SpanStatus, SpanTracker, TraceId};
