//! Tally core
//!
//! An in-process metrics and tracing pipeline: an instrument registry with per-series
//! aggregation, a span tracker with task-local nesting, and a scheduler that exports
//! both in periodic batches to a pluggable sink.
//!
//! ```no_run
//! use tally_core::config::TelemetryConfig;
//! use tally_core::telemetry::TelemetryPipeline;
//!
//! # async fn run() -> tally_core::error::TallyResult<()> {
//! let pipeline = TelemetryPipeline::start(TelemetryConfig::default())?;
//! let requests = pipeline
//!     .registry()
//!     .create_counter("requests_total", "Handled requests", "1")?;
//!
//! {
//!     let span = pipeline.tracker().start_span("handle_request")?;
//!     span.set_attribute("http.method", "GET")?;
//!     requests.record(1.0, [("method", "GET")])?;
//! }
//!
//! pipeline.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{ConfigLoader, TelemetryConfig, load_config};
pub use error::{TallyError, TallyResult, UnifiedError};
pub use telemetry::{
    AttributeSet, AttributeValue, Instrument, InstrumentKind, MetricsRegistry, SpanTracker,
    TelemetryPipeline, TelemetrySink,
};
