//! Metric instruments and aggregation
//!
//! This module provides the metric side of the pipeline:
//! - Instrument kinds: counter, up-down counter, gauge, histogram
//! - Per-series aggregation with kind-specific fold and reset rules
//! - Export statistics for the pipeline itself

mod aggregation;
mod histogram;
mod instrument;
mod stats;
mod types;

pub use aggregation::{AggregationBuffer, SeriesState};
pub use histogram::{DEFAULT_BUCKETS, HistogramState};
pub use instrument::{HistogramTimer, Instrument};
pub(crate) use instrument::InstrumentEntry;
pub use stats::{ExportStats, ExportStatsSnapshot};
pub use types::{
    HistogramData, InstrumentDescriptor, InstrumentKind, MetricValue, SeriesSnapshot, Temporality,
};
