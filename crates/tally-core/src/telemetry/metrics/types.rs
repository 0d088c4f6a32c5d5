//! Instrument kinds, descriptors and exported metric values

use crate::telemetry::attributes::AttributeSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instrument kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Monotonically increasing sum
    Counter,
    /// Distribution of recorded values
    Histogram,
    /// Last recorded value
    Gauge,
    /// Sum that accepts negative deltas
    UpDownCounter,
}

impl InstrumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Histogram => "histogram",
            Self::Gauge => "gauge",
            Self::UpDownCounter => "up_down_counter",
        }
    }

    /// Whether recorded deltas must be non-negative
    pub fn is_monotonic(&self) -> bool {
        matches!(self, Self::Counter)
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether exported sums are totals since creation or deltas since the last export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Temporality {
    #[default]
    Cumulative,
    Delta,
}

/// Immutable instrument metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentDescriptor {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub kind: InstrumentKind,
}

/// Histogram data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramData {
    /// Number of observations
    pub count: u64,
    /// Sum of all observations
    pub sum: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Cumulative bucket counts as (upper bound, observations <= bound)
    pub buckets: Vec<(f64, u64)>,
}

impl HistogramData {
    /// Calculate mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Aggregated value of one series at export time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricValue {
    /// Counter or up-down counter total
    Sum { value: f64, monotonic: bool },
    /// Last written gauge value
    Gauge { value: f64 },
    /// Histogram statistics for the export window
    Histogram(HistogramData),
}

impl MetricValue {
    /// Scalar view: the sum, the gauge value, or the histogram sum
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Sum { value, .. } => *value,
            Self::Gauge { value } => *value,
            Self::Histogram(data) => data.sum,
        }
    }

    pub fn as_histogram(&self) -> Option<&HistogramData> {
        match self {
            Self::Histogram(data) => Some(data),
            _ => None,
        }
    }
}

/// One exported series: instrument + attribute set + aggregated value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    pub descriptor: InstrumentDescriptor,
    pub attributes: AttributeSet,
    pub value: MetricValue,
    /// Start of the aggregation window
    pub start_time: DateTime<Utc>,
    /// When the snapshot was taken
    pub time: DateTime<Utc>,
}

impl SeriesSnapshot {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}
