//! Per-series aggregation buffer
//!
//! Each instrument owns one [`AggregationBuffer`]. The buffer maps attribute sets to
//! series state and folds measurements with the rule of the instrument kind:
//!
//! | kind            | state         | on collect                               |
//! |-----------------|---------------|------------------------------------------|
//! | Counter         | running sum   | kept (cumulative) or zeroed (delta)      |
//! | UpDownCounter   | running sum   | kept (cumulative) or zeroed (delta)      |
//! | Gauge           | last value    | kept                                     |
//! | Histogram       | sample window | summarised, then samples cleared         |
//!
//! Locking: one `parking_lot::Mutex` per instrument guards all of its series. A
//! record takes it once; a collect takes it once for the whole instrument, so a
//! measurement lands either entirely before or entirely after a snapshot boundary.
//! Instruments typically carry a handful of series, so per-instrument rather than
//! per-series locking keeps the snapshot pass to one acquisition per instrument.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::histogram::HistogramState;
use super::types::{InstrumentKind, MetricValue, Temporality};
use crate::telemetry::attributes::AttributeSet;

/// Mutable aggregation state of one series
#[derive(Debug, Clone)]
pub enum SeriesState {
    Sum { value: f64, monotonic: bool },
    LastValue(f64),
    Histogram(HistogramState),
}

impl SeriesState {
    pub fn new(kind: InstrumentKind, bounds: &Arc<[f64]>) -> Self {
        match kind {
            InstrumentKind::Counter => Self::Sum {
                value: 0.0,
                monotonic: true,
            },
            InstrumentKind::UpDownCounter => Self::Sum {
                value: 0.0,
                monotonic: false,
            },
            InstrumentKind::Gauge => Self::LastValue(0.0),
            InstrumentKind::Histogram => Self::Histogram(HistogramState::new(Arc::clone(bounds))),
        }
    }

    /// Fold a validated measurement into the state
    pub fn fold(&mut self, measurement: f64) {
        match self {
            Self::Sum { value, .. } => *value += measurement,
            Self::LastValue(value) => *value = measurement,
            Self::Histogram(histogram) => histogram.observe(measurement),
        }
    }

    /// Current value without touching the state
    pub fn peek(&self) -> MetricValue {
        match self {
            Self::Sum { value, monotonic } => MetricValue::Sum {
                value: *value,
                monotonic: *monotonic,
            },
            Self::LastValue(value) => MetricValue::Gauge { value: *value },
            Self::Histogram(histogram) => MetricValue::Histogram(histogram.data()),
        }
    }

    /// Current value, resetting whatever the kind and temporality require.
    /// Returns whether the start of the window moved.
    fn collect(&mut self, temporality: Temporality) -> (MetricValue, bool) {
        match self {
            Self::Sum { value, monotonic } => {
                let snapshot = MetricValue::Sum {
                    value: *value,
                    monotonic: *monotonic,
                };
                if temporality == Temporality::Delta {
                    *value = 0.0;
                    (snapshot, true)
                } else {
                    (snapshot, false)
                }
            }
            Self::LastValue(value) => (MetricValue::Gauge { value: *value }, false),
            Self::Histogram(histogram) => (MetricValue::Histogram(histogram.take()), true),
        }
    }
}

#[derive(Debug)]
struct Series {
    state: SeriesState,
    start_time: DateTime<Utc>,
}

/// Series map of a single instrument
#[derive(Debug)]
pub struct AggregationBuffer {
    kind: InstrumentKind,
    bounds: Arc<[f64]>,
    series: Mutex<HashMap<AttributeSet, Series>>,
}

impl AggregationBuffer {
    pub fn new(kind: InstrumentKind, bounds: Arc<[f64]>) -> Self {
        Self {
            kind,
            bounds,
            series: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    /// Fold a measurement into the series identified by `attributes`
    pub fn fold(&self, value: f64, attributes: AttributeSet) {
        let mut series = self.series.lock();
        series
            .entry(attributes)
            .or_insert_with(|| Series {
                state: SeriesState::new(self.kind, &self.bounds),
                start_time: Utc::now(),
            })
            .state
            .fold(value);
    }

    /// Value of one series, if it exists
    pub fn value(&self, attributes: &AttributeSet) -> Option<MetricValue> {
        self.series.lock().get(attributes).map(|s| s.state.peek())
    }

    pub fn series_count(&self) -> usize {
        self.series.lock().len()
    }

    /// Read every series without resetting anything, ordered by attribute set
    pub fn peek(&self) -> Vec<(AttributeSet, MetricValue, DateTime<Utc>)> {
        let series = self.series.lock();
        let mut out: Vec<_> = series
            .iter()
            .map(|(attrs, s)| (attrs.clone(), s.state.peek(), s.start_time))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Snapshot every series and apply the kind-specific reset, under one lock
    pub fn collect(
        &self,
        temporality: Temporality,
        now: DateTime<Utc>,
    ) -> Vec<(AttributeSet, MetricValue, DateTime<Utc>)> {
        let mut series = self.series.lock();
        let mut out = Vec::with_capacity(series.len());

        for (attrs, s) in series.iter_mut() {
            let (value, window_moved) = s.state.collect(temporality);
            out.push((attrs.clone(), value, s.start_time));
            if window_moved {
                s.start_time = now;
            }
        }

        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}
