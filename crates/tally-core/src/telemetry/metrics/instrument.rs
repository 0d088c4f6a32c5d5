//! Instrument handles
//!
//! The kind set is closed, so one [`Instrument`] type serves all four kinds and
//! dispatches on its `kind` field rather than through a trait object.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::aggregation::AggregationBuffer;
use super::types::{InstrumentDescriptor, InstrumentKind, MetricValue};
use crate::error::{TallyError, TallyResult};
use crate::telemetry::attributes::AttributeSet;
use crate::telemetry::registry::ShutdownGate;

/// Registry-owned instrument: metadata plus its aggregation buffer
#[derive(Debug)]
pub(crate) struct InstrumentEntry {
    descriptor: InstrumentDescriptor,
    buffer: AggregationBuffer,
}

impl InstrumentEntry {
    pub(crate) fn new(descriptor: InstrumentDescriptor, bounds: Arc<[f64]>) -> Self {
        let buffer = AggregationBuffer::new(descriptor.kind, bounds);
        Self { descriptor, buffer }
    }

    pub(crate) fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    pub(crate) fn buffer(&self) -> &AggregationBuffer {
        &self.buffer
    }

    /// Validate and fold a measurement. Rejected values leave the series untouched.
    pub(crate) fn record(&self, value: f64, attributes: AttributeSet) -> TallyResult<()> {
        if !value.is_finite() {
            return Err(TallyError::invalid_value(
                &self.descriptor.name,
                value,
                "value must be finite",
            ));
        }

        if self.descriptor.kind.is_monotonic() && value < 0.0 {
            return Err(TallyError::invalid_value(
                &self.descriptor.name,
                value,
                "counter values must be non-negative",
            ));
        }

        self.buffer.fold(value, attributes);
        Ok(())
    }
}

/// Cloneable handle to a registered instrument
#[derive(Debug, Clone)]
pub struct Instrument {
    entry: Arc<InstrumentEntry>,
    gate: Arc<ShutdownGate>,
}

impl Instrument {
    pub(crate) fn new(entry: Arc<InstrumentEntry>, gate: Arc<ShutdownGate>) -> Self {
        Self { entry, gate }
    }

    pub fn name(&self) -> &str {
        &self.entry.descriptor.name
    }

    pub fn description(&self) -> &str {
        &self.entry.descriptor.description
    }

    pub fn unit(&self) -> &str {
        &self.entry.descriptor.unit
    }

    pub fn kind(&self) -> InstrumentKind {
        self.entry.descriptor.kind
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.entry.descriptor
    }

    /// Record a measurement.
    ///
    /// Counters and up-down counters add `value`, gauges overwrite with it and
    /// histograms add it to the current window.
    pub fn record(&self, value: f64, attributes: impl Into<AttributeSet>) -> TallyResult<()> {
        let _open = self.gate.enter("record")?;
        self.entry.record(value, attributes.into())
    }

    /// Current value of the series for `attributes` (the gauge reading for gauges)
    pub fn value(&self, attributes: &AttributeSet) -> Option<MetricValue> {
        self.entry.buffer.value(attributes)
    }

    /// Time an operation and record its duration in seconds on stop
    pub fn start_timer(&self, attributes: impl Into<AttributeSet>) -> HistogramTimer<'_> {
        HistogramTimer {
            instrument: self,
            attributes: attributes.into(),
            start: Instant::now(),
        }
    }
}

/// Timer for measuring operation duration
pub struct HistogramTimer<'a> {
    instrument: &'a Instrument,
    attributes: AttributeSet,
    start: Instant,
}

impl<'a> HistogramTimer<'a> {
    /// Stop the timer and record the duration
    pub fn stop(self) -> TallyResult<Duration> {
        let duration = self.start.elapsed();
        self.instrument
            .record(duration.as_secs_f64(), self.attributes)?;
        Ok(duration)
    }

    /// Get elapsed time without stopping
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
