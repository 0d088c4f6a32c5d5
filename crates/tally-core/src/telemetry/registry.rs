//! Instrument registry
//!
//! The registry exclusively owns every instrument and its series. Creation is
//! idempotent for a matching kind and rejected for a conflicting one; recording goes
//! through a shutdown gate so that nothing lands after [`MetricsRegistry::shutdown`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{RwLock, RwLockReadGuard};

use super::attributes::AttributeSet;
use super::metrics::{
    DEFAULT_BUCKETS, Instrument, InstrumentDescriptor, InstrumentEntry, InstrumentKind,
    SeriesSnapshot, Temporality,
};
use crate::error::{TallyError, TallyResult};

const MAX_NAME_LEN: usize = 255;

/// Open/closed flag guarding every mutating call.
///
/// Mutations hold the read side for their critical section; closing takes the write
/// side, so it waits for in-flight records and nothing else.
#[derive(Debug, Default)]
pub(crate) struct ShutdownGate {
    closed: RwLock<bool>,
}

impl ShutdownGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&self, operation: &str) -> TallyResult<RwLockReadGuard<'_, bool>> {
        let guard = self.closed.read();
        if *guard {
            return Err(TallyError::shutdown(operation));
        }
        Ok(guard)
    }

    /// Close the gate. Returns false if it was already closed.
    pub(crate) fn close(&self) -> bool {
        let mut closed = self.closed.write();
        let was_open = !*closed;
        *closed = true;
        was_open
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.read()
    }
}

/// Validate an instrument name: ASCII letter first, then letters, digits, `_ . - /`
pub fn validate_name(name: &str) -> TallyResult<()> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(TallyError::invalid_name(name, "name must not be empty")),
        Some(c) if !c.is_ascii_alphabetic() => {
            return Err(TallyError::invalid_name(
                name,
                "name must start with an ASCII letter",
            ));
        }
        Some(_) => {}
    }

    if name.len() > MAX_NAME_LEN {
        return Err(TallyError::invalid_name(
            name,
            format!("name is longer than {} characters", MAX_NAME_LEN),
        ));
    }

    if let Some(bad) =
        chars.find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/')))
    {
        return Err(TallyError::invalid_name(
            name,
            format!("unsupported character '{}'", bad),
        ));
    }

    Ok(())
}

/// Registry of named instruments
#[derive(Debug)]
pub struct MetricsRegistry {
    instruments: RwLock<BTreeMap<String, Arc<InstrumentEntry>>>,
    gate: Arc<ShutdownGate>,
    temporality: Temporality,
    bounds: Arc<[f64]>,
}

impl MetricsRegistry {
    /// Create a registry with cumulative temporality and default histogram buckets
    pub fn new() -> Self {
        Self::with_temporality(Temporality::Cumulative)
    }

    pub fn with_temporality(temporality: Temporality) -> Self {
        Self {
            instruments: RwLock::new(BTreeMap::new()),
            gate: Arc::new(ShutdownGate::new()),
            temporality,
            bounds: Arc::from(&DEFAULT_BUCKETS[..]),
        }
    }

    /// Replace the histogram bucket boundaries used by instruments created afterwards
    pub fn with_histogram_buckets(mut self, bounds: Vec<f64>) -> TallyResult<Self> {
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(TallyError::config("histogram bucket bounds must be finite"));
        }
        if bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TallyError::config(
                "histogram bucket bounds must be strictly increasing",
            ));
        }
        self.bounds = Arc::from(bounds);
        Ok(self)
    }

    pub fn temporality(&self) -> Temporality {
        self.temporality
    }

    /// Create an instrument, or return the existing one if the kind matches.
    /// An empty unit is stored as `"1"`.
    pub fn create(
        &self,
        name: &str,
        description: &str,
        unit: &str,
        kind: InstrumentKind,
    ) -> TallyResult<Instrument> {
        validate_name(name)?;
        let unit = if unit.is_empty() { "1" } else { unit };
        let _open = self.gate.enter("create")?;

        let mut instruments = self.instruments.write();
        if let Some(existing) = instruments.get(name) {
            let descriptor = existing.descriptor();
            if descriptor.kind != kind {
                return Err(TallyError::duplicate_instrument(
                    name,
                    descriptor.kind.as_str(),
                    kind.as_str(),
                ));
            }
            if descriptor.description != description || descriptor.unit != unit {
                tracing::warn!(
                    instrument = name,
                    "Instrument re-created with different description or unit; keeping the original"
                );
            }
            return Ok(Instrument::new(Arc::clone(existing), Arc::clone(&self.gate)));
        }

        let descriptor = InstrumentDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            unit: unit.to_string(),
            kind,
        };
        let entry = Arc::new(InstrumentEntry::new(descriptor, Arc::clone(&self.bounds)));
        instruments.insert(name.to_string(), Arc::clone(&entry));
        tracing::debug!(instrument = name, kind = %kind, "Created instrument");

        Ok(Instrument::new(entry, Arc::clone(&self.gate)))
    }

    /// Create a counter (monotonic sum)
    pub fn create_counter(&self, name: &str, description: &str, unit: &str) -> TallyResult<Instrument> {
        self.create(name, description, unit, InstrumentKind::Counter)
    }

    /// Create a histogram
    pub fn create_histogram(&self, name: &str, description: &str, unit: &str) -> TallyResult<Instrument> {
        self.create(name, description, unit, InstrumentKind::Histogram)
    }

    /// Create a gauge (last value)
    pub fn create_gauge(&self, name: &str, description: &str, unit: &str) -> TallyResult<Instrument> {
        self.create(name, description, unit, InstrumentKind::Gauge)
    }

    /// Create an up-down counter (non-monotonic sum)
    pub fn create_up_down_counter(
        &self,
        name: &str,
        description: &str,
        unit: &str,
    ) -> TallyResult<Instrument> {
        self.create(name, description, unit, InstrumentKind::UpDownCounter)
    }

    /// Record a measurement on a named instrument
    pub fn record(&self, name: &str, value: f64, attributes: impl Into<AttributeSet>) -> TallyResult<()> {
        let _open = self.gate.enter("record")?;
        let entry = self
            .instruments
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| TallyError::unknown_instrument(name))?;
        entry.record(value, attributes.into())
    }

    pub fn lookup(&self, name: &str) -> Option<Instrument> {
        self.instruments
            .read()
            .get(name)
            .map(|entry| Instrument::new(Arc::clone(entry), Arc::clone(&self.gate)))
    }

    /// Descriptors of all registered instruments, ordered by name
    pub fn list_instruments(&self) -> Vec<InstrumentDescriptor> {
        self.instruments
            .read()
            .values()
            .map(|entry| entry.descriptor().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instruments.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.read().is_empty()
    }

    fn entries(&self) -> Vec<Arc<InstrumentEntry>> {
        self.instruments.read().values().cloned().collect()
    }

    /// Read all series without resetting anything
    pub fn snapshot(&self) -> Vec<SeriesSnapshot> {
        let now = Utc::now();
        self.entries()
            .iter()
            .flat_map(|entry| {
                entry
                    .buffer()
                    .peek()
                    .into_iter()
                    .map(move |(attributes, value, start_time)| SeriesSnapshot {
                        descriptor: entry.descriptor().clone(),
                        attributes,
                        value,
                        start_time,
                        time: now,
                    })
            })
            .collect()
    }

    /// Snapshot all series for export and apply the per-kind reset.
    ///
    /// Ordered by instrument name, then attribute set. Still works after shutdown
    /// so the final flush can drain what was recorded before it.
    pub fn collect(&self) -> Vec<SeriesSnapshot> {
        let now = Utc::now();
        let temporality = self.temporality;
        self.entries()
            .iter()
            .flat_map(|entry| {
                entry
                    .buffer()
                    .collect(temporality, now)
                    .into_iter()
                    .map(move |(attributes, value, start_time)| SeriesSnapshot {
                        descriptor: entry.descriptor().clone(),
                        attributes,
                        value,
                        start_time,
                        time: now,
                    })
            })
            .collect()
    }

    /// Reject all further mutations. Waits only for in-flight records.
    /// Returns false if the registry was already shut down.
    pub fn shutdown(&self) -> bool {
        self.gate.close()
    }

    pub fn is_shut_down(&self) -> bool {
        self.gate.is_closed()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::metrics::MetricValue;
    use std::thread;

    fn sum_of(snapshot: &[SeriesSnapshot], name: &str, attrs: &AttributeSet) -> Option<f64> {
        snapshot
            .iter()
            .find(|s| s.name() == name && &s.attributes == attrs)
            .map(|s| s.value.as_f64())
    }

    #[test]
    fn test_requests_total_scenario() {
        let registry = MetricsRegistry::new();
        registry
            .create_counter("requests_total", "Total requests", "1")
            .unwrap();

        for _ in 0..3 {
            registry
                .record("requests_total", 1.0, [("method", "GET")])
                .unwrap();
        }
        for _ in 0..2 {
            registry
                .record("requests_total", 1.0, [("method", "POST")])
                .unwrap();
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            sum_of(&snapshot, "requests_total", &AttributeSet::from([("method", "GET")])),
            Some(3.0)
        );
        assert_eq!(
            sum_of(&snapshot, "requests_total", &AttributeSet::from([("method", "POST")])),
            Some(2.0)
        );
    }

    #[test]
    fn test_counter_sum_matches_recorded_values() {
        let registry = MetricsRegistry::new();
        let counter = registry.create_counter("bytes_sent", "Bytes sent", "By").unwrap();

        let values = [0.0, 1.5, 7.0, 0.25, 100.0];
        for (i, value) in values.iter().enumerate() {
            counter.record(*value, AttributeSet::new()).unwrap();
            if i == 2 {
                // exports in between must not disturb the cumulative total
                registry.collect();
            }
        }

        let total: f64 = values.iter().sum();
        assert_eq!(
            sum_of(&registry.collect(), "bytes_sent", &AttributeSet::new()),
            Some(total)
        );
    }

    #[test]
    fn test_gauge_reports_latest_value() {
        let registry = MetricsRegistry::new();
        let gauge = registry
            .create_gauge("temperature_celsius", "Current temperature", "Cel")
            .unwrap();
        let attrs = AttributeSet::from([("location", "sensor_1")]);

        for value in [20.0, 22.3, 18.9, 21.7] {
            gauge.record(value, attrs.clone()).unwrap();
        }

        assert_eq!(gauge.value(&attrs), Some(MetricValue::Gauge { value: 21.7 }));
        assert_eq!(
            sum_of(&registry.snapshot(), "temperature_celsius", &attrs),
            Some(21.7)
        );
    }

    #[test]
    fn test_negative_counter_value_rejected() {
        let registry = MetricsRegistry::new();
        registry.create_counter("errors_total", "Errors", "1").unwrap();
        registry
            .record("errors_total", 4.0, AttributeSet::new())
            .unwrap();

        let before = registry.snapshot();
        let err = registry
            .record("errors_total", -1.0, AttributeSet::new())
            .unwrap_err();
        assert!(matches!(err, TallyError::InvalidValue { .. }));

        let after = registry.snapshot();
        assert_eq!(before[0].value, after[0].value);
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let registry = MetricsRegistry::new();
        let gauge = registry.create_gauge("load", "Load", "1").unwrap();
        assert!(gauge.record(f64::NAN, AttributeSet::new()).is_err());
        assert!(gauge.record(f64::INFINITY, AttributeSet::new()).is_err());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_unknown_instrument() {
        let registry = MetricsRegistry::new();
        let err = registry
            .record("never_created", 1.0, AttributeSet::new())
            .unwrap_err();
        assert_eq!(err, TallyError::unknown_instrument("never_created"));
    }

    #[test]
    fn test_duplicate_creation_policy() {
        let registry = MetricsRegistry::new();
        let first = registry.create_counter("jobs", "Jobs", "1").unwrap();
        first.record(2.0, AttributeSet::new()).unwrap();

        // same kind: the existing instrument comes back, state included
        let again = registry.create_counter("jobs", "Jobs", "1").unwrap();
        assert_eq!(
            again.value(&AttributeSet::new()).map(|v| v.as_f64()),
            Some(2.0)
        );
        assert_eq!(registry.len(), 1);

        // different kind: rejected
        let err = registry.create_gauge("jobs", "Jobs", "1").unwrap_err();
        assert!(matches!(err, TallyError::DuplicateInstrument { .. }));
    }

    #[test]
    fn test_invalid_names() {
        let registry = MetricsRegistry::new();
        for name in ["", "1st_metric", "has space", "emoji_✓"] {
            let err = registry.create_counter(name, "", "1").unwrap_err();
            assert!(matches!(err, TallyError::InvalidName { .. }), "{name}");
        }
        assert!(registry.create_counter("http.server/requests-total_v2", "", "1").is_ok());
    }

    #[test]
    fn test_lookup_and_list() {
        let registry = MetricsRegistry::new();
        registry.create_histogram("latency", "Latency", "s").unwrap();
        registry.create_up_down_counter("queue_size", "Queue", "1").unwrap();

        assert_eq!(registry.lookup("latency").unwrap().kind(), InstrumentKind::Histogram);
        assert!(registry.lookup("missing").is_none());

        let names: Vec<_> = registry
            .list_instruments()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["latency", "queue_size"]);
    }

    #[test]
    fn test_concurrent_counter_increments() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 10_000;

        let registry = MetricsRegistry::new();
        let counter = registry.create_counter("hits", "Hits", "1").unwrap();

        thread::scope(|scope| {
            for _ in 0..THREADS {
                let counter = counter.clone();
                scope.spawn(move || {
                    for _ in 0..PER_THREAD {
                        counter.record(1.0, [("shard", "a")]).unwrap();
                    }
                });
            }
        });

        let value = counter.value(&AttributeSet::from([("shard", "a")])).unwrap();
        assert_eq!(value.as_f64(), (THREADS * PER_THREAD) as f64);
    }

    #[test]
    fn test_no_measurement_lost_across_collect() {
        let registry = Arc::new(MetricsRegistry::with_temporality(Temporality::Delta));
        let counter = registry.create_counter("ticks", "Ticks", "1").unwrap();

        let mut exported = 0.0;
        thread::scope(|scope| {
            let writer = scope.spawn(|| {
                for _ in 0..20_000 {
                    counter.record(1.0, AttributeSet::new()).unwrap();
                }
            });
            while !writer.is_finished() {
                exported += sum_of(&registry.collect(), "ticks", &AttributeSet::new()).unwrap_or(0.0);
            }
        });
        exported += sum_of(&registry.collect(), "ticks", &AttributeSet::new()).unwrap_or(0.0);

        assert_eq!(exported, 20_000.0);
    }

    #[test]
    fn test_shutdown_rejects_mutations() {
        let registry = MetricsRegistry::new();
        let counter = registry.create_counter("requests_total", "Requests", "1").unwrap();
        counter.record(1.0, AttributeSet::new()).unwrap();

        assert!(registry.shutdown());
        assert!(!registry.shutdown());
        assert!(registry.is_shut_down());

        assert!(matches!(
            counter.record(1.0, AttributeSet::new()),
            Err(TallyError::ManagerShutdown { .. })
        ));
        assert!(matches!(
            registry.record("requests_total", 1.0, AttributeSet::new()),
            Err(TallyError::ManagerShutdown { .. })
        ));
        assert!(matches!(
            registry.create_gauge("late", "", "1"),
            Err(TallyError::ManagerShutdown { .. })
        ));

        // what was recorded before shutdown is still collectable
        assert_eq!(
            sum_of(&registry.collect(), "requests_total", &AttributeSet::new()),
            Some(1.0)
        );
    }

    #[test]
    fn test_custom_buckets() {
        let registry = MetricsRegistry::new()
            .with_histogram_buckets(vec![1.0, 10.0])
            .unwrap();
        let histogram = registry.create_histogram("size", "Size", "By").unwrap();
        histogram.record(5.0, AttributeSet::new()).unwrap();

        let value = histogram.value(&AttributeSet::new()).unwrap();
        assert_eq!(value.as_histogram().unwrap().buckets, vec![(1.0, 0), (10.0, 1)]);

        assert!(MetricsRegistry::new().with_histogram_buckets(vec![2.0, 1.0]).is_err());
        assert!(MetricsRegistry::new().with_histogram_buckets(vec![f64::NAN]).is_err());
    }

    #[test]
    fn test_histogram_timer_records_duration() {
        let registry = MetricsRegistry::new();
        let histogram = registry.create_histogram("op_seconds", "Op", "s").unwrap();

        let timer = histogram.start_timer([("op", "sleep")]);
        thread::sleep(std::time::Duration::from_millis(10));
        let elapsed = timer.stop().unwrap();

        let data = histogram
            .value(&AttributeSet::from([("op", "sleep")]))
            .unwrap();
        let data = data.as_histogram().unwrap();
        assert_eq!(data.count, 1);
        assert!(data.sum >= 0.01);
        assert!((data.sum - elapsed.as_secs_f64()).abs() < 1e-9);
    }
}
