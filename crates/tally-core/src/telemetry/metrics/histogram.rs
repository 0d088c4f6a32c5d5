//! Histogram aggregation state - distribution tracking

use std::sync::Arc;

use super::types::HistogramData;

/// Default explicit bucket boundaries, in seconds for latency histograms
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Samples recorded since the last export.
///
/// The raw samples are kept until the next export so the window can be
/// summarised exactly; [`HistogramState::take`] clears them.
#[derive(Debug, Clone)]
pub struct HistogramState {
    samples: Vec<f64>,
    sum: f64,
    min: f64,
    max: f64,
    bounds: Arc<[f64]>,
}

impl HistogramState {
    pub fn new(bounds: Arc<[f64]>) -> Self {
        Self {
            samples: Vec::new(),
            sum: 0.0,
            min: f64::MAX,
            max: f64::MIN,
            bounds,
        }
    }

    /// Observe a value
    pub fn observe(&mut self, value: f64) {
        self.samples.push(value);
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn count(&self) -> u64 {
        self.samples.len() as u64
    }

    /// Samples in recording order
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Summarise the window without clearing it
    pub fn data(&self) -> HistogramData {
        let mut buckets: Vec<(f64, u64)> = self.bounds.iter().map(|b| (*b, 0u64)).collect();
        for value in &self.samples {
            for (bound, count) in &mut buckets {
                if *value <= *bound {
                    *count += 1;
                }
            }
        }

        let count = self.count();
        HistogramData {
            count,
            sum: self.sum,
            min: if count > 0 { self.min } else { 0.0 },
            max: if count > 0 { self.max } else { 0.0 },
            buckets,
        }
    }

    /// Summarise the window and start a new one
    pub fn take(&mut self) -> HistogramData {
        let data = self.data();
        self.samples.clear();
        self.sum = 0.0;
        self.min = f64::MAX;
        self.max = f64::MIN;
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(bounds: &[f64]) -> HistogramState {
        HistogramState::new(Arc::from(bounds))
    }

    #[test]
    fn test_histogram_basic() {
        let mut histogram = state(&DEFAULT_BUCKETS);

        histogram.observe(0.1);
        histogram.observe(0.2);
        histogram.observe(0.3);

        let data = histogram.data();
        assert_eq!(data.count, 3);
        assert!((data.sum - 0.6).abs() < 0.001);
        assert!((data.min - 0.1).abs() < 0.001);
        assert!((data.max - 0.3).abs() < 0.001);
        assert!((data.mean() - 0.2).abs() < 0.001);
    }

    #[test]
    fn test_histogram_buckets() {
        let mut histogram = state(&[0.1, 0.5, 1.0]);

        histogram.observe(0.05);
        histogram.observe(0.3);
        histogram.observe(0.8);

        let data = histogram.data();
        assert_eq!(data.buckets[0], (0.1, 1)); // 0.05 <= 0.1
        assert_eq!(data.buckets[1], (0.5, 2)); // 0.05, 0.3 <= 0.5
        assert_eq!(data.buckets[2], (1.0, 3)); // all <= 1.0
    }

    #[test]
    fn test_take_clears_samples() {
        let mut histogram = state(&[1.0]);
        histogram.observe(2.0);
        histogram.observe(4.0);

        let first = histogram.take();
        assert_eq!(first.count, 2);
        assert_eq!(first.buckets[0], (1.0, 0));
        assert!(histogram.samples().is_empty());

        let empty = histogram.take();
        assert_eq!(empty.count, 0);
        assert_eq!(empty.min, 0.0);
        assert_eq!(empty.max, 0.0);
    }

    #[test]
    fn test_empty_mean() {
        assert_eq!(HistogramData::default().mean(), 0.0);
    }
}
