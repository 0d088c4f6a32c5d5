//! Sink that keeps every batch in memory

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{MetricsBatch, SpanBatch, TelemetrySink};
use crate::error::{TallyError, TallyResult};
use crate::telemetry::metrics::SeriesSnapshot;
use crate::telemetry::trace::SpanData;

#[derive(Debug, Default)]
struct Received {
    metrics: Vec<MetricsBatch>,
    spans: Vec<SpanBatch>,
    shut_down: bool,
}

/// Collects exported batches for inspection. Used by tests and `--sink memory`.
#[derive(Debug, Default)]
pub struct InMemorySink {
    received: Mutex<Received>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metric_batches(&self) -> Vec<MetricsBatch> {
        self.received.lock().metrics.clone()
    }

    pub fn span_batches(&self) -> Vec<SpanBatch> {
        self.received.lock().spans.clone()
    }

    /// Every exported span, across batches
    pub fn spans(&self) -> Vec<SpanData> {
        self.received
            .lock()
            .spans
            .iter()
            .flat_map(|b| b.spans.iter().cloned())
            .collect()
    }

    /// Series from the most recent metrics batch
    pub fn latest_series(&self) -> Vec<SeriesSnapshot> {
        self.received
            .lock()
            .metrics
            .last()
            .map(|b| b.series.clone())
            .unwrap_or_default()
    }

    /// The latest exported snapshot of a series by name, across all batches
    pub fn find_series(&self, name: &str) -> Vec<SeriesSnapshot> {
        let received = self.received.lock();
        received
            .metrics
            .iter()
            .rev()
            .find(|b| b.series.iter().any(|s| s.name() == name))
            .map(|b| b.series.iter().filter(|s| s.name() == name).cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_shut_down(&self) -> bool {
        self.received.lock().shut_down
    }

    pub fn clear(&self) {
        let mut received = self.received.lock();
        received.metrics.clear();
        received.spans.clear();
    }
}

#[async_trait]
impl TelemetrySink for InMemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn export_metrics(&self, batch: &MetricsBatch) -> TallyResult<()> {
        let mut received = self.received.lock();
        if received.shut_down {
            return Err(TallyError::shutdown("export_metrics"));
        }
        received.metrics.push(batch.clone());
        Ok(())
    }

    async fn export_spans(&self, batch: &SpanBatch) -> TallyResult<()> {
        let mut received = self.received.lock();
        if received.shut_down {
            return Err(TallyError::shutdown("export_spans"));
        }
        received.spans.push(batch.clone());
        Ok(())
    }

    async fn shutdown(&self) -> TallyResult<()> {
        self.received.lock().shut_down = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::resource::Resource;

    #[tokio::test]
    async fn test_records_batches_until_shutdown() {
        let sink = InMemorySink::new();
        let resource = Resource::new("svc", "0.1.0", "test");

        sink.export_metrics(&MetricsBatch::new(resource.clone(), Vec::new()))
            .await
            .unwrap();
        sink.export_spans(&SpanBatch::new(resource.clone(), Vec::new()))
            .await
            .unwrap();
        assert_eq!(sink.metric_batches().len(), 1);
        assert_eq!(sink.span_batches().len(), 1);

        sink.shutdown().await.unwrap();
        assert!(sink.is_shut_down());
        assert!(
            sink.export_metrics(&MetricsBatch::new(resource, Vec::new()))
                .await
                .is_err()
        );
    }
}
