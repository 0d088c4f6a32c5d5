//! Sink that writes batches to the log

use async_trait::async_trait;
use tracing::{debug, info};

use super::{MetricsBatch, SpanBatch, TelemetrySink};
use crate::error::TallyResult;
use crate::telemetry::metrics::MetricValue;

/// Logs each exported series and span through `tracing`.
///
/// Summaries go out at `info`, full per-series lines at `debug` unless `verbose`
/// is set.
#[derive(Debug, Clone, Default)]
pub struct LoggingSink {
    verbose: bool,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn describe(value: &MetricValue) -> String {
        match value {
            MetricValue::Sum { value, .. } => format!("sum={value}"),
            MetricValue::Gauge { value } => format!("gauge={value}"),
            MetricValue::Histogram(h) => format!(
                "count={} sum={:.4} min={:.4} max={:.4} mean={:.4}",
                h.count,
                h.sum,
                h.min,
                h.max,
                h.mean()
            ),
        }
    }
}

#[async_trait]
impl TelemetrySink for LoggingSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn export_metrics(&self, batch: &MetricsBatch) -> TallyResult<()> {
        info!(
            service = %batch.resource.service_name,
            series = batch.len(),
            "Exporting metrics"
        );
        for series in &batch.series {
            let line = Self::describe(&series.value);
            if self.verbose {
                info!(metric = %series.name(), attributes = %series.attributes, "{}", line);
            } else {
                debug!(metric = %series.name(), attributes = %series.attributes, "{}", line);
            }
        }
        Ok(())
    }

    async fn export_spans(&self, batch: &SpanBatch) -> TallyResult<()> {
        info!(
            service = %batch.resource.service_name,
            spans = batch.len(),
            "Exporting spans"
        );
        for span in &batch.spans {
            let millis = span.duration().num_microseconds().unwrap_or(i64::MAX) as f64 / 1000.0;
            if self.verbose {
                info!(trace_id = %span.trace_id, span_id = %span.span_id, status = ?span.status, "{} took {:.3}ms", span.name, millis);
            } else {
                debug!(trace_id = %span.trace_id, span_id = %span.span_id, status = ?span.status, "{} took {:.3}ms", span.name, millis);
            }
        }
        Ok(())
    }
}
