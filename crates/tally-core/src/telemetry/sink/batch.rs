//! Export batches

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::telemetry::metrics::SeriesSnapshot;
use crate::telemetry::resource::Resource;
use crate::telemetry::trace::SpanData;

/// Every series collected in one export cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsBatch {
    pub resource: Resource,
    pub series: Vec<SeriesSnapshot>,
    pub timestamp: DateTime<Utc>,
}

impl MetricsBatch {
    pub fn new(resource: Resource, series: Vec<SeriesSnapshot>) -> Self {
        Self {
            resource,
            series,
            timestamp: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Finished spans drained in one export cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanBatch {
    pub resource: Resource,
    pub spans: Vec<SpanData>,
}

impl SpanBatch {
    pub fn new(resource: Resource, spans: Vec<SpanData>) -> Self {
        Self { resource, spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}
