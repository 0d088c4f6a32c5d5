//! Export destinations
//!
//! The scheduler hands every collected batch to a [`TelemetrySink`]. Sinks never see
//! live instruments, only snapshots, so a slow or failing backend cannot block recording.

mod batch;
mod http;
mod logging;
mod memory;

use async_trait::async_trait;

use crate::error::TallyResult;

pub use batch::{MetricsBatch, SpanBatch};
pub use http::HttpJsonSink;
pub use logging::LoggingSink;
pub use memory::InMemorySink;

/// Destination for exported telemetry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn export_metrics(&self, batch: &MetricsBatch) -> TallyResult<()>;

    async fn export_spans(&self, batch: &SpanBatch) -> TallyResult<()>;

    /// Release resources. Called once, after the final flush.
    async fn shutdown(&self) -> TallyResult<()> {
        Ok(())
    }
}
