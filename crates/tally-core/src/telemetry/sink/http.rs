//! Sink that POSTs batches as JSON to a collector

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use super::{MetricsBatch, SpanBatch, TelemetrySink};
use crate::error::{TallyError, TallyResult};

const METRICS_PATH: &str = "/v1/metrics";
const TRACES_PATH: &str = "/v1/traces";

/// POSTs each batch to `{endpoint}/v1/metrics` or `{endpoint}/v1/traces`.
///
/// Any transport error or non-2xx response is a [`TallyError::Http`] carrying the
/// response status when there is one. Retrying is left to the next export cycle.
#[derive(Debug, Clone)]
pub struct HttpJsonSink {
    http_client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpJsonSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_timeout(endpoint, Duration::from_secs(10))
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn metrics_url(&self) -> String {
        format!("{}{}", self.endpoint, METRICS_PATH)
    }

    pub fn traces_url(&self) -> String {
        format!("{}{}", self.endpoint, TRACES_PATH)
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> TallyResult<()> {
        debug!("Posting telemetry batch to {}", url);

        let response = self
            .http_client
            .post(url)
            .json(body)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Collector rejected batch: {} - {}", status, error_text);
            return Err(TallyError::http(
                format!("{} returned {}: {}", url, status, error_text),
                Some(status.as_u16()),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl TelemetrySink for HttpJsonSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn export_metrics(&self, batch: &MetricsBatch) -> TallyResult<()> {
        self.post(&self.metrics_url(), batch).await
    }

    async fn export_spans(&self, batch: &SpanBatch) -> TallyResult<()> {
        self.post(&self.traces_url(), batch).await
    }
}
