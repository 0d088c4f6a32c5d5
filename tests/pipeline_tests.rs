//! End-to-end pipeline tests through the `tally` facade

use std::collections::HashMap;
use std::io::Write;

use tally::config::SinkKind;
use tally::telemetry::{MetricValue, SpanStatus, Temporality};
use tally::{AttributeSet, TallyError, TelemetryPipeline, load_config};

#[tokio::test]
async fn test_file_config_drives_memory_pipeline() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
service_name = "checkout"
environment = "staging"
export_interval = "200ms"
temporality = "delta"
sink = "memory"
"#
    )
    .unwrap();

    let overrides = HashMap::from([("service_version".to_string(), "2.1.0".to_string())]);
    let config = load_config(Some(file.path()), overrides).unwrap();
    assert_eq!(config.sink, SinkKind::Memory);
    assert_eq!(config.temporality, Temporality::Delta);

    let pipeline = TelemetryPipeline::start(config).unwrap();
    let orders = pipeline
        .registry()
        .create_counter("orders_total", "Orders placed", "")
        .unwrap();
    assert_eq!(orders.unit(), "1");
    orders.record(3.0, [("region", "eu")]).unwrap();

    pipeline.shutdown().await.unwrap();

    let sink = pipeline.memory_sink().unwrap();
    let batch = sink.metric_batches().pop().unwrap();
    assert_eq!(batch.resource.service_name, "checkout");
    assert_eq!(batch.resource.service_version, "2.1.0");
    assert_eq!(batch.resource.environment, "staging");
    assert_eq!(
        batch.series[0].value,
        MetricValue::Sum { value: 3.0, monotonic: true }
    );
}

#[tokio::test]
async fn test_in_span_marks_failures() {
    let config = tally::TelemetryConfig {
        sink: SinkKind::Memory,
        ..Default::default()
    };
    let pipeline = TelemetryPipeline::start(config).unwrap();
    let tracker = pipeline.tracker();

    let ok: anyhow::Result<u32> = tracker.in_span("charge_card", |span| {
        span.set_attribute("amount", 42)?;
        Ok(42)
    });
    assert_eq!(ok.unwrap(), 42);

    let failed: anyhow::Result<()> =
        tracker.in_span("refund", |_| Err(anyhow::anyhow!("card expired")));
    assert!(failed.is_err());

    pipeline.shutdown().await.unwrap();
    let spans = pipeline.memory_sink().unwrap().spans();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].status, SpanStatus::Ok);
    assert_eq!(spans[1].status, SpanStatus::Error("card expired".to_string()));
}

#[tokio::test]
async fn test_recording_after_shutdown_is_rejected() {
    let config = tally::TelemetryConfig {
        sink: SinkKind::Memory,
        ..Default::default()
    };
    let pipeline = TelemetryPipeline::start(config).unwrap();
    let gauge = pipeline
        .registry()
        .create_gauge("queue_depth", "Queue depth", "1")
        .unwrap();
    gauge.record(7.0, AttributeSet::new()).unwrap();

    pipeline.shutdown().await.unwrap();
    pipeline.shutdown().await.unwrap();
    assert!(pipeline.is_shut_down());

    let err = gauge.record(8.0, AttributeSet::new()).unwrap_err();
    assert!(matches!(err, TallyError::ManagerShutdown { .. }));

    let sink = pipeline.memory_sink().unwrap();
    assert_eq!(sink.find_series("queue_depth")[0].value.as_f64(), 7.0);
}

#[tokio::test]
async fn test_exported_batches_serialize_to_json() {
    let config = tally::TelemetryConfig {
        sink: SinkKind::Memory,
        ..Default::default()
    };
    let pipeline = TelemetryPipeline::start(config).unwrap();
    let latency = pipeline
        .registry()
        .create_histogram("latency_seconds", "Request latency", "s")
        .unwrap();
    latency.record(0.03, [("route", "/health")]).unwrap();
    latency.record(0.7, [("route", "/health")]).unwrap();
    pipeline.shutdown().await.unwrap();

    let batch = pipeline.memory_sink().unwrap().metric_batches().pop().unwrap();
    let json = serde_json::to_value(&batch).unwrap();
    let series = &json["series"][0];
    assert_eq!(series["descriptor"]["name"], "latency_seconds");
    assert_eq!(series["value"]["type"], "histogram");
    assert_eq!(series["value"]["count"], 2);
}
