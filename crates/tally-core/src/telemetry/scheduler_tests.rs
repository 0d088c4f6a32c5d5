use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::Sequence;

use super::*;
use crate::telemetry::attributes::AttributeSet;
use crate::telemetry::metrics::MetricValue;
use crate::telemetry::sink::{InMemorySink, MockTelemetrySink};

const INTERVAL: Duration = Duration::from_millis(5000);

fn resource() -> Resource {
    Resource::new("scheduler-test", "0.1.0", "test")
}

fn config() -> SchedulerConfig {
    SchedulerConfig {
        interval: INTERVAL,
        export_timeout: Duration::from_secs(1),
    }
}

fn scheduler_with(sink: Arc<dyn TelemetrySink>) -> (ExportScheduler, Arc<MetricsRegistry>, SpanTracker) {
    let registry = Arc::new(MetricsRegistry::new());
    let tracker = SpanTracker::new();
    let scheduler = ExportScheduler::new(
        Arc::clone(&registry),
        tracker.clone(),
        sink,
        resource(),
        config(),
    );
    (scheduler, registry, tracker)
}

#[tokio::test(start_paused = true)]
async fn test_exports_on_each_tick() {
    let sink = Arc::new(InMemorySink::new());
    let (scheduler, registry, _) = scheduler_with(sink.clone());
    let requests = registry.create_counter("requests_total", "Requests", "1").unwrap();

    assert_eq!(scheduler.state(), SchedulerState::Idle);
    scheduler.start().unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Running);

    requests.record(2.0, [("method", "GET")]).unwrap();
    tokio::time::sleep(INTERVAL / 2).await;
    assert!(sink.metric_batches().is_empty());

    tokio::time::sleep(INTERVAL / 2 + Duration::from_millis(100)).await;
    assert_eq!(sink.metric_batches().len(), 1);

    requests.record(3.0, [("method", "GET")]).unwrap();
    tokio::time::sleep(INTERVAL).await;
    let batches = sink.metric_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1].series[0].value.as_f64(), 5.0);
    assert_eq!(batches[1].resource.service_name, "scheduler-test");

    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_spans_exported_on_same_tick() {
    let sink = Arc::new(InMemorySink::new());
    let (scheduler, _, tracker) = scheduler_with(sink.clone());
    scheduler.start().unwrap();

    tracker.start_span("checkout").unwrap().end();
    tokio::time::sleep(INTERVAL + Duration::from_millis(100)).await;

    let spans = sink.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "checkout");
    assert_eq!(tracker.pending_len(), 0);
    assert_eq!(scheduler.stats().spans_exported, 1);

    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_failed_batch_is_dropped_and_next_tick_proceeds() {
    let mut sink = MockTelemetrySink::new();
    let mut seq = Sequence::new();
    sink.expect_name().return_const("mock");
    sink.expect_export_metrics()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(TallyError::export_failure("collector down")));
    sink.expect_export_metrics()
        .times(2)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    sink.expect_shutdown().times(1).returning(|| Ok(()));

    let (scheduler, registry, _) = scheduler_with(Arc::new(sink));
    let gauge = registry.create_gauge("temperature", "Temperature", "Cel").unwrap();
    gauge.record(21.5, AttributeSet::new()).unwrap();
    scheduler.start().unwrap();

    tokio::time::sleep(INTERVAL + Duration::from_millis(100)).await;
    let stats = scheduler.stats();
    assert_eq!(stats.metric_failures, 1);
    assert_eq!(stats.metric_exports, 0);

    tokio::time::sleep(INTERVAL).await;
    let stats = scheduler.stats();
    assert_eq!(stats.metric_exports, 1);
    assert!(stats.last_success.is_some());

    // the final flush is the second successful export
    scheduler.stop().await.unwrap();
    assert_eq!(scheduler.stats().metric_exports, 2);
}

struct StallingSink;

#[async_trait]
impl TelemetrySink for StallingSink {
    fn name(&self) -> &'static str {
        "stalling"
    }

    async fn export_metrics(&self, _batch: &MetricsBatch) -> TallyResult<()> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }

    async fn export_spans(&self, _batch: &SpanBatch) -> TallyResult<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_export_timeout_counts_as_failure() {
    let (scheduler, registry, _) = scheduler_with(Arc::new(StallingSink));
    registry
        .create_up_down_counter("pool_size", "Pool", "1")
        .unwrap()
        .record(4.0, AttributeSet::new())
        .unwrap();
    scheduler.start().unwrap();

    let err = scheduler.force_flush().await.unwrap_err();
    match err {
        TallyError::ExportFailure { message, target } => {
            assert!(message.contains("timed out"));
            assert_eq!(target.as_deref(), Some("stalling"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(scheduler.stats().metric_failures, 1);
}

#[tokio::test]
async fn test_sink_http_error_becomes_export_failure() {
    let mut sink = MockTelemetrySink::new();
    sink.expect_name().return_const("http");
    sink.expect_export_metrics()
        .times(1)
        .returning(|_| Err(TallyError::http("collector returned 503", Some(503))));
    sink.expect_shutdown().returning(|| Ok(()));

    let (scheduler, registry, _) = scheduler_with(Arc::new(sink));
    registry
        .create_counter("requests_total", "Requests", "1")
        .unwrap()
        .record(1.0, AttributeSet::new())
        .unwrap();

    let err = scheduler.force_flush().await.unwrap_err();
    match err {
        TallyError::ExportFailure { message, target } => {
            assert!(message.contains("503"));
            assert_eq!(target.as_deref(), Some("http"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(scheduler.stats().metric_failures, 1);
}

#[tokio::test]
async fn test_stop_flushes_everything_recorded_before_it() {
    let sink = Arc::new(InMemorySink::new());
    let (scheduler, registry, tracker) = scheduler_with(sink.clone());
    let requests = registry.create_counter("requests_total", "Requests", "1").unwrap();
    let latency = registry.create_histogram("latency", "Latency", "s").unwrap();
    scheduler.start().unwrap();

    for _ in 0..10 {
        requests.record(1.0, [("method", "GET")]).unwrap();
        latency.record(0.2, AttributeSet::new()).unwrap();
    }
    tracker.start_span("shutdown-path").unwrap().end();

    scheduler.stop().await.unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert!(sink.is_shut_down());

    let series = sink.latest_series();
    let total = series.iter().find(|s| s.name() == "requests_total").unwrap();
    assert_eq!(total.value, MetricValue::Sum { value: 10.0, monotonic: true });
    let hist = series.iter().find(|s| s.name() == "latency").unwrap();
    assert_eq!(hist.value.as_histogram().unwrap().count, 10);
    assert_eq!(sink.spans().len(), 1);

    assert!(matches!(
        requests.record(1.0, [("method", "GET")]),
        Err(TallyError::ManagerShutdown { .. })
    ));
    assert!(matches!(
        registry.record("requests_total", 1.0, AttributeSet::new()),
        Err(TallyError::ManagerShutdown { .. })
    ));
    assert!(matches!(
        tracker.start_span("late"),
        Err(TallyError::ManagerShutdown { .. })
    ));
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let mut sink = MockTelemetrySink::new();
    sink.expect_name().return_const("mock");
    sink.expect_shutdown().times(1).returning(|| Ok(()));

    let (scheduler, _, _) = scheduler_with(Arc::new(sink));
    scheduler.start().unwrap();

    scheduler.stop().await.unwrap();
    scheduler.stop().await.unwrap();
    assert!(scheduler.is_stopped());
    assert!(matches!(
        scheduler.force_flush().await,
        Err(TallyError::ManagerShutdown { .. })
    ));
    assert!(matches!(scheduler.start(), Err(TallyError::ManagerShutdown { .. })));
}

#[tokio::test]
async fn test_stop_without_start_still_flushes() {
    let sink = Arc::new(InMemorySink::new());
    let (scheduler, registry, _) = scheduler_with(sink.clone());
    registry
        .create_counter("jobs", "Jobs", "1")
        .unwrap()
        .record(1.0, AttributeSet::new())
        .unwrap();

    scheduler.stop().await.unwrap();
    assert_eq!(sink.metric_batches().len(), 1);
}

#[test]
fn test_start_requires_runtime() {
    let (scheduler, _, _) = scheduler_with(Arc::new(InMemorySink::new()));
    assert!(matches!(scheduler.start(), Err(TallyError::Config { .. })));
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}
