//! Comprehensive demo: a simulated web server next to a system-metrics sampler
//!
//! The web server runs as its own task with its own span stack while the sampler
//! runs on the demo task. Both record into one shared set of workload instruments.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tally_core::error::TallyResult;
use tally_core::telemetry::{AttributeSet, Instrument, MetricsRegistry, SpanTracker};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use super::{DemoContext, Pace};

const WEB_REQUESTS: usize = 20;
const SYSTEM_DURATION: Duration = Duration::from_secs(25);
const SAMPLE_EVERY: Duration = Duration::from_secs(2);
const ERROR_RATE: f64 = 0.1;

const METHODS: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];
const STATUSES: [&str; 3] = ["200", "404", "500"];
const ENDPOINTS: [&str; 3] = ["/api/users", "/api/orders", "/api/products"];
const CONNECTION_CHANGES: [i32; 6] = [-2, -1, 0, 1, 2, 3];
const QUEUE_CHANGES: [i32; 8] = [-3, -2, -1, 0, 1, 2, 3, 4];

/// Instruments shared by the web server and the system sampler
#[derive(Debug, Clone)]
struct Workload {
    requests: Instrument,
    errors: Instrument,
    request_duration: Instrument,
    task_duration: Instrument,
    memory: Instrument,
    cpu: Instrument,
    connections: Instrument,
    queue: Instrument,
}

impl Workload {
    fn register(registry: &MetricsRegistry) -> TallyResult<Self> {
        Ok(Self {
            requests: registry.create_counter("http_requests_total", "Total number of HTTP requests", "1")?,
            errors: registry.create_counter("errors_total", "Total number of errors", "1")?,
            request_duration: registry.create_histogram(
                "http_request_duration_seconds",
                "Duration of HTTP requests",
                "s",
            )?,
            task_duration: registry.create_histogram(
                "task_processing_duration_seconds",
                "Time taken to process tasks",
                "s",
            )?,
            memory: registry.create_gauge("memory_usage_bytes", "Current memory usage", "By")?,
            cpu: registry.create_gauge("cpu_usage_percent", "Current CPU usage percentage", "%")?,
            connections: registry.create_up_down_counter(
                "active_connections",
                "Number of active connections",
                "1",
            )?,
            queue: registry.create_up_down_counter(
                "queue_size",
                "Number of items in processing queue",
                "1",
            )?,
        })
    }
}

/// Aborts the task when dropped, so an interrupted demo does not leave it running
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub async fn run(ctx: &DemoContext) -> TallyResult<()> {
    info!("=== Comprehensive Metrics Demo ===");
    let span = ctx.tracker.start_span("comprehensive_demo")?;
    let workload = Workload::register(&ctx.registry)?;

    let server = {
        let workload = workload.clone();
        let tracker = ctx.tracker.clone();
        let pace = ctx.pace;
        AbortOnDrop(tokio::spawn(SpanTracker::scope(async move {
            simulate_web_server(&workload, &tracker, pace, WEB_REQUESTS).await
        })))
    };

    let sampled = simulate_system_metrics(&workload, ctx.pace, SYSTEM_DURATION).await;

    let mut server = server;
    match (&mut server.0).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Web server simulation stopped early: {}", e),
        Err(e) => warn!("Web server task failed: {}", e),
    }
    sampled?;

    span.set_attribute("demo_type", "comprehensive")?;
    Ok(())
}

async fn simulate_web_server(
    workload: &Workload,
    tracker: &SpanTracker,
    pace: Pace,
    num_requests: usize,
) -> TallyResult<()> {
    info!("Simulating {} web server requests", num_requests);
    let mut rng = StdRng::from_rng(&mut rand::rng());

    for i in 0..num_requests {
        let processing_time = rng.random_range(0.1..2.0);
        let attributes = AttributeSet::new()
            .with("method", pick(&METHODS, &mut rng))
            .with("status", pick(&STATUSES, &mut rng))
            .with("endpoint", pick(&ENDPOINTS, &mut rng));

        let request = tracker.start_span_with("http_request", attributes.clone())?;
        pace.sleep(Duration::from_secs_f64(processing_time)).await;

        workload.requests.record(1.0, attributes.clone())?;
        workload.request_duration.record(processing_time, attributes)?;

        if rng.random_bool(ERROR_RATE) {
            workload
                .errors
                .record(1.0, [("error_type", "timeout"), ("service", "database")])?;
            request.record_error(&"database timeout")?;
        }
        request.end();

        info!(
            "Processed request {}/{} in {:.2}s",
            i + 1,
            num_requests,
            processing_time
        );
    }
    Ok(())
}

async fn simulate_system_metrics(
    workload: &Workload,
    pace: Pace,
    duration: Duration,
) -> TallyResult<()> {
    info!("Simulating system metrics for {} seconds", duration.as_secs());
    let mut rng = StdRng::from_rng(&mut rand::rng());
    let deadline = Instant::now() + pace.scale(duration);

    while Instant::now() < deadline {
        let timer = workload.task_duration.start_timer([("task", "system_sample")]);

        workload
            .memory
            .record(rng.random_range(1_000_000_000.0..4_000_000_000.0), AttributeSet::new())?;
        workload
            .cpu
            .record(rng.random_range(10.0..90.0), AttributeSet::new())?;
        workload
            .connections
            .record(f64::from(pick(&CONNECTION_CHANGES, &mut rng)), AttributeSet::new())?;
        workload
            .queue
            .record(f64::from(pick(&QUEUE_CHANGES, &mut rng)), AttributeSet::new())?;

        timer.stop()?;
        pace.sleep(SAMPLE_EVERY).await;
    }

    info!("System metrics simulation completed");
    Ok(())
}

fn pick<T: Copy>(choices: &[T], rng: &mut StdRng) -> T {
    choices[rng.random_range(0..choices.len())]
}
