//! Histogram demo: operation durations drawn per operation type

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use tally_core::error::{TallyError, TallyResult};
use tracing::info;

use super::DemoContext;

/// (operation, mean seconds, standard deviation)
const OPERATIONS: [(&str, f64, f64); 4] = [
    ("database_query", 0.1, 0.05),
    ("api_call", 0.2, 0.1),
    ("file_processing", 0.5, 0.2),
    ("calculation", 0.05, 0.02),
];
const ITERATIONS: usize = 15;
const MIN_DURATION: f64 = 0.01;

pub async fn run(ctx: &DemoContext) -> TallyResult<()> {
    info!("=== Histogram Metrics Demo ===");
    let span = ctx.tracker.start_span("histogram_demo")?;
    let histogram = ctx.registry.create_histogram(
        "demo_operation_duration_seconds",
        "Duration of demo operations",
        "s",
    )?;

    let mut rng = StdRng::from_rng(&mut rand::rng());
    for &(operation, mean, std_dev) in OPERATIONS.iter().cycle().take(ITERATIONS) {
        let normal = Normal::new(mean, std_dev)
            .map_err(|e| TallyError::invalid_value(operation, std_dev, e.to_string()))?;
        let duration = normal.sample(&mut rng).abs().max(MIN_DURATION);

        histogram.record(duration, [("operation", operation)])?;
        info!("Recorded histogram: {} took {:.3}s", operation, duration);
        ctx.pace.sleep(Duration::from_millis(300)).await;
    }

    span.set_attribute("operations_completed", ITERATIONS)?;
    Ok(())
}
