//! Up-down counter demo: a resource pool that grows and shrinks

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tally_core::error::TallyResult;
use tracing::info;

use super::DemoContext;

const ITERATIONS: usize = 15;

pub async fn run(ctx: &DemoContext) -> TallyResult<()> {
    info!("=== UpDownCounter Metrics Demo ===");
    let span = ctx.tracker.start_span("updown_counter_demo")?;
    let pool = ctx.registry.create_up_down_counter(
        "demo_resource_pool",
        "Available resources in pool",
        "1",
    )?;

    let mut rng = StdRng::from_rng(&mut rand::rng());
    for _ in 0..ITERATIONS {
        // 60% allocate, 40% release
        let (change, action): (i32, &str) = if rng.random_bool(0.6) {
            (rng.random_range(1..=5), "allocated")
        } else {
            (-rng.random_range(1..=3), "deallocated")
        };

        pool.record(f64::from(change), [("resource_type", "compute_units")])?;
        info!("Resource change: {} {} units", action, change.abs());
        ctx.pace.sleep(Duration::from_millis(400)).await;
    }

    span.set_attribute("resource_operations", ITERATIONS)?;
    Ok(())
}
