//! Gauge demo: temperature and pressure random walks

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tally_core::error::TallyResult;
use tracing::info;

use super::DemoContext;

const ITERATIONS: usize = 10;

pub async fn run(ctx: &DemoContext) -> TallyResult<()> {
    info!("=== Gauge Metrics Demo ===");
    let span = ctx.tracker.start_span("gauge_demo")?;
    let temperature = ctx
        .registry
        .create_gauge("demo_temperature_celsius", "Current temperature", "Cel")?;
    let pressure = ctx.registry.create_gauge(
        "demo_pressure_hpa",
        "Current atmospheric pressure",
        "hPa",
    )?;

    let mut rng = StdRng::from_rng(&mut rand::rng());
    let mut base_temp = 20.0_f64;
    let mut base_pressure = 1013.25_f64;

    for _ in 0..ITERATIONS {
        base_temp += rng.random_range(-2.0..=2.0);
        temperature.record(base_temp, [("location", "sensor_1")])?;

        base_pressure += rng.random_range(-5.0..=5.0);
        pressure.record(base_pressure, [("location", "sensor_1")])?;

        info!(
            "Updated gauges: temp={:.1}°C, pressure={:.1}hPa",
            base_temp, base_pressure
        );
        ctx.pace.sleep(Duration::from_secs(1)).await;
    }

    span.set_attribute("gauge_updates", ITERATIONS)?;
    Ok(())
}
