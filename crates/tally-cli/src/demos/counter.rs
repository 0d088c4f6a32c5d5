//! Counter demo: a stream of typed events

use std::time::Duration;

use tally_core::error::TallyResult;
use tracing::info;

use super::DemoContext;

const EVENTS: [&str; 4] = ["user_login", "user_logout", "page_view", "api_call"];
const ITERATIONS: usize = 20;

pub async fn run(ctx: &DemoContext) -> TallyResult<()> {
    info!("=== Counter Metrics Demo ===");
    let span = ctx.tracker.start_span("counter_demo")?;
    let counter = ctx
        .registry
        .create_counter("demo_events_total", "Total number of demo events", "1")?;

    for event_type in EVENTS.iter().cycle().take(ITERATIONS) {
        counter.record(1.0, [("event_type", *event_type)])?;
        info!("Recorded counter event: {}", event_type);
        ctx.pace.sleep(Duration::from_millis(500)).await;
    }

    span.set_attribute("events_generated", ITERATIONS)?;
    Ok(())
}
