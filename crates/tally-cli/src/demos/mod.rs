//! Scripted workloads
//!
//! Each demo creates its instruments, records synthetic values on a timer inside a
//! span, and tags the span with a summary attribute when it finishes.

mod comprehensive;
mod counter;
mod gauge;
mod histogram;
mod updown;

use std::sync::Arc;
use std::time::Duration;

use tally_core::error::TallyResult;
use tally_core::telemetry::{MetricsRegistry, SpanTracker};
use tracing::info;

use crate::args::DemoType;

const PAUSE_BETWEEN_DEMOS: Duration = Duration::from_secs(2);

/// Time-scale factor for the scripted sleeps
#[derive(Debug, Clone, Copy)]
pub struct Pace(f64);

impl Pace {
    pub fn new(speed: f64) -> Self {
        Self(if speed.is_finite() && speed > 0.0 { speed } else { 1.0 })
    }

    pub fn scale(self, duration: Duration) -> Duration {
        duration.div_f64(self.0)
    }

    pub async fn sleep(self, duration: Duration) {
        tokio::time::sleep(self.scale(duration)).await;
    }
}

/// What the demos record into
#[derive(Debug, Clone)]
pub struct DemoContext {
    pub registry: Arc<MetricsRegistry>,
    pub tracker: SpanTracker,
    pub pace: Pace,
}

/// Run the selected demos in order, pausing between them
pub async fn run(demo_type: DemoType, ctx: &DemoContext) -> TallyResult<()> {
    SpanTracker::scope(async {
        if demo_type.includes(DemoType::Counter) {
            counter::run(ctx).await?;
            ctx.pace.sleep(PAUSE_BETWEEN_DEMOS).await;
        }
        if demo_type.includes(DemoType::Histogram) {
            histogram::run(ctx).await?;
            ctx.pace.sleep(PAUSE_BETWEEN_DEMOS).await;
        }
        if demo_type.includes(DemoType::Gauge) {
            gauge::run(ctx).await?;
            ctx.pace.sleep(PAUSE_BETWEEN_DEMOS).await;
        }
        if demo_type.includes(DemoType::Updown) {
            updown::run(ctx).await?;
            ctx.pace.sleep(PAUSE_BETWEEN_DEMOS).await;
        }
        if demo_type.includes(DemoType::Comprehensive) {
            comprehensive::run(ctx).await?;
        }
        info!("Demo completed successfully");
        Ok(())
    })
    .await
}

#[cfg(test)]
pub(crate) fn test_context() -> DemoContext {
    DemoContext {
        registry: Arc::new(MetricsRegistry::new()),
        tracker: SpanTracker::new(),
        pace: Pace::new(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pace_scales_sleeps() {
        assert_eq!(Pace::new(2.0).scale(Duration::from_secs(1)), Duration::from_millis(500));
        assert_eq!(Pace::new(0.0).scale(Duration::from_secs(1)), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_demo_selection() {
        let ctx = test_context();
        run(DemoType::Counter, &ctx).await.unwrap();

        let names: Vec<_> = ctx
            .registry
            .list_instruments()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["demo_events_total"]);
    }
}
