//! Tally demo driver
//!
//! Builds a telemetry pipeline from configuration, runs scripted workloads that
//! record metrics inside spans, and shuts the pipeline down cleanly on completion
//! or Ctrl+C.
//!
//! ```bash
//! tally --demo-type comprehensive --sink log --speed 5
//! ```

mod args;
mod console;
mod demos;
mod logging;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tally_core::config::{SinkKind, load_config};
use tally_core::telemetry::{LoggingSink, TelemetryPipeline};
use tracing::{error, info};

use crate::args::Cli;
use crate::console::Console;
use crate::demos::{DemoContext, Pace};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config_file.as_deref(), cli.config_overrides())
        .context("Failed to load configuration")?;
    logging::init_logging(&config.logging)?;

    let console = Console::new(cli.verbose);
    console.print_config(&config);

    let log_sink = config.sink == SinkKind::Log;
    let mut builder = TelemetryPipeline::builder(config);
    if log_sink {
        builder = builder.with_sink(Arc::new(LoggingSink::new().verbose(cli.verbose)));
    }
    let pipeline = builder
        .start()
        .context("Failed to start telemetry pipeline")?;

    let ctx = DemoContext {
        registry: Arc::clone(pipeline.registry()),
        tracker: pipeline.tracker().clone(),
        pace: Pace::new(cli.speed),
    };
    console.info(&format!(
        "Running {:?} demo at {}x speed",
        cli.demo_type, cli.speed
    ));

    tokio::select! {
        result = demos::run(cli.demo_type, &ctx) => {
            if let Err(e) = result {
                error!("Error during demo: {}", e);
                console.warn(&format!("Demo failed: {}", e));
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Demo interrupted by user");
            console.warn("Interrupted, shutting down");
        }
    }

    info!("Shutting down telemetry pipeline...");
    if let Err(e) = pipeline.shutdown().await {
        console.warn(&format!("Final export failed: {}", e));
    }
    console.success("Shutdown completed");

    console.print_instruments(&pipeline.registry().list_instruments());
    console.print_stats(&pipeline.stats());
    if let Some(sink) = pipeline.memory_sink() {
        console.print_memory_summary(sink);
    }
    Ok(())
}
