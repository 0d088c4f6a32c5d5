//! CLI argument definitions using clap

use clap::{Parser, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;

/// Which scripted demo to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoType {
    Counter,
    Histogram,
    Gauge,
    Updown,
    Comprehensive,
    All,
}

impl DemoType {
    /// Whether `self` selects `demo`
    pub fn includes(self, demo: DemoType) -> bool {
        self == DemoType::All || self == demo
    }
}

/// Export destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkArg {
    /// POST JSON batches to the endpoint
    Http,
    /// Log batch summaries
    Log,
    /// Keep batches in memory and print a summary at exit
    Memory,
}

impl SinkArg {
    fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Log => "log",
            Self::Memory => "memory",
        }
    }
}

fn parse_speed(value: &str) -> Result<f64, String> {
    let speed: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err("speed must be a positive number".to_string())
    }
}

#[derive(Debug, Parser)]
#[command(name = "tally")]
#[command(about = "Tally - metrics and tracing pipeline demo")]
#[command(
    long_about = r#"Tally - metrics and tracing pipeline demo

Runs scripted workloads that record counters, histograms, gauges and up-down
counters inside spans, and exports them periodically to the configured sink.

EXAMPLES:
  tally                                   # Run every demo, export over HTTP
  tally --demo-type gauge --sink log      # One demo, batches written to the log
  tally --sink memory --speed 10          # Ten times faster, summary at exit

Configuration is read from tally.toml / tally.json / tally.yaml, then TALLY_*
environment variables, then these flags."#
)]
#[command(version)]
pub struct Cli {
    /// Demo to run
    #[arg(long, value_enum, default_value = "all")]
    pub demo_type: DemoType,

    /// Service name for telemetry
    #[arg(long)]
    pub service_name: Option<String>,

    /// Collector base URL
    #[arg(long)]
    pub otlp_endpoint: Option<String>,

    /// Path to configuration file
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Export interval in milliseconds
    #[arg(long)]
    pub export_interval_ms: Option<u64>,

    /// Where exported batches go
    #[arg(long, value_enum)]
    pub sink: Option<SinkArg>,

    /// Time-scale factor for the scripted pauses (2 = twice as fast)
    #[arg(long, default_value = "1.0", value_parser = parse_speed)]
    pub speed: f64,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Flags that override file and environment configuration
    pub fn config_overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(name) = &self.service_name {
            overrides.insert("service_name".to_string(), name.clone());
        }
        if let Some(endpoint) = &self.otlp_endpoint {
            overrides.insert("otlp_endpoint".to_string(), endpoint.clone());
        }
        if let Some(ms) = self.export_interval_ms {
            overrides.insert("export_interval_ms".to_string(), ms.to_string());
        }
        if let Some(sink) = self.sink {
            overrides.insert("sink".to_string(), sink.as_str().to_string());
        }
        if self.verbose {
            overrides.insert("log_level".to_string(), "debug".to_string());
        }
        overrides
    }
}
