//! Console output for the demo driver

use colored::*;
use tally_core::config::TelemetryConfig;
use tally_core::telemetry::metrics::ExportStatsSnapshot;
use tally_core::telemetry::{InMemorySink, InstrumentDescriptor};

/// Formatted, colored console output
pub struct Console {
    verbose: bool,
}

impl Console {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn info(&self, message: &str) {
        if self.verbose {
            println!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message.green());
    }

    pub fn warn(&self, message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn print_header(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
        println!("{}", "=".repeat(title.chars().count()).dimmed());
    }

    pub fn print_config(&self, config: &TelemetryConfig) {
        self.print_header("Tally telemetry demo");
        println!("  {:<12} {}", "service".dimmed(), config.service_name);
        println!("  {:<12} {}", "version".dimmed(), config.service_version);
        println!("  {:<12} {}", "environment".dimmed(), config.environment);
        println!("  {:<12} {}", "sink".dimmed(), config.sink);
        println!("  {:<12} {}", "endpoint".dimmed(), config.otlp_endpoint);
        println!(
            "  {:<12} {}ms",
            "interval".dimmed(),
            config.export_interval.as_millis()
        );
    }

    pub fn print_instruments(&self, instruments: &[InstrumentDescriptor]) {
        self.print_header("Instruments");
        for descriptor in instruments {
            println!(
                "  {:<40} {:<16} {}",
                descriptor.name.cyan(),
                descriptor.kind.to_string(),
                descriptor.unit.dimmed()
            );
            if self.verbose && !descriptor.description.is_empty() {
                println!("    {}", descriptor.description.dimmed());
            }
        }
    }

    pub fn print_stats(&self, stats: &ExportStatsSnapshot) {
        self.print_header("Export statistics");
        println!(
            "  metric batches  {} ok, {} failed ({} series)",
            stats.metric_exports.to_string().green(),
            colour_failures(stats.metric_failures),
            stats.series_exported
        );
        println!(
            "  span batches    {} ok, {} failed ({} spans)",
            stats.span_exports.to_string().green(),
            colour_failures(stats.span_failures),
            stats.spans_exported
        );
        if let Some(last) = stats.last_success {
            println!("  last success    {}", last.format("%H:%M:%S%.3f"));
        }
    }

    pub fn print_memory_summary(&self, sink: &InMemorySink) {
        self.print_header("Final batch");
        for series in sink.latest_series() {
            println!(
                "  {} {} {}",
                series.name().cyan(),
                series.attributes.to_string().dimmed(),
                describe(&series.value)
            );
        }
        println!("  {} spans captured", sink.spans().len());
    }
}

fn colour_failures(count: u64) -> ColoredString {
    if count == 0 {
        count.to_string().normal()
    } else {
        count.to_string().red()
    }
}

fn describe(value: &tally_core::telemetry::MetricValue) -> String {
    use tally_core::telemetry::MetricValue;
    match value {
        MetricValue::Sum { value, .. } => format!("{value}"),
        MetricValue::Gauge { value } => format!("{value:.2}"),
        MetricValue::Histogram(h) => format!("count={} mean={:.3}", h.count, h.mean()),
    }
}
