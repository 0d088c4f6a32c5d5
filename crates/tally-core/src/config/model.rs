//! Telemetry configuration model

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::logging_config::{LogFormat, LoggingConfig};
use crate::error::{TallyError, TallyResult};
use crate::telemetry::metrics::Temporality;

/// Where exported batches go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// POST JSON batches to the configured endpoint
    #[default]
    Http,
    /// Write batch summaries to the log
    Log,
    /// Keep batches in memory
    Memory,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Log => write!(f, "log"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for SinkKind {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "log" => Ok(Self::Log),
            "memory" => Ok(Self::Memory),
            other => Err(TallyError::config(format!(
                "Unknown sink '{}', expected http, log or memory",
                other
            ))),
        }
    }
}

pub(crate) fn parse_temporality(s: &str) -> TallyResult<Temporality> {
    match s.to_ascii_lowercase().as_str() {
        "cumulative" => Ok(Temporality::Cumulative),
        "delta" => Ok(Temporality::Delta),
        other => Err(TallyError::config(format!(
            "Unknown temporality '{}', expected cumulative or delta",
            other
        ))),
    }
}

/// Pipeline configuration, consumed once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    /// Deployment environment (development, staging, production, ...)
    pub environment: String,
    /// Collector base URL; the HTTP sink appends `/v1/metrics` and `/v1/traces`
    pub otlp_endpoint: String,
    #[serde(with = "humantime_serde")]
    pub export_interval: Duration,
    /// Upper bound on a single sink call
    #[serde(with = "humantime_serde")]
    pub export_timeout: Duration,
    pub temporality: Temporality,
    pub sink: SinkKind,
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "tally-demo".to_string(),
            service_version: "0.1.0".to_string(),
            environment: "development".to_string(),
            otlp_endpoint: "http://localhost:4318".to_string(),
            export_interval: Duration::from_millis(5000),
            export_timeout: Duration::from_secs(10),
            temporality: Temporality::Cumulative,
            sink: SinkKind::Http,
            logging: LoggingConfig::default(),
        }
    }
}

/// Partial configuration produced by one source. Unset fields leave the
/// accumulated configuration untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    pub service_name: Option<String>,
    pub service_version: Option<String>,
    pub environment: Option<String>,
    pub otlp_endpoint: Option<String>,
    #[serde(with = "humantime_serde::option")]
    pub export_interval: Option<Duration>,
    #[serde(with = "humantime_serde::option")]
    pub export_timeout: Option<Duration>,
    pub temporality: Option<Temporality>,
    pub sink: Option<SinkKind>,
    pub logging: Option<LoggingPatch>,
}

/// Partial logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPatch {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Set one field from a `key = value` string pair.
    ///
    /// Keys are the snake_case field names, with durations given as
    /// `export_interval_ms` / `export_timeout_ms` and logging as `log_level` /
    /// `log_format`. `origin` names the source in error messages.
    pub fn set(&mut self, key: &str, value: &str, origin: &str) -> TallyResult<()> {
        let invalid = |what: &str| {
            TallyError::config_with_context(
                format!("Invalid {} value '{}'", what, value),
                format!("Parsing '{}' from {}", key, origin),
            )
        };

        match key {
            "service_name" => self.service_name = Some(value.to_string()),
            "service_version" => self.service_version = Some(value.to_string()),
            "environment" => self.environment = Some(value.to_string()),
            "otlp_endpoint" => self.otlp_endpoint = Some(value.to_string()),
            "export_interval_ms" => {
                let ms: u64 = value.parse().map_err(|_| invalid("export interval"))?;
                self.export_interval = Some(Duration::from_millis(ms));
            }
            "export_timeout_ms" => {
                let ms: u64 = value.parse().map_err(|_| invalid("export timeout"))?;
                self.export_timeout = Some(Duration::from_millis(ms));
            }
            "temporality" => self.temporality = Some(parse_temporality(value)?),
            "sink" => self.sink = Some(value.parse()?),
            "log_level" => self.logging.get_or_insert_with(Default::default).level = Some(value.to_string()),
            "log_format" => {
                self.logging.get_or_insert_with(Default::default).format = Some(value.parse()?)
            }
            other => {
                tracing::debug!(key = other, origin, "Ignoring unknown configuration key");
            }
        }
        Ok(())
    }
}

impl TelemetryConfig {
    /// Apply every field the patch sets
    pub fn merge(&mut self, patch: ConfigPatch) {
        if let Some(service_name) = patch.service_name {
            self.service_name = service_name;
        }
        if let Some(service_version) = patch.service_version {
            self.service_version = service_version;
        }
        if let Some(environment) = patch.environment {
            self.environment = environment;
        }
        if let Some(endpoint) = patch.otlp_endpoint {
            self.otlp_endpoint = endpoint;
        }
        if let Some(interval) = patch.export_interval {
            self.export_interval = interval;
        }
        if let Some(timeout) = patch.export_timeout {
            self.export_timeout = timeout;
        }
        if let Some(temporality) = patch.temporality {
            self.temporality = temporality;
        }
        if let Some(sink) = patch.sink {
            self.sink = sink;
        }
        if let Some(logging) = patch.logging {
            self.logging.merge(logging.level, logging.format);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> TallyResult<()> {
        if self.service_name.trim().is_empty() {
            return Err(TallyError::config("service_name must not be empty"));
        }
        if self.export_interval.is_zero() {
            return Err(TallyError::config("export_interval must be greater than zero"));
        }
        if self.export_timeout.is_zero() {
            return Err(TallyError::config("export_timeout must be greater than zero"));
        }

        let host = self
            .otlp_endpoint
            .strip_prefix("http://")
            .or_else(|| self.otlp_endpoint.strip_prefix("https://"));
        match host {
            Some(rest) if !rest.is_empty() && !rest.starts_with('/') => {}
            _ => {
                return Err(TallyError::config_with_context(
                    format!("Invalid endpoint '{}'", self.otlp_endpoint),
                    "otlp_endpoint must be an http:// or https:// URL",
                ));
            }
        }

        self.logging.validate()
    }
}
