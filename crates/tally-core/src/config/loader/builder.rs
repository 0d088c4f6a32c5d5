//! Configuration loader builder

use std::collections::HashMap;
use std::path::Path;

use super::loading::ConfigSource;
use crate::config::model::TelemetryConfig;
use crate::error::TallyResult;

/// Layers configuration sources over the built-in defaults
#[derive(Debug, Default)]
pub struct ConfigLoader {
    pub(super) sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer; later layers win
    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.add_source(ConfigSource::File(path.as_ref().to_path_buf()))
    }

    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    pub fn with_args(self, args: HashMap<String, String>) -> Self {
        self.add_source(ConfigSource::CommandLine(args))
    }

    pub fn with_defaults(self) -> Self {
        self.add_source(ConfigSource::Default)
    }

    /// Apply every layer in order, then validate the result
    pub fn load(self) -> TallyResult<TelemetryConfig> {
        let mut config = TelemetryConfig::default();

        for source in &self.sources {
            let patch = source.load()?;
            if !patch.is_empty() {
                tracing::debug!("Merging configuration from {}", source);
            }
            config.merge(patch);
        }

        config.validate()?;
        tracing::debug!(
            service = %config.service_name,
            endpoint = %config.otlp_endpoint,
            sink = %config.sink,
            "Configuration loaded"
        );
        Ok(config)
    }
}
