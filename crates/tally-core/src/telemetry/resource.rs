//! Static service metadata attached to every exported batch

use super::attributes::AttributeSet;
use crate::config::TelemetryConfig;
use serde::{Deserialize, Serialize};

/// Service identity, set once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
}

impl Resource {
    pub fn new(
        service_name: impl Into<String>,
        service_version: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            environment: environment.into(),
        }
    }

    /// Resource attributes using the semantic convention keys
    pub fn attributes(&self) -> AttributeSet {
        AttributeSet::new()
            .with("service.name", self.service_name.as_str())
            .with("service.version", self.service_version.as_str())
            .with("deployment.environment", self.environment.as_str())
    }
}

impl From<&TelemetryConfig> for Resource {
    fn from(config: &TelemetryConfig) -> Self {
        Self::new(
            config.service_name.clone(),
            config.service_version.clone(),
            config.environment.clone(),
        )
    }
}
