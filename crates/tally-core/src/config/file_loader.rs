//! File-based configuration loading

use crate::config::model::ConfigPatch;
use crate::error::{TallyError, TallyResult};
use std::fs;
use std::path::Path;

/// Load a configuration patch from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// A missing file yields an empty patch.
pub fn load_from_file(path: &Path) -> TallyResult<ConfigPatch> {
    if !path.exists() {
        tracing::debug!("Config file {} not found, skipping", path.display());
        return Ok(ConfigPatch::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        TallyError::config_with_context(
            format!("Failed to read config file: {}", e),
            format!("Reading configuration from '{}'", path.display()),
        )
    })?;

    let parse_error = |format: &str, e: &dyn std::fmt::Display| {
        TallyError::config_with_context(
            format!("Failed to parse {} config: {}", format, e),
            format!("Deserializing {} configuration from '{}'", format, path.display()),
        )
    };

    let patch: ConfigPatch = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| parse_error("TOML", &e))?,
        Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(|e| parse_error("YAML", &e))?,
        _ => serde_json::from_str(&content).map_err(|e| parse_error("JSON", &e))?,
    };

    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::SinkKind;
    use crate::config::LogFormat;
    use crate::telemetry::metrics::Temporality;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tally.json");
        let config_json = r#"{
            "service_name": "checkout",
            "export_interval": "2s",
            "sink": "log",
            "logging": { "level": "debug" }
        }"#;
        fs::write(&config_path, config_json).unwrap();

        let patch = load_from_file(&config_path).unwrap();
        assert_eq!(patch.service_name.as_deref(), Some("checkout"));
        assert_eq!(patch.export_interval, Some(Duration::from_secs(2)));
        assert_eq!(patch.sink, Some(SinkKind::Log));
        assert_eq!(patch.logging.unwrap().level.as_deref(), Some("debug"));
        assert!(patch.environment.is_none());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tally.toml");
        let config_toml = r#"
service_name = "billing"
environment = "staging"
otlp_endpoint = "https://collector.internal:4318"
export_interval = "500ms"
temporality = "delta"

[logging]
format = "json"
"#;
        fs::write(&config_path, config_toml).unwrap();

        let patch = load_from_file(&config_path).unwrap();
        assert_eq!(patch.service_name.as_deref(), Some("billing"));
        assert_eq!(patch.environment.as_deref(), Some("staging"));
        assert_eq!(patch.export_interval, Some(Duration::from_millis(500)));
        assert_eq!(patch.temporality, Some(Temporality::Delta));
        assert_eq!(patch.logging.unwrap().format, Some(LogFormat::Json));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("tally.yaml");
        let yaml_content = r#"
service_name: inventory
export_timeout: 3s
sink: memory
"#;
        fs::write(&config_path, yaml_content).unwrap();

        let patch = load_from_file(&config_path).unwrap();
        assert_eq!(patch.service_name.as_deref(), Some("inventory"));
        assert_eq!(patch.export_timeout, Some(Duration::from_secs(3)));
        assert_eq!(patch.sink, Some(SinkKind::Memory));
    }

    #[test]
    fn test_load_from_nonexistent_file() {
        let patch = load_from_file(Path::new("/nonexistent/tally.json")).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_load_from_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.json");
        fs::write(&config_path, "{ invalid json }").unwrap();

        let result = load_from_file(&config_path);
        assert!(matches!(result, Err(TallyError::Config { .. })));
    }
}
