//! Environment variable-based configuration loading

use crate::config::model::ConfigPatch;
use crate::error::TallyResult;
use std::env;

/// Environment variables read by [`load_from_env`], and the key each one sets
pub const ENV_VARS: [(&str, &str); 8] = [
    ("TALLY_SERVICE_NAME", "service_name"),
    ("TALLY_SERVICE_VERSION", "service_version"),
    ("TALLY_ENVIRONMENT", "environment"),
    ("TALLY_OTLP_ENDPOINT", "otlp_endpoint"),
    ("TALLY_EXPORT_INTERVAL_MS", "export_interval_ms"),
    ("TALLY_EXPORT_TIMEOUT_MS", "export_timeout_ms"),
    ("TALLY_TEMPORALITY", "temporality"),
    ("TALLY_LOG_LEVEL", "log_level"),
];

/// Load a configuration patch from `TALLY_*` environment variables
pub fn load_from_env() -> TallyResult<ConfigPatch> {
    load_from_lookup(|name| env::var(name).ok())
}

/// Load a configuration patch through an arbitrary variable lookup
pub fn load_from_lookup<F>(lookup: F) -> TallyResult<ConfigPatch>
where
    F: Fn(&str) -> Option<String>,
{
    let mut patch = ConfigPatch::default();
    for (var, key) in ENV_VARS {
        if let Some(value) = lookup(var) {
            patch.set(key, &value, var)?;
        }
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TallyError;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_load_from_env_basic() {
        let patch = load_from_lookup(lookup(&[
            ("TALLY_SERVICE_NAME", "payments"),
            ("TALLY_EXPORT_INTERVAL_MS", "1500"),
            ("TALLY_LOG_LEVEL", "warn"),
        ]))
        .unwrap();

        assert_eq!(patch.service_name.as_deref(), Some("payments"));
        assert_eq!(patch.export_interval, Some(Duration::from_millis(1500)));
        assert_eq!(patch.logging.unwrap().level.as_deref(), Some("warn"));
        assert!(patch.otlp_endpoint.is_none());
    }

    #[test]
    fn test_load_from_env_empty() {
        let patch = load_from_lookup(|_| None).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_invalid_interval_names_variable() {
        let err = load_from_lookup(lookup(&[("TALLY_EXPORT_INTERVAL_MS", "fast")])).unwrap_err();
        match err {
            TallyError::Config { context, .. } => {
                assert!(context.unwrap().contains("TALLY_EXPORT_INTERVAL_MS"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
