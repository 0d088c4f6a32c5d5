//! Command line arguments-based configuration loading

use crate::config::model::ConfigPatch;
use crate::error::TallyResult;
use std::collections::HashMap;

/// Load a configuration patch from command line overrides
///
/// Keys are the ones accepted by [`ConfigPatch::set`], e.g. `service_name`,
/// `otlp_endpoint`, `export_interval_ms`, `sink`.
pub fn load_from_args(args: &HashMap<String, String>) -> TallyResult<ConfigPatch> {
    let mut patch = ConfigPatch::default();
    for (key, value) in args {
        patch.set(key, value, "command line arguments")?;
    }
    Ok(patch)
}
