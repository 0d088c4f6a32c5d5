//! Configuration management

pub mod args_loader;
pub mod env_loader;
pub mod file_loader;
pub mod loader;
pub mod logging_config;
pub mod model;

pub use loader::{ConfigLoader, ConfigSource};
pub use logging_config::{LogFormat, LoggingConfig};
pub use model::{ConfigPatch, LoggingPatch, SinkKind, TelemetryConfig};

use crate::error::TallyResult;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File names searched in the working directory when no config file is given
pub const CONFIG_FILE_NAMES: [&str; 3] = ["tally.toml", "tally.json", "tally.yaml"];

/// First existing config file: the working directory, then `~/.tally/config.toml`
pub fn discover_config_file() -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(PathBuf::from)
        .chain(dirs::home_dir().map(|home| home.join(".tally").join("config.toml")))
        .find(|path| path.is_file())
}

/// Load configuration from defaults, a config file (given or discovered), the
/// environment and command line overrides, in that order
pub fn load_config(
    config_file: Option<&Path>,
    overrides: HashMap<String, String>,
) -> TallyResult<TelemetryConfig> {
    let mut loader = ConfigLoader::new().with_defaults();
    match config_file.map(Path::to_path_buf).or_else(discover_config_file) {
        Some(path) => loader = loader.with_file(path),
        None => tracing::debug!("No config file found, using defaults"),
    }
    loader.with_env().with_args(overrides).load()
}
