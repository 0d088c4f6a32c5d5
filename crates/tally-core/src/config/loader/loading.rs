//! Where a configuration layer comes from and how it is read

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::model::ConfigPatch;
use crate::config::{args_loader, env_loader, file_loader};
use crate::error::TallyResult;

/// One configuration layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// TOML, JSON or YAML file, chosen by extension
    File(PathBuf),
    /// `TALLY_*` environment variables
    Environment,
    /// `key = value` overrides from the command line
    CommandLine(HashMap<String, String>),
    /// Built-in defaults (contributes nothing on top of them)
    Default,
}

impl ConfigSource {
    /// Read the fields this layer sets
    pub(super) fn load(&self) -> TallyResult<ConfigPatch> {
        match self {
            Self::File(path) => file_loader::load_from_file(path),
            Self::Environment => env_loader::load_from_env(),
            Self::CommandLine(args) => args_loader::load_from_args(args),
            Self::Default => Ok(ConfigPatch::default()),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Environment => write!(f, "environment"),
            Self::CommandLine(args) => write!(f, "command line ({} keys)", args.len()),
            Self::Default => write!(f, "defaults"),
        }
    }
}
