//! Configuration loading
//!
//! Sources are applied in the order they are added, each overriding the fields it
//! sets:
//! - Default configuration
//! - Configuration files (JSON, TOML, YAML)
//! - `TALLY_*` environment variables
//! - Command line arguments

mod builder;
mod loading;


pub use builder::ConfigLoader;
pub use loading::ConfigSource;
