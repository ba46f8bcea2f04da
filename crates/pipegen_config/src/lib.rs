//! Parsing and validation of `pipegen.toml` generator configuration files.
//!
//! This crate reads the configuration file (or command-line `key=value`
//! overrides) and produces a strongly-typed [`GeneratorConfig`], then flattens
//! it into the [`ResolvedConfig`] the generator consumes: operator name and
//! numeric parameters, target device and frequency, and test settings.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_config, ResolvedConfig};
pub use types::*;
