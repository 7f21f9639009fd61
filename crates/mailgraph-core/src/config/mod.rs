//! Configuration loading.
//!
//! Configuration lives in one or more TOML files. Files are read in order
//! and merged key by key, later files overriding earlier ones, then validated
//! into a [`Config`].

mod model;
mod validation;

use std::path::Path;

pub use model::{Config, ConfigFile, LoggingSection, Section};
pub use validation::{ConfigError, validate_config};

/// Reads, merges and validates configuration files.
///
/// # Errors
///
/// Returns an error if no file is given, a file cannot be read or parsed,
/// or the merged result is missing a required key.
pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Config, ConfigError> {
    if paths.is_empty() {
        return Err(ConfigError::NoFiles);
    }

    let mut merged = ConfigFile::default();
    for path in paths {
        merged = merged.merge(read_file(path.as_ref())?);
    }
    validate_config(merged)
}

/// Reads a single configuration file without validating it.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
