//! Configuration validation.

use std::path::PathBuf;

use mailgraph_oauth::{Authority, Scopes};
use url::Url;

use super::model::{Config, ConfigFile, Section};

/// Configuration errors. All of them are fatal before any network traffic.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration file was given.
    #[error("no configuration file given")]
    NoFiles,

    /// A configuration file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML for the expected layout.
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A required key is absent or blank.
    #[error("missing required configuration key `{0}`")]
    Missing(&'static str),

    /// A URL-valued key does not parse.
    #[error("invalid URL for `{field}`: {reason}")]
    InvalidUrl {
        /// Key name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// The configuration key this error relates to, if any.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::Missing(field) | Self::InvalidUrl { field, .. } => Some(*field),
            Self::NoFiles | Self::Read { .. } | Self::Parse { .. } => None,
        }
    }
}

/// Validates a merged configuration file.
///
/// # Errors
///
/// Returns the first missing or invalid key, checked in file order.
pub fn validate_config(file: ConfigFile) -> Result<Config, ConfigError> {
    let ConfigFile { mailgraph, logging } = file;
    let Section {
        client_id,
        tenant_id,
        authority,
        secret,
        username,
        password,
        endpoint,
        scopes,
    } = mailgraph;

    let client_id = required("client_id", client_id)?;
    let tenant_id = required("tenant_id", tenant_id)?;
    let authority = match authority.filter(|value| !value.trim().is_empty()) {
        Some(url) => Authority::new(url.trim()),
        None => Authority::microsoft(&tenant_id),
    }
    .map_err(|e| ConfigError::InvalidUrl {
        field: "authority",
        reason: e.to_string(),
    })?;
    let secret = required("secret", secret)?;
    let username = required("username", username)?;
    let password = password.filter(|value| !value.is_empty());
    let endpoint = required("endpoint", endpoint)?;
    let endpoint = Url::parse(&endpoint).map_err(|e| ConfigError::InvalidUrl {
        field: "endpoint",
        reason: e.to_string(),
    })?;
    let scopes = Scopes::new(scopes.unwrap_or_default());
    if scopes.is_empty() {
        return Err(ConfigError::Missing("scopes"));
    }

    Ok(Config {
        client_id,
        tenant_id,
        authority,
        secret,
        username,
        password,
        endpoint,
        scopes,
        log_filter: logging.filter.filter(|value| !value.trim().is_empty()),
    })
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(field))
}
