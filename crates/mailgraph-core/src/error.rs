//! Error types for the core library.

use thiserror::Error;

use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::output::OutputError;

/// Errors that end a run. [`Error::stage`] names the step that failed.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No usable access token could be acquired.
    #[error(transparent)]
    Auth(#[from] mailgraph_oauth::Error),

    /// A page request failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Cancelled before an access token was acquired.
    #[error("interrupted before an access token was acquired")]
    Cancelled,

    /// Results could not be written.
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl Error {
    /// The stage of the run that failed.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Auth(_) | Self::Cancelled => "auth",
            Self::Fetch(_) => "fetch",
            Self::Output(_) => "output",
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Error::from(ConfigError::Missing("endpoint")).stage(), "config");
        assert_eq!(Error::Cancelled.stage(), "auth");
        assert_eq!(
            Error::from(mailgraph_oauth::Error::NoToken { attempts: vec![] }).stage(),
            "auth"
        );
    }

    #[test]
    fn test_display_is_the_underlying_error() {
        let err = Error::from(ConfigError::Missing("endpoint"));
        assert_eq!(err.to_string(), "missing required configuration key `endpoint`");
    }
}
