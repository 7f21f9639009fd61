//! Configuration model types.

use mailgraph_oauth::{Authority, Credentials, Scopes};
use serde::{Deserialize, Serialize};
use url::Url;

use super::validation::ConfigError;

/// One configuration file as written on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Application, user and endpoint settings.
    #[serde(default)]
    pub mailgraph: Section,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl ConfigFile {
    /// Overlays `other` on top of `self`: keys present in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            mailgraph: self.mailgraph.merge(other.mailgraph),
            logging: LoggingSection {
                filter: other.logging.filter.or(self.logging.filter),
            },
        }
    }
}

/// The `[mailgraph]` table. Every key is optional until validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Section {
    /// Application (client) ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Directory (tenant) ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Authority URL; derived from `tenant_id` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    /// Client secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Resource-owner username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Resource-owner password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// First page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Requested scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl Section {
    fn merge(self, other: Self) -> Self {
        Self {
            client_id: other.client_id.or(self.client_id),
            tenant_id: other.tenant_id.or(self.tenant_id),
            authority: other.authority.or(self.authority),
            secret: other.secret.or(self.secret),
            username: other.username.or(self.username),
            password: other.password.or(self.password),
            endpoint: other.endpoint.or(self.endpoint),
            scopes: other.scopes.or(self.scopes),
        }
    }
}

/// The `[logging]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `tracing` filter directive, e.g. `mailgraph=debug`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Validated configuration for one run.
#[derive(Clone)]
pub struct Config {
    /// Application (client) ID.
    pub client_id: String,
    /// Directory (tenant) ID.
    pub tenant_id: String,
    /// Authority tokens are requested from.
    pub authority: Authority,
    /// Client secret.
    pub secret: String,
    /// Resource-owner username.
    pub username: String,
    /// Resource-owner password, if the password grant should be tried.
    pub password: Option<String>,
    /// First page URL.
    pub endpoint: Url,
    /// Requested scopes (non-empty).
    pub scopes: Scopes,
    /// Logging filter from the `[logging]` table.
    pub log_filter: Option<String>,
}

impl Config {
    /// Credential set for the token cascade.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope set is empty.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let credentials = Credentials::new(
            self.client_id.clone(),
            self.authority.clone(),
            self.secret.clone(),
            self.scopes.clone(),
        )
        .map_err(|_| ConfigError::Missing("scopes"))?
        .with_username(self.username.clone());

        Ok(match &self.password {
            Some(password) => credentials.with_password(password.clone()),
            None => credentials,
        })
    }

    /// The processed configuration as TOML, with secrets masked.
    #[must_use]
    pub fn redacted(&self) -> String {
        let file = ConfigFile {
            mailgraph: Section {
                client_id: Some(self.client_id.clone()),
                tenant_id: Some(self.tenant_id.clone()),
                authority: Some(self.authority.url().to_string()),
                secret: Some(REDACTED.to_string()),
                username: Some(self.username.clone()),
                password: self.password.as_ref().map(|_| REDACTED.to_string()),
                endpoint: Some(self.endpoint.to_string()),
                scopes: Some(self.scopes.iter().map(str::to_string).collect()),
            },
            logging: LoggingSection {
                filter: self.log_filter.clone(),
            },
        };
        toml::to_string_pretty(&file).unwrap_or_else(|e| format!("# unprintable config: {e}\n"))
    }
}

const REDACTED: &str = "***";

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("tenant_id", &self.tenant_id)
            .field("authority", &self.authority.url().as_str())
            .field("secret", &REDACTED)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("endpoint", &self.endpoint.as_str())
            .field("scopes", &self.scopes)
            .field("log_filter", &self.log_filter)
            .finish()
    }
}
