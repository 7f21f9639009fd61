//! Identity provider authority configuration.

use crate::error::{Error, Result};
use url::Url;

/// Microsoft identity platform host.
pub const MICROSOFT_LOGIN_HOST: &str = "https://login.microsoftonline.com";

/// An `OAuth2` authority: the tenant-scoped base URL tokens are issued from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    /// Base URL, without trailing slash (e.g. `https://login.microsoftonline.com/contoso`).
    url: Url,
}

impl Authority {
    /// Creates an authority from its base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or cannot carry a path.
    pub fn new(url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref().trim_end_matches('/'))?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "authority {url} cannot be used as a base URL"
            )));
        }
        Ok(Self { url })
    }

    /// Microsoft identity platform authority for a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant is empty or produces an invalid URL.
    pub fn microsoft(tenant_id: &str) -> Result<Self> {
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(Error::InvalidConfig("tenant_id is empty".into()));
        }
        Self::new(format!("{MICROSOFT_LOGIN_HOST}/{tenant_id}"))
    }

    /// The authority base URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The v2.0 token endpoint under this authority.
    ///
    /// # Errors
    ///
    /// Returns an error if URL construction fails.
    pub fn token_url(&self) -> Result<Url> {
        let base = self.url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/oauth2/v2.0/token"))?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_microsoft_authority() {
        let authority = Authority::microsoft("contoso.onmicrosoft.com").unwrap();
        assert_eq!(
            authority.url().as_str(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com"
        );
        assert_eq!(
            authority.token_url().unwrap().as_str(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_custom_authority_trailing_slash() {
        let authority = Authority::new("http://127.0.0.1:8080/tenant/").unwrap();
        assert_eq!(
            authority.token_url().unwrap().as_str(),
            "http://127.0.0.1:8080/tenant/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_invalid_authority() {
        assert!(Authority::new("not a url").is_err());
        assert!(Authority::new("mailto:someone@example.com").is_err());
        assert!(Authority::microsoft("  ").is_err());
    }
}
