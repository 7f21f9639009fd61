//! `OAuth2` grant flows against a confidential client registration.

mod client_credentials;
mod password;

use crate::cache::{Account, TokenCache};
use crate::cascade::{Credentials, IdentityProvider};
use crate::error::{Error, Result};
use crate::provider::Authority;
use crate::token::{ErrorResponse, Scopes, Token, TokenResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::fmt;

/// A confidential `OAuth2` client: an application holding a client secret.
///
/// Owns the process-local [`TokenCache`] that silent acquisition reads from.
pub struct ConfidentialClient {
    /// Client ID from the app registration.
    pub client_id: String,
    client_secret: String,
    /// Authority tokens are requested from.
    pub authority: Authority,
    cache: TokenCache,
    http_client: Client,
}

impl ConfidentialClient {
    /// Creates a new confidential client.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        authority: Authority,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority,
            cache: TokenCache::new(),
            http_client: Client::new(),
        }
    }

    /// Creates a client from the application half of a credential set.
    #[must_use]
    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self::new(
            credentials.client_id.clone(),
            credentials.client_secret.clone(),
            credentials.authority.clone(),
        )
    }

    /// Uses a preconfigured HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// The token cache.
    #[must_use]
    pub const fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Posts a grant to the token endpoint.
    ///
    /// Returns `Ok(None)` when the server answers successfully but without an
    /// access token.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or an
    /// unparsable body.
    pub(crate) async fn request_token(
        &self,
        grant: &[(&str, &str)],
        scopes: &Scopes,
    ) -> Result<Option<Token>> {
        let scope_param = scopes.to_param();
        let mut params = HashMap::new();
        for &(key, value) in grant {
            params.insert(key, value);
        }
        params.insert("client_id", self.client_id.as_str());
        params.insert("client_secret", self.client_secret.as_str());
        params.insert("scope", scope_param.as_str());

        let response = self
            .http_client
            .post(self.authority.token_url()?)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(serde_json::from_str::<ErrorResponse>(&body).map_or_else(
                |_| Error::InvalidResponse(format!("token endpoint returned {status}")),
                ErrorResponse::into_error,
            ));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)?;
        Ok(Token::from_response(token_response, scopes))
    }
}

impl fmt::Debug for ConfidentialClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfidentialClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("authority", &self.authority)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityProvider for ConfidentialClient {
    fn accounts(&self, username: &str) -> Vec<Account> {
        self.cache.accounts(username)
    }

    async fn acquire_token_silent(
        &mut self,
        scopes: &Scopes,
        account: &Account,
    ) -> Result<Option<Token>> {
        Ok(self.cache.lookup(account, scopes))
    }

    async fn acquire_token_by_username_password(
        &mut self,
        username: &str,
        password: &str,
        scopes: &Scopes,
    ) -> Result<Option<Token>> {
        self.exchange_password(username, password, scopes).await
    }

    async fn acquire_token_for_client(&mut self, scopes: &Scopes) -> Result<Option<Token>> {
        self.exchange_client_credentials(scopes).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scopes() -> Scopes {
        Scopes::new(["https://graph.microsoft.com/.default"])
    }

    fn client_for(server: &MockServer) -> ConfidentialClient {
        let authority = Authority::new(format!("{}/tenant", server.uri())).unwrap();
        ConfidentialClient::new("app-id", "app-secret", authority)
    }

    #[test]
    fn test_debug_hides_secret() {
        let authority = Authority::microsoft("tenant").unwrap();
        let client = ConfidentialClient::new("app-id", "very-secret", authority);
        let debug = format!("{client:?}");
        assert!(debug.contains("app-id"));
        assert!(!debug.contains("very-secret"));
    }

    #[tokio::test]
    async fn test_password_grant_caches_account() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("client_secret=app-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "user-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        assert!(client.accounts("user@example.com").is_empty());

        let token = client
            .acquire_token_by_username_password("user@example.com", "pw", &scopes())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(token.access_token, "user-token");

        let accounts = client.accounts("user@example.com");
        assert_eq!(accounts.len(), 1);
        let silent = client
            .acquire_token_silent(&scopes(), &accounts[0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(silent.access_token, "user-token");
    }

    #[tokio::test]
    async fn test_oauth_error_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "AADSTS50126: invalid username or password"
            })))
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        let err = client
            .acquire_token_by_username_password("user@example.com", "bad", &scopes())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OAuth { ref error, .. } if error == "invalid_grant"));
        assert!(client.accounts("user@example.com").is_empty());
    }

    #[tokio::test]
    async fn test_non_json_error_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        let err = client.acquire_token_for_client(&scopes()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_success_without_access_token_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"token_type": "Bearer"})),
            )
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        assert!(client.acquire_token_for_client(&scopes()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_supplied_http_client_is_used() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(wiremock::matchers::header("user-agent", "mailgraph-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "app-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let http_client = Client::builder().user_agent("mailgraph-test").build().unwrap();
        let mut client = client_for(&server).with_http_client(http_client);
        let token = client.acquire_token_for_client(&scopes()).await.unwrap().unwrap();
        assert_eq!(token.access_token, "app-token");
    }
}
