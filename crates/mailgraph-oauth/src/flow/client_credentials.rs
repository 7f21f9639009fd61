//! Client Credentials grant (RFC 6749 §4.4): app-only tokens.

use super::ConfidentialClient;
use crate::error::Result;
use crate::token::{Scopes, Token};

impl ConfidentialClient {
    /// Obtains a token for the application itself, with no user context.
    ///
    /// An unexpired app token already covering `scopes` is reused without a
    /// network round trip.
    ///
    /// # Errors
    ///
    /// Returns an error if the token request fails or the server rejects
    /// the client credentials.
    pub async fn exchange_client_credentials(&mut self, scopes: &Scopes) -> Result<Option<Token>> {
        if let Some(token) = self.cache.lookup_app(scopes) {
            return Ok(Some(token));
        }

        let grant = [("grant_type", "client_credentials")];
        let token = self.request_token(&grant, scopes).await?;

        if let Some(token) = &token {
            self.cache.insert_app(token.clone());
        }
        Ok(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::flow::ConfidentialClient;
    use crate::provider::Authority;
    use crate::token::Scopes;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_client_credentials_reuses_cached_app_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "app-token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let authority = Authority::new(format!("{}/tenant", server.uri())).unwrap();
        let mut client = ConfidentialClient::new("app-id", "app-secret", authority);
        let scopes = Scopes::new(["https://graph.microsoft.com/.default"]);

        let first = client.exchange_client_credentials(&scopes).await.unwrap().unwrap();
        let second = client.exchange_client_credentials(&scopes).await.unwrap().unwrap();
        assert_eq!(first.access_token, "app-token");
        assert_eq!(second.access_token, "app-token");
        // App tokens never surface as user accounts.
        assert!(client.cache().accounts("app-id").is_empty());
    }
}
