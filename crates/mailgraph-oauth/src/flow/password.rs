//! Resource Owner Password Credentials grant (RFC 6749 §4.3).

use super::ConfidentialClient;
use crate::cache::Account;
use crate::error::Result;
use crate::token::{Scopes, Token};

impl ConfidentialClient {
    /// Exchanges a username and password for a user token.
    ///
    /// A token obtained this way is cached under the username, making it
    /// available to silent acquisition for the rest of the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the token request fails or the server rejects
    /// the credentials.
    pub async fn exchange_password(
        &mut self,
        username: &str,
        password: &str,
        scopes: &Scopes,
    ) -> Result<Option<Token>> {
        let grant = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];
        let token = self.request_token(&grant, scopes).await?;

        if let Some(token) = &token {
            self.cache.insert(&Account::new(username), token.clone());
        }
        Ok(token)
    }
}
