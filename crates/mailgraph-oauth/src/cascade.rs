//! Credential cascade.
//!
//! [`TokenProvider`] walks a fixed list of [`Strategy`] values and returns the
//! first token any of them yields:
//!
//! 1. [`Strategy::Silent`]: cached token for a known account, no network.
//! 2. [`Strategy::UsernamePassword`]: resource-owner password grant. Skipped
//!    when no username or password is configured.
//! 3. [`Strategy::ClientCredentials`]: app-only token.
//!
//! A strategy that errors is logged and recorded, and the cascade moves on.
//! Only when every strategy comes up empty does acquisition fail, with
//! [`Error::NoToken`] listing what was tried.

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cache::Account;
use crate::error::{Error, Result};
use crate::provider::Authority;
use crate::token::{Scopes, Token};

/// Application and user credentials for one run.
#[derive(Clone)]
pub struct Credentials {
    /// Client ID from the app registration.
    pub client_id: String,
    /// Authority tokens are requested from.
    pub authority: Authority,
    /// Client secret.
    pub client_secret: String,
    /// Resource-owner username.
    pub username: Option<String>,
    /// Resource-owner password.
    pub password: Option<String>,
    /// Requested scopes.
    pub scopes: Scopes,
}

impl Credentials {
    /// Creates app-only credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if `scopes` is empty.
    pub fn new(
        client_id: impl Into<String>,
        authority: Authority,
        client_secret: impl Into<String>,
        scopes: Scopes,
    ) -> Result<Self> {
        if scopes.is_empty() {
            return Err(Error::InvalidConfig("at least one scope is required".into()));
        }
        Ok(Self {
            client_id: client_id.into(),
            authority,
            client_secret: client_secret.into(),
            username: None,
            password: None,
            scopes,
        })
    }

    /// Sets the resource-owner username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the resource-owner password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("authority", &self.authority.url().as_str())
            .field("client_secret", &"***")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// The three operations an identity provider offers the cascade.
///
/// Each acquisition returns `Ok(None)` when it has nothing to offer, and
/// `Err` when the attempt itself failed.
#[async_trait]
pub trait IdentityProvider: Send {
    /// Accounts previously signed in under `username`.
    fn accounts(&self, username: &str) -> Vec<Account>;

    /// Cached token for `account`, without network or user interaction.
    async fn acquire_token_silent(
        &mut self,
        scopes: &Scopes,
        account: &Account,
    ) -> Result<Option<Token>>;

    /// Token from a direct username/password exchange.
    async fn acquire_token_by_username_password(
        &mut self,
        username: &str,
        password: &str,
        scopes: &Scopes,
    ) -> Result<Option<Token>>;

    /// App-only token.
    async fn acquire_token_for_client(&mut self, scopes: &Scopes) -> Result<Option<Token>>;
}

/// One step of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Cached token for a known account.
    Silent,
    /// Resource-owner password grant.
    UsernamePassword,
    /// App-only client credentials grant.
    ClientCredentials,
}

impl Strategy {
    /// The order strategies are attempted in.
    pub const ORDER: [Self; 3] = [Self::Silent, Self::UsernamePassword, Self::ClientCredentials];

    /// Short name used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::UsernamePassword => "username/password",
            Self::ClientCredentials => "client credentials",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Acquires bearer tokens by running the credential cascade.
#[derive(Debug)]
pub struct TokenProvider<I> {
    identity: I,
}

impl<I: IdentityProvider> TokenProvider<I> {
    /// Wraps an identity provider.
    #[must_use]
    pub const fn new(identity: I) -> Self {
        Self { identity }
    }

    /// The wrapped identity provider.
    #[must_use]
    pub const fn identity(&self) -> &I {
        &self.identity
    }

    /// Acquires a token for `credentials.scopes`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoToken`] if no strategy yields a usable token.
    pub async fn acquire(&mut self, credentials: &Credentials) -> Result<Token> {
        let mut attempts = Vec::new();

        for strategy in Strategy::ORDER {
            match self.attempt(strategy, credentials, &mut attempts).await {
                Some(token) => {
                    info!(%strategy, scopes = %credentials.scopes, "Acquired access token");
                    return Ok(token);
                }
                None => debug!(%strategy, "Strategy produced no token"),
            }
        }

        Err(Error::NoToken { attempts })
    }

    async fn attempt(
        &mut self,
        strategy: Strategy,
        credentials: &Credentials,
        attempts: &mut Vec<String>,
    ) -> Option<Token> {
        let scopes = &credentials.scopes;
        match strategy {
            Strategy::Silent => {
                let Some(username) = credentials.username.as_deref() else {
                    attempts.push(format!("{strategy}: no username configured"));
                    return None;
                };
                let accounts = self.identity.accounts(username);
                if accounts.is_empty() {
                    attempts.push(format!("{strategy}: no cached account for {username}"));
                }
                for account in accounts {
                    debug!(%scopes, account = %account.username, "acquire_token_silent");
                    let result = self.identity.acquire_token_silent(scopes, &account).await;
                    if let Some(token) = settle(strategy, result, attempts) {
                        return Some(token);
                    }
                }
                None
            }
            Strategy::UsernamePassword => {
                let (Some(username), Some(password)) = (
                    credentials.username.as_deref(),
                    credentials.password.as_deref(),
                ) else {
                    attempts.push(format!("{strategy}: skipped, no password configured"));
                    return None;
                };
                debug!(%username, password = "***", %scopes, "acquire_token_by_username_password");
                let result = self
                    .identity
                    .acquire_token_by_username_password(username, password, scopes)
                    .await;
                settle(strategy, result, attempts)
            }
            Strategy::ClientCredentials => {
                debug!(%scopes, "acquire_token_for_client");
                let result = self.identity.acquire_token_for_client(scopes).await;
                settle(strategy, result, attempts)
            }
        }
    }
}

/// Turns one acquisition result into an optional usable token, recording
/// anything else.
fn settle(
    strategy: Strategy,
    result: Result<Option<Token>>,
    attempts: &mut Vec<String>,
) -> Option<Token> {
    match result {
        Ok(Some(token)) if !token.access_token.is_empty() => Some(token),
        Ok(_) => {
            attempts.push(format!("{strategy}: no access token returned"));
            None
        }
        Err(e) => {
            warn!(%strategy, error = %e, "Token acquisition failed");
            attempts.push(format!("{strategy}: {e}"));
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Scripted identity provider that records every call.
    #[derive(Default)]
    struct ScriptedProvider {
        accounts: Vec<Account>,
        silent: Vec<Option<Token>>,
        password: Option<Result<Option<Token>>>,
        client: Option<Result<Option<Token>>>,
        calls: Vec<&'static str>,
    }

    #[async_trait]
    impl IdentityProvider for ScriptedProvider {
        fn accounts(&self, _username: &str) -> Vec<Account> {
            self.accounts.clone()
        }

        async fn acquire_token_silent(
            &mut self,
            _scopes: &Scopes,
            _account: &Account,
        ) -> Result<Option<Token>> {
            self.calls.push("silent");
            Ok(if self.silent.is_empty() {
                None
            } else {
                self.silent.remove(0)
            })
        }

        async fn acquire_token_by_username_password(
            &mut self,
            _username: &str,
            _password: &str,
            _scopes: &Scopes,
        ) -> Result<Option<Token>> {
            self.calls.push("password");
            self.password.take().unwrap_or(Ok(None))
        }

        async fn acquire_token_for_client(&mut self, _scopes: &Scopes) -> Result<Option<Token>> {
            self.calls.push("client");
            self.client.take().unwrap_or(Ok(None))
        }
    }

    fn scopes() -> Scopes {
        Scopes::new(["https://graph.microsoft.com/.default"])
    }

    fn token(value: &str) -> Token {
        Token::new(value, scopes())
    }

    fn credentials() -> Credentials {
        Credentials::new(
            "app-id",
            Authority::microsoft("tenant").unwrap(),
            "secret",
            scopes(),
        )
        .unwrap()
        .with_username("user@example.com")
        .with_password("hunter2")
    }

    #[test]
    fn test_credentials_require_scopes() {
        let result = Credentials::new(
            "app-id",
            Authority::microsoft("tenant").unwrap(),
            "secret",
            Scopes::default(),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let debug = format!("{:?}", credentials());
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("\"secret\""));
        assert!(debug.contains("user@example.com"));
    }

    #[test]
    fn test_strategy_order() {
        assert_eq!(
            Strategy::ORDER,
            [
                Strategy::Silent,
                Strategy::UsernamePassword,
                Strategy::ClientCredentials
            ]
        );
    }

    #[tokio::test]
    async fn test_silent_success_short_circuits() {
        let provider = ScriptedProvider {
            accounts: vec![Account::new("user@example.com")],
            silent: vec![Some(token("cached"))],
            password: Some(Ok(Some(token("password")))),
            client: Some(Ok(Some(token("client")))),
            ..Default::default()
        };
        let mut tokens = TokenProvider::new(provider);

        let acquired = tokens.acquire(&credentials()).await.unwrap();
        assert_eq!(acquired.access_token, "cached");
        assert_eq!(tokens.identity().calls, ["silent"]);
    }

    #[tokio::test]
    async fn test_silent_tries_each_account_until_success() {
        let provider = ScriptedProvider {
            accounts: vec![Account::new("a@example.com"), Account::new("A@example.com")],
            silent: vec![None, Some(token("second"))],
            ..Default::default()
        };
        let mut tokens = TokenProvider::new(provider);

        let acquired = tokens.acquire(&credentials()).await.unwrap();
        assert_eq!(acquired.access_token, "second");
        assert_eq!(tokens.identity().calls, ["silent", "silent"]);
    }

    #[tokio::test]
    async fn test_password_before_client_credentials() {
        let provider = ScriptedProvider {
            password: Some(Ok(Some(token("password")))),
            client: Some(Ok(Some(token("client")))),
            ..Default::default()
        };
        let mut tokens = TokenProvider::new(provider);

        let acquired = tokens.acquire(&credentials()).await.unwrap();
        assert_eq!(acquired.access_token, "password");
        assert_eq!(tokens.identity().calls, ["password"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_client_credentials() {
        let provider = ScriptedProvider {
            accounts: vec![Account::new("user@example.com")],
            silent: vec![None],
            password: Some(Err(Error::oauth_error("invalid_grant", "bad password"))),
            client: Some(Ok(Some(token("client")))),
            ..Default::default()
        };
        let mut tokens = TokenProvider::new(provider);

        let acquired = tokens.acquire(&credentials()).await.unwrap();
        assert_eq!(acquired.access_token, "client");
        assert_eq!(tokens.identity().calls, ["silent", "password", "client"]);
    }

    #[tokio::test]
    async fn test_password_skipped_without_password() {
        let provider = ScriptedProvider {
            client: Some(Ok(Some(token("client")))),
            ..Default::default()
        };
        let mut tokens = TokenProvider::new(provider);
        let credentials = Credentials {
            password: None,
            ..credentials()
        };

        let acquired = tokens.acquire(&credentials).await.unwrap();
        assert_eq!(acquired.access_token, "client");
        assert_eq!(tokens.identity().calls, ["client"]);
    }

    #[tokio::test]
    async fn test_empty_access_token_is_not_usable() {
        let provider = ScriptedProvider {
            password: Some(Ok(Some(token("")))),
            client: Some(Ok(Some(token("client")))),
            ..Default::default()
        };
        let mut tokens = TokenProvider::new(provider);

        let acquired = tokens.acquire(&credentials()).await.unwrap();
        assert_eq!(acquired.access_token, "client");
    }

    #[tokio::test]
    async fn test_all_strategies_fail() {
        let provider = ScriptedProvider {
            password: Some(Err(Error::oauth_error("invalid_grant", "bad password"))),
            client: Some(Ok(None)),
            ..Default::default()
        };
        let mut tokens = TokenProvider::new(provider);

        let err = tokens.acquire(&credentials()).await.unwrap_err();
        let Error::NoToken { attempts } = err else {
            panic!("expected NoToken, got {err:?}");
        };
        assert_eq!(attempts.len(), 3);
        assert!(attempts[0].starts_with("silent"));
        assert!(attempts[1].contains("invalid_grant"));
        assert!(attempts[2].starts_with("client credentials"));
    }

    /// Log sink shared between the subscriber and the test.
    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_password_never_logged() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let provider = ScriptedProvider {
            password: Some(Err(Error::oauth_error("invalid_grant", "bad password"))),
            client: Some(Ok(Some(token("client")))),
            ..Default::default()
        };
        let mut tokens = TokenProvider::new(provider);
        tokens.acquire(&credentials()).await.unwrap();

        let output = logs.contents();
        assert!(output.contains("acquire_token_by_username_password"), "{output}");
        assert!(output.contains("***"), "{output}");
        assert!(!output.contains("hunter2"), "{output}");
    }
}
