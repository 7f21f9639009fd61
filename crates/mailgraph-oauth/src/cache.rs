//! Process-local token cache.
//!
//! Tokens obtained through user flows are remembered per [`Account`] so later
//! acquisitions in the same process can be served silently. App-only tokens
//! are kept separately. Nothing is written to disk.

use std::collections::HashMap;

use crate::token::{Scopes, Token};

/// A user account known to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Account {
    /// Sign-in name the account was established with.
    pub username: String,
}

impl Account {
    /// Creates an account handle for a username.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    fn key(&self) -> String {
        self.username.to_lowercase()
    }
}

/// In-memory token cache.
#[derive(Debug, Default)]
pub struct TokenCache {
    accounts: HashMap<String, (Account, Vec<Token>)>,
    app_tokens: Vec<Token>,
}

impl TokenCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts matching a username (case-insensitive).
    #[must_use]
    pub fn accounts(&self, username: &str) -> Vec<Account> {
        let key = username.to_lowercase();
        self.accounts
            .get(&key)
            .map(|(account, _)| vec![account.clone()])
            .unwrap_or_default()
    }

    /// Finds an unexpired token for `account` whose scopes cover `scopes`.
    #[must_use]
    pub fn lookup(&self, account: &Account, scopes: &Scopes) -> Option<Token> {
        let (_, tokens) = self.accounts.get(&account.key())?;
        find_usable(tokens, scopes)
    }

    /// Stores a user token, replacing any token issued for the same scopes.
    pub fn insert(&mut self, account: &Account, token: Token) {
        let (_, tokens) = self
            .accounts
            .entry(account.key())
            .or_insert_with(|| (account.clone(), Vec::new()));
        replace_or_push(tokens, token);
    }

    /// Finds an unexpired app-only token covering `scopes`.
    #[must_use]
    pub fn lookup_app(&self, scopes: &Scopes) -> Option<Token> {
        find_usable(&self.app_tokens, scopes)
    }

    /// Stores an app-only token.
    pub fn insert_app(&mut self, token: Token) {
        replace_or_push(&mut self.app_tokens, token);
    }
}

fn find_usable(tokens: &[Token], scopes: &Scopes) -> Option<Token> {
    tokens
        .iter()
        .find(|token| token.is_valid() && token.scopes.covers(scopes))
        .cloned()
}

fn replace_or_push(tokens: &mut Vec<Token>, token: Token) {
    tokens.retain(|existing| existing.scopes != token.scopes && existing.is_valid());
    tokens.push(token);
}
