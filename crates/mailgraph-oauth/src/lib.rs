//! # mailgraph-oauth
//!
//! `OAuth2` token acquisition for Microsoft Graph mail clients.
//!
//! ## Features
//!
//! - **Credential cascade**: silent (cached) → resource-owner password →
//!   client credentials, first usable token wins
//! - **Token cache**: process-local, per account and scope set
//! - **Confidential client**: Microsoft identity platform v2.0 token endpoint
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailgraph_oauth::{Authority, ConfidentialClient, Credentials, Scopes, TokenProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Credentials::new(
//!         "your_client_id",
//!         Authority::microsoft("your_tenant_id")?,
//!         "your_secret",
//!         Scopes::new(["https://graph.microsoft.com/.default"]),
//!     )?
//!     .with_username("user@example.com")
//!     .with_password("password");
//!
//!     let mut provider = TokenProvider::new(ConfidentialClient::from_credentials(&credentials));
//!     let token = provider.acquire(&credentials).await?;
//!     println!("Token type: {}", token.token_type);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod cascade;
mod error;
pub mod flow;
pub mod provider;
pub mod token;

pub use cache::{Account, TokenCache};
pub use cascade::{Credentials, IdentityProvider, Strategy, TokenProvider};
pub use error::{Error, Result};
pub use flow::ConfidentialClient;
pub use provider::Authority;
pub use token::{Scopes, Token};
