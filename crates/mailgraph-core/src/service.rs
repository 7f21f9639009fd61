//! End-to-end retrieval: token, pages, validation.

use std::path::Path;

use mailgraph_oauth::{ConfidentialClient, Credentials, IdentityProvider, TokenProvider};
use reqwest::Client;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{PageFetcher, PageLimit, RawRecord, StopReason};
use crate::output::{self, OutputError};
use crate::schema::{self, ValidatedMessage, ValidationError};

/// Options for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Request budget for pagination.
    pub limit: PageLimit,
    /// Validate records, or hand them on as received.
    pub validate: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limit: PageLimit::default(),
            validate: true,
        }
    }
}

/// Records produced by a run.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Records {
    /// Validated messages.
    Validated(Vec<ValidatedMessage>),
    /// Records exactly as received.
    Raw(Vec<RawRecord>),
}

impl Records {
    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Validated(messages) => messages.len(),
            Self::Raw(records) => records.len(),
        }
    }

    /// Whether there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the records to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_json(&self, path: &Path) -> std::result::Result<(), OutputError> {
        match self {
            Self::Validated(messages) => output::write_json(path, messages),
            Self::Raw(records) => output::write_json(path, records),
        }
    }

    /// Prints the records to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if stdout cannot be written.
    pub fn print(&self) -> std::result::Result<(), OutputError> {
        match self {
            Self::Validated(messages) => output::print(messages),
            Self::Raw(records) => output::print(records),
        }
    }
}

/// Result of a successful run, possibly partial.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Retrieved records.
    pub records: Records,
    /// Field-level validation problems; empty when validation is off.
    pub validation_errors: Vec<ValidationError>,
    /// Pages received.
    pub pages: usize,
    /// Why pagination ended.
    pub stop: StopReason,
}

/// Acquires a token, pages through the endpoint, and validates the result.
#[derive(Debug)]
pub struct MailGraph<I> {
    tokens: TokenProvider<I>,
    fetcher: PageFetcher,
}

impl<I: IdentityProvider> MailGraph<I> {
    /// Combines a token provider and a page fetcher.
    #[must_use]
    pub const fn new(tokens: TokenProvider<I>, fetcher: PageFetcher) -> Self {
        Self { tokens, fetcher }
    }

    /// Runs one retrieval.
    ///
    /// Cancellation during pagination is not an error: the records gathered
    /// so far are returned with [`StopReason::Cancelled`]. Cancellation while
    /// the token is being acquired ends the run at once with
    /// [`Error::Cancelled`], since nothing has been retrieved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if no token can be acquired,
    /// [`Error::Cancelled`] if cancelled first, and [`Error::Fetch`] if a
    /// page request fails.
    pub async fn run(
        &mut self,
        credentials: &Credentials,
        endpoint: &Url,
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let token = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!("Cancelled before an access token was acquired");
                return Err(Error::Cancelled);
            }
            token = self.tokens.acquire(credentials) => token?,
        };
        let fetched = self
            .fetcher
            .fetch_all(endpoint, &token, options.limit, cancel)
            .await?;

        let (records, validation_errors) = if options.validate {
            let report = schema::validate(&fetched.records);
            (Records::Validated(report.messages), report.errors)
        } else {
            (Records::Raw(fetched.records), Vec::new())
        };

        info!(
            records = records.len(),
            pages = fetched.pages,
            validation_errors = validation_errors.len(),
            "Run complete"
        );

        Ok(RunOutcome {
            records,
            validation_errors,
            pages: fetched.pages,
            stop: fetched.stop,
        })
    }
}

impl MailGraph<ConfidentialClient> {
    /// A client for the application described by `credentials`.
    ///
    /// Token and page requests share one connection pool.
    #[must_use]
    pub fn confidential(credentials: &Credentials) -> Self {
        Self::with_http_client(credentials, Client::new())
    }

    /// Like [`MailGraph::confidential`], sending every request through
    /// `http_client`.
    #[must_use]
    pub fn with_http_client(credentials: &Credentials, http_client: Client) -> Self {
        let identity =
            ConfidentialClient::from_credentials(credentials).with_http_client(http_client.clone());
        Self::new(
            TokenProvider::new(identity),
            PageFetcher::with_http_client(http_client),
        )
    }
}

/// Runs one retrieval from a loaded configuration.
///
/// # Errors
///
/// Returns an error naming the failed stage: config, auth or fetch.
/// Cancellation before a token is acquired is [`Error::Cancelled`].
pub async fn run(
    config: &Config,
    options: RunOptions,
    cancel: &CancellationToken,
) -> Result<RunOutcome> {
    let credentials = config.credentials()?;
    MailGraph::confidential(&credentials)
        .run(&credentials, &config.endpoint, options, cancel)
        .await
}
