//! Paged retrieval from an `OData` collection endpoint.
//!
//! Each page is a JSON object with a `value` array and, when more results
//! exist, an `@odata.nextLink` URL. [`PageFetcher::fetch_all`] follows those
//! links one request at a time until the server stops supplying them, the
//! [`PageLimit`] is reached, or the caller cancels.

use std::num::NonZeroUsize;

use mailgraph_oauth::Token;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// One item of a page, exactly as the server sent it.
///
/// Items are normally objects; anything else is passed through for the
/// validator to report.
pub type RawRecord = serde_json::Value;

/// Errors that abort a fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure.
    #[error("request to {url} failed: {source}")]
    Http {
        /// Request target.
        url: String,
        /// Underlying error.
        source: reqwest::Error,
    },

    /// Non-success status code.
    #[error("{url} returned {status}: {body}")]
    Status {
        /// Request target.
        url: String,
        /// Response status.
        status: reqwest::StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Body is not a page object.
    #[error("malformed page from {url}: {source}")]
    MalformedPage {
        /// Request target.
        url: String,
        /// Parse failure.
        source: serde_json::Error,
    },
}

/// How many requests a fetch may issue, the first included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    /// At most this many requests.
    Pages(NonZeroUsize),
    /// Follow every continuation link.
    Unbounded,
}

impl PageLimit {
    /// Limit of `pages` requests; zero means unbounded.
    #[must_use]
    pub const fn from_count(pages: usize) -> Self {
        match NonZeroUsize::new(pages) {
            Some(pages) => Self::Pages(pages),
            None => Self::Unbounded,
        }
    }

    /// Whether `issued` requests exhaust this limit.
    #[must_use]
    pub const fn reached(self, issued: usize) -> bool {
        match self {
            Self::Pages(max) => issued >= max.get(),
            Self::Unbounded => false,
        }
    }
}

impl Default for PageLimit {
    /// A single request.
    fn default() -> Self {
        Self::Pages(NonZeroUsize::MIN)
    }
}

/// Why a fetch stopped. All of these are successful outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The last page had no continuation link.
    Exhausted,
    /// The page limit was reached with more pages available.
    PageLimit,
    /// The caller cancelled; records from completed pages are kept.
    Cancelled,
}

/// Result of a fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Records in page order, then in-page order.
    pub records: Vec<RawRecord>,
    /// Number of pages received.
    pub pages: usize,
    /// Why the loop ended.
    pub stop: StopReason,
}

#[derive(Debug, Deserialize)]
struct Page {
    value: Vec<RawRecord>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// Issues authenticated GETs and follows continuation links.
#[derive(Debug, Clone, Default)]
pub struct PageFetcher {
    http_client: Client,
}

impl PageFetcher {
    /// Creates a fetcher with a default HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured HTTP client.
    #[must_use]
    pub const fn with_http_client(http_client: Client) -> Self {
        Self { http_client }
    }

    /// Fetches `endpoint` and every following page, up to `limit` requests.
    ///
    /// Cancellation is observed before each request and while one is in
    /// flight; either way the records already accumulated are returned and
    /// the interrupted page is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// body that is not a page. Records from earlier pages are dropped.
    pub async fn fetch_all(
        &self,
        endpoint: &Url,
        token: &Token,
        limit: PageLimit,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        let mut url = endpoint.to_string();
        let mut records = Vec::new();
        let mut pages = 0;

        let stop = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let page = tokio::select! {
                biased;
                () = cancel.cancelled() => break StopReason::Cancelled,
                page = self.fetch_page(&url, token) => page?,
            };

            pages += 1;
            debug!(page = pages, records = page.value.len(), "Received page");
            records.extend(page.value);

            let Some(next_link) = page.next_link else {
                break StopReason::Exhausted;
            };
            if limit.reached(pages) {
                break StopReason::PageLimit;
            }
            url = next_link;
        };

        match stop {
            StopReason::Cancelled => warn!(pages, records = records.len(), "Fetch cancelled"),
            StopReason::PageLimit => {
                info!(pages, records = records.len(), "Page limit reached");
            }
            StopReason::Exhausted => info!(pages, records = records.len(), "Fetched all pages"),
        }

        Ok(FetchOutcome {
            records,
            pages,
            stop,
        })
    }

    async fn fetch_page(&self, url: &str, token: &Token) -> Result<Page, FetchError> {
        debug!(%url, "GET");
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&token.access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::MalformedPage {
            url: url.to_string(),
            source,
        })
    }
}
