//! # mailgraph-core
//!
//! Mailbox retrieval from the Microsoft Graph API.
//!
//! This crate provides:
//! - Configuration loading and validation
//! - Paged fetching that follows `@odata.nextLink` with a request budget
//!   and cooperative cancellation
//! - Tolerant validation of message records, including base64 attachment
//!   content, with field-scoped errors
//! - JSON output to a file or the console

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod fetch;
pub mod output;
pub mod schema;
pub mod service;

pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use fetch::{FetchError, FetchOutcome, PageFetcher, PageLimit, RawRecord, StopReason};
pub use output::OutputError;
pub use schema::{ValidatedAttachment, ValidatedMessage, ValidationError, ValidationReport};
pub use service::{MailGraph, Records, RunOptions, RunOutcome, run};
