//! Validated message types.
//!
//! Every field is optional: a key missing from the source record, or one
//! whose value could not be used, is simply absent here.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// A mailbox message after validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidatedMessage {
    /// Who sent the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    /// Subject line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// When the message arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_datetime: Option<DateTime<Utc>>,
    /// Message body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    /// Attachments, in server order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<ValidatedAttachment>>,
}

/// Sender wrapper, as nested by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sender {
    /// Sender address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<EmailAddress>,
}

/// An address and display name pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Message body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Body {
    /// Body text or markup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// `text` or `html`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// A file attachment with its content decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidatedAttachment {
    /// MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Decoded content bytes.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_base64"
    )]
    pub content: Option<Vec<u8>>,
    /// Attachment ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Whether the attachment is rendered inline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_inline: Option<bool>,
    /// Last modification time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_datetime: Option<DateTime<Utc>>,
    /// File name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Size in bytes, as reported by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

// Content is written back out as standard base64 text.
#[allow(clippy::ref_option)]
fn serialize_base64<S: Serializer>(
    content: &Option<Vec<u8>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    match content {
        Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}
