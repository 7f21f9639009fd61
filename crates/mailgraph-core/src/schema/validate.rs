//! Tolerant mapping from raw records to [`ValidatedMessage`].
//!
//! Unknown keys are ignored, missing keys stay absent and `null` counts as
//! missing. A value of the wrong shape is coerced when that is unambiguous
//! (`"42"` for an integer, `"true"` for a boolean) and otherwise dropped with
//! a [`ValidationError`] naming the record, attachment and field. No error
//! ever rejects a whole record or the batch.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::model::{Body, EmailAddress, Sender, ValidatedAttachment, ValidatedMessage};
use crate::fetch::RawRecord;

/// What was wrong with a field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The JSON type cannot be used for this field.
    InvalidType {
        /// What the field accepts.
        expected: &'static str,
        /// JSON type that was found.
        found: &'static str,
    },
    /// A timestamp string that is not ISO 8601.
    InvalidDateTime(String),
    /// Binary content that is not valid base64.
    InvalidBase64(String),
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidType { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::InvalidDateTime(value) => write!(f, "not a valid date-time: {value:?}"),
            Self::InvalidBase64(reason) => write!(f, "content is not valid base64: {reason}"),
        }
    }
}

/// A problem with one field of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Index of the record in the batch.
    pub record: usize,
    /// Index of the attachment within the record, for attachment fields.
    pub attachment: Option<usize>,
    /// Source key path, e.g. `sender.emailAddress.address` or `contentBytes`.
    pub field: String,
    /// What went wrong.
    pub kind: ValidationErrorKind,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {}", self.record)?;
        if let Some(attachment) = self.attachment {
            write!(f, ", attachment {attachment}")?;
        }
        write!(f, ", field `{}`: {}", self.field, self.kind)
    }
}

impl std::error::Error for ValidationError {}

/// Validated messages plus every field-level problem found on the way.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// One message per input record, in input order.
    pub messages: Vec<ValidatedMessage>,
    /// Field errors, in the order they were found.
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// Errors belonging to one record.
    pub fn errors_for(&self, record: usize) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |error| error.record == record)
    }
}

/// Validates a batch of raw records.
///
/// An item that is not an object yields an empty message in its position
/// and an error on field `value[index]`.
#[must_use]
pub fn validate(records: &[RawRecord]) -> ValidationReport {
    let mut errors = Vec::new();
    let messages = records
        .iter()
        .enumerate()
        .map(|(index, record)| match record {
            Value::Object(object) => validate_message(index, object, &mut errors),
            other => {
                errors.push(ValidationError {
                    record: index,
                    attachment: None,
                    field: format!("value[{index}]"),
                    kind: ValidationErrorKind::InvalidType {
                        expected: "object",
                        found: json_type(other),
                    },
                });
                ValidatedMessage::default()
            }
        })
        .collect::<Vec<_>>();

    for error in &errors {
        warn!(%error, "Validation error");
    }
    debug!(
        messages = messages.len(),
        errors = errors.len(),
        "Validated records"
    );

    ValidationReport { messages, errors }
}

/// Validates one record, appending its field errors to `errors`.
pub fn validate_message(
    index: usize,
    record: &Map<String, Value>,
    errors: &mut Vec<ValidationError>,
) -> ValidatedMessage {
    let mut fields = Fields::new(record, index, None, errors);

    let sender = fields.child("sender").map(|mut sender| Sender {
        email_address: sender.child("emailAddress").map(|mut address| EmailAddress {
            address: address.string("address"),
            name: address.string("name"),
        }),
    });
    let subject = fields.string("subject");
    let received_datetime = fields.datetime("receivedDateTime");
    let body = fields.child("body").map(|mut body| Body {
        content: body.string("content"),
        content_type: body.string("contentType"),
    });
    let attachments = fields.list("attachments").map(|items| {
        let mut attachments = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if let Some(mut attachment) = fields.attachment(position, item) {
                attachments.push(validate_attachment(&mut attachment));
            }
        }
        attachments
    });

    ValidatedMessage {
        sender,
        subject,
        received_datetime,
        body,
        attachments,
    }
}

fn validate_attachment(fields: &mut Fields<'_, '_>) -> ValidatedAttachment {
    ValidatedAttachment {
        content_type: fields.string("contentType"),
        content: fields.base64("contentBytes"),
        id: fields.string("id"),
        is_inline: fields.boolean("isInline"),
        last_modified_datetime: fields.datetime("lastModifiedDateTime"),
        name: fields.string("name"),
        size: fields.integer("size"),
    }
}

/// Typed reads from one JSON object, recording failures.
struct Fields<'a, 'e> {
    object: &'a Map<String, Value>,
    prefix: String,
    record: usize,
    attachment: Option<usize>,
    errors: &'e mut Vec<ValidationError>,
}

impl<'a, 'e> Fields<'a, 'e> {
    const fn new(
        object: &'a Map<String, Value>,
        record: usize,
        attachment: Option<usize>,
        errors: &'e mut Vec<ValidationError>,
    ) -> Self {
        Self {
            object,
            prefix: String::new(),
            record,
            attachment,
            errors,
        }
    }

    /// The value under `key`, treating `null` as absent.
    fn value(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|value| !value.is_null())
    }

    fn reject(&mut self, key: &str, kind: ValidationErrorKind) {
        self.errors.push(ValidationError {
            record: self.record,
            attachment: self.attachment,
            field: format!("{}{key}", self.prefix),
            kind,
        });
    }

    fn wrong_type(&mut self, key: &str, expected: &'static str, found: &Value) {
        self.reject(
            key,
            ValidationErrorKind::InvalidType {
                expected,
                found: json_type(found),
            },
        );
    }

    /// Reader for a nested object.
    fn child(&mut self, key: &str) -> Option<Fields<'a, '_>> {
        let value = self.value(key)?;
        let Value::Object(object) = value else {
            self.wrong_type(key, "object", value);
            return None;
        };
        Some(Fields {
            object,
            prefix: format!("{}{key}.", self.prefix),
            record: self.record,
            attachment: self.attachment,
            errors: &mut *self.errors,
        })
    }

    /// Reader for the attachment at `position`, or `None` if it is not an object.
    fn attachment(&mut self, position: usize, value: &'a Value) -> Option<Fields<'a, '_>> {
        let Value::Object(object) = value else {
            self.wrong_type(&format!("attachments[{position}]"), "object", value);
            return None;
        };
        Some(Fields::new(
            object,
            self.record,
            Some(position),
            &mut *self.errors,
        ))
    }

    fn list(&mut self, key: &str) -> Option<&'a Vec<Value>> {
        let value = self.value(key)?;
        let Value::Array(items) = value else {
            self.wrong_type(key, "list", value);
            return None;
        };
        Some(items)
    }

    fn string(&mut self, key: &str) -> Option<String> {
        let value = self.value(key)?;
        let Value::String(text) = value else {
            self.wrong_type(key, "string", value);
            return None;
        };
        Some(text.clone())
    }

    fn boolean(&mut self, key: &str) -> Option<bool> {
        let value = self.value(key)?;
        let coerced = match value {
            Value::Bool(flag) => Some(*flag),
            Value::String(text) => parse_bool(text),
            Value::Number(number) => match number.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            _ => None,
        };
        if coerced.is_none() {
            self.wrong_type(key, "boolean", value);
        }
        coerced
    }

    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    fn integer(&mut self, key: &str) -> Option<i64> {
        let value = self.value(key)?;
        let coerced = match value {
            Value::Number(number) => number.as_i64().or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0 && float.abs() < 9.0e15)
                    .map(|float| float as i64)
            }),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        };
        if coerced.is_none() {
            self.wrong_type(key, "integer", value);
        }
        coerced
    }

    fn datetime(&mut self, key: &str) -> Option<DateTime<Utc>> {
        let value = self.value(key)?;
        let Value::String(text) = value else {
            self.wrong_type(key, "date-time string", value);
            return None;
        };
        let parsed = parse_datetime(text);
        if parsed.is_none() {
            self.reject(key, ValidationErrorKind::InvalidDateTime(text.clone()));
        }
        parsed
    }

    fn base64(&mut self, key: &str) -> Option<Vec<u8>> {
        let value = self.value(key)?;
        let Value::String(text) = value else {
            self.wrong_type(key, "base64 string", value);
            return None;
        };
        match STANDARD.decode(text) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                self.reject(key, ValidationErrorKind::InvalidBase64(e.to_string()));
                None
            }
        }
    }
}

/// Parses an ISO 8601 timestamp; one without an offset is taken as UTC.
fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
