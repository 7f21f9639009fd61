//! Message schema and tolerant validation.

mod model;
mod validate;

pub use model::{Body, EmailAddress, Sender, ValidatedAttachment, ValidatedMessage};
pub use validate::{
    ValidationError, ValidationErrorKind, ValidationReport, validate, validate_message,
};
