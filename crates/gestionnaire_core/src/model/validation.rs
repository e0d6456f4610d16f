//! Field-level validation shared by entity write and read paths.

use super::document::Document;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Document field failed an entity rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField(&'static str),
    BlankField(&'static str),
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "field `{field}` is required"),
            Self::BlankField(field) => write!(f, "field `{field}` must not be blank"),
            Self::WrongType { field, expected } => {
                write!(f, "field `{field}` must be {expected}")
            }
        }
    }
}

impl Error for ValidationError {}

/// Returns a required, non-blank string field.
pub(crate) fn required_text(
    document: &Document,
    field: &'static str,
) -> Result<String, ValidationError> {
    match document.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(text)) if text.trim().is_empty() => {
            Err(ValidationError::BlankField(field))
        }
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(ValidationError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

/// Returns an optional string field; `null` reads as absent.
pub(crate) fn optional_text(
    document: &Document,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(ValidationError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

/// Moves every field not listed in `known` into a new document.
pub(crate) fn remaining_fields(document: &Document, known: &[&str]) -> Document {
    document
        .iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
