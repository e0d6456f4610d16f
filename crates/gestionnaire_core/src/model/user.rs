//! User entity (`users` collection). Profile fields are free-form.

use super::document::{document_id, Document, CREATED_AT_FIELD, ID_FIELD};
use super::object_id::ObjectId;
use super::validation::{optional_text, remaining_fields, ValidationError};
use serde::Serialize;

pub const ROLE_FIELD: &str = "role";

const KNOWN_FIELDS: &[&str] = &[ID_FIELD, ROLE_FIELD, CREATED_AT_FIELD];

/// Typed view over one stored user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub role: Option<String>,
    pub created_at: Option<String>,
    /// Profile fields (name, email, ...) kept verbatim.
    #[serde(flatten)]
    pub profile: Document,
}

impl User {
    pub fn from_document(document: &Document) -> Result<Self, ValidationError> {
        let id = document_id(document).ok_or(ValidationError::WrongType {
            field: ID_FIELD,
            expected: "an object id",
        })?;
        Ok(Self {
            id,
            role: optional_text(document, ROLE_FIELD)?,
            created_at: optional_text(document, CREATED_AT_FIELD)?,
            profile: remaining_fields(document, KNOWN_FIELDS),
        })
    }
}

/// Validates caller fields for a new user.
pub fn prepare_new_user(document: &Document) -> Result<(), ValidationError> {
    optional_text(document, ROLE_FIELD)?;
    Ok(())
}
