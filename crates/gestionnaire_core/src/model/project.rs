//! Project entity (`projets` collection).

use super::document::{document_id, Document, CREATED_AT_FIELD, ID_FIELD};
use super::object_id::ObjectId;
use super::validation::{optional_text, remaining_fields, required_text, ValidationError};
use serde::Serialize;

pub const TITLE_FIELD: &str = "titre";
pub const DESCRIPTION_FIELD: &str = "description";

const KNOWN_FIELDS: &[&str] = &[ID_FIELD, TITLE_FIELD, DESCRIPTION_FIELD, CREATED_AT_FIELD];

/// Typed view over one stored project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub titre: String,
    pub description: Option<String>,
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Document,
}

impl Project {
    pub fn from_document(document: &Document) -> Result<Self, ValidationError> {
        let id = document_id(document).ok_or(ValidationError::WrongType {
            field: ID_FIELD,
            expected: "an object id",
        })?;
        Ok(Self {
            id,
            titre: required_text(document, TITLE_FIELD)?,
            description: optional_text(document, DESCRIPTION_FIELD)?,
            created_at: optional_text(document, CREATED_AT_FIELD)?,
            extra: remaining_fields(document, KNOWN_FIELDS),
        })
    }
}

/// Validates caller fields for a new project.
pub fn prepare_new_project(document: &Document) -> Result<(), ValidationError> {
    required_text(document, TITLE_FIELD)?;
    optional_text(document, DESCRIPTION_FIELD)?;
    Ok(())
}
