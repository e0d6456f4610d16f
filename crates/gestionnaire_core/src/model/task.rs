//! Task entity (`taches` collection).
//!
//! # Invariants
//! - `titre` is required and non-blank on every write.
//! - `created_at` and `_id` are set once at creation and never patched.
//! - The project reference is written canonically; see [`super::project_ref`].

use super::document::{document_id, path_touches, Document, CREATED_AT_FIELD, ID_FIELD};
use super::object_id::ObjectId;
use super::project_ref::{
    normalize_project_ref, ProjectRef, CANONICAL_PROJECT_FIELD, LEGACY_PROJECT_FIELD,
};
use super::validation::{optional_text, remaining_fields, required_text, ValidationError};
use serde::Serialize;

pub const TITLE_FIELD: &str = "titre";
pub const STATUS_FIELD: &str = "status";
pub const ASSIGNEE_FIELD: &str = "assignee";

const KNOWN_FIELDS: &[&str] = &[
    ID_FIELD,
    TITLE_FIELD,
    STATUS_FIELD,
    ASSIGNEE_FIELD,
    CREATED_AT_FIELD,
    CANONICAL_PROJECT_FIELD,
    LEGACY_PROJECT_FIELD,
];

/// Typed view over one stored task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub titre: String,
    pub status: Option<String>,
    /// User id as plain text; not checked against `users`.
    pub assignee: Option<String>,
    pub created_at: Option<String>,
    #[serde(rename = "projetId")]
    pub project_ref: ProjectRef,
    /// Caller-defined fields kept verbatim.
    #[serde(flatten)]
    pub extra: Document,
}

impl Task {
    /// Decodes a stored document. Rejects documents breaking entity rules.
    pub fn from_document(document: &Document) -> Result<Self, ValidationError> {
        let id = document_id(document).ok_or(ValidationError::WrongType {
            field: ID_FIELD,
            expected: "an object id",
        })?;
        Ok(Self {
            id,
            titre: required_text(document, TITLE_FIELD)?,
            status: optional_text(document, STATUS_FIELD)?,
            assignee: optional_text(document, ASSIGNEE_FIELD)?,
            created_at: optional_text(document, CREATED_AT_FIELD)?,
            project_ref: ProjectRef::read(document)?,
            extra: remaining_fields(document, KNOWN_FIELDS),
        })
    }
}

/// Validates and normalizes caller fields for a new task.
pub fn prepare_new_task(document: &mut Document) -> Result<(), ValidationError> {
    required_text(document, TITLE_FIELD)?;
    optional_text(document, STATUS_FIELD)?;
    optional_text(document, ASSIGNEE_FIELD)?;
    normalize_project_ref(document)
}

/// Validates and normalizes a partial update.
///
/// Identity and creation stamp are dropped from the patch, never rejected.
pub fn prepare_task_patch(patch: &mut Document) -> Result<(), ValidationError> {
    patch.retain(|path, _| {
        !path_touches(path, ID_FIELD) && !path_touches(path, CREATED_AT_FIELD)
    });
    if patch.contains_key(TITLE_FIELD) {
        required_text(patch, TITLE_FIELD)?;
    }
    optional_text(patch, STATUS_FIELD)?;
    optional_text(patch, ASSIGNEE_FIELD)?;
    normalize_project_ref(patch)
}
