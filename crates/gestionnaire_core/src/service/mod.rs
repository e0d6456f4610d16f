//! Core use-case services.
//!
//! # Responsibility
//! - Expose the operations callers (routing, CLI) invoke with parsed input.
//! - Orchestrate resolver, pagination and gateway calls per operation.
//!
//! # Invariants
//! - Services hold an injected store handle and no other mutable state.
//! - Services never bypass entity validation on write paths.

use crate::error::{CoreError, CoreResult};
use crate::model::document::{document_id, object_id_value, Document, CREATED_AT_FIELD, ID_FIELD};
use crate::model::object_id::ObjectId;
use crate::model::timestamp::now_iso8601;
use crate::model::validation::ValidationError;
use crate::repo::document_store::{Collection, DocumentStore, StoreError};
use serde_json::Value;

pub mod backup_service;
pub mod project_service;
pub mod report_service;
pub mod task_service;
pub mod user_service;

/// Parses a caller-supplied document id.
pub(crate) fn parse_id(id: &str) -> CoreResult<ObjectId> {
    ObjectId::parse_str(id.trim()).map_err(|err| CoreError::InvalidArgument(err.to_string()))
}

/// Stamps identity and creation time, then inserts.
///
/// Caller-supplied `_id` and `created_at` are discarded. Returns the
/// generated id with the stored document.
pub(crate) fn insert_new<S: DocumentStore>(
    store: &S,
    collection: Collection,
    mut fields: Document,
) -> CoreResult<(ObjectId, Document)> {
    fields.remove(ID_FIELD);
    fields.insert(CREATED_AT_FIELD.to_string(), Value::String(now_iso8601()));
    let id = store.insert_one(collection, fields.clone())?;
    fields.insert(ID_FIELD.to_string(), object_id_value(&id));
    Ok((id, fields))
}

/// Decodes a stored document into its typed view.
///
/// A stored document breaking entity rules is a storage data error, not a
/// caller error.
pub(crate) fn decode<T>(
    collection: Collection,
    document: &Document,
    decoder: impl Fn(&Document) -> Result<T, ValidationError>,
) -> CoreResult<T> {
    decoder(document).map_err(|err| {
        let id = document_id(document).map_or_else(|| "<no id>".to_string(), |id| id.to_hex());
        CoreError::Storage(StoreError::InvalidData(format!(
            "{collection} document {id}: {err}"
        )))
    })
}
