//! Task → project reference, as found in storage.
//!
//! Historical write paths stored the reference under two field names and as
//! either a plain string or a native identifier. Reads accept every shape;
//! writes always produce the canonical field holding a native identifier
//! whenever the value parses as one.

use super::document::{as_object_id, object_id_value, Document};
use super::object_id::ObjectId;
use super::validation::ValidationError;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Field name used by current write paths.
pub const CANONICAL_PROJECT_FIELD: &str = "projetId";
/// Field name used by earlier schema versions.
pub const LEGACY_PROJECT_FIELD: &str = "projectId";

/// Stored value of a project reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefValue {
    Text(String),
    Native(ObjectId),
}

impl RefValue {
    fn from_json(field: &'static str, value: &Value) -> Result<Option<Self>, ValidationError> {
        match value {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(Self::Text(text.clone()))),
            other => as_object_id(other)
                .map(|id| Some(Self::Native(id)))
                .ok_or(ValidationError::WrongType {
                    field,
                    expected: "string or object id",
                }),
        }
    }

    /// Logical project id as text (hex for native identifiers).
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Native(id) => id.to_hex(),
        }
    }

    /// Canonical stored form: native when the text parses as an identifier.
    pub fn to_canonical_json(&self) -> Value {
        match self {
            Self::Native(id) => object_id_value(id),
            Self::Text(text) => match ObjectId::parse_str(text) {
                Ok(id) => object_id_value(&id),
                Err(_) => Value::String(text.clone()),
            },
        }
    }
}

/// Boundary representation of a task's owning project.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProjectRef {
    #[default]
    Unset,
    Legacy {
        field: &'static str,
        value: RefValue,
    },
    Canonical(RefValue),
}

impl ProjectRef {
    /// Reads the reference without modifying the document.
    ///
    /// The canonical field wins when both names are present.
    pub fn read(document: &Document) -> Result<Self, ValidationError> {
        if let Some(raw) = document.get(CANONICAL_PROJECT_FIELD) {
            if let Some(value) = RefValue::from_json(CANONICAL_PROJECT_FIELD, raw)? {
                return Ok(Self::Canonical(value));
            }
        }
        if let Some(raw) = document.get(LEGACY_PROJECT_FIELD) {
            if let Some(value) = RefValue::from_json(LEGACY_PROJECT_FIELD, raw)? {
                return Ok(Self::Legacy {
                    field: LEGACY_PROJECT_FIELD,
                    value,
                });
            }
        }
        Ok(Self::Unset)
    }

    pub fn value(&self) -> Option<&RefValue> {
        match self {
            Self::Unset => None,
            Self::Legacy { value, .. } | Self::Canonical(value) => Some(value),
        }
    }

    /// Logical project id regardless of storage shape.
    pub fn project_id(&self) -> Option<String> {
        self.value().map(RefValue::as_text)
    }
}

impl Serialize for ProjectRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.project_id() {
            Some(id) => serializer.serialize_some(&id),
            None => serializer.serialize_none(),
        }
    }
}

/// Rewrites any reference in `document` into canonical form, in place.
///
/// The legacy field is always removed. A `null` reference is kept as `null`
/// under the canonical name so a patch can clear it.
pub fn normalize_project_ref(document: &mut Document) -> Result<(), ValidationError> {
    let legacy = document.remove(LEGACY_PROJECT_FIELD);
    let raw = match document.remove(CANONICAL_PROJECT_FIELD) {
        Some(canonical) => canonical,
        None => match legacy {
            Some(legacy) => legacy,
            None => return Ok(()),
        },
    };

    let normalized = match RefValue::from_json(CANONICAL_PROJECT_FIELD, &raw)? {
        Some(value) => value.to_canonical_json(),
        None => Value::Null,
    };
    document.insert(CANONICAL_PROJECT_FIELD.to_string(), normalized);
    Ok(())
}

/// Stamps the canonical reference with a freshly created project id.
pub fn stamp_project_ref(document: &mut Document, project_id: &ObjectId) {
    document.remove(LEGACY_PROJECT_FIELD);
    document.insert(
        CANONICAL_PROJECT_FIELD.to_string(),
        object_id_value(project_id),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HEX: &str = "507f1f77bcf86cd799439011";

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn read_covers_every_historical_shape() {
        let id = ObjectId::parse_str(HEX).unwrap();

        let canonical_text = doc(json!({"projetId": HEX}));
        assert_eq!(
            ProjectRef::read(&canonical_text).unwrap(),
            ProjectRef::Canonical(RefValue::Text(HEX.to_string()))
        );

        let legacy_native = doc(json!({"projectId": {"$oid": HEX}}));
        assert_eq!(
            ProjectRef::read(&legacy_native).unwrap(),
            ProjectRef::Legacy {
                field: LEGACY_PROJECT_FIELD,
                value: RefValue::Native(id)
            }
        );

        assert_eq!(ProjectRef::read(&doc(json!({}))).unwrap(), ProjectRef::Unset);
        assert!(ProjectRef::read(&doc(json!({"projetId": 12}))).is_err());
    }

    #[test]
    fn normalize_moves_legacy_text_to_canonical_native() {
        let mut document = doc(json!({"titre": "t", "projectId": HEX}));
        normalize_project_ref(&mut document).unwrap();

        assert!(!document.contains_key(LEGACY_PROJECT_FIELD));
        assert_eq!(document[CANONICAL_PROJECT_FIELD], json!({"$oid": HEX}));
    }

    #[test]
    fn normalize_keeps_non_identifier_text() {
        let mut document = doc(json!({"projetId": "projet-42"}));
        normalize_project_ref(&mut document).unwrap();
        assert_eq!(document[CANONICAL_PROJECT_FIELD], json!("projet-42"));
    }
}
