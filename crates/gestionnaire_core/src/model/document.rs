//! Raw document shape shared by every collection.
//!
//! Documents are JSON objects. Native identifiers are embedded with the
//! Extended-JSON wrapper `{"$oid": "<24 hex>"}` so a stored string and a stored
//! identifier with the same hex stay distinguishable.

use super::object_id::ObjectId;
use serde_json::{Map, Value};

/// One stored document.
pub type Document = Map<String, Value>;

/// Primary key field present on every stored document.
pub const ID_FIELD: &str = "_id";
/// Server-stamped creation timestamp (ISO-8601 string).
pub const CREATED_AT_FIELD: &str = "created_at";

const OID_KEY: &str = "$oid";

/// Wraps an identifier in its embedded document form.
pub fn object_id_value(id: &ObjectId) -> Value {
    let mut wrapper = Map::with_capacity(1);
    wrapper.insert(OID_KEY.to_string(), Value::String(id.to_hex()));
    Value::Object(wrapper)
}

/// Reads an embedded identifier. Plain strings are not identifiers here.
pub fn as_object_id(value: &Value) -> Option<ObjectId> {
    let Value::Object(wrapper) = value else {
        return None;
    };
    if wrapper.len() != 1 {
        return None;
    }
    wrapper
        .get(OID_KEY)
        .and_then(Value::as_str)
        .and_then(|hex| ObjectId::parse_str(hex).ok())
}

/// Returns the document `_id` when it is a native identifier.
pub fn document_id(document: &Document) -> Option<ObjectId> {
    document.get(ID_FIELD).and_then(as_object_id)
}

/// Resolves a dotted path (`_id.year`) inside a document.
pub fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = document.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Whether the dotted `path` names `field` itself or anything nested in it.
pub fn path_touches(path: &str, field: &str) -> bool {
    path.split('.').next() == Some(field)
}

/// Builds the JSON path used by SQLite `json_extract` for a dotted field.
///
/// Every segment is quoted so field names like `$oid` stay literal.
pub fn json_path(path: &str) -> String {
    let mut out = String::from("$");
    for segment in path.split('.') {
        out.push_str(".\"");
        out.push_str(&segment.replace('"', "\\\""));
        out.push('"');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{as_object_id, get_path, json_path, object_id_value, path_touches, Document};
    use crate::model::object_id::ObjectId;
    use serde_json::json;

    #[test]
    fn embedded_identifier_roundtrip_rejects_plain_strings() {
        let id = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(as_object_id(&object_id_value(&id)), Some(id));
        assert_eq!(as_object_id(&json!("507f1f77bcf86cd799439011")), None);
        assert_eq!(
            as_object_id(&json!({"$oid": "507f1f77bcf86cd799439011", "x": 1})),
            None
        );
    }

    #[test]
    fn get_path_walks_nested_objects() {
        let doc: Document = serde_json::from_value(json!({"_id": {"year": 2025}})).unwrap();
        assert_eq!(get_path(&doc, "_id.year"), Some(&json!(2025)));
        assert_eq!(get_path(&doc, "_id.month"), None);
        assert_eq!(get_path(&doc, "missing"), None);
    }

    #[test]
    fn path_touches_matches_field_and_nested_paths_only() {
        assert!(path_touches("_id", "_id"));
        assert!(path_touches("_id.$oid", "_id"));
        assert!(!path_touches("_idx", "_id"));
        assert!(!path_touches("meta._id", "_id"));
    }

    #[test]
    fn json_path_quotes_each_segment() {
        assert_eq!(json_path("projetId"), "$.\"projetId\"");
        assert_eq!(json_path("projetId.$oid"), "$.\"projetId\".\"$oid\"");
    }
}
