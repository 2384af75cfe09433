//! Document record model for the remote store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::hash;

/// JSON-compatible field mapping carried by every document.
///
/// Values are `serde_json::Value`, so fields may hold strings, numbers,
/// booleans, null, sequences, and nested mappings.
pub type FieldMap = Map<String, Value>;

/// A logical unit stored in the remote document database.
///
/// Identifiers are unique within a named collection. `updated_at` is
/// assigned by the state manager at write time, never by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Identifier, unique within its collection.
    pub id: String,
    /// Document content.
    pub fields: FieldMap,
    /// Digest of the canonical field content, used for deduplication.
    pub content_hash: String,
    /// Last-modified timestamp, stamped by the manager.
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Build a record with a freshly computed content hash and timestamp.
    pub fn new(id: impl Into<String>, fields: FieldMap) -> Self {
        let content_hash = hash::content_hash(&fields);
        Self {
            id: id.into(),
            fields,
            content_hash,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_new_stamps_hash_and_timestamp() {
        let before = Utc::now();
        let record = DocumentRecord::new("doc-1", fields(json!({"a": 1})));
        assert_eq!(record.id, "doc-1");
        assert!(record.content_hash.starts_with("blake3:"));
        assert!(record.updated_at >= before);
    }

    #[test]
    fn test_serde_round_trip() {
        let record = DocumentRecord::new(
            "doc-2",
            fields(json!({"title": "entropy", "tags": ["a", "b"], "score": 0.5})),
        );
        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: DocumentRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_nested_values_preserved() {
        let record = DocumentRecord::new(
            "doc-3",
            fields(json!({"nested": {"flag": true, "inner": [1, null]}})),
        );
        assert_eq!(
            record.fields["nested"]["inner"],
            json!([1, null])
        );
    }
}
