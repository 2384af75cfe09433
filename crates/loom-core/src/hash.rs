//! Content addressing over a canonical document serialization.
//!
//! Identical field content must always produce the same digest regardless
//! of key ordering, and any value change must produce a different digest.
//! The canonical form sorts object keys recursively and uses compact
//! separators; arrays keep their order (sequence order is content).

use serde_json::Value;

use crate::document::FieldMap;

/// Render a JSON value in canonical form.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Keys render through Value::String so escaping stays JSON.
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Compute the BLAKE3 digest of a field mapping's canonical form.
///
/// Returns a string in the format: `blake3:{64-char-hex}`
pub fn content_hash(fields: &FieldMap) -> String {
    let canonical = canonical_json(&Value::Object(fields.clone()));
    let hash = blake3::hash(canonical.as_bytes());
    format!("blake3:{}", hash.to_hex())
}

/// Compose a content-addressed document identifier.
///
/// The namespace joins with `:` so the identifier stays a single URL
/// path segment.
pub fn content_address(namespace: Option<&str>, content_hash: &str) -> String {
    match namespace {
        Some(ns) => format!("{}:{}", ns, content_hash),
        None => content_hash.to_string(),
    }
}
