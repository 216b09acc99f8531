//! Content digests for notarization proofs.
//!
//! Every proof in the compliance layer is backed by a SHA-256 digest of the
//! exact representation of the notarized data. JSON objects are serialized
//! with their keys sorted so that equal values always produce equal digests.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute SHA256 hash of content.
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Digest of a JSON value, taken over its canonical (sorted-key, compact)
/// JSON form. Strings keep their quotes, so a string never shares a digest
/// with the value it encodes.
pub fn digest_value(data: &Value) -> String {
    compute_hash(canonical_json(data).as_bytes())
}

/// Compact JSON with object keys in lexical order at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compute_hash() {
        let hash1 = compute_hash(b"hello");
        let hash2 = compute_hash(b"hello");
        let hash3 = compute_hash(b"world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 64); // SHA256 = 32 bytes = 64 hex chars
    }

    #[test]
    fn test_string_hashed_as_quoted_json() {
        assert_eq!(digest_value(&json!("hello")), compute_hash(b"\"hello\""));
        assert_ne!(digest_value(&json!("hello")), compute_hash(b"hello"));
    }

    #[test]
    fn test_string_encoding_does_not_collide_with_object() {
        let object = json!({ "amount": 100, "to": "acct-1" });
        let encoded = json!(canonical_json(&object));
        assert_ne!(digest_value(&object), digest_value(&encoded));
    }

    #[test]
    fn test_key_order_does_not_change_digest() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":{"y":2,"x":[1,2]}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":{"x":[1,2],"y":2},"b":1}"#).unwrap();

        assert_eq!(canonical_json(&a), r#"{"a":{"x":[1,2],"y":2},"b":1}"#);
        assert_eq!(digest_value(&a), digest_value(&b));
    }

    #[test]
    fn test_single_character_change_changes_digest() {
        let original = json!({ "title": "Sunrise", "frames": 24 });
        let mutated = json!({ "title": "Sunrisf", "frames": 24 });
        assert_ne!(digest_value(&original), digest_value(&mutated));
    }
}
