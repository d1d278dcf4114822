//! Canonical JSON and content hashes.
//!
//! The canonical form is compact JSON with object keys sorted by their UTF-8
//! bytes at every level. It does not depend on how the value was built or on
//! serde_json's map ordering features.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Prefix for bundle ids.
pub const BUNDLE_ID_PREFIX: &str = "bundle-";

/// Serialize a value in canonical form.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
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
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// SHA-256 hex digest of bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// SHA-256 of a value's canonical form.
pub fn content_hash(value: &Value) -> String {
    sha256_hex(canonical_json(value).as_bytes())
}

/// Derive a bundle id from the ordered session hashes.
pub fn bundle_id<S: AsRef<str>>(session_hashes: &[S]) -> String {
    let mut hasher = Sha256::new();
    for hash in session_hashes {
        hasher.update(hash.as_ref().as_bytes());
        hasher.update(b"\n");
    }
    let digest = hex::encode(hasher.finalize());
    format!("{}{}", BUNDLE_ID_PREFIX, &digest[..16])
}
