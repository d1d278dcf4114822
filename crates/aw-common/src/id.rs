//! Deterministic identifiers.

use sha2::{Digest, Sha256};

/// Prefix for correlation ids derived from (cwd, start time).
pub const CORRELATION_HASH_PREFIX: &str = "conv-";

/// Derive a stable correlation id from a working directory and start time.
///
/// Used when a conversation has neither a hook session id nor a transcript id.
/// Format: `conv-<16 hex chars>`.
pub fn correlation_hash(cwd: &str, start_time: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cwd.as_bytes());
    hasher.update([0u8]);
    hasher.update(start_time.to_be_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}{}", CORRELATION_HASH_PREFIX, &digest[..16])
}
