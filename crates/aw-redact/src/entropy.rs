//! High-entropy token detection.
//!
//! A safety net for secrets no named rule recognises. Candidates are runs of
//! token characters at least `min_length` long whose Shannon entropy exceeds
//! `threshold` bits per character.

use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default minimum run length for high-entropy candidates.
pub const DEFAULT_MIN_LENGTH: usize = 20;

/// Default entropy threshold in bits per character.
pub const DEFAULT_THRESHOLD: f64 = 3.5;

/// Tunables for the high-entropy heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntropyConfig {
    /// Entropy threshold (bits per character).
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Minimum contiguous token length.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_min_length() -> usize {
    DEFAULT_MIN_LENGTH
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_length: DEFAULT_MIN_LENGTH,
        }
    }
}

impl EntropyConfig {
    /// Compile the candidate-run regex for this configuration.
    pub(crate) fn candidate_regex(&self) -> Result<Regex> {
        let min = self.min_length.max(1);
        Regex::new(&format!(r"[A-Za-z0-9+=_\-]{{{},}}", min))
            .map_err(|_| crate::RedactionError::InvalidEntropyConfig(self.min_length))
    }

    /// Whether a candidate token looks like a secret.
    ///
    /// Skips runs that are letters/underscores/hyphens only (identifiers,
    /// placeholders) and pure hex digests such as commit hashes.
    pub fn is_plausible_secret(&self, token: &str) -> bool {
        if token.len() < self.min_length {
            return false;
        }
        if token
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == '_' || c == '-')
        {
            return false;
        }
        if token.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }
        shannon_entropy(token) > self.threshold
    }
}

/// Calculate Shannon entropy of a string in bits per byte.
///
/// Random base64 of moderate length sits well above 4; English words and
/// repeated characters sit well below 3.
pub fn shannon_entropy(value: &str) -> f64 {
    if value.is_empty() {
        return 0.0;
    }

    let mut freq = [0u32; 256];
    let len = value.len() as f64;

    for byte in value.bytes() {
        freq[byte as usize] += 1;
    }

    let mut entropy = 0.0;
    for &count in &freq {
        if count > 0 {
            let p = count as f64 / len;
            entropy -= p * p.log2();
        }
    }

    entropy
}
