//! Redaction categories.

use serde::{Deserialize, Serialize};

/// Category a redaction is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// API keys, tokens, private keys, credentials.
    Secrets,
    /// Emails, phone numbers, IP addresses, card numbers.
    Pii,
    /// User names embedded in home directory paths.
    Paths,
    /// User-supplied regexes.
    Custom,
    /// Speculative: high-entropy tokens no named rule matched.
    HighEntropy,
}

impl Category {
    /// Categories in the order the sanitizer applies them.
    pub const ALL: &'static [Category] = &[
        Category::Secrets,
        Category::Pii,
        Category::Paths,
        Category::Custom,
        Category::HighEntropy,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Secrets => "secrets",
            Category::Pii => "pii",
            Category::Paths => "paths",
            Category::Custom => "custom",
            Category::HighEntropy => "high_entropy",
        }
    }

    /// Whether redactions in this category are a heuristic guess rather than
    /// a named-rule match.
    pub fn is_heuristic(&self) -> bool {
        matches!(self, Category::HighEntropy)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
