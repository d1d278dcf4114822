//! Sanitization and export-safety engine for agentwatch.
//!
//! This crate holds everything that decides what a shared session may
//! contain:
//!
//! - **Pattern library**: named detection rules (secrets, PII, paths), each
//!   with a category and a placeholder token.
//! - **Sanitizer**: applies the enabled categories to strings or JSON values
//!   and counts redactions per category.
//! - **Residue checker**: an independent, non-configurable re-scan of
//!   sanitized output for leak signatures. Private key material blocks export.
//! - **Field selection**: typed allow-list patterns (`a.b`, `a[].b`, `*`).
//! - **Profiles**: named (field allow-list + redaction config) pairs, built in
//!   or user defined.
//!
//! # Example
//!
//! ```
//! use aw_redact::{sanitize_str, Category, RedactionConfig};
//!
//! let config = RedactionConfig::default();
//! let (output, report) = sanitize_str("token: sk-ABCDEF1234567890", &config).unwrap();
//! assert!(output.contains("[REDACTED_SECRET]"));
//! assert_eq!(report.count(Category::Secrets), 1);
//! ```

pub mod category;
pub mod entropy;
pub mod error;
pub mod fields;
pub mod patterns;
pub mod profile;
pub mod residue;
pub mod sanitizer;

pub use category::Category;
pub use entropy::{shannon_entropy, EntropyConfig};
pub use error::{RedactionError, Result};
pub use fields::{
    apply_field_selection, apply_field_selection_with_report, FieldPattern, FieldSelector,
    Segment,
};
pub use patterns::{PatternRule, PLACEHOLDER_HIGH_ENTROPY};
pub use profile::{
    builtin_profiles, resolve_profile, ProfileStore, RedactionProfile, FULL, METADATA_ONLY, MODERATE,
};
pub use residue::{residue_check, residue_check_value, ResidueFinding, ResidueKind, ResidueReport};
pub use sanitizer::{sanitize, sanitize_str, RedactionConfig, SanitizeReport, Sanitizer};
