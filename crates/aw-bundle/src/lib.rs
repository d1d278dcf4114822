//! Export bundles for agentwatch.
//!
//! This crate turns conversations into shareable, integrity-checked bundles:
//!
//! - [`prepare_sessions`] runs field selection, sanitization and the residue
//!   check over each session, then hashes, previews and scores it.
//! - [`Bundle`] pairs a manifest with the prepared sessions.
//! - [`BundleWriter`] emits JSON Lines or a ZIP of JSON Lines.
//! - [`BundleReader`] parses either form and re-verifies hashes and residue.
//!
//! # Bundle Format
//!
//! One manifest line followed by one line per session:
//!
//! ```text
//! {"type":"manifest","bundle_id":"bundle-…","version":"1.0.0","session_count":1,"sanitization":{…}}
//! {"type":"session","session_id":"s1","content_hash":"…","score":40,"data":{…}}
//! ```
//!
//! Content hashes are SHA-256 over the canonical JSON of the sanitized data,
//! so identical sanitized content always hashes identically.
//!
//! # Example
//!
//! ```no_run
//! use aw_bundle::{prepare_sessions, Bundle, BundleFormat, BundleReader, BundleWriter, PrepareConfig};
//! use std::path::Path;
//!
//! let raw = vec![serde_json::json!({"correlation_id": "s1"}).into()];
//! let result = prepare_sessions(&raw, &PrepareConfig::default()).unwrap();
//! let bundle = Bundle::from_preparation(&result, None).unwrap();
//! BundleWriter::new(bundle, BundleFormat::Zip)
//!     .write(Path::new("export.zip"))
//!     .unwrap();
//!
//! let report = BundleReader::open(Path::new("export.zip")).unwrap().verify();
//! assert!(report.is_valid());
//! ```

pub mod error;
pub mod hash;
pub mod manifest;
pub mod prepare;
pub mod reader;
pub mod score;
pub mod writer;

pub use error::{BundleError, Result};
pub use hash::{canonical_json, content_hash};
pub use manifest::{
    Bundle, BundleLine, BundleManifest, SanitizationSummary, SessionRecord, BUNDLE_VERSION,
};
pub use prepare::{
    prepare_sessions, prepare_with_profile, BlockedSession, ContributorMeta, Exclusion,
    ExclusionReason, PrepareConfig, PreparationResult, PreparationStats, PreparedSession,
    RawSession, DEFAULT_PREVIEW_CHARS,
};
pub use reader::{BundleReader, SessionResidue, VerificationReport};
pub use score::{quality_score, QualitySignals};
pub use writer::{BundleFormat, BundleWriter, BUNDLE_ENTRY_NAME};
