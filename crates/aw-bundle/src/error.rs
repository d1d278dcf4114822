//! Error types for bundle operations.

use thiserror::Error;

/// Errors that can occur while preparing, writing or reading bundles.
#[derive(Error, Debug)]
pub enum BundleError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Profile resolution or sanitizer configuration failed
    #[error(transparent)]
    Redaction(#[from] aw_redact::RedactionError),

    /// A session's stored hash does not match its content
    #[error("content hash mismatch for session '{session_id}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        session_id: String,
        expected: String,
        actual: String,
    },

    /// Missing required entry in a zip bundle
    #[error("missing required file: {0}")]
    MissingFile(String),

    /// Unknown or unsupported bundle version
    #[error("unsupported bundle version: {version} (supported: {supported})")]
    UnsupportedVersion { version: String, supported: String },

    /// Structurally invalid bundle
    #[error("corrupted bundle: {0}")]
    Corrupted(String),

    /// Nothing left to write after preparation
    #[error("bundle has no sessions to write")]
    EmptyBundle,

    /// Manifest metadata carries blocking residue
    #[error("manifest metadata contains private key material")]
    ManifestBlocked,
}

/// Result type alias for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;

impl From<BundleError> for aw_common::Error {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::Io(e) => aw_common::Error::Io(e),
            BundleError::Json(e) => aw_common::Error::Json(e),
            BundleError::Redaction(e) => e.into(),
            other => aw_common::Error::BundleInvalid(other.to_string()),
        }
    }
}
