//! Error types for the redaction engine.

use thiserror::Error;

/// Result type for redaction operations.
pub type Result<T> = std::result::Result<T, RedactionError>;

/// Errors that can occur while configuring or applying redaction.
#[derive(Error, Debug)]
pub enum RedactionError {
    /// A user-supplied regex failed to compile.
    ///
    /// Only the position is reported; the pattern text may itself be sensitive.
    #[error("custom pattern #{index} is not a valid regex")]
    InvalidPattern { index: usize },

    /// The high-entropy run length cannot be compiled into a matcher.
    #[error("invalid high-entropy minimum length: {0}")]
    InvalidEntropyConfig(usize),

    /// A field path in a profile could not be parsed.
    #[error("invalid field path: {0:?}")]
    InvalidFieldPath(String),

    /// A profile failed validation.
    #[error("invalid redaction profile: {0}")]
    InvalidProfile(String),

    /// No built-in or stored profile has this id.
    #[error("unknown redaction profile: {0}")]
    UnknownProfile(String),

    /// Built-in profiles cannot be created, replaced, or deleted.
    #[error("redaction profile is built in and read-only: {0}")]
    ProfileReadOnly(String),

    /// A user profile with this id already exists.
    #[error("redaction profile already exists: {0}")]
    DuplicateProfile(String),

    /// I/O error during profile store persistence.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<RedactionError> for aw_common::Error {
    fn from(err: RedactionError) -> Self {
        match err {
            RedactionError::UnknownProfile(id) => aw_common::Error::UnknownProfile { id },
            RedactionError::ProfileReadOnly(id) => aw_common::Error::ProfileReadOnly { id },
            RedactionError::IoError(e) => aw_common::Error::Io(e),
            RedactionError::JsonError(e) => aw_common::Error::Json(e),
            other @ (RedactionError::InvalidPattern { .. }
            | RedactionError::InvalidEntropyConfig(_)
            | RedactionError::InvalidFieldPath(_)
            | RedactionError::InvalidProfile(_)
            | RedactionError::DuplicateProfile(_)) => {
                aw_common::Error::InvalidPattern(other.to_string())
            }
        }
    }
}
