//! Error types for agentwatch.
//!
//! Errors carry a stable numeric code and a category so the CLI can emit
//! machine-parseable failures:
//! ```json
//! {
//!   "code": 30,
//!   "category": "profile",
//!   "message": "unknown redaction profile: team-share"
//! }
//! ```
//!
//! Messages never include record content. Only ids, paths supplied by the
//! operator, and counts are interpolated.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for agentwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Raw record input errors.
    Input,
    /// Redaction profile and pattern errors.
    Profile,
    /// Export and bundle errors.
    Export,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Profile => write!(f, "profile"),
            ErrorCategory::Export => write!(f, "export"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for agentwatch.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Input errors (20-29)
    #[error("invalid record set: {0}")]
    InvalidRecords(String),

    #[error("conversation not found: {correlation_id}")]
    ConversationNotFound { correlation_id: String },

    // Profile errors (30-39)
    #[error("unknown redaction profile: {id}")]
    UnknownProfile { id: String },

    #[error("redaction profile is built in and read-only: {id}")]
    ProfileReadOnly { id: String },

    #[error("invalid redaction pattern: {0}")]
    InvalidPattern(String),

    // Export errors (40-49)
    #[error("export blocked: {blocked} session(s) failed the residue check")]
    ExportBlocked { blocked: usize },

    #[error("bundle verification failed: {0}")]
    BundleInvalid(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidRecords(_) => 20,
            Error::ConversationNotFound { .. } => 21,
            Error::UnknownProfile { .. } => 30,
            Error::ProfileReadOnly { .. } => 31,
            Error::InvalidPattern(_) => 32,
            Error::ExportBlocked { .. } => 40,
            Error::BundleInvalid(_) => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Config,
            Error::InvalidRecords(_) | Error::ConversationNotFound { .. } => ErrorCategory::Input,
            Error::UnknownProfile { .. }
            | Error::ProfileReadOnly { .. }
            | Error::InvalidPattern(_) => ErrorCategory::Profile,
            Error::ExportBlocked { .. } | Error::BundleInvalid(_) => ErrorCategory::Export,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Check aw.toml syntax or point --config at a valid file.",
            Error::InvalidRecords(_) => {
                "The record file must be a JSON object with hook_sessions, transcripts, ... arrays."
            }
            Error::ConversationNotFound { .. } => {
                "Run 'aw correlate' to list the correlation ids available in this record set."
            }
            Error::UnknownProfile { .. } => {
                "List available profiles with 'aw profiles list'. Unknown ids never fall back."
            }
            Error::ProfileReadOnly { .. } => {
                "Built-in profiles cannot be changed. Create a user profile with a new id instead."
            }
            Error::InvalidPattern(_) => "Fix the custom regex in the profile's redaction config.",
            Error::ExportBlocked { .. } => {
                "Enable the secrets category or remove the offending sessions before exporting."
            }
            Error::BundleInvalid(_) => "The bundle was modified after export. Re-export it.",
            Error::Io(_) => "Check the path exists and is readable/writable.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq .' or restore from backup.",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Remediation hint.
    pub remediation: String,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            remediation: err.remediation().to_string(),
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}
