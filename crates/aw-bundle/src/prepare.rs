//! Session preparation.
//!
//! Each raw session runs through the same pipeline:
//!
//! 1. parse (raw JSON text is accepted)
//! 2. field selection against the allow-list
//! 3. sanitization of what remains
//! 4. residue check of everything the session line will carry
//! 5. content hash, preview and quality score
//!
//! Nothing read from the raw input reaches the bundle unsanitized: the
//! session id comes from the sanitized data and the names of stripped fields
//! are sanitized too.
//!
//! A session that fails a step is excluded and reported; the other sessions
//! are unaffected. Only configuration problems (a bad field path or custom
//! regex, an unknown profile) fail the whole call.

use crate::hash::{canonical_json, content_hash};
use crate::score::quality_score;
use crate::Result;
use aw_redact::{
    residue_check_value, resolve_profile, FieldSelector, ProfileStore, RedactionConfig,
    SanitizeReport, Sanitizer,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Default preview budget in characters.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// Appended to a preview that was cut short.
pub const PREVIEW_ELLIPSIS: &str = "...";

/// A session as handed to the preparer.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSession {
    /// Already parsed JSON.
    Value(Value),
    /// JSON text, parsed during preparation.
    Text(String),
}

impl From<Value> for RawSession {
    fn from(value: Value) -> Self {
        RawSession::Value(value)
    }
}

impl From<String> for RawSession {
    fn from(text: String) -> Self {
        RawSession::Text(text)
    }
}

impl From<&str> for RawSession {
    fn from(text: &str) -> Self {
        RawSession::Text(text.to_string())
    }
}

/// Who is sharing the bundle and under what terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Free-form AI usage preference, e.g. `train-genai=n`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_preference: Option<String>,
}

/// Preparation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareConfig {
    #[serde(default)]
    pub redaction: RedactionConfig,
    /// Field allow-list. `None` keeps every field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_fields: Option<Vec<String>>,
    #[serde(default)]
    pub contributor: ContributorMeta,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    /// Profile the settings came from, recorded in the manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
}

fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            redaction: RedactionConfig::default(),
            selected_fields: None,
            contributor: ContributorMeta::default(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
            profile_id: None,
        }
    }
}

/// A session ready for a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedSession {
    pub session_id: String,
    /// Selected and sanitized content.
    pub data: Value,
    /// SHA-256 of `data` in canonical form.
    pub content_hash: String,
    pub preview: String,
    pub score: u32,
    /// Non-blocking residue warnings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub residue_warnings: Vec<String>,
    pub redactions: SanitizeReport,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stripped_fields: Vec<String>,
}

/// A session the residue check refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedSession {
    pub session_id: String,
    pub blocked: bool,
    pub warnings: Vec<String>,
}

/// Why a session was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Raw text was not valid JSON.
    InvalidJson,
    /// The session was valid JSON but not an object.
    NotAnObject,
    /// Private key material survived sanitization.
    ResidueBlocked,
}

/// One excluded session, by input position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub reason: ExclusionReason,
}

/// Counts for one preparation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationStats {
    pub total: usize,
    pub prepared: usize,
    pub blocked: usize,
    pub excluded: Vec<Exclusion>,
}

/// Output of [`prepare_sessions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparationResult {
    pub sessions: Vec<PreparedSession>,
    pub blocked: Vec<BlockedSession>,
    /// Redactions over all prepared sessions.
    pub redaction_report: SanitizeReport,
    /// Union of the field paths removed by selection, sorted.
    pub stripped_fields: Vec<String>,
    pub stats: PreparationStats,
    pub contributor: ContributorMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    /// Hash of the redaction config used, so a reader can tell two bundles
    /// were sanitized the same way.
    pub redaction_config_hash: String,
}

impl PreparationResult {
    /// True if nothing was prepared and at least one session was blocked.
    pub fn all_blocked(&self) -> bool {
        self.sessions.is_empty() && !self.blocked.is_empty()
    }
}

/// Session id: the correlation id if it survived selection and
/// sanitization and is not already taken, else the input position.
fn session_id(data: &Value, index: usize, taken: &BTreeSet<String>) -> String {
    data.get("correlation_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty() && !taken.contains(*id))
        .map(str::to_string)
        .unwrap_or_else(|| format!("session-{index}"))
}

fn preview(data: &Value, budget: usize) -> String {
    let text = canonical_json(data);
    if text.chars().count() <= budget {
        return text;
    }
    let mut out: String = text.chars().take(budget).collect();
    out.push_str(PREVIEW_ELLIPSIS);
    out
}

/// Prepare sessions for export.
pub fn prepare_sessions(raw: &[RawSession], config: &PrepareConfig) -> Result<PreparationResult> {
    let selector = match &config.selected_fields {
        Some(fields) => FieldSelector::parse(fields.as_slice())?,
        None => FieldSelector::parse(&["*"])?,
    };
    let sanitizer = Sanitizer::new(&config.redaction)?;

    let mut sessions = Vec::new();
    let mut blocked = Vec::new();
    let mut redaction_report = SanitizeReport::default();
    let mut stripped_fields = BTreeSet::new();
    let mut taken_ids = BTreeSet::new();
    let mut stats = PreparationStats {
        total: raw.len(),
        ..PreparationStats::default()
    };

    for (index, session) in raw.iter().enumerate() {
        let parsed = match session {
            RawSession::Value(value) => value.clone(),
            RawSession::Text(text) => match serde_json::from_str::<Value>(text) {
                Ok(value) => value,
                Err(e) => {
                    warn!(index, error = %e, "Excluding session: invalid JSON");
                    stats.excluded.push(Exclusion {
                        index,
                        session_id: None,
                        reason: ExclusionReason::InvalidJson,
                    });
                    continue;
                }
            },
        };
        if !parsed.is_object() {
            warn!(index, "Excluding session: not a JSON object");
            stats.excluded.push(Exclusion {
                index,
                session_id: None,
                reason: ExclusionReason::NotAnObject,
            });
            continue;
        }

        let (selected, stripped) = selector.select_with_report(&parsed);
        let (data, redactions) = sanitizer.sanitize_value(&selected);
        // Dropped key names come from the raw input as well.
        let stripped: Vec<String> = stripped
            .iter()
            .map(|path| sanitizer.sanitize_str(path).0)
            .collect();
        let id = session_id(&data, index, &taken_ids);

        let residue = residue_check_value(&json!({
            "session_id": &id,
            "stripped_fields": &stripped,
            "data": &data,
        }));
        if residue.blocked {
            warn!(
                session = %id,
                warnings = residue.warnings.len(),
                "Excluding session: residue check blocked"
            );
            stats.excluded.push(Exclusion {
                index,
                session_id: Some(id.clone()),
                reason: ExclusionReason::ResidueBlocked,
            });
            blocked.push(BlockedSession {
                session_id: id,
                blocked: true,
                warnings: residue.warnings,
            });
            continue;
        }

        let hash = content_hash(&data);
        debug!(
            session = %id,
            redactions = redactions.total_redactions,
            stripped = stripped.len(),
            hash = %hash,
            "Prepared session"
        );

        taken_ids.insert(id.clone());
        redaction_report.merge(&redactions);
        stripped_fields.extend(stripped.iter().cloned());
        sessions.push(PreparedSession {
            session_id: id,
            preview: preview(&data, config.preview_chars),
            score: quality_score(&parsed),
            content_hash: hash,
            data,
            residue_warnings: residue.warnings,
            redactions,
            stripped_fields: stripped,
        });
    }

    stats.prepared = sessions.len();
    stats.blocked = blocked.len();

    let redaction_config_hash = content_hash(&serde_json::to_value(&config.redaction)?);

    info!(
        total = stats.total,
        prepared = stats.prepared,
        blocked = stats.blocked,
        excluded = stats.excluded.len(),
        redactions = redaction_report.total_redactions,
        "Session preparation complete"
    );

    Ok(PreparationResult {
        sessions,
        blocked,
        redaction_report,
        stripped_fields: stripped_fields.into_iter().collect(),
        stats,
        contributor: config.contributor.clone(),
        profile_id: config.profile_id.clone(),
        redaction_config_hash,
    })
}

/// Resolve a profile and prepare with its field list and redaction config.
///
/// An unknown profile id is an error; nothing falls back to keeping all
/// fields.
pub fn prepare_with_profile(
    raw: &[RawSession],
    profile_id: &str,
    store: &ProfileStore,
    contributor: ContributorMeta,
) -> Result<PreparationResult> {
    let profile = resolve_profile(profile_id, store)?;
    let config = PrepareConfig {
        redaction: profile.redaction_config,
        selected_fields: Some(profile.kept_fields),
        contributor,
        preview_chars: DEFAULT_PREVIEW_CHARS,
        profile_id: Some(profile.id),
    };
    prepare_sessions(raw, &config)
}
