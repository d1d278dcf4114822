//! Command pipelines behind the CLI.
//!
//! Each function takes fully loaded inputs and returns a serializable
//! outcome; printing and exit codes stay in `main.rs`.

use crate::config::AwConfig;
use aw_bundle::{
    prepare_sessions, Bundle, BundleFormat, BundleReader, BundleWriter, Exclusion, RawSession,
    VerificationReport,
};
use aw_common::{EpochMs, Error, RecordSet, Result};
use aw_correlate::{Conversation, CorrelationOutput};
use aw_redact::{resolve_profile, ProfileStore, RedactionProfile, SanitizeReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Read a record document from a file, or stdin for `-`.
pub fn read_records(input: &Path) -> Result<RecordSet> {
    let text = if input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(input)?
    };
    RecordSet::from_json_str(&text)
}

/// Correlate records with the configured tunables and projects.
pub fn correlate_records(
    records: &RecordSet,
    config: &AwConfig,
    now_ms: EpochMs,
) -> Result<CorrelationOutput> {
    let correlator = config.correlator()?;
    Ok(correlator.run(records, &config.projects, now_ms))
}

/// What to export and where.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Profile id; falls back to config, then the store default.
    pub profile: Option<String>,
    /// Correlation ids to export; empty exports every conversation.
    pub sessions: Vec<String>,
    pub output: PathBuf,
    pub format: BundleFormat,
    pub created_at: Option<DateTime<Utc>>,
    pub now_ms: EpochMs,
}

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub bundle_id: String,
    pub output: PathBuf,
    pub format: String,
    pub profile: String,
    pub session_count: usize,
    /// Correlation ids excluded by the residue check.
    pub blocked: Vec<String>,
    pub excluded: Vec<Exclusion>,
    pub redactions: SanitizeReport,
    pub stripped_fields: Vec<String>,
}

impl ExportSummary {
    /// True if anything was left out of the bundle.
    pub fn has_warnings(&self) -> bool {
        !self.blocked.is_empty() || !self.excluded.is_empty()
    }
}

/// Correlate, select, prepare and write a bundle.
///
/// Fails with [`Error::ExportBlocked`] if every selected conversation was
/// blocked; nothing is written in that case.
pub fn export_bundle(
    records: &RecordSet,
    config: &AwConfig,
    request: &ExportRequest,
) -> Result<ExportSummary> {
    let output = correlate_records(records, config, request.now_ms)?;
    let selected = select_conversations(output.conversations, &request.sessions)?;
    if selected.is_empty() {
        return Err(Error::InvalidRecords(
            "no conversations to export".to_string(),
        ));
    }

    let store = config.load_profile_store()?;
    let profile_id = config.export_profile_id(request.profile.as_deref(), &store);
    let profile = resolve_profile(&profile_id, &store)?;
    let prepare_config = config.prepare_config(profile);

    let raw = selected
        .iter()
        .map(|c| serde_json::to_value(c).map(RawSession::from))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let result = prepare_sessions(&raw, &prepare_config)?;

    if result.sessions.is_empty() {
        warn!(blocked = result.blocked.len(), "Every session was blocked");
        return Err(Error::ExportBlocked {
            blocked: result.blocked.len(),
        });
    }

    let bundle = Bundle::from_preparation(&result, request.created_at)?;
    let bundle_id = bundle.manifest.bundle_id.clone();
    let session_count = bundle.manifest.session_count;
    BundleWriter::new(bundle, request.format).write(&request.output)?;

    info!(
        bundle_id = %bundle_id,
        sessions = session_count,
        blocked = result.blocked.len(),
        "Export complete"
    );

    Ok(ExportSummary {
        bundle_id,
        output: request.output.clone(),
        format: request.format.to_string(),
        profile: profile_id,
        session_count,
        blocked: result.blocked.into_iter().map(|b| b.session_id).collect(),
        excluded: result.stats.excluded,
        redactions: result.redaction_report,
        stripped_fields: result.stripped_fields,
    })
}

/// Keep the requested conversations, in request order.
fn select_conversations(
    conversations: Vec<Conversation>,
    ids: &[String],
) -> Result<Vec<Conversation>> {
    if ids.is_empty() {
        return Ok(conversations);
    }
    let mut selected = Vec::with_capacity(ids.len());
    for id in ids {
        let conversation = conversations
            .iter()
            .find(|c| &c.correlation_id == id)
            .ok_or_else(|| Error::ConversationNotFound {
                correlation_id: id.clone(),
            })?;
        if !selected
            .iter()
            .any(|c: &Conversation| &c.correlation_id == id)
        {
            selected.push(conversation.clone());
        }
    }
    Ok(selected)
}

/// Open and verify a bundle file.
pub fn check_bundle(path: &Path) -> Result<VerificationReport> {
    let reader = BundleReader::open(path)?;
    Ok(reader.verify())
}

/// One row of `aw profiles list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub builtin: bool,
    pub is_default: bool,
    pub kept_fields: usize,
}

impl From<&RedactionProfile> for ProfileSummary {
    fn from(profile: &RedactionProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            description: profile.description.clone(),
            builtin: RedactionProfile::is_builtin_id(&profile.id),
            is_default: profile.is_default,
            kept_fields: profile.kept_fields.len(),
        }
    }
}

/// Built-in and user profiles.
pub fn list_profiles(store: &ProfileStore) -> Vec<ProfileSummary> {
    store.list().iter().map(ProfileSummary::from).collect()
}

/// A profile by id, with the config's entropy override applied.
pub fn show_profile(id: &str, store: &ProfileStore, config: &AwConfig) -> Result<RedactionProfile> {
    let mut profile = resolve_profile(id, store)?;
    if let Some(entropy) = config.entropy {
        profile.redaction_config.entropy = entropy;
    }
    Ok(profile)
}
