//! Redaction profiles.
//!
//! A profile pairs a field whitelist with a sanitizer configuration. Three
//! profiles are built in and immutable; user profiles live in a
//! [`ProfileStore`] keyed by id and persisted as JSON.

use crate::error::{RedactionError, Result};
use crate::fields::FieldSelector;
use crate::sanitizer::{RedactionConfig, Sanitizer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Id of the metadata-only built-in profile.
pub const METADATA_ONLY: &str = "metadata-only";
/// Id of the moderate built-in profile (the default).
pub const MODERATE: &str = "moderate";
/// Id of the full built-in profile.
pub const FULL: &str = "full";

/// A named field whitelist plus sanitizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Field-path patterns; see [`crate::fields`].
    pub kept_fields: Vec<String>,
    #[serde(default)]
    pub redaction_config: RedactionConfig,
    #[serde(default)]
    pub is_default: bool,
}

impl RedactionProfile {
    /// Whether this id belongs to a built-in profile.
    pub fn is_builtin_id(id: &str) -> bool {
        matches!(id, METADATA_ONLY | MODERATE | FULL)
    }

    /// Check that the field paths parse and the custom patterns compile.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(RedactionError::InvalidProfile("id is empty".to_string()));
        }
        FieldSelector::parse(&self.kept_fields)?;
        Sanitizer::new(&self.redaction_config)?;
        Ok(())
    }

    /// Compiled field selector.
    pub fn selector(&self) -> Result<FieldSelector> {
        FieldSelector::parse(&self.kept_fields)
    }
}

fn fields(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

const METADATA_FIELDS: &[&str] = &[
    "correlation_id",
    "match_type",
    "match_details",
    "start_time",
    "end_time",
    "agent",
    "project.id",
    "project.name",
    "hook_session.session_id",
    "hook_session.start_time",
    "hook_session.end_time",
    "hook_session.tool_count",
    "hook_session.tools_used",
    "hook_session.input_tokens",
    "hook_session.output_tokens",
    "hook_session.estimated_cost_usd",
    "hook_session.source",
    "hook_session.commits[].timestamp",
    "tool_usages[].tool_name",
    "tool_usages[].timestamp",
    "tool_usages[].success",
    "tool_usages[].duration_ms",
    "transcript.agent",
    "transcript.message_count",
    "transcript.tool_use_count",
    "transcript.size_bytes",
    "transcript.start_time",
    "transcript.end_time",
    "process_snapshots[].timestamp",
    "process_snapshots[].state",
    "process_snapshots[].cpu_percent",
    "process_snapshots[].memory_bytes",
    "managed_session.agent",
    "managed_session.status",
    "managed_session.exit_code",
];

const MODERATE_EXTRA_FIELDS: &[&str] = &[
    "cwd",
    "hook_session.cwd",
    "hook_session.commits[]",
    "tool_usages[].tool_input",
    "tool_usages[].error",
    "transcript.path",
    "transcript.project_dir",
    "managed_session.prompt",
    "managed_session.cwd",
    "start_state",
];

/// The built-in profiles, default first.
pub fn builtin_profiles() -> Vec<RedactionProfile> {
    let mut moderate_fields = fields(METADATA_FIELDS);
    moderate_fields.extend(fields(MODERATE_EXTRA_FIELDS));

    vec![
        RedactionProfile {
            id: MODERATE.to_string(),
            name: "Moderate".to_string(),
            description: "Metadata, commits, tool inputs and prompts, with all categories redacted"
                .to_string(),
            kept_fields: moderate_fields,
            redaction_config: RedactionConfig::default(),
            is_default: true,
        },
        RedactionProfile {
            id: METADATA_ONLY.to_string(),
            name: "Metadata only".to_string(),
            description: "Timing, counts and tool names; no content".to_string(),
            kept_fields: fields(METADATA_FIELDS),
            redaction_config: RedactionConfig::default(),
            is_default: false,
        },
        RedactionProfile {
            id: FULL.to_string(),
            name: "Full".to_string(),
            description: "Every field, with all categories and high-entropy tokens redacted"
                .to_string(),
            kept_fields: fields(&["*"]),
            redaction_config: RedactionConfig {
                enable_high_entropy: true,
                ..RedactionConfig::default()
            },
            is_default: false,
        },
    ]
}

/// User-defined profiles keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileStore {
    #[serde(default)]
    profiles: BTreeMap<String, RedactionProfile>,
}

impl ProfileStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let store: ProfileStore = serde_json::from_str(&content)?;
        for (key, profile) in &store.profiles {
            if key != &profile.id {
                return Err(RedactionError::InvalidProfile(format!(
                    "profile stored under '{key}' has id '{}'",
                    profile.id
                )));
            }
            if RedactionProfile::is_builtin_id(&profile.id) {
                return Err(RedactionError::ProfileReadOnly(profile.id.clone()));
            }
            profile.validate()?;
        }
        debug!(
            path = %path.as_ref().display(),
            profiles = store.profiles.len(),
            "Loaded profile store"
        );
        Ok(store)
    }

    /// Save the store to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Add a new profile.
    pub fn create(&mut self, profile: RedactionProfile) -> Result<()> {
        if RedactionProfile::is_builtin_id(&profile.id) {
            return Err(RedactionError::ProfileReadOnly(profile.id));
        }
        if self.profiles.contains_key(&profile.id) {
            return Err(RedactionError::DuplicateProfile(profile.id));
        }
        profile.validate()?;
        info!(profile = %profile.id, "Created redaction profile");
        self.insert(profile);
        Ok(())
    }

    /// Replace an existing profile.
    pub fn update(&mut self, profile: RedactionProfile) -> Result<()> {
        if RedactionProfile::is_builtin_id(&profile.id) {
            return Err(RedactionError::ProfileReadOnly(profile.id));
        }
        if !self.profiles.contains_key(&profile.id) {
            return Err(RedactionError::UnknownProfile(profile.id));
        }
        profile.validate()?;
        info!(profile = %profile.id, "Updated redaction profile");
        self.insert(profile);
        Ok(())
    }

    /// Remove a profile.
    pub fn delete(&mut self, id: &str) -> Result<RedactionProfile> {
        if RedactionProfile::is_builtin_id(id) {
            return Err(RedactionError::ProfileReadOnly(id.to_string()));
        }
        let removed = self
            .profiles
            .remove(id)
            .ok_or_else(|| RedactionError::UnknownProfile(id.to_string()))?;
        info!(profile = %id, "Deleted redaction profile");
        Ok(removed)
    }

    /// A user profile by id.
    pub fn get(&self, id: &str) -> Option<&RedactionProfile> {
        self.profiles.get(id)
    }

    /// Built-in profiles followed by user profiles (sorted by id).
    pub fn list(&self) -> Vec<RedactionProfile> {
        let mut all = builtin_profiles();
        if self.profiles.values().any(|p| p.is_default) {
            for profile in &mut all {
                profile.is_default = false;
            }
        }
        all.extend(self.profiles.values().cloned());
        all
    }

    /// Id of the default profile: a user profile flagged default, else `moderate`.
    pub fn default_profile_id(&self) -> String {
        self.profiles
            .values()
            .find(|p| p.is_default)
            .map(|p| p.id.clone())
            .unwrap_or_else(|| MODERATE.to_string())
    }

    // At most one user profile is the default.
    fn insert(&mut self, profile: RedactionProfile) {
        if profile.is_default {
            for other in self.profiles.values_mut() {
                other.is_default = false;
            }
        }
        self.profiles.insert(profile.id.clone(), profile);
    }
}

/// Resolve a profile id against the built-ins, then the store.
///
/// Unknown ids are an error; there is no fallback.
pub fn resolve_profile(id: &str, store: &ProfileStore) -> Result<RedactionProfile> {
    if let Some(profile) = builtin_profiles().into_iter().find(|p| p.id == id) {
        return Ok(profile);
    }
    store
        .get(id)
        .cloned()
        .ok_or_else(|| RedactionError::UnknownProfile(id.to_string()))
}
