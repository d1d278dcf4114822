//! Configuration loading for the `aw` CLI.
//!
//! A single `aw.toml` file holds export defaults, project definitions,
//! correlation tunables, high-entropy policy and the location of the user
//! profile store:
//!
//! ```toml
//! profiles_path = "profiles.json"
//!
//! [export]
//! profile = "moderate"
//! preview_chars = 300
//!
//! [export.contributor]
//! contributor_id = "contributor-7"
//! license = "CC-BY-4.0"
//!
//! [correlation]
//! time_window_ms = 5000
//!
//! [entropy]
//! threshold = 4.0
//! min_length = 24
//!
//! [[projects]]
//! id = "api"
//! name = "API"
//! paths = ["/work/api"]
//! ```
//!
//! Resolution order (highest to lowest priority):
//! 1. Explicit CLI flag (`--config`)
//! 2. `AW_CONFIG` (path to a file)
//! 3. `AW_CONFIG_DIR` (directory holding `aw.toml`)
//! 4. XDG config home (`~/.config/agentwatch/aw.toml`)
//! 5. Built-in defaults
//!
//! Explicit paths (1 and 2) must exist; the directory lookups (3 and 4) are
//! skipped when no file is there.

use aw_bundle::hash::sha256_hex;
use aw_bundle::{ContributorMeta, PrepareConfig, DEFAULT_PREVIEW_CHARS};
use aw_common::Project;
use aw_correlate::correlator::{MIN_TOOL_TOLERANCE, TIME_WINDOW_MS, TOOL_TOLERANCE_RATIO};
use aw_correlate::Correlator;
use aw_redact::{EntropyConfig, ProfileStore, RedactionProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "aw.toml";

/// Directory name under the XDG config home.
const CONFIG_DIR_NAME: &str = "agentwatch";

/// Shortest high-entropy run length accepted from config.
const MIN_ENTROPY_RUN: usize = 8;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("invalid TOML in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for aw_common::Error {
    fn from(err: ConfigError) -> Self {
        aw_common::Error::Config(err.to_string())
    }
}

/// `[export]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    /// Profile used when `--profile` is not given.
    pub profile: Option<String>,
    pub contributor: ContributorMeta,
    pub preview_chars: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            profile: None,
            contributor: ContributorMeta::default(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

/// `[correlation]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorrelationSettings {
    pub time_window_ms: u64,
    pub min_tool_tolerance: u32,
    pub tool_tolerance_ratio: f64,
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            time_window_ms: TIME_WINDOW_MS,
            min_tool_tolerance: MIN_TOOL_TOLERANCE,
            tool_tolerance_ratio: TOOL_TOLERANCE_RATIO,
        }
    }
}

/// Parsed `aw.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwConfig {
    /// JSON file holding user-defined redaction profiles. Relative paths
    /// are resolved against the config file's directory.
    pub profiles_path: Option<PathBuf>,
    pub export: ExportSettings,
    pub correlation: CorrelationSettings,
    /// Overrides the high-entropy tunables of every resolved profile.
    pub entropy: Option<EntropyConfig>,
    /// Order is significant: the first project containing a cwd wins.
    pub projects: Vec<Project>,
}

impl AwConfig {
    /// Parse config text.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Semantic checks beyond what deserialization enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.export.preview_chars == 0 {
            return Err(ConfigError::Invalid(
                "export.preview_chars must be positive".to_string(),
            ));
        }
        if let Some(entropy) = &self.entropy {
            if !entropy.threshold.is_finite() || entropy.threshold <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "entropy.threshold must be positive, got {}",
                    entropy.threshold
                )));
            }
            if entropy.min_length < MIN_ENTROPY_RUN {
                return Err(ConfigError::Invalid(format!(
                    "entropy.min_length must be at least {}, got {}",
                    MIN_ENTROPY_RUN, entropy.min_length
                )));
            }
        }

        let mut ids = BTreeSet::new();
        for project in &self.projects {
            if project.id.trim().is_empty() {
                return Err(ConfigError::Invalid("project id is empty".to_string()));
            }
            if !ids.insert(project.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate project id: {}",
                    project.id
                )));
            }
        }

        self.correlator()?;
        Ok(())
    }

    /// A correlator built from the `[correlation]` section.
    pub fn correlator(&self) -> Result<Correlator, ConfigError> {
        let settings = &self.correlation;
        Correlator::new()
            .with_time_window_ms(settings.time_window_ms)
            .and_then(|c| {
                c.with_tool_tolerance(settings.min_tool_tolerance, settings.tool_tolerance_ratio)
            })
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Load the user profile store, or an empty one if none is configured.
    pub fn load_profile_store(&self) -> aw_common::Result<ProfileStore> {
        match &self.profiles_path {
            Some(path) if path.exists() => Ok(ProfileStore::load(path)?),
            Some(path) => {
                debug!(path = %path.display(), "Profile store not found; using built-ins only");
                Ok(ProfileStore::new())
            }
            None => Ok(ProfileStore::new()),
        }
    }

    /// Profile id for an export: the CLI choice, else `[export].profile`,
    /// else the store default.
    pub fn export_profile_id(&self, cli: Option<&str>, store: &ProfileStore) -> String {
        cli.map(str::to_string)
            .or_else(|| self.export.profile.clone())
            .unwrap_or_else(|| store.default_profile_id())
    }

    /// Preparation settings for a resolved profile.
    pub fn prepare_config(&self, profile: RedactionProfile) -> PrepareConfig {
        let mut redaction = profile.redaction_config;
        if let Some(entropy) = self.entropy {
            redaction.entropy = entropy;
        }
        PrepareConfig {
            redaction,
            selected_fields: Some(profile.kept_fields),
            contributor: self.export.contributor.clone(),
            preview_chars: self.export.preview_chars,
            profile_id: Some(profile.id),
        }
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Cli,
    EnvFile,
    EnvDir,
    Xdg,
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Cli => write!(f, "cli"),
            ConfigSource::EnvFile => write!(f, "AW_CONFIG"),
            ConfigSource::EnvDir => write!(f, "AW_CONFIG_DIR"),
            ConfigSource::Xdg => write!(f, "xdg"),
            ConfigSource::Defaults => write!(f, "defaults"),
        }
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: AwConfig,
    pub source: ConfigSource,
    /// Path of the loaded file (None when using defaults).
    pub path: Option<PathBuf>,
    /// SHA-256 of the file content (None when using defaults).
    pub hash: Option<String>,
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config file (highest priority).
    pub config_path: Option<PathBuf>,
}

/// Load configuration with the standard resolution order.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    load_config_with(options, |key| std::env::var(key).ok())
}

fn load_config_with(
    options: &ConfigOptions,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig, ConfigError> {
    let Some((path, source)) = resolve_config_path(options, &lookup)? else {
        debug!("No config file found; using defaults");
        return Ok(ResolvedConfig {
            config: AwConfig::default(),
            source: ConfigSource::Defaults,
            path: None,
            hash: None,
        });
    };

    let (config, hash) = load_config_from_file(&path)?;
    debug!(path = %path.display(), source = %source, "Loaded config");
    Ok(ResolvedConfig {
        config,
        source,
        path: Some(path),
        hash: Some(hash),
    })
}

fn resolve_config_path(
    options: &ConfigOptions,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<(PathBuf, ConfigSource)>, ConfigError> {
    if let Some(path) = &options.config_path {
        return explicit(path.clone(), ConfigSource::Cli).map(Some);
    }

    if let Some(path) = lookup("AW_CONFIG").filter(|v| !v.is_empty()) {
        return explicit(PathBuf::from(path), ConfigSource::EnvFile).map(Some);
    }

    if let Some(dir) = lookup("AW_CONFIG_DIR").filter(|v| !v.is_empty()) {
        let path = PathBuf::from(dir).join(CONFIG_FILE_NAME);
        if path.is_file() {
            return Ok(Some((path, ConfigSource::EnvDir)));
        }
    }

    let xdg_config = lookup("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")));
    if let Some(base) = xdg_config {
        let path = base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if path.is_file() {
            return Ok(Some((path, ConfigSource::Xdg)));
        }
    }

    Ok(None)
}

fn explicit(path: PathBuf, source: ConfigSource) -> Result<(PathBuf, ConfigSource), ConfigError> {
    if path.is_file() {
        Ok((path, source))
    } else {
        Err(ConfigError::NotFound { path })
    }
}

/// Load and validate a config file, returning it with its content hash.
pub fn load_config_from_file(path: &Path) -> Result<(AwConfig, String), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let hash = sha256_hex(content.as_bytes());

    let mut config = AwConfig::from_toml_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    if let (Some(profiles), Some(dir)) = (&config.profiles_path, path.parent()) {
        if profiles.is_relative() {
            config.profiles_path = Some(dir.join(profiles));
        }
    }

    config.validate()?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aw_redact::{resolve_profile, MODERATE};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    const FULL_CONFIG: &str = r#"
profiles_path = "profiles.json"

[export]
profile = "metadata-only"
preview_chars = 120

[export.contributor]
contributor_id = "contributor-7"

[correlation]
time_window_ms = 8000

[entropy]
threshold = 4.2
min_length = 24

[[projects]]
id = "api"
name = "API"
paths = ["/work/api"]

[[projects]]
id = "web"
name = "Web"
paths = ["/work/web", "/work/shared"]
"#;

    #[test]
    fn test_defaults_when_nothing_is_found() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().to_string_lossy().to_string();
        let resolved = load_config_with(
            &ConfigOptions::default(),
            env(&[("XDG_CONFIG_HOME", &home)]),
        )
        .unwrap();
        assert_eq!(resolved.source, ConfigSource::Defaults);
        assert!(resolved.path.is_none());
        assert_eq!(resolved.config, AwConfig::default());
    }

    #[test]
    fn test_full_config_parses() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), CONFIG_FILE_NAME, FULL_CONFIG);
        let (config, hash) = load_config_from_file(&path).unwrap();

        assert_eq!(hash.len(), 64);
        assert_eq!(config.export.profile.as_deref(), Some("metadata-only"));
        assert_eq!(config.export.preview_chars, 120);
        assert_eq!(
            config.export.contributor.contributor_id.as_deref(),
            Some("contributor-7")
        );
        assert_eq!(config.correlation.time_window_ms, 8000);
        assert_eq!(config.correlation.min_tool_tolerance, MIN_TOOL_TOLERANCE);
        assert_eq!(config.projects[1].paths.len(), 2);
        assert_eq!(config.profiles_path, Some(dir.path().join("profiles.json")));
        assert_eq!(config.correlator().unwrap().time_window_ms(), 8000);
    }

    #[test]
    fn test_resolution_order() {
        let dir = TempDir::new().unwrap();
        let cli = write(dir.path(), "cli.toml", "");
        let from_env = write(dir.path(), "env.toml", "");
        let env_dir = dir.path().join("envdir");
        std::fs::create_dir_all(&env_dir).unwrap();
        write(&env_dir, CONFIG_FILE_NAME, "");
        let xdg = dir.path().join("xdg");
        std::fs::create_dir_all(xdg.join(CONFIG_DIR_NAME)).unwrap();
        write(&xdg.join(CONFIG_DIR_NAME), CONFIG_FILE_NAME, "");

        let all = [
            ("AW_CONFIG", from_env.to_str().unwrap()),
            ("AW_CONFIG_DIR", env_dir.to_str().unwrap()),
            ("XDG_CONFIG_HOME", xdg.to_str().unwrap()),
        ];

        let options = ConfigOptions {
            config_path: Some(cli.clone()),
        };
        let resolved = load_config_with(&options, env(&all)).unwrap();
        assert_eq!(resolved.source, ConfigSource::Cli);
        assert_eq!(resolved.path, Some(cli));

        let resolved = load_config_with(&ConfigOptions::default(), env(&all)).unwrap();
        assert_eq!(resolved.source, ConfigSource::EnvFile);

        let resolved = load_config_with(&ConfigOptions::default(), env(&all[1..])).unwrap();
        assert_eq!(resolved.source, ConfigSource::EnvDir);

        let resolved = load_config_with(&ConfigOptions::default(), env(&all[2..])).unwrap();
        assert_eq!(resolved.source, ConfigSource::Xdg);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let options = ConfigOptions {
            config_path: Some(PathBuf::from("/nonexistent/aw.toml")),
        };
        let err = load_config_with(&options, env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));

        let err = load_config_with(
            &ConfigOptions::default(),
            env(&[("AW_CONFIG", "/nonexistent/aw.toml")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), CONFIG_FILE_NAME, "[export]\nprofle = \"full\"\n");
        let err = load_config_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_semantic_validation() {
        let dir = TempDir::new().unwrap();
        for bad in [
            "[export]\npreview_chars = 0\n",
            "[entropy]\nthreshold = 0.0\n",
            "[entropy]\nmin_length = 4\n",
            "[correlation]\ntool_tolerance_ratio = 2.0\n",
            "[[projects]]\nid = \"a\"\nname = \"A\"\n[[projects]]\nid = \"a\"\nname = \"B\"\n",
        ] {
            let path = write(dir.path(), CONFIG_FILE_NAME, bad);
            let err = load_config_from_file(&path).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{bad}");
        }
    }

    #[test]
    fn test_export_profile_precedence() {
        let store = ProfileStore::new();
        let mut config = AwConfig::default();
        assert_eq!(config.export_profile_id(None, &store), MODERATE);

        config.export.profile = Some("full".to_string());
        assert_eq!(config.export_profile_id(None, &store), "full");
        assert_eq!(
            config.export_profile_id(Some("metadata-only"), &store),
            "metadata-only"
        );
    }

    #[test]
    fn test_entropy_override_reaches_prepare_config() {
        let config = AwConfig {
            entropy: Some(EntropyConfig {
                threshold: 4.5,
                min_length: 32,
            }),
            ..AwConfig::default()
        };
        let profile = resolve_profile(MODERATE, &ProfileStore::new()).unwrap();
        let prepare = config.prepare_config(profile);
        assert_eq!(prepare.redaction.entropy.min_length, 32);
        assert_eq!(prepare.profile_id.as_deref(), Some(MODERATE));
        assert!(prepare.selected_fields.is_some());
    }

    #[test]
    fn test_missing_profile_store_is_empty() {
        let config = AwConfig {
            profiles_path: Some(PathBuf::from("/nonexistent/profiles.json")),
            ..AwConfig::default()
        };
        let store = config.load_profile_store().unwrap();
        assert_eq!(store.list().len(), 3);
    }

    #[test]
    fn test_config_error_maps_to_config_code() {
        let err: aw_common::Error = ConfigError::Invalid("x".to_string()).into();
        assert_eq!(err.code(), 10);
    }
}
