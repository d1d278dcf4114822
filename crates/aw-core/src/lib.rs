//! Agentwatch CLI library.
//!
//! Holds everything the `aw` binary needs beyond the engine crates:
//! - `config`: `aw.toml` resolution and loading
//! - `logging`: human and JSONL log output on stderr
//! - `exit_codes`: the stable exit-code contract
//! - `pipeline`: correlate, export, check and profile commands over loaded
//!   inputs

pub mod config;
pub mod exit_codes;
pub mod logging;
pub mod pipeline;

pub use config::{load_config, AwConfig, ConfigError, ConfigOptions, ConfigSource, ResolvedConfig};
pub use exit_codes::ExitCode;
pub use pipeline::{ExportRequest, ExportSummary, ProfileSummary};
