//! Agentwatch common types, ids, and errors.
//!
//! This crate provides the foundational types shared by the agentwatch crates:
//! - Raw record types for the four observation sources (hooks, transcripts,
//!   process snapshots, managed runs)
//! - Lenient record ingestion that never fails on a single bad record
//! - Deterministic id derivation
//! - The unified, code-carrying error type surfaced by the CLI

pub mod error;
pub mod id;
pub mod path;
pub mod records;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use id::correlation_hash;
pub use path::{is_path_prefix, normalize_dir};
pub use records::{
    CommitRecord, EpochMs, HookSession, LocalTranscript, ManagedSession, ManagedStatus,
    ProcessSnapshot, ProcessState, Project, RecordSet, SessionSource, StartState, ToolUsage,
};
