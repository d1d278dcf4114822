//! Conversation correlation for agentwatch.
//!
//! Several independent sources observe the same agent session: real-time
//! hook events, transcript files on disk, periodic process snapshots, and
//! runs the system launched itself. This crate joins them into a single
//! [`Conversation`] per real session:
//!
//! 1. [`Correlator::correlate`] pairs hook sessions with transcripts by
//!    greedy highest-score-first assignment.
//! 2. The attachment passes in [`attach`] add managed runs, process
//!    snapshots, configured projects and git start states.
//!
//! Everything is pure and deterministic: identical input gives identical
//! output, and malformed records are dropped and counted rather than
//! reported as errors.

pub mod attach;
pub mod conversation;
pub mod correlator;
pub mod error;
pub mod start_state;

pub use attach::{attach_managed_sessions, attach_process_snapshots, attach_projects};
pub use conversation::{Conversation, MatchDetails, MatchType, HOOK_AGENT};
pub use correlator::{correlate, CorrelationOutput, CorrelationStats, Correlator};
pub use error::{CorrelationError, Result};
pub use start_state::{attach_start_states, StartStateStore};
