//! Raw record types for the observation sources.
//!
//! These are the read-only snapshots the stores hand to the correlator.
//! Timestamps are epoch milliseconds; a `start_time` of 0 and an empty `cwd`
//! mean the source never reported them, which makes the record
//! uncorrelatable (it is dropped and counted, never an error).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Milliseconds since the Unix epoch.
pub type EpochMs = i64;

/// How a hook session came to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionSource {
    #[default]
    Startup,
    Resume,
    Clear,
    Compact,
}

/// A git commit made during a hook session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: EpochMs,
}

/// A session observed through real-time lifecycle hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSession {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub start_time: EpochMs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<EpochMs>,
    #[serde(default)]
    pub tool_count: u32,
    #[serde(default)]
    pub tools_used: BTreeSet<String>,
    #[serde(default)]
    pub commits: Vec<CommitRecord>,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub estimated_cost_usd: f64,
    #[serde(default)]
    pub source: SessionSource,
}

impl HookSession {
    /// Whether the session carries the fields correlation needs.
    pub fn is_correlatable(&self) -> bool {
        !self.session_id.is_empty() && !self.cwd.trim().is_empty() && self.start_time > 0
    }

    /// Whether the session has ended.
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }
}

/// One tool invocation inside a hook session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUsage {
    pub tool_use_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: Value,
    #[serde(default)]
    pub timestamp: EpochMs,
    /// `None` until the matching post-use event arrives.
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A conversation log discovered on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalTranscript {
    pub id: String,
    #[serde(default)]
    pub agent: String,
    pub path: String,
    #[serde(default)]
    pub project_dir: String,
    #[serde(default)]
    pub modified_at: EpochMs,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub message_count: u32,
    /// Tool calls counted by the discovery layer, when it parsed them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_count: Option<u32>,
    #[serde(default)]
    pub start_time: EpochMs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<EpochMs>,
}

impl LocalTranscript {
    /// Whether the transcript carries the fields correlation needs.
    pub fn is_correlatable(&self) -> bool {
        !self.id.is_empty() && !self.project_dir.trim().is_empty() && self.start_time > 0
    }

    /// Estimated number of tool calls in the transcript.
    ///
    /// Falls back to half the message count (one request/result pair per call).
    pub fn estimated_tool_count(&self) -> u32 {
        self.tool_use_count.unwrap_or(self.message_count / 2)
    }
}

/// Lifecycle state of an observed agent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Working,
    Waiting,
    Idle,
    Exited,
    #[default]
    Unknown,
}

/// A point-in-time OS observation of a running agent process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub timestamp: EpochMs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub memory_bytes: u64,
    #[serde(default)]
    pub state: ProcessState,
}

/// Status of a run launched by `aw run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagedStatus {
    Running,
    Completed,
    Failed,
}

/// A session the system itself launched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedSession {
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default)]
    pub started_at: EpochMs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<EpochMs>,
    pub status: ManagedStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl ManagedSession {
    /// Whether the run carries the cwd and start time attachment needs.
    pub fn is_correlatable(&self) -> bool {
        !self.cwd.trim().is_empty() && self.started_at > 0
    }
}

/// A configured project: a name over one or more directory roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Git state captured when a session started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartState {
    pub head: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default)]
    pub dirty_files: Vec<String>,
    #[serde(default)]
    pub captured_at: EpochMs,
}

/// The raw record streams for one correlation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(default)]
    pub hook_sessions: Vec<HookSession>,
    #[serde(default)]
    pub tool_usages: BTreeMap<String, Vec<ToolUsage>>,
    #[serde(default)]
    pub transcripts: Vec<LocalTranscript>,
    #[serde(default)]
    pub process_snapshots: Vec<ProcessSnapshot>,
    #[serde(default)]
    pub managed_sessions: Vec<ManagedSession>,
    /// Git start states keyed by session id.
    #[serde(default)]
    pub start_states: BTreeMap<String, StartState>,
    /// Records skipped because they did not deserialize.
    #[serde(default, skip_serializing)]
    pub rejected: usize,
}

impl RecordSet {
    /// Parse a record document leniently.
    ///
    /// Every record is deserialized on its own; one that fails is skipped and
    /// counted in `rejected`. Only a document that is not a JSON object is an
    /// error.
    pub fn from_value(value: Value) -> crate::Result<Self> {
        let Value::Object(mut doc) = value else {
            return Err(crate::Error::InvalidRecords(
                "top-level document must be a JSON object".to_string(),
            ));
        };

        let mut set = RecordSet::default();
        let mut rejected = 0usize;

        set.hook_sessions = parse_list(doc.remove("hook_sessions"), "hook_sessions", &mut rejected);
        set.transcripts = parse_list(doc.remove("transcripts"), "transcripts", &mut rejected);
        set.process_snapshots = parse_list(
            doc.remove("process_snapshots"),
            "process_snapshots",
            &mut rejected,
        );
        set.managed_sessions = parse_list(
            doc.remove("managed_sessions"),
            "managed_sessions",
            &mut rejected,
        );

        match doc.remove("start_states") {
            Some(Value::Object(by_session)) => {
                for (session_id, state) in by_session {
                    match serde_json::from_value::<StartState>(state) {
                        Ok(state) => {
                            set.start_states.insert(session_id, state);
                        }
                        Err(e) => {
                            debug!(
                                stream = "start_states",
                                session = %session_id,
                                error = %e,
                                "Skipping malformed record"
                            );
                            rejected += 1;
                        }
                    }
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => {
                warn!(stream = "start_states", "expected an object keyed by session id");
                rejected += 1;
            }
        }

        match doc.remove("tool_usages") {
            Some(Value::Object(by_session)) => {
                for (session_id, usages) in by_session {
                    let parsed: Vec<ToolUsage> =
                        parse_list(Some(usages), "tool_usages", &mut rejected);
                    set.tool_usages.insert(session_id, parsed);
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => {
                warn!(stream = "tool_usages", "expected an object keyed by session id");
                rejected += 1;
            }
        }

        set.rejected = rejected;
        debug!(
            hook_sessions = set.hook_sessions.len(),
            transcripts = set.transcripts.len(),
            snapshots = set.process_snapshots.len(),
            managed = set.managed_sessions.len(),
            rejected,
            "Record set parsed"
        );
        Ok(set)
    }

    /// Parse a record document from JSON text.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Tool usages recorded for a hook session.
    pub fn usages_for(&self, session_id: &str) -> &[ToolUsage] {
        self.tool_usages
            .get(session_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn parse_list<T: serde::de::DeserializeOwned>(
    value: Option<Value>,
    stream: &'static str,
    rejected: &mut usize,
) -> Vec<T> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                match serde_json::from_value::<T>(item) {
                    Ok(record) => out.push(record),
                    Err(e) => {
                        debug!(stream, index, error = %e, "Skipping malformed record");
                        *rejected += 1;
                    }
                }
            }
            out
        }
        Some(_) => {
            warn!(stream, "expected an array of records");
            *rejected += 1;
            Vec::new()
        }
    }
}
