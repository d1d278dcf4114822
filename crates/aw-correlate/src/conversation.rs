//! The unified conversation view.

use aw_common::{
    EpochMs, HookSession, LocalTranscript, ManagedSession, ProcessSnapshot, Project, StartState,
    ToolUsage,
};
use serde::{Deserialize, Serialize};

/// Agent name used when only a hook session is known; the lifecycle hooks
/// are only emitted by this agent.
pub const HOOK_AGENT: &str = "claude";

/// How a conversation's primary records were matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Hook session and transcript agree on the transcript path.
    Exact,
    /// Hook session and transcript paired on timing (and usually cwd).
    Linked,
    /// Only a hook session or only a transcript.
    Partial,
    /// Neither a hook session nor a transcript; surfaced from a managed run.
    Unmatched,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Linked => "linked",
            MatchType::Partial => "partial",
            MatchType::Unmatched => "unmatched",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signals observed for a hook/transcript pair and their combined score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetails {
    pub path_match: bool,
    pub time_match: bool,
    /// Hook cwd and transcript project dir are the same string. A trailing
    /// separator makes the pair compatible but not a cwd match.
    pub cwd_match: bool,
    pub tool_count_match: bool,
    pub score: u32,
}

/// One real session, assembled from every source that observed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub correlation_id: String,
    pub match_type: MatchType,
    pub match_details: MatchDetails,
    /// Linked on timing alone, without an exact cwd match.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub low_confidence: bool,
    pub start_time: EpochMs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<EpochMs>,
    pub cwd: String,
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_session: Option<HookSession>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_usages: Vec<ToolUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<LocalTranscript>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub process_snapshots: Vec<ProcessSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_session: Option<ManagedSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_state: Option<StartState>,
}

impl Conversation {
    /// Build a conversation from whichever primary records are present.
    ///
    /// At least one of `hook` and `transcript` must be `Some`.
    pub(crate) fn from_primary(
        hook: Option<&HookSession>,
        transcript: Option<&LocalTranscript>,
        usages: &[ToolUsage],
        match_type: MatchType,
        match_details: MatchDetails,
    ) -> Self {
        let correlation_id = hook
            .map(|h| h.session_id.clone())
            .or_else(|| transcript.map(|t| t.id.clone()))
            .unwrap_or_default();

        let (start_time, end_time, cwd) = match (hook, transcript) {
            (Some(h), _) => (h.start_time, h.end_time, h.cwd.clone()),
            (None, Some(t)) => (t.start_time, t.end_time, t.project_dir.clone()),
            (None, None) => (0, None, String::new()),
        };

        let agent = transcript
            .map(|t| t.agent.as_str())
            .filter(|a| !a.is_empty())
            .unwrap_or(HOOK_AGENT)
            .to_string();

        let low_confidence = match_type == MatchType::Linked
            && !(match_details.cwd_match && match_details.time_match);

        Self {
            correlation_id,
            match_type,
            match_details,
            low_confidence,
            start_time,
            end_time,
            cwd,
            agent,
            hook_session: hook.cloned(),
            tool_usages: if hook.is_some() { usages.to_vec() } else { Vec::new() },
            transcript: transcript.cloned(),
            process_snapshots: Vec::new(),
            managed_session: None,
            project: None,
            start_state: None,
        }
    }

    /// A conversation known only from a managed run.
    pub(crate) fn from_managed(managed: &ManagedSession) -> Self {
        let agent = if managed.agent.is_empty() {
            HOOK_AGENT.to_string()
        } else {
            managed.agent.clone()
        };
        Self {
            correlation_id: aw_common::correlation_hash(&managed.cwd, managed.started_at),
            match_type: MatchType::Unmatched,
            match_details: MatchDetails::default(),
            low_confidence: false,
            start_time: managed.started_at,
            end_time: managed.ended_at,
            cwd: managed.cwd.clone(),
            agent,
            hook_session: None,
            tool_usages: Vec::new(),
            transcript: None,
            process_snapshots: Vec::new(),
            managed_session: Some(managed.clone()),
            project: None,
            start_state: None,
        }
    }

    /// Whether the conversation is still running.
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Pid of the agent process, when a managed run recorded one.
    pub fn pid(&self) -> Option<u32> {
        self.managed_session.as_ref().and_then(|m| m.pid)
    }

    /// Duration in milliseconds, if ended.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time.map(|end| (end - self.start_time).max(0))
    }

    /// Whether `ts` lies within `[start_time, end_time or now]`.
    pub fn contains_time(&self, ts: EpochMs, now_ms: EpochMs) -> bool {
        ts >= self.start_time && ts <= self.end_time.unwrap_or(now_ms)
    }
}

/// Most recent first, then by id.
pub(crate) fn sort_conversations(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| {
        b.start_time
            .cmp(&a.start_time)
            .then_with(|| a.correlation_id.cmp(&b.correlation_id))
    });
}
