//! Hook session / transcript pairing.
//!
//! Every (hook session, transcript) pair with compatible working directories
//! is scored on four signals. A pair is only assignable when it agrees on the
//! transcript path or on timing; the others only raise the score. Assignment
//! is greedy, highest score first, and each record is claimed at most once.
//! Whatever is left over becomes a partial conversation.

use crate::attach::{attach_managed_sessions, attach_process_snapshots, attach_projects};
use crate::conversation::{sort_conversations, Conversation, MatchDetails, MatchType};
use crate::error::{CorrelationError, Result};
use crate::start_state::{attach_start_states, StartStateStore};
use aw_common::{
    is_path_prefix, EpochMs, HookSession, LocalTranscript, Project, RecordSet, ToolUsage,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Maximum start-time difference for `time_match`.
pub const TIME_WINDOW_MS: u64 = 5_000;

/// Largest accepted time window.
pub const MAX_TIME_WINDOW_MS: u64 = 3_600_000;

/// Score contributed by an exact transcript path match.
pub const PATH_WEIGHT: u32 = 100;
/// Score contributed by start times within the window.
pub const TIME_WEIGHT: u32 = 30;
/// Score contributed by identical working directories.
pub const CWD_WEIGHT: u32 = 20;
/// Score contributed by agreeing tool counts.
pub const TOOL_COUNT_WEIGHT: u32 = 10;

/// Tool counts within this absolute difference always agree.
pub const MIN_TOOL_TOLERANCE: u32 = 2;
/// Otherwise they agree within this fraction of the larger count.
pub const TOOL_TOLERANCE_RATIO: f64 = 0.10;

/// Summary counts for one correlation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationStats {
    /// Hook sessions supplied.
    pub hook_sessions: usize,
    /// Transcripts supplied.
    pub transcripts: usize,
    pub exact: usize,
    /// Linked conversations, including low-confidence ones.
    pub linked: usize,
    pub low_confidence: usize,
    pub partial: usize,
    /// Records dropped as uncorrelatable (missing cwd or start time,
    /// duplicate id, or unparseable).
    pub unmatched: usize,
}

/// Conversations plus run statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationOutput {
    pub conversations: Vec<Conversation>,
    pub stats: CorrelationStats,
}

/// Correlation tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlator {
    time_window_ms: u64,
    min_tool_tolerance: u32,
    tool_tolerance_ratio: f64,
}

impl Default for Correlator {
    fn default() -> Self {
        Self {
            time_window_ms: TIME_WINDOW_MS,
            min_tool_tolerance: MIN_TOOL_TOLERANCE,
            tool_tolerance_ratio: TOOL_TOLERANCE_RATIO,
        }
    }
}

/// A scored, assignable pair (indices into the filtered inputs).
#[derive(Debug, Clone, Copy)]
struct Candidate {
    hook: usize,
    transcript: usize,
    details: MatchDetails,
}

impl Correlator {
    /// A correlator with the default tunables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `time_match` window.
    pub fn with_time_window_ms(mut self, window_ms: u64) -> Result<Self> {
        if window_ms > MAX_TIME_WINDOW_MS {
            return Err(CorrelationError::TimeWindowTooLarge(window_ms));
        }
        self.time_window_ms = window_ms;
        Ok(self)
    }

    /// Set the tool-count tolerance: `max(min_abs, ratio * larger count)`.
    pub fn with_tool_tolerance(mut self, min_abs: u32, ratio: f64) -> Result<Self> {
        if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
            return Err(CorrelationError::InvalidToleranceRatio(ratio));
        }
        self.min_tool_tolerance = min_abs;
        self.tool_tolerance_ratio = ratio;
        Ok(self)
    }

    pub fn time_window_ms(&self) -> u64 {
        self.time_window_ms
    }

    /// Whether two tool counts agree within tolerance.
    pub fn tool_counts_agree(&self, a: u32, b: u32) -> bool {
        let larger = a.max(b) as f64;
        let tolerance = (larger * self.tool_tolerance_ratio).floor() as u32;
        a.abs_diff(b) <= tolerance.max(self.min_tool_tolerance)
    }

    /// Score one hook/transcript pair. `None` if the directories are not
    /// compatible.
    pub fn score_pair(
        &self,
        hook: &HookSession,
        transcript: &LocalTranscript,
        hook_tool_count: u32,
    ) -> Option<MatchDetails> {
        let cwd_match = hook.cwd == transcript.project_dir;
        if !cwd_match && !is_path_prefix(&transcript.project_dir, &hook.cwd) {
            return None;
        }

        let path_match = hook.transcript_path.as_deref() == Some(transcript.path.as_str());
        let time_match =
            hook.start_time.abs_diff(transcript.start_time) <= self.time_window_ms;
        let tool_count_match =
            self.tool_counts_agree(hook_tool_count, transcript.estimated_tool_count());

        let mut score = 0;
        if path_match {
            score += PATH_WEIGHT;
        }
        if time_match {
            score += TIME_WEIGHT;
        }
        if cwd_match {
            score += CWD_WEIGHT;
        }
        if tool_count_match {
            score += TOOL_COUNT_WEIGHT;
        }

        Some(MatchDetails {
            path_match,
            time_match,
            cwd_match,
            tool_count_match,
            score,
        })
    }

    /// Pair hook sessions with transcripts.
    ///
    /// Never fails: records without an id, a cwd, or a start time, and
    /// repeated ids, are dropped and counted in `stats.unmatched`.
    pub fn correlate(
        &self,
        hooks: &[HookSession],
        transcripts: &[LocalTranscript],
        usages_by_session: &BTreeMap<String, Vec<ToolUsage>>,
    ) -> CorrelationOutput {
        let mut stats = CorrelationStats {
            hook_sessions: hooks.len(),
            transcripts: transcripts.len(),
            ..CorrelationStats::default()
        };

        let hooks = usable(hooks, |h| h.is_correlatable(), |h| &h.session_id, &mut stats);
        let transcripts = usable(transcripts, |t| t.is_correlatable(), |t| &t.id, &mut stats);

        let usages_for = |hook: &HookSession| -> &[ToolUsage] {
            usages_by_session
                .get(&hook.session_id)
                .map(Vec::as_slice)
                .unwrap_or(&[])
        };

        let mut candidates = Vec::new();
        for (hi, hook) in hooks.iter().copied().enumerate() {
            let tool_count = hook.tool_count.max(usages_for(hook).len() as u32);
            for (ti, transcript) in transcripts.iter().copied().enumerate() {
                let Some(details) = self.score_pair(hook, transcript, tool_count) else {
                    continue;
                };
                if details.path_match || details.time_match {
                    candidates.push(Candidate {
                        hook: hi,
                        transcript: ti,
                        details,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.details
                .score
                .cmp(&a.details.score)
                .then_with(|| hooks[a.hook].start_time.cmp(&hooks[b.hook].start_time))
                .then_with(|| hooks[a.hook].session_id.cmp(&hooks[b.hook].session_id))
                .then_with(|| transcripts[a.transcript].id.cmp(&transcripts[b.transcript].id))
        });

        let mut hook_claimed = vec![false; hooks.len()];
        let mut transcript_claimed = vec![false; transcripts.len()];
        let mut conversations = Vec::new();

        for candidate in &candidates {
            if hook_claimed[candidate.hook] || transcript_claimed[candidate.transcript] {
                continue;
            }
            hook_claimed[candidate.hook] = true;
            transcript_claimed[candidate.transcript] = true;

            let hook = hooks[candidate.hook];
            let transcript = transcripts[candidate.transcript];
            let match_type = if candidate.details.path_match {
                MatchType::Exact
            } else {
                MatchType::Linked
            };
            debug!(
                session = %hook.session_id,
                transcript = %transcript.id,
                score = candidate.details.score,
                match_type = %match_type,
                "Paired hook session with transcript"
            );
            conversations.push(Conversation::from_primary(
                Some(hook),
                Some(transcript),
                usages_for(hook),
                match_type,
                candidate.details,
            ));
        }

        for (&hook, _) in hooks.iter().zip(&hook_claimed).filter(|(_, c)| !**c) {
            conversations.push(Conversation::from_primary(
                Some(hook),
                None,
                usages_for(hook),
                MatchType::Partial,
                MatchDetails::default(),
            ));
        }
        for (&transcript, _) in transcripts
            .iter()
            .zip(&transcript_claimed)
            .filter(|(_, c)| !**c)
        {
            conversations.push(Conversation::from_primary(
                None,
                Some(transcript),
                &[],
                MatchType::Partial,
                MatchDetails::default(),
            ));
        }

        for conv in &conversations {
            match conv.match_type {
                MatchType::Exact => stats.exact += 1,
                MatchType::Linked => stats.linked += 1,
                MatchType::Partial => stats.partial += 1,
                MatchType::Unmatched => {}
            }
            if conv.low_confidence {
                stats.low_confidence += 1;
            }
        }

        sort_conversations(&mut conversations);

        info!(
            conversations = conversations.len(),
            candidates = candidates.len(),
            exact = stats.exact,
            linked = stats.linked,
            partial = stats.partial,
            unmatched = stats.unmatched,
            "Correlation complete"
        );

        CorrelationOutput {
            conversations,
            stats,
        }
    }

    /// Correlate a full record set and run every attachment pass.
    ///
    /// Unparseable records and managed sessions without a cwd or start time
    /// are counted in `stats.unmatched`.
    ///
    /// Managed sessions are attached before snapshots so that their pids are
    /// available for snapshot matching.
    pub fn run(
        &self,
        records: &RecordSet,
        projects: &[Project],
        now_ms: EpochMs,
    ) -> CorrelationOutput {
        let mut output = self.correlate(
            &records.hook_sessions,
            &records.transcripts,
            &records.tool_usages,
        );
        output.stats.unmatched += records.rejected;
        output.stats.unmatched += records
            .managed_sessions
            .iter()
            .filter(|m| !m.is_correlatable())
            .count();

        let store = StartStateStore::from_map(records.start_states.clone());

        let conversations =
            attach_managed_sessions(output.conversations, &records.managed_sessions);
        let conversations =
            attach_process_snapshots(conversations, &records.process_snapshots, now_ms);
        let conversations = attach_projects(conversations, projects);
        output.conversations = attach_start_states(conversations, &store);
        output
    }
}

/// Filter out uncorrelatable records and repeated ids, keeping first
/// occurrences in input order.
fn usable<'a, T>(
    records: &'a [T],
    is_correlatable: impl Fn(&T) -> bool,
    id: impl Fn(&T) -> &String,
    stats: &mut CorrelationStats,
) -> Vec<&'a T> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        if !is_correlatable(record) || !seen.insert(id(record).clone()) {
            debug!(id = %id(record), "Dropping uncorrelatable record");
            stats.unmatched += 1;
            continue;
        }
        out.push(record);
    }
    out
}

/// Correlate with the default tunables.
pub fn correlate(
    hooks: &[HookSession],
    transcripts: &[LocalTranscript],
    usages_by_session: &BTreeMap<String, Vec<ToolUsage>>,
) -> CorrelationOutput {
    Correlator::default().correlate(hooks, transcripts, usages_by_session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hook(id: &str, cwd: &str, start: i64, path: Option<&str>) -> HookSession {
        let mut value = json!({"session_id": id, "cwd": cwd, "start_time": start});
        if let Some(path) = path {
            value["transcript_path"] = json!(path);
        }
        serde_json::from_value(value).unwrap()
    }

    fn transcript(id: &str, dir: &str, start: i64) -> LocalTranscript {
        serde_json::from_value(json!({
            "id": id,
            "agent": "claude",
            "path": format!("/t/{id}.jsonl"),
            "project_dir": dir,
            "start_time": start
        }))
        .unwrap()
    }

    fn run(hooks: &[HookSession], transcripts: &[LocalTranscript]) -> CorrelationOutput {
        correlate(hooks, transcripts, &BTreeMap::new())
    }

    #[test]
    fn test_exact_on_transcript_path() {
        let out = run(
            &[hook("s1", "/proj", 1000, Some("/t/a.jsonl"))],
            &[transcript("a", "/proj", 1000)],
        );
        assert_eq!(out.conversations.len(), 1);
        let conv = &out.conversations[0];
        assert_eq!(conv.match_type, MatchType::Exact);
        assert_eq!(conv.correlation_id, "s1");
        assert!(conv.match_details.path_match);
        assert_eq!(out.stats.exact, 1);
    }

    #[test]
    fn test_path_match_alone_is_exact() {
        // Different start times, transcript dir is a parent of the hook cwd
        let out = run(
            &[hook("s1", "/proj/sub", 1_000, Some("/t/a.jsonl"))],
            &[transcript("a", "/proj", 900_000)],
        );
        assert_eq!(out.conversations[0].match_type, MatchType::Exact);
        assert!(!out.conversations[0].match_details.time_match);
        assert!(!out.conversations[0].match_details.cwd_match);
    }

    #[test]
    fn test_linked_within_window() {
        let out = run(
            &[hook("s1", "/proj", 1_000_000, None)],
            &[transcript("a", "/proj", 1_004_000)],
        );
        assert_eq!(out.conversations.len(), 1);
        assert_eq!(out.conversations[0].match_type, MatchType::Linked);
        assert!(!out.conversations[0].low_confidence);
        assert_eq!(out.stats.linked, 1);
    }

    #[test]
    fn test_outside_window_is_partial() {
        let out = run(
            &[hook("s1", "/proj", 1_000_000, None)],
            &[transcript("a", "/proj", 1_010_000)],
        );
        assert_eq!(out.conversations.len(), 2);
        assert!(out
            .conversations
            .iter()
            .all(|c| c.match_type == MatchType::Partial));
        assert_eq!(out.stats.partial, 2);
    }

    #[test]
    fn test_prefix_dir_with_time_is_low_confidence() {
        let out = run(
            &[hook("s1", "/proj/sub", 1_000_000, None)],
            &[transcript("a", "/proj", 1_002_000)],
        );
        let conv = &out.conversations[0];
        assert_eq!(conv.match_type, MatchType::Linked);
        assert!(conv.low_confidence);
        assert_eq!(out.stats.low_confidence, 1);
    }

    #[test]
    fn test_trailing_separator_is_compatible_not_equal() {
        let out = run(
            &[hook("s1", "/proj/", 1_000_000, None)],
            &[transcript("a", "/proj", 1_001_000)],
        );
        assert_eq!(out.conversations.len(), 1);
        let conv = &out.conversations[0];
        assert_eq!(conv.match_type, MatchType::Linked);
        assert!(!conv.match_details.cwd_match);
        assert!(conv.low_confidence);
    }

    #[test]
    fn test_incompatible_dirs_never_pair() {
        let out = run(
            &[hook("s1", "/project", 1000, Some("/t/a.jsonl"))],
            &[transcript("a", "/proj", 1000)],
        );
        assert_eq!(out.conversations.len(), 2);
    }

    #[test]
    fn test_greedy_prefers_higher_score() {
        // Both hooks are within the window of transcript `a`; s2 also agrees
        // on the path and must win it.
        let out = run(
            &[
                hook("s1", "/proj", 1_000_000, None),
                hook("s2", "/proj", 1_001_000, Some("/t/a.jsonl")),
            ],
            &[transcript("a", "/proj", 1_000_500)],
        );
        let s2 = out
            .conversations
            .iter()
            .find(|c| c.correlation_id == "s2")
            .unwrap();
        assert_eq!(s2.match_type, MatchType::Exact);
        let s1 = out
            .conversations
            .iter()
            .find(|c| c.correlation_id == "s1")
            .unwrap();
        assert_eq!(s1.match_type, MatchType::Partial);
    }

    #[test]
    fn test_tie_broken_by_earliest_hook() {
        let out = run(
            &[
                hook("s2", "/proj", 1_000_100, None),
                hook("s1", "/proj", 1_000_000, None),
            ],
            &[transcript("a", "/proj", 1_000_050)],
        );
        let linked: Vec<_> = out
            .conversations
            .iter()
            .filter(|c| c.match_type == MatchType::Linked)
            .collect();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].correlation_id, "s1");
    }

    #[test]
    fn test_malformed_records_counted_not_paired() {
        let out = run(
            &[
                hook("s1", "", 1000, None),
                hook("s2", "/proj", 0, None),
                hook("s3", "/proj", 1000, None),
                hook("s3", "/proj", 2000, None),
            ],
            &[transcript("", "/proj", 1000)],
        );
        assert_eq!(out.stats.unmatched, 4);
        assert_eq!(out.conversations.len(), 1);
        assert_eq!(out.conversations[0].correlation_id, "s3");
        assert_eq!(out.conversations[0].start_time, 1000);
    }

    #[test]
    fn test_tool_usages_raise_effective_count() {
        let mut usages = BTreeMap::new();
        let usage: ToolUsage =
            serde_json::from_value(json!({"tool_use_id": "u", "tool_name": "Bash"})).unwrap();
        usages.insert("s1".to_string(), vec![usage; 10]);

        let mut t = transcript("a", "/proj", 1000);
        t.tool_use_count = Some(10);

        let out = correlate(&[hook("s1", "/proj", 1000, None)], &[t], &usages);
        let conv = &out.conversations[0];
        assert!(conv.match_details.tool_count_match);
        assert_eq!(conv.tool_usages.len(), 10);
        assert_eq!(conv.match_details.score, TIME_WEIGHT + CWD_WEIGHT + TOOL_COUNT_WEIGHT);
    }

    #[test]
    fn test_tool_tolerance() {
        let correlator = Correlator::default();
        assert!(correlator.tool_counts_agree(0, 2));
        assert!(!correlator.tool_counts_agree(0, 3));
        assert!(correlator.tool_counts_agree(100, 110));
        assert!(!correlator.tool_counts_agree(100, 112));
    }

    #[test]
    fn test_output_most_recent_first() {
        let out = run(
            &[hook("old", "/a", 1000, None), hook("new", "/b", 9000, None)],
            &[transcript("mid", "/c", 5000)],
        );
        let ids: Vec<_> = out
            .conversations
            .iter()
            .map(|c| c.correlation_id.as_str())
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_builder_validation() {
        assert!(Correlator::new().with_time_window_ms(10_000).is_ok());
        assert!(matches!(
            Correlator::new().with_time_window_ms(MAX_TIME_WINDOW_MS + 1),
            Err(CorrelationError::TimeWindowTooLarge(_))
        ));
        assert!(matches!(
            Correlator::new().with_tool_tolerance(2, f64::NAN),
            Err(CorrelationError::InvalidToleranceRatio(_))
        ));

        let wide = Correlator::new().with_time_window_ms(20_000).unwrap();
        let out = wide.correlate(
            &[hook("s1", "/proj", 1_000_000, None)],
            &[transcript("a", "/proj", 1_010_000)],
            &BTreeMap::new(),
        );
        assert_eq!(out.conversations.len(), 1);
        assert_eq!(out.conversations[0].match_type, MatchType::Linked);
    }
}
