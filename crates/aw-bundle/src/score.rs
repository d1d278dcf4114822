//! Session quality score.
//!
//! A bounded weighted sum of boolean signals read from a conversation. The
//! score is only a hint for reviewers choosing what to share; it never gates
//! export.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COMMITS_WEIGHT: u32 = 25;
pub const LOW_FAILURE_WEIGHT: u32 = 20;
pub const TOOL_ACTIVITY_WEIGHT: u32 = 15;
pub const PACING_WEIGHT: u32 = 15;
pub const CORRELATED_WEIGHT: u32 = 15;
pub const TRANSCRIPT_WEIGHT: u32 = 10;

/// Failure rate below which tool use counts as healthy.
pub const MAX_FAILURE_RATE: f64 = 0.2;
/// Tool calls needed for the activity signal.
pub const MIN_TOOL_CALLS: usize = 5;
/// Durations in `[MIN_DURATION_MS, MAX_DURATION_MS]` count as well paced.
pub const MIN_DURATION_MS: i64 = 60_000;
pub const MAX_DURATION_MS: i64 = 4 * 60 * 60 * 1000;

/// The boolean signals behind a score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySignals {
    pub has_commits: bool,
    pub low_failure_rate: bool,
    pub tool_activity: bool,
    pub well_paced: bool,
    pub correlated: bool,
    pub has_transcript: bool,
}

impl QualitySignals {
    /// Read the signals from a conversation value. Missing fields read as
    /// absent signals.
    pub fn from_value(session: &Value) -> Self {
        let usages = session
            .get("tool_usages")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let completed: Vec<bool> = usages
            .iter()
            .filter_map(|u| u.get("success").and_then(Value::as_bool))
            .collect();
        let failures = completed.iter().filter(|ok| !**ok).count();
        let low_failure_rate = !completed.is_empty()
            && (failures as f64 / completed.len() as f64) < MAX_FAILURE_RATE;

        let hook_tool_count = session
            .pointer("/hook_session/tool_count")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;

        let duration = match (
            session.get("start_time").and_then(Value::as_i64),
            session.get("end_time").and_then(Value::as_i64),
        ) {
            (Some(start), Some(end)) if end >= start => Some(end - start),
            _ => None,
        };

        Self {
            has_commits: session
                .pointer("/hook_session/commits")
                .and_then(Value::as_array)
                .is_some_and(|c| !c.is_empty()),
            low_failure_rate,
            tool_activity: usages.len().max(hook_tool_count) >= MIN_TOOL_CALLS,
            well_paced: duration
                .is_some_and(|d| (MIN_DURATION_MS..=MAX_DURATION_MS).contains(&d)),
            correlated: matches!(
                session.get("match_type").and_then(Value::as_str),
                Some("exact" | "linked")
            ),
            has_transcript: session.get("transcript").is_some_and(|t| !t.is_null()),
        }
    }

    /// Weighted score in `0..=100`.
    pub fn score(&self) -> u32 {
        [
            (self.has_commits, COMMITS_WEIGHT),
            (self.low_failure_rate, LOW_FAILURE_WEIGHT),
            (self.tool_activity, TOOL_ACTIVITY_WEIGHT),
            (self.well_paced, PACING_WEIGHT),
            (self.correlated, CORRELATED_WEIGHT),
            (self.has_transcript, TRANSCRIPT_WEIGHT),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, weight)| weight)
        .sum()
    }
}

/// Score a conversation value.
pub fn quality_score(session: &Value) -> u32 {
    QualitySignals::from_value(session).score()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_weights_sum_to_100() {
        let all = QualitySignals {
            has_commits: true,
            low_failure_rate: true,
            tool_activity: true,
            well_paced: true,
            correlated: true,
            has_transcript: true,
        };
        assert_eq!(all.score(), 100);
        assert_eq!(QualitySignals::default().score(), 0);
    }

    #[test]
    fn test_full_session_scores_high() {
        let usages: Vec<_> = (0..6)
            .map(|i| json!({"tool_name": "Bash", "success": i != 0}))
            .collect();
        let session = json!({
            "match_type": "exact",
            "start_time": 0,
            "end_time": 30 * 60 * 1000,
            "hook_session": {"commits": [{"hash": "abc"}]},
            "tool_usages": usages,
            "transcript": {"id": "t"}
        });
        // 1 failure in 6 is under the 20% limit
        assert_eq!(quality_score(&session), 100);
    }

    #[test]
    fn test_signals_from_sparse_session() {
        let session = json!({
            "match_type": "partial",
            "start_time": 0,
            "end_time": 10_000,
            "tool_usages": [
                {"success": false},
                {"success": null}
            ],
            "transcript": null
        });
        let signals = QualitySignals::from_value(&session);
        assert_eq!(signals, QualitySignals::default());
    }

    #[test]
    fn test_hook_tool_count_counts_as_activity() {
        let session = json!({"hook_session": {"tool_count": 12}});
        assert!(QualitySignals::from_value(&session).tool_activity);
        assert_eq!(quality_score(&session), TOOL_ACTIVITY_WEIGHT);
    }

    #[test]
    fn test_scalar_input_scores_zero() {
        assert_eq!(quality_score(&json!("text")), 0);
    }
}
