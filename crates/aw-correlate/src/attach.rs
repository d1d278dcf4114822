//! Attachment passes.
//!
//! Each pass takes the conversation list plus one extra source and returns
//! the augmented list. They run after hook/transcript pairing.

use crate::conversation::{sort_conversations, Conversation};
use aw_common::{is_path_prefix, normalize_dir, EpochMs, ManagedSession, ProcessSnapshot, Project};
use tracing::debug;

/// Attach process snapshots to the conversations they observed.
///
/// A snapshot belongs to a conversation when its timestamp lies within
/// `[start_time, end_time or now_ms]` and either its pid equals the
/// conversation's known pid or, when no pid is known, its cwd equals the
/// conversation's cwd. A pid match is preferred, then the most recently
/// started conversation. Each snapshot is attached at most once; attached
/// snapshots are ordered by timestamp.
pub fn attach_process_snapshots(
    mut conversations: Vec<Conversation>,
    snapshots: &[ProcessSnapshot],
    now_ms: EpochMs,
) -> Vec<Conversation> {
    let mut attached = 0usize;

    for snapshot in snapshots {
        let mut best: Option<(usize, bool)> = None;
        for (index, conv) in conversations.iter().enumerate() {
            if !conv.contains_time(snapshot.timestamp, now_ms) {
                continue;
            }
            let pid_match = match conv.pid() {
                Some(pid) => pid == snapshot.pid,
                None => false,
            };
            let cwd_match = conv.pid().is_none()
                && snapshot
                    .cwd
                    .as_deref()
                    .is_some_and(|cwd| normalize_dir(cwd) == normalize_dir(&conv.cwd));
            if !pid_match && !cwd_match {
                continue;
            }

            let better = match best {
                None => true,
                Some((current, current_pid)) => {
                    let other = &conversations[current];
                    (pid_match, conv.start_time, std::cmp::Reverse(&conv.correlation_id))
                        > (
                            current_pid,
                            other.start_time,
                            std::cmp::Reverse(&other.correlation_id),
                        )
                }
            };
            if better {
                best = Some((index, pid_match));
            }
        }

        if let Some((index, _)) = best {
            conversations[index].process_snapshots.push(snapshot.clone());
            attached += 1;
        }
    }

    for conv in &mut conversations {
        conv.process_snapshots
            .sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.pid.cmp(&b.pid)));
    }

    debug!(
        snapshots = snapshots.len(),
        attached,
        "Attached process snapshots"
    );
    conversations
}

fn windows_overlap(
    a_start: EpochMs,
    a_end: Option<EpochMs>,
    b_start: EpochMs,
    b_end: Option<EpochMs>,
) -> bool {
    a_start <= b_end.unwrap_or(EpochMs::MAX) && b_start <= a_end.unwrap_or(EpochMs::MAX)
}

/// Attach managed sessions by cwd equality and overlapping time windows.
///
/// Managed sessions are considered in start order; each takes the free
/// conversation whose start is closest to its own. A conversation holds at
/// most one managed session. Managed sessions that match nothing become
/// their own conversations; ones without a cwd or start time are dropped
/// (callers count them, see [`Correlator::run`](crate::Correlator::run)).
pub fn attach_managed_sessions(
    mut conversations: Vec<Conversation>,
    managed: &[ManagedSession],
) -> Vec<Conversation> {
    let mut ordered: Vec<&ManagedSession> = managed.iter().collect();
    ordered.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));

    let mut extra = Vec::new();
    let mut dropped = 0usize;

    for session in ordered {
        if !session.is_correlatable() {
            dropped += 1;
            continue;
        }
        let cwd = normalize_dir(&session.cwd);

        let best = conversations
            .iter()
            .enumerate()
            .filter(|(_, conv)| conv.managed_session.is_none())
            .filter(|(_, conv)| normalize_dir(&conv.cwd) == cwd)
            .filter(|(_, conv)| {
                windows_overlap(
                    conv.start_time,
                    conv.end_time,
                    session.started_at,
                    session.ended_at,
                )
            })
            .min_by(|(_, a), (_, b)| {
                a.start_time
                    .abs_diff(session.started_at)
                    .cmp(&b.start_time.abs_diff(session.started_at))
                    .then_with(|| a.correlation_id.cmp(&b.correlation_id))
            })
            .map(|(index, _)| index);

        match best {
            Some(index) => {
                debug!(
                    managed = %session.id,
                    conversation = %conversations[index].correlation_id,
                    "Attached managed session"
                );
                conversations[index].managed_session = Some(session.clone());
            }
            None => extra.push(Conversation::from_managed(session)),
        }
    }

    if dropped > 0 {
        debug!(dropped, "Dropped managed sessions without cwd or start time");
    }
    if !extra.is_empty() {
        conversations.extend(extra);
        sort_conversations(&mut conversations);
    }
    conversations
}

/// Attach the first project with a path that contains the conversation's cwd.
///
/// Project order is significant: the first match wins even if a later
/// project has a more specific path.
pub fn attach_projects(
    mut conversations: Vec<Conversation>,
    projects: &[Project],
) -> Vec<Conversation> {
    for conv in &mut conversations {
        conv.project = projects
            .iter()
            .find(|project| {
                project
                    .paths
                    .iter()
                    .any(|path| is_path_prefix(path, &conv.cwd))
            })
            .cloned();
    }
    conversations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{MatchDetails, MatchType};
    use aw_common::HookSession;
    use serde_json::json;

    fn conv(id: &str, cwd: &str, start: i64, end: Option<i64>) -> Conversation {
        let mut value = json!({"session_id": id, "cwd": cwd, "start_time": start});
        if let Some(end) = end {
            value["end_time"] = json!(end);
        }
        let hook: HookSession = serde_json::from_value(value).unwrap();
        Conversation::from_primary(
            Some(&hook),
            None,
            &[],
            MatchType::Partial,
            MatchDetails::default(),
        )
    }

    fn snapshot(pid: u32, cwd: Option<&str>, ts: i64) -> ProcessSnapshot {
        serde_json::from_value(json!({"pid": pid, "cwd": cwd, "timestamp": ts})).unwrap()
    }

    fn managed(id: &str, cwd: &str, start: i64, end: Option<i64>, pid: Option<u32>) -> ManagedSession {
        serde_json::from_value(json!({
            "id": id, "agent": "claude", "cwd": cwd, "started_at": start,
            "ended_at": end, "pid": pid, "status": "completed"
        }))
        .unwrap()
    }

    #[test]
    fn test_snapshots_by_cwd_and_window() {
        let convs = vec![conv("s1", "/proj", 1000, Some(2000))];
        let out = attach_process_snapshots(
            convs,
            &[
                snapshot(7, Some("/proj"), 1500),
                snapshot(7, Some("/proj"), 1200),
                snapshot(7, Some("/proj"), 2500),
                snapshot(7, Some("/other"), 1500),
                snapshot(7, None, 1500),
            ],
            10_000,
        );
        let times: Vec<_> = out[0].process_snapshots.iter().map(|s| s.timestamp).collect();
        assert_eq!(times, vec![1200, 1500]);
    }

    #[test]
    fn test_active_conversation_window_ends_now() {
        let convs = vec![conv("s1", "/proj", 1000, None)];
        let out = attach_process_snapshots(
            convs,
            &[snapshot(1, Some("/proj"), 5000), snapshot(1, Some("/proj"), 9000)],
            6000,
        );
        assert_eq!(out[0].process_snapshots.len(), 1);
    }

    #[test]
    fn test_snapshot_pid_match_preferred() {
        let mut with_pid = conv("a", "/proj", 1000, None);
        with_pid.managed_session = Some(managed("m", "/proj", 1000, None, Some(42)));
        let without_pid = conv("b", "/proj", 1100, None);

        let out = attach_process_snapshots(
            vec![with_pid, without_pid],
            &[snapshot(42, Some("/proj"), 1500), snapshot(9, Some("/proj"), 1500)],
            2000,
        );
        let a = out.iter().find(|c| c.correlation_id == "a").unwrap();
        let b = out.iter().find(|c| c.correlation_id == "b").unwrap();
        assert_eq!(a.process_snapshots.len(), 1);
        assert_eq!(a.process_snapshots[0].pid, 42);
        // pid 9 does not match a's pid, so only b (no pid, same cwd) can take it
        assert_eq!(b.process_snapshots.len(), 1);
        assert_eq!(b.process_snapshots[0].pid, 9);
    }

    #[test]
    fn test_managed_session_closest_start_wins() {
        let convs = vec![
            conv("early", "/proj", 1000, Some(10_000)),
            conv("late", "/proj", 4000, Some(10_000)),
        ];
        let out = attach_managed_sessions(convs, &[managed("m1", "/proj", 3500, Some(6000), None)]);
        let late = out.iter().find(|c| c.correlation_id == "late").unwrap();
        let early = out.iter().find(|c| c.correlation_id == "early").unwrap();
        assert_eq!(late.managed_session.as_ref().unwrap().id, "m1");
        assert!(early.managed_session.is_none());
    }

    #[test]
    fn test_managed_session_at_most_one_per_conversation() {
        let convs = vec![conv("s1", "/proj", 1000, Some(10_000))];
        let out = attach_managed_sessions(
            convs,
            &[
                managed("m1", "/proj", 1000, Some(2000), None),
                managed("m2", "/proj", 1500, Some(2500), None),
                managed("m3", "/elsewhere", 1000, None, None),
                managed("bad", "", 1000, None, None),
            ],
        );
        assert_eq!(out.len(), 3);
        let s1 = out.iter().find(|c| c.correlation_id == "s1").unwrap();
        assert_eq!(s1.managed_session.as_ref().unwrap().id, "m1");
        let orphans: Vec<_> = out
            .iter()
            .filter(|c| c.match_type == MatchType::Unmatched)
            .map(|c| c.managed_session.as_ref().unwrap().id.as_str())
            .collect();
        assert_eq!(orphans.len(), 2);
        assert!(orphans.contains(&"m2"));
        assert!(orphans.contains(&"m3"));
    }

    #[test]
    fn test_managed_requires_overlap() {
        let convs = vec![conv("s1", "/proj", 1000, Some(2000))];
        let out = attach_managed_sessions(convs, &[managed("m1", "/proj", 3000, None, None)]);
        assert!(out
            .iter()
            .find(|c| c.correlation_id == "s1")
            .unwrap()
            .managed_session
            .is_none());
    }

    #[test]
    fn test_projects_first_match_wins() {
        let projects = vec![
            Project {
                id: "mono".into(),
                name: "Monorepo".into(),
                paths: vec!["/work".into()],
            },
            Project {
                id: "api".into(),
                name: "API".into(),
                paths: vec!["/work/api".into()],
            },
        ];
        let convs = vec![
            conv("a", "/work/api/src", 1, None),
            conv("b", "/workshop", 2, None),
        ];
        let out = attach_projects(convs, &projects);
        let a = out.iter().find(|c| c.correlation_id == "a").unwrap();
        let b = out.iter().find(|c| c.correlation_id == "b").unwrap();
        assert_eq!(a.project.as_ref().unwrap().id, "mono");
        assert!(b.project.is_none());
    }
}
