//! Git start-state store.
//!
//! Start states are captured by the hook layer when a session starts and are
//! later copied onto conversations. The store is an explicit value owned by
//! the caller; nothing here is global.

use crate::conversation::Conversation;
use aw_common::StartState;
use std::collections::BTreeMap;

/// Start states keyed by session id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartStateStore {
    states: BTreeMap<String, StartState>,
}

impl StartStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from an existing map.
    pub fn from_map(states: BTreeMap<String, StartState>) -> Self {
        Self { states }
    }

    /// Record the start state for a session, returning any previous one.
    pub fn insert(&mut self, key: impl Into<String>, state: StartState) -> Option<StartState> {
        self.states.insert(key.into(), state)
    }

    pub fn get(&self, key: &str) -> Option<&StartState> {
        self.states.get(key)
    }

    /// Forget one session's start state.
    pub fn clear(&mut self, key: &str) -> Option<StartState> {
        self.states.remove(key)
    }

    /// Forget everything.
    pub fn clear_all(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Copy start states onto conversations.
///
/// Looks up the hook session id first, then the correlation id.
pub fn attach_start_states(
    mut conversations: Vec<Conversation>,
    store: &StartStateStore,
) -> Vec<Conversation> {
    if store.is_empty() {
        return conversations;
    }
    for conv in &mut conversations {
        let state = conv
            .hook_session
            .as_ref()
            .and_then(|hook| store.get(&hook.session_id))
            .or_else(|| store.get(&conv.correlation_id));
        if let Some(state) = state {
            conv.start_state = Some(state.clone());
        }
    }
    conversations
}
