//! Call sessions.
//!
//! One [`Session`] per live call, keyed by call SID in the [`SessionStore`].
//! The session tracks the call's lifecycle state and the at-most-one
//! structured record collected during the call. AI transport handles are not
//! stored here; they live inside the call's bridge task so nothing outside
//! the call can touch them.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use serde_json::Value;

/// Lifecycle state of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Session created from the `start` message, AI not yet contacted
    Created,
    /// AI connection handshake in flight; inbound frames are buffered
    AiConnecting,
    /// Both legs up, audio flowing
    Active,
    /// Teardown in progress
    Terminating,
    /// Fully torn down; the session is about to leave the store
    Closed,
}

impl CallState {
    /// Whether a transition to `next` is legal.
    pub fn can_transition(self, next: CallState) -> bool {
        matches!(
            (self, next),
            (CallState::Created, CallState::AiConnecting)
                | (CallState::Created, CallState::Terminating)
                | (CallState::AiConnecting, CallState::Active)
                | (CallState::AiConnecting, CallState::Terminating)
                | (CallState::Active, CallState::Terminating)
                | (CallState::Terminating, CallState::Closed)
        )
    }

    /// Whether the call has begun tearing down.
    pub fn is_ending(self) -> bool {
        matches!(self, CallState::Terminating | CallState::Closed)
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CallState::Created => "created",
            CallState::AiConnecting => "ai_connecting",
            CallState::Active => "active",
            CallState::Terminating => "terminating",
            CallState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// State for one live call.
#[derive(Debug)]
pub struct Session {
    /// Call SID, the session key
    pub call_sid: String,
    /// Stream SID, echoed on every outbound media frame
    pub stream_sid: String,
    /// Caller phone number from the stream's custom parameters
    pub caller: Option<String>,
    /// When the stream started
    pub started_at: Instant,
    state: Mutex<CallState>,
    collected: Mutex<Option<Value>>,
}

impl Session {
    /// Create a session in the `Created` state.
    pub fn new(call_sid: String, stream_sid: String, caller: Option<String>) -> Self {
        Self {
            call_sid,
            stream_sid,
            caller,
            started_at: Instant::now(),
            state: Mutex::new(CallState::Created),
            collected: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CallState {
        *self.state.lock()
    }

    /// Advance to `next` if the transition is legal. Illegal transitions are
    /// logged and leave the state unchanged.
    pub fn transition(&self, next: CallState) -> bool {
        let mut state = self.state.lock();
        if state.can_transition(next) {
            tracing::debug!(
                call_sid = %self.call_sid,
                from = %*state,
                to = %next,
                "Call state transition"
            );
            *state = next;
            true
        } else {
            tracing::warn!(
                call_sid = %self.call_sid,
                from = %*state,
                to = %next,
                "Ignoring illegal call state transition"
            );
            false
        }
    }

    /// Set the collected record. Returns `false` when a record was already
    /// collected; the record is kept as-is in that case.
    pub fn try_set_collected(&self, record: Value) -> bool {
        let mut collected = self.collected.lock();
        if collected.is_some() {
            false
        } else {
            *collected = Some(record);
            true
        }
    }

    /// The collected record, if any.
    pub fn collected(&self) -> Option<Value> {
        self.collected.lock().clone()
    }

    /// Whole seconds since the stream started.
    pub fn duration_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Arena of live sessions, keyed by call SID.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session. Returns `None` when a session for the call SID
    /// already exists; the existing session is left untouched.
    pub fn insert(&self, session: Session) -> Option<Arc<Session>> {
        match self.sessions.entry(session.call_sid.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                let session = Arc::new(session);
                vacant.insert(session.clone());
                Some(session)
            }
        }
    }

    /// Look up a live session.
    pub fn get(&self, call_sid: &str) -> Option<Arc<Session>> {
        self.sessions.get(call_sid).map(|s| s.clone())
    }

    /// Remove a session at the end of its call.
    pub fn remove(&self, call_sid: &str) -> Option<Arc<Session>> {
        self.sessions.remove(call_sid).map(|(_, s)| s)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no calls are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> Session {
        Session::new(
            "CA1".to_string(),
            "MZ1".to_string(),
            Some("+15551234567".to_string()),
        )
    }

    #[test]
    fn test_legal_lifecycle() {
        let s = session();
        assert_eq!(s.state(), CallState::Created);
        assert!(s.transition(CallState::AiConnecting));
        assert!(s.transition(CallState::Active));
        assert!(s.transition(CallState::Terminating));
        assert!(s.transition(CallState::Closed));
    }

    #[test]
    fn test_illegal_transitions_are_ignored() {
        let s = session();
        assert!(!s.transition(CallState::Active));
        assert_eq!(s.state(), CallState::Created);

        assert!(s.transition(CallState::AiConnecting));
        assert!(s.transition(CallState::Terminating));
        // Cannot go back to Active once ending
        assert!(!s.transition(CallState::Active));
        assert!(s.state().is_ending());
    }

    #[test]
    fn test_collected_is_set_once() {
        let s = session();
        assert!(s.try_set_collected(json!({"phone": "+15551234567"})));
        assert!(!s.try_set_collected(json!({"phone": "+15559999999"})));
        assert_eq!(s.collected().unwrap()["phone"], "+15551234567");
    }

    #[test]
    fn test_store_rejects_duplicate_call_sid() {
        let store = SessionStore::new();
        assert!(store.insert(session()).is_some());
        assert!(store.insert(session()).is_none());
        assert_eq!(store.len(), 1);

        assert!(store.get("CA1").is_some());
        assert!(store.remove("CA1").is_some());
        assert!(store.is_empty());
    }
}
