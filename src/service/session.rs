//! In-flight call bookkeeping keyed by the telephony provider's CallSid

use std::collections::HashMap;
use std::sync::Mutex;

/// Tracks which call log each live CallSid belongs to, plus how many
/// follow-up turns the caller has used. The CallSid is the primary
/// correlation key; hash lookup against storage is only a fallback for
/// calls that started before a restart.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, CallSession>>,
}

#[derive(Debug, Clone)]
struct CallSession {
    call_id: String,
    turns_used: u32,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new call at call start
    pub fn start(&self, call_sid: &str, call_id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(
            call_sid.to_string(),
            CallSession {
                call_id: call_id.to_string(),
                turns_used: 0,
            },
        );
    }

    /// Call log id for a live CallSid, if the registry has seen it
    pub fn call_id(&self, call_sid: &str) -> Option<String> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(call_sid).map(|s| s.call_id.clone())
    }

    /// Consume one follow-up turn. Returns the 1-based turn number, or
    /// `None` once the cap is exhausted.
    pub fn next_turn(&self, call_sid: &str, max_turns: u32) -> Option<u32> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let session = sessions.get_mut(call_sid)?;
        if session.turns_used >= max_turns {
            return None;
        }
        session.turns_used += 1;
        Some(session.turns_used)
    }

    /// Drop bookkeeping once a call ends
    pub fn finish(&self, call_sid: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(call_sid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_lookup() {
        let registry = SessionRegistry::new();
        registry.start("CA123", "call-1");

        assert_eq!(registry.call_id("CA123").as_deref(), Some("call-1"));
        assert!(registry.call_id("CA999").is_none());
    }

    #[test]
    fn turn_cap_allows_exactly_max_turns() {
        let registry = SessionRegistry::new();
        registry.start("CA123", "call-1");

        for expected in 1..=5 {
            assert_eq!(registry.next_turn("CA123", 5), Some(expected));
        }
        assert_eq!(registry.next_turn("CA123", 5), None);
        assert_eq!(registry.next_turn("CA123", 5), None);
    }

    #[test]
    fn unknown_sid_has_no_turns() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.next_turn("CA404", 5), None);
    }

    #[test]
    fn finish_clears_the_session() {
        let registry = SessionRegistry::new();
        registry.start("CA123", "call-1");
        registry.finish("CA123");

        assert!(registry.call_id("CA123").is_none());
    }
}
