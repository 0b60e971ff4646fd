//! Session-scoped conversation history.
//!
//! Histories are keyed by a caller-supplied session ID. Each session keeps a
//! bounded number of turns and is evicted after a period of inactivity, so
//! concurrent callers never share or grow state without bound.

use crate::llm::ChatTurn;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Session {
    turns: Vec<ChatTurn>,
    last_active: Instant,
}

/// Bounded, TTL-evicted store of per-session chat histories.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    max_turns: usize,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(max_turns: usize, ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_turns,
            ttl,
        }
    }

    /// A copy of the session's turns, oldest first. Expired sessions are
    /// pruned on every access.
    pub fn snapshot(&self, session_id: &str) -> Vec<ChatTurn> {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Self::prune(&mut sessions, self.ttl);

        sessions
            .get(session_id)
            .map(|s| s.turns.clone())
            .unwrap_or_default()
    }

    /// Append turns to a session, creating it if needed and trimming to the
    /// turn bound.
    pub fn append(&self, session_id: &str, turns: impl IntoIterator<Item = ChatTurn>) {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Self::prune(&mut sessions, self.ttl);

        let session = sessions.entry(session_id.to_string()).or_insert(Session {
            turns: Vec::new(),
            last_active: Instant::now(),
        });

        session.turns.extend(turns);
        session.last_active = Instant::now();

        if session.turns.len() > self.max_turns {
            let excess = session.turns.len() - self.max_turns;
            session.turns.drain(..excess);
        }
    }

    /// Clear one session. Returns whether it existed.
    pub fn clear(&self, session_id: &str) -> bool {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.remove(session_id).is_some()
    }

    /// Clear every session.
    pub fn clear_all(&self) {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.clear();
    }

    fn prune(sessions: &mut HashMap<String, Session>, ttl: Duration) {
        sessions.retain(|_, session| session.last_active.elapsed() < ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new(20, Duration::from_secs(3600));

        store.append("a", [ChatTurn::user("hello from a")]);
        store.append("b", [ChatTurn::user("hello from b")]);

        let a = store.snapshot("a");
        let b = store.snapshot("b");
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(a[0].text, "hello from a");
        assert_eq!(b[0].text, "hello from b");
    }

    #[test]
    fn test_clear_targets_one_session() {
        let store = SessionStore::new(20, Duration::from_secs(3600));
        store.append("a", [ChatTurn::user("x")]);
        store.append("b", [ChatTurn::user("y")]);

        assert!(store.clear("a"));
        assert!(store.snapshot("a").is_empty());
        assert_eq!(store.snapshot("b").len(), 1);

        assert!(!store.clear("a"));
    }

    #[test]
    fn test_turns_trimmed_to_bound() {
        let store = SessionStore::new(4, Duration::from_secs(3600));
        for i in 0..10 {
            store.append(
                "s",
                [
                    ChatTurn::user(format!("q{}", i)),
                    ChatTurn::model(format!("a{}", i)),
                ],
            );
        }

        let turns = store.snapshot("s");
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].text, "q8");
        assert_eq!(turns[3].text, "a9");
    }

    #[test]
    fn test_ttl_eviction() {
        let store = SessionStore::new(20, Duration::from_millis(0));
        store.append("s", [ChatTurn::user("x")]);
        // TTL of zero: the session is already expired on next access
        assert!(store.snapshot("s").is_empty());
    }
}
