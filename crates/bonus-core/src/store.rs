// Keyed session store with a lock per user.
//
// The outer map lock is held only long enough to look up or insert a slot;
// each slot has its own mutex, so handlers for different users never wait on
// each other while the state machine runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::directive::Directive;
use crate::machine::{self, Transition};
use crate::session::Session;

#[derive(Debug)]
struct Slot {
    session: Session,
    /// Last time a handler touched this session. Drives idle eviction.
    last_active: Instant,
}

impl Slot {
    fn fresh() -> Self {
        Self {
            session: Session::default(),
            last_active: Instant::now(),
        }
    }
}

/// Recover the guard from a poisoned mutex. A panic in one handler must not
/// lock a user (or everyone) out for the rest of the process.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// All live sessions, keyed by chat user id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<Slot>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the slot for `user_id`, creating it under the map lock so two
    /// concurrent first messages share one session.
    fn slot(&self, user_id: &str) -> Arc<Mutex<Slot>> {
        let mut sessions = lock(&self.sessions);
        if let Some(slot) = sessions.get(user_id) {
            return Arc::clone(slot);
        }
        debug!(user_id, "creating session");
        let slot = Arc::new(Mutex::new(Slot::fresh()));
        sessions.insert(user_id.to_string(), Arc::clone(&slot));
        slot
    }

    /// Snapshot of the user's session, creating a default one if needed.
    pub fn get_or_create(&self, user_id: &str) -> Session {
        let slot = self.slot(user_id);
        let guard = lock(&slot);
        guard.session.clone()
    }

    /// Replace the user's session with a fresh default and return it.
    pub fn reset(&self, user_id: &str) -> Session {
        let slot = self.slot(user_id);
        let mut guard = lock(&slot);
        *guard = Slot::fresh();
        debug!(user_id, "session reset");
        guard.session.clone()
    }

    /// Run one message through the state machine for `user_id`.
    ///
    /// The user's slot stays locked for the whole lookup + transition, so
    /// messages from the same user are applied one at a time.
    pub fn apply(&self, user_id: &str, raw_text: &str) -> Vec<Directive> {
        self.transition(user_id, |session| machine::handle(session, raw_text))
    }

    /// Run `step` on a copy of the user's session and store the result.
    /// If `step` unwinds, the slot still holds the previous session.
    fn transition<F>(&self, user_id: &str, step: F) -> Vec<Directive>
    where
        F: FnOnce(Session) -> Transition,
    {
        let slot = self.slot(user_id);
        let mut guard = lock(&slot);

        let Transition {
            session,
            directives,
        } = step(guard.session.clone());

        guard.session = session;
        guard.last_active = Instant::now();
        directives
    }

    /// Drop sessions untouched for longer than `max_idle`.
    ///
    /// Slots that a handler currently holds are skipped. Returns the number
    /// of sessions evicted.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = lock(&self.sessions);
        let before = sessions.len();

        // Handlers clone the Arc under the map lock, which we hold, so a
        // count of 1 means nobody else can reach this slot right now.
        sessions.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let last_active = lock(slot).last_active;
            now.saturating_duration_since(last_active) <= max_idle
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
