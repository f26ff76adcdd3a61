//! Process-wide collection of live capture sessions
//!
//! The registry exists so one external "tick" call can advance every open
//! session together. It is an explicitly constructed object owned by the
//! embedder and passed to whoever needs it; there is no implicit singleton.
//! It starts empty and is expected to be empty again at clean shutdown;
//! closing still-open sessions is the caller's responsibility.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::session::{SessionId, SharedSession};

/// Registry of open capture sessions, in registration order.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<Vec<(SessionId, SharedSession)>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn register(&self, session: SharedSession) {
        let id = session.lock().id();
        self.sessions.lock().push((id, session));
    }

    pub(crate) fn unregister(&self, id: SessionId) {
        self.sessions.lock().retain(|(session_id, _)| *session_id != id);
    }

    /// Advance every registered session by one tick, in registration order.
    ///
    /// A failing session is logged and never stops the rest; with zero
    /// sessions this is a no-op.
    pub fn tick_all(&self) {
        let snapshot: Vec<SharedSession> = self
            .sessions
            .lock()
            .iter()
            .map(|(_, session)| Arc::clone(session))
            .collect();
        for session in snapshot {
            if let Err(e) = session.lock().update() {
                warn!(error = %e, "session update failed during tick");
            }
        }
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// True when no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
