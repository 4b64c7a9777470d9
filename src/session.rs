use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::{Level, debug, event};

use crate::token::AccessToken;

/// Holds the current access token and authentication flag. Owned by the
/// application; the refresh flow writes the token exactly once per successful
/// refresh and reads it on every dispatch.
pub trait SessionStore: Send + Sync {
    fn access_token(&self) -> Option<AccessToken>;

    /// Replaces the token wholesale and marks the session authenticated.
    fn set_access_token(&self, token: AccessToken);

    /// Clears the token and authentication flag. Returns `true` only if a live
    /// session was actually cleared, so overlapping teardowns collapse to one
    /// observable effect.
    fn clear_session(&self) -> bool;

    fn is_authenticated(&self) -> bool;
}

/// Signal the hosting application observes to redirect to its login surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Ended,
}

#[derive(Default)]
struct SessionInner {
    token: Option<AccessToken>,
    authenticated: bool,
}

/// In-process `SessionStore`. State lives for the process lifetime and resets
/// only with it; nothing is persisted.
#[derive(Default)]
pub struct MemorySession {
    inner: RwLock<SessionInner>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySession {
    fn access_token(&self) -> Option<AccessToken> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .token
            .clone()
    }

    fn set_access_token(&self, token: AccessToken) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.token = Some(token);
        inner.authenticated = true;
    }

    fn clear_session(&self) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.token.is_none() && !inner.authenticated {
            return false;
        }
        inner.token = None;
        inner.authenticated = false;
        true
    }

    fn is_authenticated(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .authenticated
    }
}

/// Terminal session action: clear the store and tell the application once.
///
/// Idempotent under overlap. A refresh failure racing a user-initiated logout
/// produces a single `SessionEvent::Ended`; a teardown after a later login is a
/// new session-ending event and signals again.
#[derive(Clone)]
pub(crate) struct SessionTeardown {
    store: Arc<dyn SessionStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionTeardown {
    pub(crate) fn new(store: Arc<dyn SessionStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self { store, events }
    }

    pub(crate) fn teardown(&self) {
        if self.store.clear_session() {
            event!(Level::INFO, "session.teardown");
            // Nobody subscribed yet is fine; the clear already happened.
            let _ = self.events.send(SessionEvent::Ended);
        } else {
            debug!("session.teardown skipped, no live session");
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
