use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::auth::AuthProvider;
use crate::security::{generate_token, validate_token};
use crate::store::DocumentStore;
use crate::view::PointsView;

/// View shared between the requests of one browser session
pub type SharedView<A, S> = Arc<tokio::sync::Mutex<PointsView<A, S>>>;

/// A resolved browser session
pub struct Session<A, S> {
    pub id: String,
    pub view: SharedView<A, S>,
    /// True when the id was just issued and the cookie must be set
    pub is_new: bool,
}

struct SessionEntry<A, S> {
    view: SharedView<A, S>,
    last_seen: Instant,
}

/// In-memory map from session cookie to that session's view
///
/// Sessions idle longer than the timeout are evicted on the next access, and
/// the least recently seen session makes room once `max_sessions` is reached.
/// Evicting a session drops its view, which unregisters the view's auth
/// subscription.
pub struct SessionRegistry<A, S> {
    sessions: Mutex<HashMap<String, SessionEntry<A, S>>>,
    idle_timeout: Duration,
    max_sessions: usize,
    provider: A,
    store: S,
}

type Entries<A, S> = HashMap<String, SessionEntry<A, S>>;

impl<A: AuthProvider, S: DocumentStore> SessionRegistry<A, S> {
    pub fn new(provider: A, store: S, idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
            provider,
            store,
        }
    }

    /// Find the live session for a cookie value without starting one
    ///
    /// Read-only requests use this so anonymous visitors hold no state.
    pub fn lookup(&self, id: Option<&str>) -> Option<Session<A, S>> {
        self.lookup_at(id, Instant::now())
    }

    /// Find the session for a cookie value, or start a new one
    pub fn resolve(&self, id: Option<&str>) -> Session<A, S> {
        self.resolve_at(id, Instant::now())
    }

    fn lookup_at(&self, id: Option<&str>, now: Instant) -> Option<Session<A, S>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        self.evict_idle(&mut sessions, now);
        Self::touch(&mut sessions, id, now)
    }

    fn resolve_at(&self, id: Option<&str>, now: Instant) -> Session<A, S> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        self.evict_idle(&mut sessions, now);

        if let Some(session) = Self::touch(&mut sessions, id, now) {
            return session;
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::warn!("Session limit {} reached, evicted oldest", self.max_sessions);
            }
        }

        let id = generate_token();
        let view = Arc::new(tokio::sync::Mutex::new(PointsView::new(
            self.provider.clone(),
            self.store.clone(),
        )));
        sessions.insert(
            id.clone(),
            SessionEntry {
                view: view.clone(),
                last_seen: now,
            },
        );
        tracing::debug!("Session started ({} active)", sessions.len());

        Session {
            id,
            view,
            is_new: true,
        }
    }

    fn evict_idle(&self, sessions: &mut Entries<A, S>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!("Evicted {} idle sessions", evicted);
        }
    }

    fn touch(
        sessions: &mut Entries<A, S>,
        id: Option<&str>,
        now: Instant,
    ) -> Option<Session<A, S>> {
        let id = id.filter(|id| validate_token(id))?;
        let entry = sessions.get_mut(id)?;
        entry.last_seen = now;
        Some(Session {
            id: id.to_string(),
            view: entry.view.clone(),
            is_new: false,
        })
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
