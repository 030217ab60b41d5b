//! Session management for Vitrine: a forest of named scopes layered on a
//! root scope.
//!
//! Sessions nest; closing one closes its child sessions first, then the
//! windows bound to it, then disposes its scope. Window closure is
//! delegated through [`SessionWindowCloser`] so this crate stays free of
//! window-manager types.

pub mod model;

pub use model::{Session, SessionEvent, SessionOptions};

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use thiserror::Error;

use vitrine_shared::{ListenerId, PersistenceContext, Scope, ScopeProvider, SessionId, WindowId};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("parent session {0} not found or inactive")]
    ParentNotFound(SessionId),
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error("session {0} is no longer active")]
    NotActive(SessionId),
    #[error("scope provider failed: {0}")]
    Scope(#[source] anyhow::Error),
    #[error("{failed} of {total} persistence contexts failed to commit")]
    Persistence { failed: usize, total: usize },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Closes the windows bound to a session, returning per-window failures.
/// Implemented by the window manager; injected to avoid a crate cycle.
pub trait SessionWindowCloser: Send + Sync {
    fn close_session_windows(&self, session: SessionId) -> Vec<(WindowId, String)>;
}

type SessionListener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Default)]
struct SessionState {
    sessions: HashMap<SessionId, Arc<Session>>,
    children: HashMap<SessionId, SmallVec<[SessionId; 2]>>,
}

struct SessionManagerInner {
    provider: Arc<dyn ScopeProvider>,
    root_scope: Arc<dyn Scope>,
    state: Mutex<SessionState>,
    closer: RwLock<Option<Arc<dyn SessionWindowCloser>>>,
    listeners: Mutex<Vec<(ListenerId, SessionListener)>>,
    next_listener: AtomicU64,
}

/// Manages the session forest. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionManagerInner>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn ScopeProvider>, root_scope: Arc<dyn Scope>) -> Self {
        Self {
            inner: Arc::new(SessionManagerInner {
                provider,
                root_scope,
                state: Mutex::new(SessionState::default()),
                closer: RwLock::new(None),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
            }),
        }
    }

    /// Installs the window-closing delegate. Called once by the window
    /// manager during wiring.
    pub fn set_window_closer(&self, closer: Arc<dyn SessionWindowCloser>) {
        *self.inner.closer.write() = Some(closer);
    }

    /// Creates a session whose scope is a child of the parent session's
    /// scope, or of the root scope when no parent is given.
    pub fn create_session(
        &self,
        tag: impl Into<String>,
        parent: Option<SessionId>,
        options: SessionOptions,
    ) -> SessionResult<Arc<Session>> {
        let tag = tag.into();
        let parent_scope = match parent {
            Some(parent_id) => {
                let state = self.inner.state.lock();
                let session = state
                    .sessions
                    .get(&parent_id)
                    .filter(|s| s.is_active())
                    .ok_or(SessionError::ParentNotFound(parent_id))?;
                session.scope()
            }
            None => Arc::clone(&self.inner.root_scope),
        };

        let scope = self
            .inner
            .provider
            .create_child_scope(&parent_scope, &format!("session:{tag}"))
            .map_err(SessionError::Scope)?;

        let session = Arc::new(Session::new(tag.clone(), scope, parent, options));
        let id = session.id();
        {
            let mut state = self.inner.state.lock();
            state.sessions.insert(id, Arc::clone(&session));
            if let Some(parent_id) = parent {
                state.children.entry(parent_id).or_default().push(id);
            }
        }

        log::info!("session {id} created (tag={tag})");
        self.emit(&SessionEvent::Created { session: id, tag });
        Ok(session)
    }

    pub fn session(&self, id: SessionId) -> Option<Arc<Session>> {
        self.inner.state.lock().sessions.get(&id).cloned()
    }

    pub fn is_session_active(&self, id: SessionId) -> bool {
        self.inner
            .state
            .lock()
            .sessions
            .get(&id)
            .is_some_and(|s| s.is_active())
    }

    pub fn child_sessions(&self, parent: SessionId) -> Vec<SessionId> {
        self.inner
            .state
            .lock()
            .children
            .get(&parent)
            .map(|c| c.to_vec())
            .unwrap_or_default()
    }

    /// Closes a session: child sessions first (recursively), then the
    /// session's windows, then its scope. Idempotent: closing an unknown
    /// or already-closed session is a no-op.
    pub fn close_session(&self, id: SessionId) {
        // Drop out of the active index before anything else so re-entrant
        // close attempts (e.g. from a window-closed listener) short-circuit.
        let (session, children) = {
            let mut state = self.inner.state.lock();
            let Some(session) = state.sessions.remove(&id) else {
                return;
            };
            if let Some(parent_id) = session.parent() {
                if let Some(siblings) = state.children.get_mut(&parent_id) {
                    siblings.retain(|c| *c != id);
                    if siblings.is_empty() {
                        state.children.remove(&parent_id);
                    }
                }
            }
            let children = state.children.remove(&id).unwrap_or_default();
            (session, children)
        };

        if !session.deactivate() {
            return;
        }

        for child in children {
            self.close_session(child);
        }

        let closer = self.inner.closer.read().clone();
        if let Some(closer) = closer {
            let failures = closer.close_session_windows(id);
            for (window, message) in &failures {
                log::warn!("session {id}: window {window} failed to close: {message}");
            }
        }

        session.scope().dispose();
        log::info!("session {id} closed (tag={})", session.tag());
        self.emit(&SessionEvent::Closed { session: id });
    }

    /// Closes every root session, which cascades through the forest.
    pub fn close_all_sessions(&self) {
        let roots: Vec<SessionId> = {
            let state = self.inner.state.lock();
            state
                .sessions
                .values()
                .filter(|s| s.parent().is_none())
                .map(|s| s.id())
                .collect()
        };
        for root in roots {
            self.close_session(root);
        }
    }

    /// Commits every persistence context in a data-bound session's scope.
    /// Individual failures are logged and counted rather than aborting.
    pub fn save_changes(&self, id: SessionId) -> SessionResult<()> {
        let session = self.session(id).ok_or(SessionError::NotFound(id))?;
        if !session.is_active() {
            return Err(SessionError::NotActive(id));
        }
        if !session.is_data_bound() {
            log::warn!("save_changes on non-data-bound session {id} is a no-op");
            return Ok(());
        }

        let contexts = session.scope().persistence_contexts();
        let total = contexts.len();
        let mut failed = 0usize;
        for context in contexts {
            if let Err(err) = context.commit() {
                failed += 1;
                log::error!("session {id}: persistence commit failed: {err:#}");
            }
        }
        if failed > 0 {
            return Err(SessionError::Persistence { failed, total });
        }
        Ok(())
    }

    /// Discards in-memory changes in a data-bound session's scope.
    pub fn rollback(&self, id: SessionId) -> SessionResult<()> {
        let session = self.session(id).ok_or(SessionError::NotFound(id))?;
        if !session.is_active() {
            return Err(SessionError::NotActive(id));
        }
        if !session.is_data_bound() {
            log::warn!("rollback on non-data-bound session {id} is a no-op");
            return Ok(());
        }

        for context in session.scope().persistence_contexts() {
            context.discard();
        }
        Ok(())
    }

    /// Notification from the window manager that a window bound to this
    /// session closed. Auto-closes the session once empty if configured.
    pub fn handle_window_closed(&self, id: SessionId, remaining_windows: usize) {
        if remaining_windows > 0 {
            return;
        }
        let Some(session) = self.session(id) else {
            return;
        };
        if session.is_active() && session.options().auto_close_when_empty {
            log::info!("session {id}: last window closed, auto-closing");
            self.close_session(id);
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&SessionEvent) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.inner.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    fn emit(&self, event: &SessionEvent) {
        let listeners: Vec<SessionListener> = {
            let guard = self.inner.listeners.lock();
            guard.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                log::error!("session event listener panicked on {event:?}");
            }
        }
    }
}
