use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use vitrine_shared::{Scope, SessionId};

/// Creation options for a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Data-bound sessions discover persistence contexts in their scope and
    /// support save/rollback. Other sessions treat those calls as warned
    /// no-ops.
    pub data_bound: bool,
    /// Close the session automatically once its last window closes.
    pub auto_close_when_empty: bool,
}

/// A named scope shared across multiple windows.
///
/// The session owns its scope and nothing else: child sessions dispose
/// their own scopes, the parent only forwards the close signal.
pub struct Session {
    id: SessionId,
    tag: String,
    scope: Arc<dyn Scope>,
    parent: Option<SessionId>,
    options: SessionOptions,
    active: AtomicBool,
}

impl Session {
    pub(crate) fn new(
        tag: impl Into<String>,
        scope: Arc<dyn Scope>,
        parent: Option<SessionId>,
        options: SessionOptions,
    ) -> Self {
        Self {
            id: SessionId::new(),
            tag: tag.into(),
            scope,
            parent,
            options,
            active: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn scope(&self) -> Arc<dyn Scope> {
        Arc::clone(&self.scope)
    }

    pub fn parent(&self) -> Option<SessionId> {
        self.parent
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn is_data_bound(&self) -> bool {
        self.options.data_bound
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Flips the session inactive. Returns false when it already was,
    /// which is how re-entrant close attempts are cut short.
    pub(crate) fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("parent", &self.parent)
            .field("data_bound", &self.options.data_bound)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Lifecycle notifications raised by the session manager.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Created { session: SessionId, tag: String },
    Closed { session: SessionId },
}
