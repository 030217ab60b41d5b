use std::fmt;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use vitrine_shared::{
    ScopeId, SessionId, Surface, ViewModel, ViewModelKind, WindowHandle, WindowId,
};

/// Lifecycle state of a tracked window. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lifecycle {
    Creating,
    Open,
    Closing,
    Closed,
    Faulted,
}

impl Lifecycle {
    pub fn is_terminal(self) -> bool {
        matches!(self, Lifecycle::Closed | Lifecycle::Faulted)
    }

    /// Whether a transition to `next` moves strictly forward. Terminal
    /// states accept nothing; same-state transitions are rejected so
    /// callers notice redundant advances.
    pub fn can_advance_to(self, next: Lifecycle) -> bool {
        use Lifecycle::*;
        match self {
            Creating => matches!(next, Open | Closing | Closed | Faulted),
            Open => matches!(next, Closing | Closed | Faulted),
            Closing => matches!(next, Closed | Faulted),
            Closed | Faulted => false,
        }
    }
}

/// Per-window bookkeeping. The tracker describes relationships but owns
/// nothing: surface and view-model are weak, the scope is recorded by id
/// only, and the strong scope reference lives in the ownership handle.
#[derive(Clone)]
pub struct WindowMetadata {
    pub window_id: WindowId,
    pub parent_id: Option<WindowId>,
    pub session_id: Option<SessionId>,
    pub surface: Weak<dyn Surface>,
    pub view_model: Weak<dyn ViewModel>,
    pub view_model_kind: ViewModelKind,
    pub own_scope: Option<ScopeId>,
    pub lifecycle: Lifecycle,
    pub handle: Arc<dyn WindowHandle>,
    pub created_at: OffsetDateTime,
}

impl WindowMetadata {
    pub fn surface(&self) -> Option<Arc<dyn Surface>> {
        self.surface.upgrade()
    }

    pub fn view_model(&self) -> Option<Arc<dyn ViewModel>> {
        self.view_model.upgrade()
    }

    pub fn is_surface_alive(&self) -> bool {
        self.surface.strong_count() > 0
    }
}

impl fmt::Debug for WindowMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowMetadata")
            .field("window_id", &self.window_id)
            .field("parent_id", &self.parent_id)
            .field("session_id", &self.session_id)
            .field("view_model_kind", &self.view_model_kind)
            .field("own_scope", &self.own_scope)
            .field("lifecycle", &self.lifecycle)
            .field("surface_alive", &self.is_surface_alive())
            .finish()
    }
}

/// Serializable dump of the tracked window tree, for support diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub windows: Vec<WindowSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    pub window_id: WindowId,
    pub parent_id: Option<WindowId>,
    pub session_id: Option<SessionId>,
    pub view_model: String,
    pub lifecycle: Lifecycle,
    pub surface_alive: bool,
    pub created_at: String,
}

impl WindowSnapshot {
    pub(crate) fn from_metadata(meta: &WindowMetadata) -> Self {
        Self {
            window_id: meta.window_id,
            parent_id: meta.parent_id,
            session_id: meta.session_id,
            view_model: meta.view_model_kind.name().to_string(),
            lifecycle: meta.lifecycle,
            surface_alive: meta.is_surface_alive(),
            created_at: meta
                .created_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| "unknown-time".to_string()),
        }
    }
}
