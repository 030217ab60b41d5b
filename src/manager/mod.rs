//! The window/dialog manager: the public surface for opening and closing
//! windows and the only component that advances tracker lifecycle states.

mod close;
mod dialog;
mod open;

pub use dialog::{DialogFuture, DialogModality, DialogResult};

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};

use crate::config::RuntimeConfig;
use crate::context::UiContext;
use crate::error::{LastError, WindowError, WindowResult};
use crate::events::{EventHub, WindowEvent};
use crate::mapping::ViewRegistry;
use dialog::DialogHook;
use vitrine_registry::WindowTracker;
use vitrine_session::{SessionManager, SessionWindowCloser};
use vitrine_shared::{
    Scope, ScopeProvider, SessionId, SurfaceFactory, ViewModelKind, WindowId,
};

pub(crate) struct ManagerInner {
    pub(crate) tracker: WindowTracker,
    pub(crate) sessions: SessionManager,
    pub(crate) provider: Arc<dyn ScopeProvider>,
    pub(crate) surfaces: Arc<dyn SurfaceFactory>,
    pub(crate) views: ViewRegistry,
    pub(crate) ui: UiContext,
    pub(crate) config: RuntimeConfig,
    pub(crate) events: EventHub,
    pub(crate) root_scope: Arc<dyn Scope>,
    pub(crate) last_error: Mutex<Option<LastError>>,
    pub(crate) dialog_hooks: Mutex<HashMap<WindowId, DialogHook>>,
    pub(crate) close_sync: CloseSync,
}

/// Condvar pair used to wait for in-flight child closures.
#[derive(Default)]
pub(crate) struct CloseSync {
    pub(crate) lock: Mutex<()>,
    pub(crate) condvar: Condvar,
}

/// Orchestrates window and dialog lifecycles. Cheap to clone; all clones
/// share state. Collaborators are injected explicitly; the manager never
/// reaches for process-global context.
#[derive(Clone)]
pub struct WindowManager {
    pub(crate) inner: Arc<ManagerInner>,
}

impl WindowManager {
    pub fn new(
        provider: Arc<dyn ScopeProvider>,
        surfaces: Arc<dyn SurfaceFactory>,
        root_scope: Arc<dyn Scope>,
        ui: UiContext,
    ) -> Self {
        Self::with_config(provider, surfaces, root_scope, ui, RuntimeConfig::default())
    }

    pub fn with_config(
        provider: Arc<dyn ScopeProvider>,
        surfaces: Arc<dyn SurfaceFactory>,
        root_scope: Arc<dyn Scope>,
        ui: UiContext,
        config: RuntimeConfig,
    ) -> Self {
        let sessions = SessionManager::new(Arc::clone(&provider), Arc::clone(&root_scope));
        let manager = Self {
            inner: Arc::new(ManagerInner {
                tracker: WindowTracker::new(),
                sessions: sessions.clone(),
                provider,
                surfaces,
                views: ViewRegistry::new(),
                ui,
                config,
                events: EventHub::new(),
                root_scope,
                last_error: Mutex::new(None),
                dialog_hooks: Mutex::new(HashMap::new()),
                close_sync: CloseSync::default(),
            }),
        };
        sessions.set_window_closer(Arc::new(ManagerSessionCloser {
            inner: Arc::downgrade(&manager.inner),
        }));
        manager
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.inner.views
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    pub fn tracker(&self) -> &WindowTracker {
        &self.inner.tracker
    }

    pub fn events(&self) -> &EventHub {
        &self.inner.events
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    // ---- queries ----

    pub fn is_window_open(&self, window: WindowId) -> bool {
        self.inner.tracker.is_open(window)
    }

    pub fn parent_window_id(&self, window: WindowId) -> Option<WindowId> {
        self.inner.tracker.metadata(window)?.parent_id
    }

    pub fn child_window_ids(&self, window: WindowId) -> Vec<WindowId> {
        self.inner.tracker.children_of(window)
    }

    pub fn session_windows(&self, session: SessionId) -> Vec<WindowId> {
        self.inner.tracker.session_windows(session)
    }

    pub fn view_model_kind_of(&self, window: WindowId) -> Option<ViewModelKind> {
        Some(self.inner.tracker.metadata(window)?.view_model_kind)
    }

    pub fn open_window_ids(&self) -> Vec<WindowId> {
        self.inner.tracker.open_window_ids()
    }

    /// Most recent failure recorded by the try-variant API surface.
    pub fn last_error(&self) -> Option<LastError> {
        self.inner.last_error.lock().clone()
    }

    // ---- try-variants: never propagate without recording ----

    pub fn try_open_window<VM: 'static>(&self) -> WindowResult<WindowId> {
        self.guarded("open_window", |m| m.open_window::<VM>())
    }

    pub fn try_open_child_window<VM: 'static>(&self, parent: WindowId) -> WindowResult<WindowId> {
        self.guarded("open_child_window", |m| m.open_child_window::<VM>(parent))
    }

    pub fn try_open_window_in_session<VM: 'static>(
        &self,
        session: SessionId,
    ) -> WindowResult<WindowId> {
        self.guarded("open_window_in_session", |m| {
            m.open_window_in_session::<VM>(session)
        })
    }

    pub fn try_close_window(&self, window: WindowId) -> WindowResult<()> {
        self.guarded("close_window", |m| m.close_window(window))
    }

    pub fn try_close_all_child_windows(&self, window: WindowId) -> WindowResult<()> {
        self.guarded("close_all_child_windows", |m| {
            m.close_all_child_windows(window)
        })
    }

    pub fn try_close_all_session_windows(&self, session: SessionId) -> WindowResult<()> {
        self.guarded("close_all_session_windows", |m| {
            m.close_all_session_windows(session)
        })
    }

    pub fn try_show_dialog<VM: 'static, R: 'static>(
        &self,
        owner: Option<WindowId>,
        modality: DialogModality,
    ) -> WindowResult<DialogFuture<R>> {
        self.guarded("show_dialog", |m| m.show_dialog::<VM, R>(owner, modality))
    }

    fn guarded<T>(
        &self,
        operation: &'static str,
        run: impl FnOnce(&Self) -> WindowResult<T>,
    ) -> WindowResult<T> {
        run(self).inspect_err(|err| self.record_error(operation, err))
    }

    pub(crate) fn record_error(&self, operation: &'static str, error: &WindowError) {
        log::error!("{operation} failed: {error}");
        *self.inner.last_error.lock() = Some(LastError::new(operation, error));
        self.inner.events.emit(&WindowEvent::Error {
            operation,
            message: error.to_string(),
        });
    }

    pub(crate) fn downgrade(&self) -> Weak<ManagerInner> {
        Arc::downgrade(&self.inner)
    }
}

/// Delegates session-window closure back into the manager without a crate
/// cycle or a strong reference loop.
struct ManagerSessionCloser {
    inner: Weak<ManagerInner>,
}

impl SessionWindowCloser for ManagerSessionCloser {
    fn close_session_windows(&self, session: SessionId) -> Vec<(WindowId, String)> {
        let Some(inner) = self.inner.upgrade() else {
            return Vec::new();
        };
        let manager = WindowManager { inner };
        let mut failures = Vec::new();
        for window in manager.inner.tracker.session_windows(session) {
            if !manager.inner.tracker.is_tracked(window) {
                continue;
            }
            if let Err(err) = manager.close_window(window) {
                failures.push((window, err.to_string()));
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WindowEvent;
    use crate::test_support::{PlainVm, TestEnv};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn try_open_unmapped_kind_returns_failure_and_raises_one_error_event() {
        let env = TestEnv::new();
        let errors = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&errors);
        env.manager.events().subscribe(move |event| {
            if matches!(event, WindowEvent::Error { .. }) {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        let result = env.manager.try_open_window::<PlainVm>();

        assert!(matches!(result, Err(WindowError::NoViewMapping(_))));
        assert_eq!(errors.load(Ordering::SeqCst), 1);

        let last = env.manager.last_error().expect("recorded");
        assert_eq!(last.operation, "open_window");
        assert!(last.message.contains("no surface mapping"));
    }

    #[test]
    fn throwing_variant_does_not_record_last_error() {
        let env = TestEnv::new();
        let _ = env.manager.open_window::<PlainVm>();
        assert!(env.manager.last_error().is_none());
    }

    #[test]
    fn try_variants_pass_successes_through() {
        let env = TestEnv::new();
        env.register_vm::<PlainVm>("main", |_| Arc::new(PlainVm));

        let id = env.manager.try_open_window::<PlainVm>().unwrap();
        assert!(env.manager.is_window_open(id));

        env.manager.try_close_window(id).unwrap();
        assert!(!env.manager.is_window_open(id));
        assert!(env.manager.last_error().is_none());
    }

    #[test]
    fn try_open_child_records_parent_failure() {
        let env = TestEnv::new();
        env.register_vm::<PlainVm>("main", |_| Arc::new(PlainVm));

        let missing = WindowId::new();
        let result = env.manager.try_open_child_window::<PlainVm>(missing);

        assert!(matches!(result, Err(WindowError::ParentNotFound(_))));
        assert_eq!(
            env.manager.last_error().unwrap().operation,
            "open_child_window"
        );
    }

    #[test]
    fn tracker_snapshot_serializes_open_windows() {
        let env = TestEnv::new();
        env.register_vm::<PlainVm>("main", |_| Arc::new(PlainVm));
        let id = env.manager.open_window::<PlainVm>().unwrap();

        let json = serde_json::to_string(&env.manager.tracker().snapshot()).unwrap();
        assert!(json.contains(&id.to_string()));
        assert!(json.contains("open"));
    }

    #[test]
    fn queries_on_unknown_ids_return_empty() {
        let env = TestEnv::new();
        let id = WindowId::new();
        assert!(!env.manager.is_window_open(id));
        assert!(env.manager.parent_window_id(id).is_none());
        assert!(env.manager.child_window_ids(id).is_empty());
        assert!(env.manager.view_model_kind_of(id).is_none());
    }
}
