//! Window-opening paths: scope creation, resolution, wiring, and rollback.

use std::sync::Arc;

use time::OffsetDateTime;

use super::WindowManager;
use crate::error::{WindowError, WindowResult};
use crate::events::WindowEvent;
use crate::handle::OwnershipHandle;
use vitrine_registry::{Lifecycle, WindowMetadata};
use vitrine_shared::{
    ResolveParams, Scope, SessionId, Surface, SurfaceKind, ViewModel, ViewModelKind, WindowHandle,
    WindowId,
};

/// A window that has been resolved, wired, and tracked but not yet shown.
pub(crate) struct PreparedWindow {
    pub(crate) id: WindowId,
    pub(crate) kind: ViewModelKind,
    pub(crate) surface: Arc<dyn Surface>,
    pub(crate) view_model: Arc<dyn ViewModel>,
    pub(crate) scope: Arc<dyn Scope>,
}

impl WindowManager {
    /// Opens a root window for `VM`.
    pub fn open_window<VM: 'static>(&self) -> WindowResult<WindowId> {
        self.open_with_options(ViewModelKind::of::<VM>(), None, None, None)
    }

    /// Opens a root window for `VM`, passing typed constructor parameters
    /// through to the scope resolution.
    pub fn open_window_with<VM: 'static, P: Send + Sync + 'static>(
        &self,
        params: P,
    ) -> WindowResult<WindowId> {
        self.open_with_options(
            ViewModelKind::of::<VM>(),
            Some(Arc::new(params) as ResolveParams),
            None,
            None,
        )
    }

    /// Opens a window owned by `parent`; its scope is a child of the
    /// parent window's scope and it closes when the parent closes.
    pub fn open_child_window<VM: 'static>(&self, parent: WindowId) -> WindowResult<WindowId> {
        self.open_with_options(ViewModelKind::of::<VM>(), None, Some(parent), None)
    }

    /// Opens a window inside a session; its scope is a child of the
    /// session's scope and it closes when the session closes.
    pub fn open_window_in_session<VM: 'static>(
        &self,
        session: SessionId,
    ) -> WindowResult<WindowId> {
        self.open_with_options(ViewModelKind::of::<VM>(), None, None, Some(session))
    }

    pub(crate) fn open_with_options(
        &self,
        kind: ViewModelKind,
        params: Option<ResolveParams>,
        parent: Option<WindowId>,
        session: Option<SessionId>,
    ) -> WindowResult<WindowId> {
        let prepared = self.prepare_window(kind, params, parent, session)?;

        if let Err(source) = prepared.surface.show() {
            self.abort_open(prepared.id, &prepared.scope);
            return Err(WindowError::ShowFailed {
                window: prepared.id,
                source,
            });
        }

        self.mark_opened(&prepared);
        Ok(prepared.id)
    }

    pub(crate) fn mark_opened(&self, prepared: &PreparedWindow) {
        self.inner.tracker.advance_lifecycle(prepared.id, Lifecycle::Open);
        log::info!("window {} opened ({})", prepared.id, prepared.kind);
        self.inner.events.emit(&WindowEvent::Opened {
            window: prepared.id,
            kind: prepared.kind,
        });
    }

    /// Steps 1–7 of the open routine: mapping lookup, scope creation,
    /// resolution, wiring, tracking. On failure everything partially
    /// created is rolled back before the error propagates.
    pub(crate) fn prepare_window(
        &self,
        kind: ViewModelKind,
        params: Option<ResolveParams>,
        parent: Option<WindowId>,
        session: Option<SessionId>,
    ) -> WindowResult<PreparedWindow> {
        let surface_kind = self.inner.views.require(kind)?;
        let parent_scope = self.parent_scope(parent, session)?;

        let window_id = WindowId::new();
        let scope = self
            .inner
            .provider
            .create_child_scope(&parent_scope, &format!("window:{window_id}"))
            .map_err(WindowError::Scope)?;

        match self.build_window(window_id, kind, &surface_kind, Arc::clone(&scope), params, parent, session)
        {
            Ok(prepared) => Ok(prepared),
            Err(err) => {
                self.abort_open(window_id, &scope);
                Err(err)
            }
        }
    }

    fn parent_scope(
        &self,
        parent: Option<WindowId>,
        session: Option<SessionId>,
    ) -> WindowResult<Arc<dyn Scope>> {
        match (parent, session) {
            (Some(parent_id), _) => {
                let meta = self
                    .inner
                    .tracker
                    .metadata(parent_id)
                    .ok_or(WindowError::ParentNotFound(parent_id))?;
                meta.handle
                    .scope()
                    .ok_or(WindowError::AlreadyDisposed(parent_id))
            }
            (None, Some(session_id)) => {
                let session = self
                    .inner
                    .sessions
                    .session(session_id)
                    .filter(|s| s.is_active())
                    .ok_or(WindowError::SessionNotFound(session_id))?;
                Ok(session.scope())
            }
            (None, None) => Ok(Arc::clone(&self.inner.root_scope)),
        }
    }

    fn build_window(
        &self,
        window_id: WindowId,
        kind: ViewModelKind,
        surface_kind: &SurfaceKind,
        scope: Arc<dyn Scope>,
        params: Option<ResolveParams>,
        parent: Option<WindowId>,
        session: Option<SessionId>,
    ) -> WindowResult<PreparedWindow> {
        let surface = self
            .inner
            .surfaces
            .create_surface(surface_kind)
            .map_err(WindowError::Surface)?;
        let view_model = scope.resolve(kind, params).map_err(WindowError::Scope)?;

        surface.set_content(Arc::clone(&view_model));
        self.hook_initialization(window_id, &surface, &view_model);

        let handle = OwnershipHandle::new(
            window_id,
            Arc::clone(&scope),
            &surface,
            &view_model,
            self.inner.config.leak_diagnostics,
        );

        let metadata = WindowMetadata {
            window_id,
            parent_id: parent,
            session_id: session,
            surface: Arc::downgrade(&surface),
            view_model: Arc::downgrade(&view_model),
            view_model_kind: kind,
            own_scope: Some(scope.id()),
            lifecycle: Lifecycle::Creating,
            handle: handle as Arc<dyn WindowHandle>,
            created_at: OffsetDateTime::now_utc(),
        };
        self.inner.tracker.track(metadata);

        let weak = self.downgrade();
        surface.subscribe_closed(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                WindowManager { inner }.finish_close(window_id);
            }
        }));

        Ok(PreparedWindow {
            id: window_id,
            kind,
            surface,
            view_model,
            scope,
        })
    }

    /// Registers the one-shot "surface loaded" callback that drives the
    /// view-model's async initialization hook, when it has one.
    fn hook_initialization(
        &self,
        window_id: WindowId,
        surface: &Arc<dyn Surface>,
        view_model: &Arc<dyn ViewModel>,
    ) {
        if view_model.as_initializable().is_none() {
            return;
        }
        let ui = self.inner.ui.clone();
        let view_model = Arc::clone(view_model);
        surface.subscribe_loaded(Box::new(move || {
            ui.spawn(Box::pin(async move {
                let Some(initializable) = view_model.as_initializable() else {
                    return;
                };
                if let Err(err) = initializable.initialize().await {
                    log::error!("window {window_id}: view-model initialization failed: {err:#}");
                    if let Some(error_state) = view_model.as_error_state() {
                        error_state.set_error(Some(err.to_string()));
                    }
                }
            }));
        }));
    }

    /// Best-effort rollback of a partially opened window: mark faulted,
    /// untrack, and dispose whichever of handle/scope exists.
    pub(crate) fn abort_open(&self, window_id: WindowId, scope: &Arc<dyn Scope>) {
        if let Some(meta) = self.inner.tracker.metadata(window_id) {
            self.inner.tracker.advance_lifecycle(window_id, Lifecycle::Faulted);
            self.inner.tracker.untrack(window_id);
            meta.handle.dispose();
        } else if !scope.is_disposed() {
            scope.dispose();
        }
        log::warn!("window {window_id}: open aborted, partial state rolled back");
    }
}
