//! The ownership handle: the single object responsible for disposing a
//! window's scope exactly once.

use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use vitrine_shared::{
    Disposable, Scope, SubscriptionId, Surface, ViewModel, WindowHandle, WindowId, diagnostics,
};

struct ArmedHandle {
    scope: Arc<dyn Scope>,
    surface: Weak<dyn Surface>,
    view_model: Weak<dyn ViewModel>,
    closed_subscription: Option<SubscriptionId>,
}

/// Binds a window's scope, surface, and view-model lifetimes together.
///
/// The handle owns the scope exclusively and holds only weak references to
/// the surface and view-model, so the tracker is never the reason a
/// surface stays alive. Disposal is triggered by the surface's "closed"
/// signal or an explicit [`dispose`](OwnershipHandle::dispose) call,
/// whichever fires first; the second is a no-op.
pub struct OwnershipHandle {
    window_id: WindowId,
    state: Mutex<Option<ArmedHandle>>,
    disposed: AtomicBool,
    leak_diagnostics: bool,
}

impl OwnershipHandle {
    /// Creates the handle and subscribes it to the surface's closed
    /// signal.
    pub fn new(
        window_id: WindowId,
        scope: Arc<dyn Scope>,
        surface: &Arc<dyn Surface>,
        view_model: &Arc<dyn ViewModel>,
        leak_diagnostics: bool,
    ) -> Arc<Self> {
        let handle = Arc::new(Self {
            window_id,
            state: Mutex::new(Some(ArmedHandle {
                scope,
                surface: Arc::downgrade(surface),
                view_model: Arc::downgrade(view_model),
                closed_subscription: None,
            })),
            disposed: AtomicBool::new(false),
            leak_diagnostics,
        });

        let weak = Arc::downgrade(&handle);
        let subscription = surface.subscribe_closed(Box::new(move || {
            if let Some(handle) = weak.upgrade() {
                handle.dispose();
            }
        }));
        if let Some(armed) = handle.state.lock().as_mut() {
            armed.closed_subscription = Some(subscription);
        }

        handle
    }
}

impl WindowHandle for OwnershipHandle {
    fn window_id(&self) -> WindowId {
        self.window_id
    }

    fn dispose(&self) {
        let Some(armed) = self.state.lock().take() else {
            return;
        };
        self.disposed.store(true, Ordering::SeqCst);

        if let (Some(subscription), Some(surface)) =
            (armed.closed_subscription, armed.surface.upgrade())
        {
            surface.unsubscribe(subscription);
        }
        if let Some(view_model) = armed.view_model.upgrade() {
            if let Some(disposable) = view_model.as_disposable() {
                disposable.dispose();
            }
        }
        armed.scope.dispose();
        log::debug!("window {}: scope disposed", self.window_id);
        // Dropping `armed` clears the weak references.
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn scope(&self) -> Option<Arc<dyn Scope>> {
        self.state.lock().as_ref().map(|armed| Arc::clone(&armed.scope))
    }
}

impl Drop for OwnershipHandle {
    fn drop(&mut self) {
        if !self.leak_diagnostics || self.is_disposed() {
            return;
        }
        // A live surface at this point means nobody disposed the handle:
        // a genuine leak. Diagnostic only; the scope Arc is released by the
        // drop itself either way.
        let surface_alive = self
            .state
            .get_mut()
            .as_ref()
            .is_some_and(|armed| armed.surface.strong_count() > 0);
        if surface_alive {
            let message = format!(
                "ownership handle for window {} dropped without dispose while its surface is alive",
                self.window_id
            );
            log::error!("{message}");
            diagnostics::log(message);
        }
    }
}
