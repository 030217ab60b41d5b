//! Window-closing paths: depth-first cascade, the closed-signal cleanup,
//! and the bounded wait for in-flight child closures.

use std::time::{Duration, Instant};

use super::WindowManager;
use crate::error::{WindowError, WindowResult};
use crate::events::WindowEvent;
use vitrine_registry::Lifecycle;
use vitrine_shared::{SessionId, Surface, WindowHandle, WindowId};

impl WindowManager {
    /// Closes a window and, first, its entire subtree (children before
    /// self). Unknown ids are no-ops: a window that is gone is a close
    /// that already succeeded.
    pub fn close_window(&self, window: WindowId) -> WindowResult<()> {
        let Some(meta) = self.inner.tracker.metadata(window) else {
            log::debug!("close_window({window}): not tracked, nothing to do");
            return Ok(());
        };

        for child in self.inner.tracker.children_of(window) {
            if let Err(err) = self.close_window(child) {
                log::warn!("window {window}: child {child} failed to close: {err}");
            }
        }

        match meta.surface() {
            Some(surface) => {
                // Surface mutation belongs to the UI-affinity thread. The
                // closed signal triggers finish_close asynchronously.
                self.inner.ui.run(move || surface.close());
            }
            None => {
                // Already collected by the toolkit: not a failure, just a
                // close that is half done. Finish the bookkeeping.
                log::warn!("window {window}: surface already dropped, cleaning up tracker state");
                self.finish_close(window);
            }
        }
        Ok(())
    }

    /// Closes every direct child of `window`, leaving the window itself
    /// open.
    pub fn close_all_child_windows(&self, window: WindowId) -> WindowResult<()> {
        for child in self.inner.tracker.children_of(window) {
            self.close_window(child)?;
        }
        Ok(())
    }

    /// Closes every window bound to `session`. Individual failures are
    /// logged and do not abort the sweep.
    pub fn close_all_session_windows(&self, session: SessionId) -> WindowResult<()> {
        for window in self.inner.tracker.session_windows(session) {
            if !self.inner.tracker.is_tracked(window) {
                continue;
            }
            if let Err(err) = self.close_window(window) {
                log::warn!("session {session}: window {window} failed to close: {err}");
            }
        }
        Ok(())
    }

    /// Cleanup run when a surface signals "closed" (or directly, when the
    /// surface is already dead): wait for children, advance the lifecycle,
    /// untrack, dispose the handle, settle any dialog, raise the event.
    pub(crate) fn finish_close(&self, window: WindowId) {
        // A second invocation (late signal after a dead-surface cleanup)
        // finds nothing tracked and returns.
        if !self.inner.tracker.is_tracked(window) {
            return;
        }

        let timeout = self.inner.config.child_close_timeout();
        if !self.wait_for_children(window, timeout) {
            log::warn!(
                "{}",
                WindowError::ChildCloseTimeout { window, timeout }
            );
        }

        self.inner.tracker.advance_lifecycle(window, Lifecycle::Closing);
        self.inner.tracker.advance_lifecycle(window, Lifecycle::Closed);
        let Some(meta) = self.inner.tracker.untrack(window) else {
            return;
        };
        self.notify_close_waiters();

        meta.handle.dispose();

        if let Some(session) = meta.session_id {
            let remaining = self.inner.tracker.session_windows(session).len();
            self.inner.sessions.handle_window_closed(session, remaining);
        }

        let hook = self.inner.dialog_hooks.lock().remove(&window);
        if let Some(hook) = hook {
            self.settle_dialog(hook);
        }

        log::info!("window {window} closed");
        self.inner.events.emit(&WindowEvent::Closed { window });
    }

    /// Blocks until `window` has no tracked children or the timeout
    /// elapses. Returns false on timeout; the caller logs and proceeds,
    /// so a parent close never hangs indefinitely.
    fn wait_for_children(&self, window: WindowId, timeout: Duration) -> bool {
        if self.inner.tracker.children_of(window).is_empty() {
            return true;
        }
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.close_sync.lock.lock();
        while !self.inner.tracker.children_of(window).is_empty() {
            if self
                .inner
                .close_sync
                .condvar
                .wait_until(&mut guard, deadline)
                .timed_out()
            {
                return self.inner.tracker.children_of(window).is_empty();
            }
        }
        true
    }

    fn notify_close_waiters(&self) {
        // Take the lock so a waiter between its children check and its
        // wait cannot miss the wakeup.
        let _guard = self.inner.close_sync.lock.lock();
        self.inner.close_sync.condvar.notify_all();
    }
}
