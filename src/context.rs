use std::sync::Arc;

use futures::future::BoxFuture;

/// Scheduling seam for the UI-affinity thread.
///
/// All surface mutation (show/close/enable/disable) must happen on the
/// host toolkit's UI thread. The dispatcher is injected into the window
/// manager at construction; there is no process-global lookup.
pub trait UiDispatcher: Send + Sync {
    /// Runs a task on the UI-affinity thread.
    fn dispatch(&self, task: Box<dyn FnOnce() + Send>);

    /// Drives a future on the UI-affinity thread's event loop.
    fn spawn(&self, task: BoxFuture<'static, ()>);

    /// Whether the calling thread already is the UI-affinity thread.
    fn is_ui_thread(&self) -> bool;
}

/// Cheap handle around the injected dispatcher.
#[derive(Clone)]
pub struct UiContext {
    dispatcher: Arc<dyn UiDispatcher>,
}

impl UiContext {
    pub fn new(dispatcher: Arc<dyn UiDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Context that runs everything inline on the calling thread. Suitable
    /// for tests and single-threaded hosts that pump their own loop.
    pub fn inline() -> Self {
        Self::new(Arc::new(InlineDispatcher))
    }

    /// Runs `task` now when already on the UI thread, otherwise marshals
    /// it over.
    pub fn run(&self, task: impl FnOnce() + Send + 'static) {
        if self.dispatcher.is_ui_thread() {
            task();
        } else {
            self.dispatcher.dispatch(Box::new(task));
        }
    }

    pub fn spawn(&self, task: BoxFuture<'static, ()>) {
        self.dispatcher.spawn(task);
    }

    pub fn is_ui_thread(&self) -> bool {
        self.dispatcher.is_ui_thread()
    }
}

/// Executes tasks synchronously on the calling thread; futures are driven
/// to completion before returning.
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn dispatch(&self, task: Box<dyn FnOnce() + Send>) {
        task();
    }

    fn spawn(&self, task: BoxFuture<'static, ()>) {
        futures::executor::block_on(task);
    }

    fn is_ui_thread(&self) -> bool {
        true
    }
}
