//! Dialogs: typed async results and the three modality levels.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use futures::channel::oneshot;
use parking_lot::Mutex;

use super::WindowManager;
use crate::error::{WindowError, WindowResult};
use vitrine_shared::{ResolveParams, Surface, ViewModel, ViewModelKind, WindowId};

/// How much of the rest of the UI is blocked while the dialog is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogModality {
    /// Behaves like a normal window.
    NonModal,
    /// The owner window and its descendant tree are interaction-blocked
    /// until the dialog closes; the dialog itself stays enabled.
    WindowModal,
    /// Blocks the calling flow until the dialog closes.
    AppModal,
}

type ErasedOutcome = Result<Box<dyn Any + Send>, String>;

/// Completed outcome of a dialog: a typed payload or a failure message.
/// Callers always receive one of the two, never an unresolved await.
#[derive(Debug)]
pub struct DialogResult<R> {
    inner: Result<R, String>,
}

impl<R> DialogResult<R> {
    fn success(value: R) -> Self {
        Self { inner: Ok(value) }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            inner: Err(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.inner.is_ok()
    }

    pub fn value(&self) -> Option<&R> {
        self.inner.as_ref().ok()
    }

    pub fn into_value(self) -> Option<R> {
        self.inner.ok()
    }

    pub fn error(&self) -> Option<&str> {
        self.inner.as_ref().err().map(String::as_str)
    }
}

/// Pending dialog outcome. Completes exactly once, whether the dialog
/// closes normally, is torn down externally, or fails to show.
#[derive(Debug)]
pub struct DialogFuture<R> {
    window: WindowId,
    receiver: oneshot::Receiver<ErasedOutcome>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: 'static> DialogFuture<R> {
    pub fn window_id(&self) -> WindowId {
        self.window
    }

    pub async fn result(self) -> DialogResult<R> {
        match self.receiver.await {
            Ok(Ok(boxed)) => match boxed.downcast::<R>() {
                Ok(value) => DialogResult::success(*value),
                Err(_) => DialogResult::failure("dialog result has an unexpected type"),
            },
            Ok(Err(message)) => DialogResult::failure(message),
            Err(oneshot::Canceled) => {
                DialogResult::failure("dialog result channel dropped before completion")
            }
        }
    }

    /// Blocking wait for callers off the UI-affinity thread.
    pub fn wait(self) -> DialogResult<R> {
        futures::executor::block_on(self.result())
    }
}

/// Sender side of a dialog result. Dropping it undelivered still completes
/// the receiver with a failure-shaped outcome.
struct DialogCompletion {
    sender: Mutex<Option<oneshot::Sender<ErasedOutcome>>>,
}

impl DialogCompletion {
    fn new(sender: oneshot::Sender<ErasedOutcome>) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
        }
    }

    fn complete(&self, outcome: ErasedOutcome) {
        if let Some(sender) = self.sender.lock().take() {
            let _ = sender.send(outcome);
        }
    }
}

impl Drop for DialogCompletion {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.get_mut().take() {
            let _ = sender.send(Err("dialog closed without delivering a result".to_string()));
        }
    }
}

/// Per-dialog state kept until the dialog window finishes closing.
pub(crate) struct DialogHook {
    completion: DialogCompletion,
    view_model: Weak<dyn ViewModel>,
    /// Windows this dialog disabled; exactly these are re-enabled on
    /// close, in reverse order.
    reenable: Vec<WindowId>,
}

impl WindowManager {
    /// Shows a dialog for `VM` producing a result of type `R`.
    ///
    /// The returned future completes when the dialog closes (through its
    /// own flow, owner teardown, or failure), always with a result object.
    pub fn show_dialog<VM: 'static, R: 'static>(
        &self,
        owner: Option<WindowId>,
        modality: DialogModality,
    ) -> WindowResult<DialogFuture<R>> {
        self.show_dialog_kind(ViewModelKind::of::<VM>(), None, owner, modality)
    }

    /// Shows a dialog for `VM` with typed constructor parameters.
    pub fn show_dialog_with<VM: 'static, P: Send + Sync + 'static, R: 'static>(
        &self,
        params: P,
        owner: Option<WindowId>,
        modality: DialogModality,
    ) -> WindowResult<DialogFuture<R>> {
        self.show_dialog_kind(
            ViewModelKind::of::<VM>(),
            Some(Arc::new(params) as ResolveParams),
            owner,
            modality,
        )
    }

    pub(crate) fn show_dialog_kind<R: 'static>(
        &self,
        kind: ViewModelKind,
        params: Option<ResolveParams>,
        owner: Option<WindowId>,
        modality: DialogModality,
    ) -> WindowResult<DialogFuture<R>> {
        let prepared = self.prepare_window(kind, params, owner, None)?;

        let (sender, receiver) = oneshot::channel();
        let reenable = match (modality, owner) {
            (DialogModality::WindowModal, Some(owner_id)) => {
                self.disable_tree(owner_id, prepared.id)
            }
            (DialogModality::WindowModal, None) => {
                log::warn!(
                    "window-modal dialog {} has no owner; showing non-modally",
                    prepared.id
                );
                Vec::new()
            }
            _ => Vec::new(),
        };
        self.inner.dialog_hooks.lock().insert(
            prepared.id,
            DialogHook {
                completion: DialogCompletion::new(sender),
                view_model: Arc::downgrade(&prepared.view_model),
                reenable,
            },
        );

        let shown = match modality {
            DialogModality::AppModal => {
                // The window counts as open for the whole blocking show.
                self.mark_opened(&prepared);
                prepared.surface.show_blocking()
            }
            _ => prepared.surface.show(),
        };

        if let Err(source) = shown {
            // The surface never appeared: undo the disable set, fail the
            // result (hook drop delivers it), and roll back the open.
            let hook = self.inner.dialog_hooks.lock().remove(&prepared.id);
            if let Some(hook) = hook {
                self.reenable_windows(&hook.reenable);
            }
            self.abort_open(prepared.id, &prepared.scope);
            return Err(WindowError::ShowFailed {
                window: prepared.id,
                source,
            });
        }

        if modality != DialogModality::AppModal {
            self.mark_opened(&prepared);
        }

        Ok(DialogFuture {
            window: prepared.id,
            receiver,
            _marker: PhantomData,
        })
    }

    /// Disables the owner window and its descendants, skipping the dialog
    /// itself and anything already disabled for other reasons. Returns the
    /// set that was actually disabled.
    fn disable_tree(&self, owner: WindowId, dialog: WindowId) -> Vec<WindowId> {
        let mut targets = vec![owner];
        targets.extend(self.inner.tracker.descendants_of(owner));

        let mut disabled = Vec::new();
        for window in targets {
            if window == dialog {
                continue;
            }
            let Some(meta) = self.inner.tracker.metadata(window) else {
                continue;
            };
            let Some(surface) = meta.surface() else {
                continue;
            };
            if surface.is_enabled() {
                surface.set_enabled(false);
                disabled.push(window);
            }
        }
        disabled
    }

    /// Re-enables exactly the recorded set, deepest first.
    fn reenable_windows(&self, windows: &[WindowId]) {
        for window in windows.iter().rev() {
            let Some(meta) = self.inner.tracker.metadata(*window) else {
                continue;
            };
            if let Some(surface) = meta.surface() {
                surface.set_enabled(true);
            }
        }
    }

    /// Runs when the dialog window has finished closing: restore the
    /// disabled tree, then deliver the result.
    pub(crate) fn settle_dialog(&self, hook: DialogHook) {
        self.reenable_windows(&hook.reenable);

        let outcome: ErasedOutcome = match hook.view_model.upgrade() {
            Some(view_model) => match view_model.as_dialog_result_source() {
                Some(source) => match source.take_dialog_result() {
                    Some(payload) => Ok(payload),
                    None => Err("dialog closed without producing a result".to_string()),
                },
                None => Err("dialog view-model does not produce a result".to_string()),
            },
            None => Err("dialog view-model was dropped before producing a result".to_string()),
        };
        hook.completion.complete(outcome);
    }
}
