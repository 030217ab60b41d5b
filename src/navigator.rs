//! In-window content switching with a type-based history stack.
//!
//! The navigator shows one content view-model at a time inside a window's
//! shell. History stores only `(kind, params)`, never the instance, so
//! back-navigation re-creates content from the scope and disposed
//! view-models are never resurrected. Each navigation is one ordered
//! async sequence: resolve, deactivate outgoing, dispose, then activate
//! incoming and publish.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{WindowError, WindowResult};
use vitrine_shared::{
    Activatable, Deactivatable, Disposable, ListenerId, ResolveParams, Scope, ViewModel,
    ViewModelKind,
};

struct CurrentContent {
    view_model: Arc<dyn ViewModel>,
    kind: ViewModelKind,
    params: Option<ResolveParams>,
}

struct HistoryEntry {
    kind: ViewModelKind,
    params: Option<ResolveParams>,
}

#[derive(Default)]
struct NavigatorState {
    current: Option<CurrentContent>,
    history: Vec<HistoryEntry>,
}

type ContentObserver = Arc<dyn Fn(ViewModelKind) + Send + Sync>;

/// Stack-based content navigator for a single window's shell.
pub struct Navigator {
    scope: Arc<dyn Scope>,
    /// When true the navigator disposes outgoing content it replaced.
    owns_content: bool,
    state: Mutex<NavigatorState>,
    observers: Mutex<Vec<(ListenerId, ContentObserver)>>,
    next_observer: AtomicU64,
}

impl Navigator {
    pub fn new(scope: Arc<dyn Scope>, owns_content: bool) -> Self {
        Self {
            scope,
            owns_content,
            state: Mutex::new(NavigatorState::default()),
            observers: Mutex::new(Vec::new()),
            next_observer: AtomicU64::new(1),
        }
    }

    pub fn current(&self) -> Option<Arc<dyn ViewModel>> {
        self.state
            .lock()
            .current
            .as_ref()
            .map(|c| Arc::clone(&c.view_model))
    }

    pub fn current_kind(&self) -> Option<ViewModelKind> {
        self.state.lock().current.as_ref().map(|c| c.kind)
    }

    pub fn can_navigate_back(&self) -> bool {
        !self.state.lock().history.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Navigates to new content, pushing the current content's type and
    /// parameters onto the history stack.
    pub async fn navigate_to<VM: 'static>(&self) -> WindowResult<()> {
        self.navigate_to_kind(ViewModelKind::of::<VM>(), None).await
    }

    pub async fn navigate_to_with<VM: 'static, P: Send + Sync + 'static>(
        &self,
        params: P,
    ) -> WindowResult<()> {
        self.navigate_to_kind(
            ViewModelKind::of::<VM>(),
            Some(Arc::new(params) as ResolveParams),
        )
        .await
    }

    pub async fn navigate_to_kind(
        &self,
        kind: ViewModelKind,
        params: Option<ResolveParams>,
    ) -> WindowResult<()> {
        let incoming = self
            .scope
            .resolve(kind, params.clone())
            .map_err(WindowError::Scope)?;

        let outgoing = self.state.lock().current.take();
        if let Some(outgoing) = outgoing {
            self.retire(&outgoing.view_model).await;
            self.state.lock().history.push(HistoryEntry {
                kind: outgoing.kind,
                params: outgoing.params,
            });
        }

        self.present(incoming, kind, params).await;
        Ok(())
    }

    /// Pops the most recent history entry and re-creates its content from
    /// the stored type and parameters. Returns false when the history is
    /// empty.
    pub async fn navigate_back(&self) -> WindowResult<bool> {
        let Some(entry) = self.state.lock().history.pop() else {
            return Ok(false);
        };
        self.replace_current(entry).await?;
        Ok(true)
    }

    /// Pops history entries until content of kind `VM` is found, then
    /// navigates to it. Returns false, leaving history untouched, when
    /// no such entry exists.
    pub async fn navigate_back_to<VM: 'static>(&self) -> WindowResult<bool> {
        self.navigate_back_to_kind(ViewModelKind::of::<VM>()).await
    }

    pub async fn navigate_back_to_kind(&self, kind: ViewModelKind) -> WindowResult<bool> {
        let entry = {
            let mut state = self.state.lock();
            let Some(index) = state.history.iter().rposition(|e| e.kind == kind) else {
                return Ok(false);
            };
            state.history.truncate(index + 1);
            state.history.pop()
        };
        let Some(entry) = entry else {
            return Ok(false);
        };
        self.replace_current(entry).await?;
        Ok(true)
    }

    pub fn subscribe(&self, observer: impl Fn(ViewModelKind) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.observers.lock().retain(|(oid, _)| *oid != id);
    }

    async fn replace_current(&self, entry: HistoryEntry) -> WindowResult<()> {
        let incoming = self
            .scope
            .resolve(entry.kind, entry.params.clone())
            .map_err(WindowError::Scope)?;

        let outgoing = self.state.lock().current.take();
        if let Some(outgoing) = outgoing {
            self.retire(&outgoing.view_model).await;
        }

        self.present(incoming, entry.kind, entry.params).await;
        Ok(())
    }

    async fn retire(&self, view_model: &Arc<dyn ViewModel>) {
        if let Some(deactivatable) = view_model.as_deactivatable() {
            deactivatable.deactivate().await;
        }
        if self.owns_content {
            if let Some(disposable) = view_model.as_disposable() {
                disposable.dispose();
            }
        }
    }

    async fn present(
        &self,
        incoming: Arc<dyn ViewModel>,
        kind: ViewModelKind,
        params: Option<ResolveParams>,
    ) {
        if let Some(activatable) = incoming.as_activatable() {
            activatable.activate().await;
        }
        self.state.lock().current = Some(CurrentContent {
            view_model: incoming,
            kind,
            params,
        });
        self.notify(kind);
    }

    fn notify(&self, kind: ViewModelKind) {
        let observers: Vec<ContentObserver> = {
            let guard = self.observers.lock();
            guard.iter().map(|(_, o)| Arc::clone(o)).collect()
        };
        for observer in observers {
            observer(kind);
        }
    }
}
