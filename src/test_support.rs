//! In-crate fakes standing in for the host DI container and UI toolkit.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::context::UiContext;
use crate::manager::WindowManager;
use vitrine_shared::{
    Disposable, HasErrorState, Initializable, PersistenceContext, ResolveParams, Scope, ScopeId,
    ScopeProvider, SubscriptionId, Surface, SurfaceCallback, SurfaceFactory, SurfaceKind,
    ViewModel, ViewModelKind,
};

pub(crate) type VmFactory = Arc<dyn Fn(Option<ResolveParams>) -> Arc<dyn ViewModel> + Send + Sync>;

/// Registration table shared by every fake scope, mimicking a container
/// whose child scopes inherit the parent's registrations.
#[derive(Default)]
pub(crate) struct FactoryMap {
    map: Mutex<HashMap<ViewModelKind, VmFactory>>,
}

impl FactoryMap {
    pub fn register<VM: ViewModel + 'static>(
        &self,
        factory: impl Fn(Option<ResolveParams>) -> Arc<VM> + Send + Sync + 'static,
    ) {
        self.map.lock().insert(
            ViewModelKind::of::<VM>(),
            Arc::new(move |params| factory(params) as Arc<dyn ViewModel>),
        );
    }

    fn get(&self, kind: ViewModelKind) -> Option<VmFactory> {
        self.map.lock().get(&kind).cloned()
    }
}

pub(crate) struct FakeScope {
    id: ScopeId,
    tag: String,
    dispose_count: AtomicUsize,
    factories: Arc<FactoryMap>,
    pub contexts: Mutex<Vec<Arc<dyn PersistenceContext>>>,
    /// Resolved instances, held strongly the way a real container scope
    /// owns what it resolves. Cleared on dispose.
    pub resolved: Mutex<Vec<Arc<dyn ViewModel>>>,
}

impl FakeScope {
    pub fn new(tag: &str) -> Arc<Self> {
        Self::with_factories(tag, Arc::new(FactoryMap::default()))
    }

    pub fn with_factories(tag: &str, factories: Arc<FactoryMap>) -> Arc<Self> {
        Arc::new(Self {
            id: ScopeId::new(),
            tag: tag.to_string(),
            dispose_count: AtomicUsize::new(0),
            factories,
            contexts: Mutex::new(Vec::new()),
            resolved: Mutex::new(Vec::new()),
        })
    }

    pub fn dispose_count(&self) -> usize {
        self.dispose_count.load(Ordering::SeqCst)
    }
}

impl Scope for FakeScope {
    fn id(&self) -> ScopeId {
        self.id
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn resolve(
        &self,
        kind: ViewModelKind,
        params: Option<ResolveParams>,
    ) -> anyhow::Result<Arc<dyn ViewModel>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| anyhow::anyhow!("no registration for {kind}"))?;
        let view_model = factory(params);
        self.resolved.lock().push(Arc::clone(&view_model));
        Ok(view_model)
    }

    fn persistence_contexts(&self) -> Vec<Arc<dyn PersistenceContext>> {
        self.contexts.lock().clone()
    }

    fn dispose(&self) {
        if self.dispose_count.fetch_add(1, Ordering::SeqCst) == 0 {
            self.resolved.lock().clear();
            self.contexts.lock().clear();
        }
    }

    fn is_disposed(&self) -> bool {
        self.dispose_count() > 0
    }
}

pub(crate) struct FakeScopeProvider {
    factories: Arc<FactoryMap>,
    pub created: Mutex<Vec<Arc<FakeScope>>>,
    pub fail_create: AtomicBool,
}

impl FakeScopeProvider {
    pub fn new(factories: Arc<FactoryMap>) -> Arc<Self> {
        Arc::new(Self {
            factories,
            created: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
        })
    }

    pub fn scope_with_tag(&self, tag: &str) -> Option<Arc<FakeScope>> {
        self.created.lock().iter().find(|s| s.tag == tag).cloned()
    }
}

impl ScopeProvider for FakeScopeProvider {
    fn create_child_scope(
        &self,
        _parent: &Arc<dyn Scope>,
        tag: &str,
    ) -> anyhow::Result<Arc<dyn Scope>> {
        if self.fail_create.load(Ordering::SeqCst) {
            anyhow::bail!("container unavailable");
        }
        let scope = FakeScope::with_factories(tag, Arc::clone(&self.factories));
        self.created.lock().push(Arc::clone(&scope));
        Ok(scope)
    }
}

type StoredCallback = (SubscriptionId, Option<SurfaceCallback>);

pub(crate) struct FakeSurface {
    enabled: AtomicBool,
    shown: AtomicBool,
    closed: AtomicBool,
    pub fail_show: AtomicBool,
    content: Mutex<Option<Arc<dyn ViewModel>>>,
    loaded_subs: Mutex<Vec<StoredCallback>>,
    closed_subs: Mutex<Vec<StoredCallback>>,
    next_sub: AtomicU64,
    /// History of `set_enabled` calls, for modality assertions.
    pub enable_history: Mutex<Vec<bool>>,
}

impl FakeSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            enabled: AtomicBool::new(true),
            shown: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            fail_show: AtomicBool::new(false),
            content: Mutex::new(None),
            loaded_subs: Mutex::new(Vec::new()),
            closed_subs: Mutex::new(Vec::new()),
            next_sub: AtomicU64::new(1),
            enable_history: Mutex::new(Vec::new()),
        })
    }

    pub fn is_shown(&self) -> bool {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn content(&self) -> Option<Arc<dyn ViewModel>> {
        self.content.lock().clone()
    }

    fn fire(subs: &Mutex<Vec<StoredCallback>>) {
        let callbacks: Vec<SurfaceCallback> = {
            let mut guard = subs.lock();
            guard.iter_mut().filter_map(|(_, cb)| cb.take()).collect()
        };
        for callback in callbacks {
            callback();
        }
    }
}

impl Surface for FakeSurface {
    fn set_content(&self, view_model: Arc<dyn ViewModel>) {
        *self.content.lock() = Some(view_model);
    }

    fn show(&self) -> anyhow::Result<()> {
        if self.fail_show.load(Ordering::SeqCst) {
            anyhow::bail!("toolkit refused to show surface");
        }
        self.shown.store(true, Ordering::SeqCst);
        Self::fire(&self.loaded_subs);
        Ok(())
    }

    fn show_blocking(&self) -> anyhow::Result<()> {
        self.show()?;
        // An app-modal fake returns once the "user" closes the dialog.
        self.close();
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        Self::fire(&self.closed_subs);
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        self.enable_history.lock().push(enabled);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn subscribe_loaded(&self, callback: SurfaceCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_sub.fetch_add(1, Ordering::Relaxed));
        if self.is_shown() {
            callback();
            return id;
        }
        self.loaded_subs.lock().push((id, Some(callback)));
        id
    }

    fn subscribe_closed(&self, callback: SurfaceCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_sub.fetch_add(1, Ordering::Relaxed));
        if self.is_closed() {
            callback();
            return id;
        }
        self.closed_subs.lock().push((id, Some(callback)));
        id
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        self.loaded_subs.lock().retain(|(id, _)| *id != subscription);
        self.closed_subs.lock().retain(|(id, _)| *id != subscription);
    }
}

pub(crate) struct FakeSurfaceFactory {
    pub created: Mutex<Vec<(SurfaceKind, Arc<FakeSurface>)>>,
    pub fail_kinds: Mutex<HashSet<SurfaceKind>>,
    /// Kinds whose surfaces are created armed to fail at show time.
    pub fail_show_kinds: Mutex<HashSet<SurfaceKind>>,
}

impl FakeSurfaceFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            created: Mutex::new(Vec::new()),
            fail_kinds: Mutex::new(HashSet::new()),
            fail_show_kinds: Mutex::new(HashSet::new()),
        })
    }

    pub fn surface_at(&self, index: usize) -> Arc<FakeSurface> {
        Arc::clone(&self.created.lock()[index].1)
    }

    pub fn last_surface(&self) -> Arc<FakeSurface> {
        let created = self.created.lock();
        Arc::clone(&created.last().expect("a surface was created").1)
    }

    pub fn surface_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Drops the factory's strong reference, simulating a surface that the
    /// toolkit already tore down and the collector reclaimed.
    pub fn drop_surface(&self, surface: &Arc<FakeSurface>) {
        self.created
            .lock()
            .retain(|(_, s)| !Arc::ptr_eq(s, surface));
    }
}

impl SurfaceFactory for FakeSurfaceFactory {
    fn create_surface(&self, kind: &SurfaceKind) -> anyhow::Result<Arc<dyn Surface>> {
        if self.fail_kinds.lock().contains(kind) {
            anyhow::bail!("no surface template for {kind}");
        }
        let surface = FakeSurface::new();
        if self.fail_show_kinds.lock().contains(kind) {
            surface.fail_show.store(true, Ordering::SeqCst);
        }
        self.created.lock().push((kind.clone(), Arc::clone(&surface)));
        Ok(surface)
    }
}

/// View-model that records lifecycle interactions.
#[derive(Default)]
pub(crate) struct TrackingVm {
    pub init_count: AtomicUsize,
    pub dispose_count: AtomicUsize,
}

impl ViewModel for TrackingVm {
    fn kind(&self) -> ViewModelKind {
        ViewModelKind::of::<TrackingVm>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_initializable(&self) -> Option<&dyn Initializable> {
        Some(self)
    }

    fn as_disposable(&self) -> Option<&dyn Disposable> {
        Some(self)
    }
}

impl Initializable for TrackingVm {
    fn initialize(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async {
            self.init_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

impl Disposable for TrackingVm {
    fn dispose(&self) {
        self.dispose_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Dialog view-model that hands out a pre-seeded result.
pub(crate) struct DialogVm {
    result: Mutex<Option<Box<dyn Any + Send>>>,
}

impl DialogVm {
    pub fn with_result<R: Send + 'static>(value: R) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Some(Box::new(value))),
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(None),
        })
    }
}

impl ViewModel for DialogVm {
    fn kind(&self) -> ViewModelKind {
        ViewModelKind::of::<DialogVm>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_dialog_result_source(&self) -> Option<&dyn vitrine_shared::DialogResultSource> {
        Some(self)
    }
}

impl vitrine_shared::DialogResultSource for DialogVm {
    fn take_dialog_result(&self) -> Option<Box<dyn Any + Send>> {
        self.result.lock().take()
    }
}

/// Bare view-model with no capabilities.
pub(crate) struct PlainVm;

impl ViewModel for PlainVm {
    fn kind(&self) -> ViewModelKind {
        ViewModelKind::of::<PlainVm>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// View-model whose initialization hook fails, surfacing through the error
/// state.
#[derive(Default)]
pub(crate) struct FailingInitVm {
    pub error: Mutex<Option<String>>,
}

impl ViewModel for FailingInitVm {
    fn kind(&self) -> ViewModelKind {
        ViewModelKind::of::<FailingInitVm>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_initializable(&self) -> Option<&dyn Initializable> {
        Some(self)
    }

    fn as_error_state(&self) -> Option<&dyn HasErrorState> {
        Some(self)
    }
}

impl Initializable for FailingInitVm {
    fn initialize(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async { anyhow::bail!("backing store offline") })
    }
}

impl HasErrorState for FailingInitVm {
    fn set_error(&self, message: Option<String>) {
        *self.error.lock() = message;
    }

    fn error(&self) -> Option<String> {
        self.error.lock().clone()
    }
}

pub(crate) struct TestEnv {
    pub manager: WindowManager,
    pub factories: Arc<FactoryMap>,
    pub provider: Arc<FakeScopeProvider>,
    pub surfaces: Arc<FakeSurfaceFactory>,
    pub root_scope: Arc<FakeScope>,
}

impl TestEnv {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let factories = Arc::new(FactoryMap::default());
        let provider = FakeScopeProvider::new(Arc::clone(&factories));
        let surfaces = FakeSurfaceFactory::new();
        let root_scope = FakeScope::with_factories("root", Arc::clone(&factories));
        let manager = WindowManager::new(
            provider.clone() as Arc<dyn ScopeProvider>,
            surfaces.clone() as Arc<dyn SurfaceFactory>,
            root_scope.clone() as Arc<dyn Scope>,
            UiContext::inline(),
        );
        Self {
            manager,
            factories,
            provider,
            surfaces,
            root_scope,
        }
    }

    /// Registers a view mapping and a container factory for `VM` in one
    /// step.
    pub fn register_vm<VM: ViewModel + 'static>(
        &self,
        surface: &str,
        factory: impl Fn(Option<ResolveParams>) -> Arc<VM> + Send + Sync + 'static,
    ) {
        self.manager.views().register::<VM>(surface);
        self.factories.register(factory);
    }
}
