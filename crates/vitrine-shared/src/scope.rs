use std::any::Any;
use std::sync::Arc;

use crate::ids::{ScopeId, ViewModelKind};
use crate::view_model::ViewModel;

/// Parameters handed to a scoped resolution. Stored behind an `Arc` so the
/// navigator history can keep them and replay a resolution later.
pub type ResolveParams = Arc<dyn Any + Send + Sync>;

/// A resource-resolution context. Child scopes inherit and may override
/// their parent's registrations; disposing a scope releases everything
/// resolved from it.
///
/// Implemented by the host application's dependency-injection container.
/// Vitrine never implements this itself.
pub trait Scope: Send + Sync {
    fn id(&self) -> ScopeId;

    /// Tag the scope was created with, e.g. `window:<id>` or a session name.
    fn tag(&self) -> &str;

    /// Resolves a view-model instance of the given kind from this scope.
    fn resolve(
        &self,
        kind: ViewModelKind,
        params: Option<ResolveParams>,
    ) -> anyhow::Result<Arc<dyn ViewModel>>;

    /// Persistence contexts reachable from this scope. Empty unless the
    /// container carries data-bound registrations.
    fn persistence_contexts(&self) -> Vec<Arc<dyn PersistenceContext>> {
        Vec::new()
    }

    /// Releases the scope and everything resolved from it. Must be
    /// idempotent.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// Factory for child scopes, implemented by the host DI container.
pub trait ScopeProvider: Send + Sync {
    fn create_child_scope(
        &self,
        parent: &Arc<dyn Scope>,
        tag: &str,
    ) -> anyhow::Result<Arc<dyn Scope>>;
}

/// A unit-of-work style persistence context discovered inside data-bound
/// session scopes. `commit` flushes pending changes, `discard` drops them.
pub trait PersistenceContext: Send + Sync {
    fn commit(&self) -> anyhow::Result<()>;
    fn discard(&self);
}
