//! Vitrine: a window and scope lifecycle runtime for MVVM desktop apps.
//!
//! Vitrine opens, tracks, and tears down top-level UI surfaces together
//! with the dependency-injection scopes bound to them. Windows form
//! parent/child trees and can share named session scopes; closing any node
//! deterministically closes everything beneath it. The host application
//! supplies two collaborators, a [`ScopeProvider`] (DI container) and a
//! [`SurfaceFactory`] (UI toolkit), plus an explicit [`UiContext`] for the
//! UI-affinity thread; Vitrine supplies the orchestration:
//!
//! - [`WindowManager`]: open/close/dialog orchestration and lifecycle
//!   events
//! - [`WindowTracker`]: the concurrent metadata registry
//! - [`SessionManager`]: nested, taggable session scopes
//! - [`OwnershipHandle`]: owns each window's scope, disposing it exactly
//!   once
//! - [`Navigator`]: in-window content switching with a type-based
//!   history stack

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod handle;
pub mod manager;
pub mod mapping;
pub mod navigator;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::RuntimeConfig;
pub use context::{InlineDispatcher, UiContext, UiDispatcher};
pub use error::{LastError, WindowError, WindowResult};
pub use events::{EventHub, WindowEvent};
pub use handle::OwnershipHandle;
pub use manager::{DialogFuture, DialogModality, DialogResult, WindowManager};
pub use mapping::ViewRegistry;
pub use navigator::Navigator;

pub use vitrine_registry::{Lifecycle, TrackerSnapshot, WindowMetadata, WindowTracker};
pub use vitrine_session::{
    Session, SessionError, SessionEvent, SessionManager, SessionOptions, SessionWindowCloser,
};
pub use vitrine_shared::{
    Activatable, Deactivatable, DialogResultSource, Disposable, HasBusyState, HasErrorState,
    Initializable, ListenerId, PersistenceContext, ResolveParams, Scope, ScopeId, ScopeProvider,
    SessionId, SubscriptionId, Surface, SurfaceCallback, SurfaceFactory, SurfaceKind, ViewModel,
    ViewModelKind, WindowHandle, WindowId, diagnostics,
};
