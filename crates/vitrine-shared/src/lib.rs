//! Shared contracts for the Vitrine lifecycle runtime.
//!
//! This crate holds the identifier types and the collaborator traits that
//! every other Vitrine crate builds on: the scope provider (dependency
//! injection seam), the surface factory (host UI toolkit seam), and the
//! view-model capability interfaces. It deliberately contains no lifecycle
//! logic of its own.

pub mod diagnostics;
pub mod ids;
pub mod scope;
pub mod surface;
pub mod view_model;
pub mod window_handle;

pub use ids::{ListenerId, ScopeId, SessionId, SurfaceKind, ViewModelKind, WindowId};
pub use scope::{PersistenceContext, ResolveParams, Scope, ScopeProvider};
pub use surface::{SubscriptionId, Surface, SurfaceCallback, SurfaceFactory};
pub use view_model::{
    Activatable, Deactivatable, DialogResultSource, Disposable, HasBusyState, HasErrorState,
    Initializable, ViewModel,
};
pub use window_handle::WindowHandle;
