use std::sync::Arc;

use crate::ids::WindowId;
use crate::scope::Scope;

/// Ownership handle for a window's resources, as seen by the registry.
///
/// The registry stores handles behind this trait so it can describe the
/// relationship without depending on the concrete owner. The handle is the
/// single owner of the window's scope; everything else holds weak refs.
pub trait WindowHandle: Send + Sync {
    fn window_id(&self) -> WindowId;

    /// Releases the window's scope and clears the weak references.
    /// Idempotent: the first caller wins, later calls are no-ops.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;

    /// The owned scope, `None` once disposed.
    fn scope(&self) -> Option<Arc<dyn Scope>>;
}
