use std::sync::Arc;

use crate::ids::SurfaceKind;
use crate::view_model::ViewModel;

/// One-shot callback registered on a surface signal.
pub type SurfaceCallback = Box<dyn FnOnce() + Send>;

/// Token for a registered surface-signal callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A displayable top-level UI unit (window or dialog), implemented by the
/// host toolkit. All methods are called from the UI-affinity thread except
/// the subscription bookkeeping, which must be thread-safe.
pub trait Surface: Send + Sync {
    /// Binds the view-model the surface renders.
    fn set_content(&self, view_model: Arc<dyn ViewModel>);

    /// Shows the surface without blocking the caller.
    fn show(&self) -> anyhow::Result<()>;

    /// Shows the surface app-modally; returns only once it has closed.
    fn show_blocking(&self) -> anyhow::Result<()>;

    /// Requests the surface to close. The `closed` signal fires when the
    /// toolkit has actually torn the surface down.
    fn close(&self);

    /// Interaction blocking for modal trees.
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;

    /// One-shot "content loaded" signal. Implementations fire the callback
    /// immediately when the surface is already loaded.
    fn subscribe_loaded(&self, callback: SurfaceCallback) -> SubscriptionId;

    /// One-shot "closed" signal. Implementations fire the callback
    /// immediately when the surface is already closed.
    fn subscribe_closed(&self, callback: SurfaceCallback) -> SubscriptionId;

    /// Removes a not-yet-fired callback. Unknown or fired ids are no-ops.
    fn unsubscribe(&self, subscription: SubscriptionId);
}

/// Factory for surfaces, implemented by the host toolkit.
pub trait SurfaceFactory: Send + Sync {
    fn create_surface(&self, kind: &SurfaceKind) -> anyhow::Result<Arc<dyn Surface>>;
}
