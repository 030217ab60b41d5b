use std::any::Any;

use futures::future::BoxFuture;

use crate::ids::ViewModelKind;

/// A view-model bound to a surface.
///
/// Capabilities are modeled as small optional interfaces rather than a base
/// class hierarchy: a view-model opts into each by overriding the matching
/// `as_*` accessor to return `Some(self)`. Callers probe the accessor and
/// act only when the capability is present.
pub trait ViewModel: Send + Sync {
    fn kind(&self) -> ViewModelKind;

    fn as_any(&self) -> &dyn Any;

    fn as_initializable(&self) -> Option<&dyn Initializable> {
        None
    }

    fn as_disposable(&self) -> Option<&dyn Disposable> {
        None
    }

    fn as_dialog_result_source(&self) -> Option<&dyn DialogResultSource> {
        None
    }

    fn as_activatable(&self) -> Option<&dyn Activatable> {
        None
    }

    fn as_deactivatable(&self) -> Option<&dyn Deactivatable> {
        None
    }

    fn as_busy_state(&self) -> Option<&dyn HasBusyState> {
        None
    }

    fn as_error_state(&self) -> Option<&dyn HasErrorState> {
        None
    }
}

/// Async post-load initialization hook. Runs after the surface has loaded;
/// the surface is already visible while this executes.
pub trait Initializable: Send + Sync {
    fn initialize(&self) -> BoxFuture<'_, anyhow::Result<()>>;
}

/// Explicit teardown for view-models holding resources the scope does not
/// already own.
pub trait Disposable: Send + Sync {
    fn dispose(&self);
}

/// Produces the typed result a dialog resolves to when it closes.
pub trait DialogResultSource: Send + Sync {
    /// Materializes the result, consuming it. `None` when the dialog was
    /// dismissed without producing one.
    fn take_dialog_result(&self) -> Option<Box<dyn Any + Send>>;
}

/// Navigator hook: content became current.
pub trait Activatable: Send + Sync {
    fn activate(&self) -> BoxFuture<'_, ()>;
}

/// Navigator hook: content is about to be replaced.
pub trait Deactivatable: Send + Sync {
    fn deactivate(&self) -> BoxFuture<'_, ()>;
}

pub trait HasBusyState: Send + Sync {
    fn set_busy(&self, busy: bool);
    fn is_busy(&self) -> bool;
}

pub trait HasErrorState: Send + Sync {
    fn set_error(&self, message: Option<String>);
    fn error(&self) -> Option<String>;
}
