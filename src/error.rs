use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;

use vitrine_session::SessionError;
use vitrine_shared::{SessionId, ViewModelKind, WindowId};

/// Failures raised by the window/dialog manager.
#[derive(Debug, Error)]
pub enum WindowError {
    #[error("no surface mapping registered for view-model {0}")]
    NoViewMapping(ViewModelKind),

    #[error("parent window {0} not found")]
    ParentNotFound(WindowId),

    #[error("session {0} not found or inactive")]
    SessionNotFound(SessionId),

    #[error("ownership handle for window {0} is already disposed")]
    AlreadyDisposed(WindowId),

    /// Logged and non-fatal: the parent close proceeds after the wait.
    #[error("timed out after {timeout:?} waiting for children of window {window} to close")]
    ChildCloseTimeout {
        window: WindowId,
        timeout: Duration,
    },

    #[error("failed to show surface for window {window}: {source}")]
    ShowFailed {
        window: WindowId,
        #[source]
        source: anyhow::Error,
    },

    #[error("scope error: {0}")]
    Scope(#[source] anyhow::Error),

    #[error("surface error: {0}")]
    Surface(#[source] anyhow::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type WindowResult<T> = Result<T, WindowError>;

/// Snapshot of the most recent failure, kept for diagnostics and exposed
/// through `WindowManager::last_error`.
#[derive(Debug, Clone)]
pub struct LastError {
    pub operation: &'static str,
    pub message: String,
    pub at: OffsetDateTime,
}

impl LastError {
    pub(crate) fn new(operation: &'static str, error: &WindowError) -> Self {
        Self {
            operation,
            message: error.to_string(),
            at: OffsetDateTime::now_utc(),
        }
    }
}
