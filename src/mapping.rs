use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{WindowError, WindowResult};
use vitrine_shared::{SurfaceKind, ViewModelKind};

/// Registry of view-model kind → surface kind mappings.
///
/// Populated at startup by the host application; the window manager
/// consults it on every open and fails with [`WindowError::NoViewMapping`]
/// for unmapped kinds.
#[derive(Default)]
pub struct ViewRegistry {
    map: RwLock<HashMap<ViewModelKind, SurfaceKind>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<VM: 'static>(&self, surface: impl Into<SurfaceKind>) {
        self.register_kind(ViewModelKind::of::<VM>(), surface);
    }

    pub fn register_kind(&self, kind: ViewModelKind, surface: impl Into<SurfaceKind>) {
        let surface = surface.into();
        if let Some(previous) = self.map.write().insert(kind, surface.clone()) {
            if previous != surface {
                log::warn!("view mapping for {kind} replaced: {previous} -> {surface}");
            }
        }
    }

    pub fn surface_for(&self, kind: ViewModelKind) -> Option<SurfaceKind> {
        self.map.read().get(&kind).cloned()
    }

    pub(crate) fn require(&self, kind: ViewModelKind) -> WindowResult<SurfaceKind> {
        self.surface_for(kind)
            .ok_or(WindowError::NoViewMapping(kind))
    }
}
