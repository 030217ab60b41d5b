//! Concurrent metadata registry for Vitrine windows.
//!
//! The tracker is pure bookkeeping: per-window metadata plus the
//! parent→children and session→windows indexes. It owns none of the
//! resources it describes: surfaces and view-models are weak references
//! and the scope is recorded by id only. Operations on unknown ids are
//! no-ops returning empty/false, never panics.

pub mod model;

pub use model::{Lifecycle, TrackerSnapshot, WindowMetadata, WindowSnapshot};

use std::collections::{HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use vitrine_shared::{SessionId, WindowId};

type IdSet = SmallVec<[WindowId; 4]>;

struct Entry {
    meta: WindowMetadata,
    /// Serializes `update_metadata` calls for this window without holding
    /// the map lock across the caller's mutator.
    update_gate: Arc<Mutex<()>>,
}

#[derive(Default)]
struct TrackerState {
    entries: HashMap<WindowId, Entry>,
    children: HashMap<WindowId, IdSet>,
    sessions: HashMap<SessionId, IdSet>,
}

/// Thread-safe registry of per-window metadata.
///
/// Reads never block other reads. Mutations for a single window are
/// linearized; mutations across different windows proceed in parallel.
#[derive(Default)]
pub struct WindowTracker {
    state: RwLock<TrackerState>,
}

impl WindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a window. Parent and session indexes are derived from the
    /// metadata fields. Re-tracking an already-tracked id replaces the
    /// entry and logs a warning.
    pub fn track(&self, meta: WindowMetadata) {
        let id = meta.window_id;
        let mut state = self.state.write();
        if state.entries.contains_key(&id) {
            log::warn!("window {id} tracked twice; replacing metadata");
            Self::unlink(&mut state, id);
        }
        Self::link(&mut state, &meta);
        state.entries.insert(
            id,
            Entry {
                meta,
                update_gate: Arc::new(Mutex::new(())),
            },
        );
    }

    /// Removes a window and returns its metadata. Unknown ids return None.
    pub fn untrack(&self, id: WindowId) -> Option<WindowMetadata> {
        let mut state = self.state.write();
        if !state.entries.contains_key(&id) {
            return None;
        }
        Self::unlink(&mut state, id);
        let entry = state.entries.remove(&id)?;
        // The children index entry for `id` stays while grandchildren still
        // point at it; drop it once empty.
        if state.children.get(&id).is_some_and(|c| c.is_empty()) {
            state.children.remove(&id);
        }
        Some(entry.meta)
    }

    pub fn metadata(&self, id: WindowId) -> Option<WindowMetadata> {
        self.state.read().entries.get(&id).map(|e| e.meta.clone())
    }

    pub fn is_tracked(&self, id: WindowId) -> bool {
        self.state.read().entries.contains_key(&id)
    }

    /// Whether the window is tracked and actually usable.
    pub fn is_open(&self, id: WindowId) -> bool {
        self.state
            .read()
            .entries
            .get(&id)
            .is_some_and(|e| e.meta.lifecycle == Lifecycle::Open)
    }

    /// Atomic read-modify-write of one window's metadata.
    ///
    /// The mutator runs without the map lock held, so it may re-enter read
    /// queries on this tracker. A panicking mutator is caught and logged,
    /// and the pre-mutation state is kept. Returns false for unknown ids,
    /// panicked mutators, and windows untracked mid-update.
    pub fn update_metadata(
        &self,
        id: WindowId,
        mutator: impl FnOnce(&mut WindowMetadata),
    ) -> bool {
        let (mut meta, gate) = {
            let state = self.state.read();
            let Some(entry) = state.entries.get(&id) else {
                return false;
            };
            (entry.meta.clone(), Arc::clone(&entry.update_gate))
        };

        let _serialized = gate.lock();
        let before_lifecycle = meta.lifecycle;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            mutator(&mut meta);
            meta
        }));
        let mut meta = match outcome {
            Ok(meta) => meta,
            Err(_) => {
                log::warn!("metadata mutator for window {id} panicked; keeping previous state");
                return false;
            }
        };

        // Lifecycle mutations go through advance_lifecycle; reject backward
        // edits slipped in through the mutator.
        if meta.lifecycle != before_lifecycle
            && !before_lifecycle.can_advance_to(meta.lifecycle)
        {
            log::warn!(
                "mutator for window {id} attempted lifecycle {:?} -> {:?}; keeping {:?}",
                before_lifecycle,
                meta.lifecycle,
                before_lifecycle
            );
            meta.lifecycle = before_lifecycle;
        }

        let mut state = self.state.write();
        if !state.entries.contains_key(&id) {
            return false;
        }
        Self::unlink(&mut state, id);
        Self::link(&mut state, &meta);
        if let Some(entry) = state.entries.get_mut(&id) {
            entry.meta = meta;
        }
        true
    }

    /// Forward-only lifecycle transition. Backward or same-state moves are
    /// rejected with a warning.
    pub fn advance_lifecycle(&self, id: WindowId, next: Lifecycle) -> bool {
        let mut state = self.state.write();
        let Some(entry) = state.entries.get_mut(&id) else {
            return false;
        };
        if !entry.meta.lifecycle.can_advance_to(next) {
            log::warn!(
                "rejected lifecycle transition {:?} -> {next:?} for window {id}",
                entry.meta.lifecycle
            );
            return false;
        }
        entry.meta.lifecycle = next;
        true
    }

    /// Reparents a window. Unknown child ids return false; the caller is
    /// responsible for ensuring the parent is (or was) tracked.
    pub fn set_parent(&self, child: WindowId, parent: WindowId) -> bool {
        let mut state = self.state.write();
        if !state.entries.contains_key(&child) {
            return false;
        }
        Self::unlink_parent(&mut state, child);
        if let Some(entry) = state.entries.get_mut(&child) {
            entry.meta.parent_id = Some(parent);
        }
        state.children.entry(parent).or_default().push(child);
        true
    }

    /// Direct children, including windows mid-close.
    pub fn children_of(&self, parent: WindowId) -> Vec<WindowId> {
        self.state
            .read()
            .children
            .get(&parent)
            .map(|c| c.to_vec())
            .unwrap_or_default()
    }

    /// Transitive children in breadth-first order, excluding `parent`
    /// itself. Includes windows mid-close.
    pub fn descendants_of(&self, parent: WindowId) -> Vec<WindowId> {
        let state = self.state.read();
        let mut out = Vec::new();
        let mut queue: VecDeque<WindowId> = VecDeque::new();
        queue.push_back(parent);
        while let Some(next) = queue.pop_front() {
            if let Some(children) = state.children.get(&next) {
                for child in children {
                    out.push(*child);
                    queue.push_back(*child);
                }
            }
        }
        out
    }

    /// Binds a window to a session. Set-once: binding an unbound window
    /// succeeds, re-binding to the same session is an idempotent success,
    /// and re-association to a different session is rejected with a
    /// warning.
    pub fn associate_with_session(&self, id: WindowId, session: SessionId) -> bool {
        let mut state = self.state.write();
        let Some(entry) = state.entries.get_mut(&id) else {
            return false;
        };
        match entry.meta.session_id {
            Some(existing) if existing == session => true,
            Some(existing) => {
                log::warn!(
                    "window {id} is bound to session {existing}; re-association to {session} rejected"
                );
                false
            }
            None => {
                entry.meta.session_id = Some(session);
                state.sessions.entry(session).or_default().push(id);
                true
            }
        }
    }

    pub fn session_windows(&self, session: SessionId) -> Vec<WindowId> {
        self.state
            .read()
            .sessions
            .get(&session)
            .map(|w| w.to_vec())
            .unwrap_or_default()
    }

    pub fn find(&self, predicate: impl Fn(&WindowMetadata) -> bool) -> Vec<WindowMetadata> {
        self.state
            .read()
            .entries
            .values()
            .filter(|e| predicate(&e.meta))
            .map(|e| e.meta.clone())
            .collect()
    }

    /// Windows whose lifecycle is `Open`, the "actually usable" set.
    pub fn open_window_ids(&self) -> Vec<WindowId> {
        self.state
            .read()
            .entries
            .values()
            .filter(|e| e.meta.lifecycle == Lifecycle::Open)
            .map(|e| e.meta.window_id)
            .collect()
    }

    /// Every tracked window regardless of lifecycle, for structural
    /// traversal.
    pub fn tracked_ids(&self) -> Vec<WindowId> {
        self.state.read().entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Serializable dump of the tracked tree, ordered by creation time.
    pub fn snapshot(&self) -> TrackerSnapshot {
        let state = self.state.read();
        let mut windows: Vec<WindowSnapshot> = state
            .entries
            .values()
            .map(|e| WindowSnapshot::from_metadata(&e.meta))
            .collect();
        windows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.window_id.to_string().cmp(&b.window_id.to_string()))
        });
        TrackerSnapshot { windows }
    }

    fn link(state: &mut TrackerState, meta: &WindowMetadata) {
        if let Some(parent) = meta.parent_id {
            state.children.entry(parent).or_default().push(meta.window_id);
        }
        if let Some(session) = meta.session_id {
            state.sessions.entry(session).or_default().push(meta.window_id);
        }
    }

    fn unlink(state: &mut TrackerState, id: WindowId) {
        Self::unlink_parent(state, id);
        let session = state
            .entries
            .get(&id)
            .and_then(|e| e.meta.session_id)
            .or_else(|| {
                // Entry may already be removed; sweep the session index.
                state
                    .sessions
                    .iter()
                    .find(|(_, ids)| ids.contains(&id))
                    .map(|(session, _)| *session)
            });
        if let Some(session) = session {
            if let Some(ids) = state.sessions.get_mut(&session) {
                ids.retain(|w| *w != id);
                if ids.is_empty() {
                    state.sessions.remove(&session);
                }
            }
        }
    }

    fn unlink_parent(state: &mut TrackerState, id: WindowId) {
        let parent = state.entries.get(&id).and_then(|e| e.meta.parent_id);
        let parents: Vec<WindowId> = match parent {
            Some(parent) => vec![parent],
            // Entry already removed; sweep every child list.
            None => state
                .children
                .iter()
                .filter(|(_, c)| c.contains(&id))
                .map(|(parent, _)| *parent)
                .collect(),
        };
        for parent in parents {
            if let Some(children) = state.children.get_mut(&parent) {
                children.retain(|c| *c != id);
                if children.is_empty() {
                    state.children.remove(&parent);
                }
            }
        }
    }
}
