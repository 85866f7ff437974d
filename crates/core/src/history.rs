//! Annotation history engine
//!
//! Undo/redo is modeled as a log of full deep snapshots of the
//! per-document annotation map plus an index into that log. Every
//! committed edit truncates any redo branch, appends a snapshot, and
//! advances the index; undo and redo only move the index. A commit whose
//! snapshot is structurally equal to the current one is dropped, so
//! no-op edits never grow the log.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationData, AnnotationId, Annotations};

/// The serializable undo/redo log
///
/// This is the exact payload embedded in exported PDF metadata, so a
/// reopened document restores not just the annotations but the entire
/// undo timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
    pub history: Vec<Annotations>,
    pub index: usize,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self { history: vec![Annotations::new()], index: 0 }
    }
}

impl HistoryState {
    /// Current snapshot the index points at
    pub fn current(&self) -> &Annotations {
        &self.history[self.index]
    }
}

/// Owns the history log and applies edits to the current snapshot
#[derive(Debug, Clone, Default)]
pub struct AnnotationHistory {
    state: HistoryState,
}

impl AnnotationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a previously saved log
    ///
    /// An out-of-range index is clamped and an empty log is normalized to
    /// a single empty snapshot, so malformed metadata can never produce
    /// an unusable engine.
    pub fn from_state(mut state: HistoryState) -> Self {
        if state.history.is_empty() {
            state = HistoryState::default();
        } else if state.index >= state.history.len() {
            state.index = state.history.len() - 1;
        }
        Self { state }
    }

    /// Seed from a bare annotation map, with no undo past it
    pub fn from_annotations(annotations: Annotations) -> Self {
        Self { state: HistoryState { history: vec![annotations], index: 0 } }
    }

    pub fn annotations(&self) -> &Annotations {
        self.state.current()
    }

    pub fn history_state(&self) -> &HistoryState {
        &self.state
    }

    /// Replace the whole log (hard reset)
    pub fn set_history_state(&mut self, state: HistoryState) {
        *self = Self::from_state(state);
    }

    /// Replace the log with a single snapshot (hard reset, no undo past it)
    pub fn set_annotations(&mut self, annotations: Annotations) {
        *self = Self::from_annotations(annotations);
    }

    pub fn can_undo(&self) -> bool {
        self.state.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.state.index + 1 < self.state.history.len()
    }

    /// Step back one snapshot; returns whether anything changed
    pub fn undo(&mut self) -> bool {
        if self.can_undo() {
            self.state.index -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward one snapshot; returns whether anything changed
    pub fn redo(&mut self) -> bool {
        if self.can_redo() {
            self.state.index += 1;
            true
        } else {
            false
        }
    }

    /// Commit a new snapshot, discarding any redo branch
    ///
    /// Returns `false` (and leaves the log untouched) when the snapshot
    /// is structurally equal to the current one.
    pub fn commit(&mut self, next: Annotations) -> bool {
        if next == *self.state.current() {
            return false;
        }
        self.state.history.truncate(self.state.index + 1);
        self.state.history.push(next);
        self.state.index = self.state.history.len() - 1;
        true
    }

    /// Add a new annotation to a page; returns its freshly minted id
    pub fn add_annotation(&mut self, page: u32, data: AnnotationData) -> AnnotationId {
        let annotation = data.into_annotation(page);
        let id = annotation.id.clone();
        let mut next = self.state.current().clone();
        next.entry(page).or_default().push(annotation);
        self.commit(next);
        id
    }

    /// Replace an annotation in place, matched by id on its page
    ///
    /// A missing id is a silent no-op, as is an update that leaves the
    /// annotation unchanged.
    pub fn update_annotation(&mut self, updated: Annotation) -> bool {
        let mut next = self.state.current().clone();
        let Some(slot) = next
            .get_mut(&updated.page)
            .and_then(|list| list.iter_mut().find(|a| a.id == updated.id))
        else {
            return false;
        };
        *slot = updated;
        self.commit(next)
    }

    /// Remove an annotation by id from a page; missing id is a no-op
    pub fn delete_annotation(&mut self, page: u32, id: &str) -> bool {
        let mut next = self.state.current().clone();
        let Some(list) = next.get_mut(&page) else {
            return false;
        };
        list.retain(|a| a.id != id);
        self.commit(next)
    }

    /// Commit an empty snapshot, wiping every page
    pub fn clear_annotations(&mut self) -> bool {
        self.commit(Annotations::new())
    }
}
