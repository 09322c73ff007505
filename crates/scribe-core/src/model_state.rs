//! Selection snapshots for undo and redo.
//!
//! Each view keeps a [`ModelState`] so undo and redo can restore where the caret was, not only
//! what the text was. Snapshots are keyed by absolute undo index:
//!
//! - the undo stack at key `k` holds the selection from before action `k - 1` ran, restored
//!   when undoing back to `k - 1` applied actions;
//! - the redo stack at key `k` holds the selection after the step that ended with action
//!   `k - 1`, restored when redoing up to `k` applied actions.
//!
//! A typing burst that coalesces into one action keeps the snapshot taken before its first
//! keystroke.

use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether undo and redo restore view state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndoSelectionHistory {
    /// Leave the selection alone on undo and redo.
    Disabled,
    /// Restore the selection.
    #[default]
    Enabled,
    /// Restore the selection and the first visible line.
    Scroll,
}

/// Which stack to read a snapshot from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoRedo {
    /// Snapshots restored by undo.
    Undo,
    /// Snapshots restored by redo.
    Redo,
}

/// A serialized selection and the first visible line at the time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionWithScroll {
    /// The selection in its string form.
    pub selection: String,
    /// First visible document line.
    pub top_line: usize,
}

#[derive(Debug, Clone, Default)]
struct SelectionHistory {
    index_current: Option<usize>,
    ss_current: String,
    stack: BTreeMap<usize, SelectionWithScroll>,
}

/// Per-view snapshot stacks.
#[derive(Debug, Clone, Default)]
pub struct ModelState {
    history_for_undo: SelectionHistory,
    history_for_redo: SelectionHistory,
}

impl ModelState {
    /// Create empty stacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the selection before an edit at undo index `index`.
    ///
    /// The capture only reaches the stack through
    /// [`remember_selection_onto_stack`](Self::remember_selection_onto_stack), which skips
    /// keystrokes that merged into an existing action.
    pub fn remember_selection_for_undo(&mut self, index: usize, selection: &Selection) {
        self.history_for_undo.index_current = Some(index);
        self.history_for_undo.ss_current = selection.to_string();
    }

    /// Drop the pending capture, e.g. after the caret moved without an edit.
    pub fn forget_selection_for_undo(&mut self) {
        self.history_for_undo.index_current = None;
    }

    /// Store the pending capture at key `index` if it was taken just before that action.
    pub fn remember_selection_onto_stack(&mut self, index: usize, top_line: usize) {
        let history = &mut self.history_for_undo;
        if history.index_current.is_some_and(|current| index == current + 1) {
            tracing::trace!(target: "scribe.edit_model", index, selection = %history.ss_current, "undo snapshot");
            history.stack.insert(
                index,
                SelectionWithScroll {
                    selection: history.ss_current.clone(),
                    top_line,
                },
            );
        }
    }

    /// Store the selection after an edit at redo key `index`.
    pub fn remember_selection_for_redo_onto_stack(&mut self, index: usize, selection: &Selection, top_line: usize) {
        self.history_for_redo.stack.insert(
            index,
            SelectionWithScroll {
                selection: selection.to_string(),
                top_line,
            },
        );
    }

    /// Snapshot at `index` on one of the stacks.
    pub fn selection_from_stack(&self, index: usize, history: UndoRedo) -> Option<&SelectionWithScroll> {
        let history = match history {
            UndoRedo::Undo => &self.history_for_undo,
            UndoRedo::Redo => &self.history_for_redo,
        };
        history.stack.get(&index)
    }

    /// Remove every snapshot at or after `index` from both stacks.
    pub fn truncate_undo(&mut self, index: usize) {
        self.history_for_undo.stack.split_off(&index);
        self.history_for_redo.stack.split_off(&index);
        if self.history_for_undo.index_current.is_some_and(|current| current >= index) {
            self.history_for_undo.index_current = None;
        }
    }

    /// Remove every snapshot at or below `index`, after the undo log evicted those actions.
    pub fn retire_below(&mut self, index: usize) {
        for history in [&mut self.history_for_undo, &mut self.history_for_redo] {
            history.stack = history.stack.split_off(&(index + 1));
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of stored snapshots on each stack.
    pub fn len(&self) -> (usize, usize) {
        (self.history_for_undo.stack.len(), self.history_for_redo.stack.len())
    }

    /// `true` when neither stack holds a snapshot.
    pub fn is_empty(&self) -> bool {
        self.history_for_undo.stack.is_empty() && self.history_for_redo.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionRange;

    fn caret(position: usize) -> Selection {
        let mut sel = Selection::new();
        sel.set_caret(position);
        sel
    }

    #[test]
    fn test_first_capture_of_burst_wins() {
        let mut state = ModelState::new();
        state.remember_selection_for_undo(0, &caret(0));
        state.remember_selection_onto_stack(1, 0);
        state.remember_selection_for_undo(1, &caret(1));
        // Coalesced: no new action, so nothing is pushed for index 2.
        state.remember_selection_for_undo(1, &caret(2));
        state.remember_selection_onto_stack(1, 0);
        assert_eq!(state.selection_from_stack(1, UndoRedo::Undo).map(|s| s.selection.as_str()), Some("0"));
        assert_eq!(state.len().0, 1);
    }

    #[test]
    fn test_onto_stack_requires_adjacent_index() {
        let mut state = ModelState::new();
        state.remember_selection_for_undo(3, &caret(7));
        state.remember_selection_onto_stack(5, 2);
        assert!(state.is_empty());
        state.remember_selection_onto_stack(4, 2);
        let snapshot = state.selection_from_stack(4, UndoRedo::Undo).unwrap();
        assert_eq!(snapshot.selection, "7");
        assert_eq!(snapshot.top_line, 2);
        state.forget_selection_for_undo();
        state.remember_selection_onto_stack(4, 9);
        assert_eq!(state.selection_from_stack(4, UndoRedo::Undo).unwrap().top_line, 2);
    }

    #[test]
    fn test_truncate_and_retire() {
        let mut state = ModelState::new();
        let mut sel = Selection::new();
        sel.set_selection(SelectionRange::new(1, 4));
        for index in 1..=5 {
            state.remember_selection_for_undo(index - 1, &sel);
            state.remember_selection_onto_stack(index, 0);
            state.remember_selection_for_redo_onto_stack(index, &sel, 0);
        }
        state.truncate_undo(4);
        assert_eq!(state.len(), (3, 3));
        assert!(state.selection_from_stack(4, UndoRedo::Redo).is_none());
        state.retire_below(2);
        assert_eq!(state.len(), (1, 1));
        assert_eq!(state.selection_from_stack(3, UndoRedo::Redo).unwrap().selection, "1-4");
    }
}
