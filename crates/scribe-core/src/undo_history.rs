//! Linear undo log with typing coalescing.
//!
//! The log is addressed by absolute action index: the first action ever recorded is index 0,
//! and indices keep counting up even after old actions are evicted. `current` is the number of
//! actions applied, so `actions[..current]` can be undone and `actions[current..active_end]`
//! redone. Appending after an undo does not free the redo branch; it moves `active_end` back and
//! later appends overwrite the stale slots. Selection snapshots held by views are keyed by the
//! same absolute indices, so neither truncation nor eviction ever renumbers them.
//!
//! Actions form *steps*: an action with `start_sequence` begins a step and the following
//! actions without it belong to the same step. Undo and redo always apply whole steps.

use std::collections::VecDeque;

/// What an [`UndoAction`] did to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// `text` was inserted at `position`.
    Insert,
    /// `text` was removed from `position`.
    Delete,
}

/// One reversible text change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoAction {
    /// Insert or delete.
    pub kind: ActionType,
    /// Byte position of the change.
    pub position: usize,
    /// The inserted or removed text.
    pub text: String,
    /// `true` if this action begins an undo step.
    pub start_sequence: bool,
    /// `true` if later typing may be merged into this action.
    pub may_coalesce: bool,
}

impl UndoAction {
    /// Byte length of the affected text.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// `true` for an action without text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// How [`UndoHistory::append_action`] recorded an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppendOutcome {
    /// The action was merged into the previous one.
    pub coalesced: bool,
    /// A redo branch starting at this absolute index was discarded.
    pub truncated_from: Option<usize>,
    /// Actions below this absolute index were evicted.
    pub evicted_below: Option<usize>,
}

/// The undo log of a buffer.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    actions: VecDeque<UndoAction>,
    first_index: usize,
    current: usize,
    active_end: usize,
    save_point: Option<usize>,
    sequence_depth: usize,
    group_start_pending: bool,
    typing_broken: bool,
    limit: usize,
    coalesce_limit: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(1000, 256)
    }
}

impl UndoHistory {
    /// Create an empty history holding at most `limit` actions.
    pub fn new(limit: usize, coalesce_limit: usize) -> Self {
        Self {
            actions: VecDeque::new(),
            first_index: 0,
            current: 0,
            active_end: 0,
            save_point: Some(0),
            sequence_depth: 0,
            group_start_pending: false,
            typing_broken: true,
            limit: limit.max(1),
            coalesce_limit,
        }
    }

    /// Maximum number of retained actions.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the action limit, evicting immediately if needed.
    pub fn set_limit(&mut self, limit: usize) -> Option<usize> {
        self.limit = limit.max(1);
        self.evict()
    }

    /// Maximum byte length of one coalesced typing action.
    pub fn set_coalesce_limit(&mut self, coalesce_limit: usize) {
        self.coalesce_limit = coalesce_limit;
    }

    fn slot(&self, index: usize) -> Option<&UndoAction> {
        index
            .checked_sub(self.first_index)
            .and_then(|slot| self.actions.get(slot))
    }

    fn slot_mut(&mut self, index: usize) -> Option<&mut UndoAction> {
        index
            .checked_sub(self.first_index)
            .and_then(|slot| self.actions.get_mut(slot))
    }

    fn try_coalesce(&mut self, kind: ActionType, position: usize, text: &str, may_coalesce: bool) -> bool {
        if kind != ActionType::Insert
            || !may_coalesce
            || self.typing_broken
            || self.sequence_depth > 0
            || self.current == self.first_index
            || self.save_point == Some(self.current)
        {
            return false;
        }
        let limit = self.coalesce_limit;
        let Some(previous) = self.slot_mut(self.current - 1) else {
            return false;
        };
        if previous.kind != ActionType::Insert
            || !previous.may_coalesce
            || previous.position + previous.text.len() != position
            || previous.text.len() + text.len() > limit
        {
            return false;
        }
        previous.text.push_str(text);
        true
    }

    /// Record an action at the current index.
    ///
    /// Any redo branch is discarded. A single-character insert made while typing may be merged
    /// into the previous action instead of creating a new one.
    pub fn append_action(
        &mut self,
        kind: ActionType,
        position: usize,
        text: &str,
        may_coalesce: bool,
    ) -> AppendOutcome {
        let mut outcome = AppendOutcome::default();
        if self.current < self.active_end {
            outcome.truncated_from = Some(self.current);
            self.active_end = self.current;
            if self.save_point.is_some_and(|save| save > self.current) {
                self.save_point = None;
            }
        }
        let may_coalesce = may_coalesce && text.chars().count() == 1;
        if self.try_coalesce(kind, position, text, may_coalesce) {
            tracing::trace!(target: "scribe.undo", position, index = self.current - 1, "coalesced typing");
            outcome.coalesced = true;
            return outcome;
        }
        let start_sequence = if self.sequence_depth == 0 {
            true
        } else {
            std::mem::take(&mut self.group_start_pending)
        };
        let action = UndoAction {
            kind,
            position,
            text: text.to_string(),
            start_sequence,
            may_coalesce,
        };
        let slot = self.current - self.first_index;
        if slot < self.actions.len() {
            self.actions[slot] = action;
        } else {
            self.actions.push_back(action);
        }
        self.current += 1;
        self.active_end = self.current;
        self.typing_broken = !may_coalesce;
        outcome.evicted_below = self.evict();
        outcome
    }

    fn evict(&mut self) -> Option<usize> {
        if self.active_end - self.first_index <= self.limit {
            return None;
        }
        while self.active_end - self.first_index > self.limit && self.current > self.first_index {
            self.actions.pop_front();
            self.first_index += 1;
        }
        if let Some(front) = self.actions.front_mut() {
            front.start_sequence = true;
        }
        if self.save_point.is_some_and(|save| save < self.first_index) {
            self.save_point = None;
        }
        tracing::debug!(target: "scribe.undo", first_index = self.first_index, "evicted old actions");
        Some(self.first_index)
    }

    /// Open an undo group. Groups nest; everything until the matching
    /// [`end_undo_action`](Self::end_undo_action) is undone as one step.
    pub fn begin_undo_action(&mut self) {
        if self.sequence_depth == 0 {
            self.group_start_pending = true;
        }
        self.sequence_depth += 1;
        self.typing_broken = true;
    }

    /// Close an undo group.
    pub fn end_undo_action(&mut self) {
        self.sequence_depth = self.sequence_depth.saturating_sub(1);
        if self.sequence_depth == 0 {
            self.group_start_pending = false;
        }
        self.typing_broken = true;
    }

    /// Nesting depth of open groups.
    pub fn undo_sequence_depth(&self) -> usize {
        self.sequence_depth
    }

    /// Prevent the next typed character from merging into the previous action.
    pub fn break_coalescing(&mut self) {
        self.typing_broken = true;
    }

    /// Forget every action.
    pub fn delete_undo_history(&mut self) {
        self.actions.clear();
        self.first_index = self.current;
        self.active_end = self.current;
        self.typing_broken = true;
        if self.save_point != Some(self.current) {
            self.save_point = None;
        }
    }

    /// Mark the current state as saved.
    pub fn set_save_point(&mut self) {
        self.save_point = Some(self.current);
        self.typing_broken = true;
    }

    /// `true` when the text matches the last save point.
    pub fn is_save_point(&self) -> bool {
        self.save_point == Some(self.current)
    }

    /// Absolute index of the save point, if it is still reachable.
    pub fn save_point(&self) -> Option<usize> {
        self.save_point
    }

    /// `true` if there is a step to undo.
    pub fn can_undo(&self) -> bool {
        self.current > self.first_index
    }

    /// `true` if there is a step to redo.
    pub fn can_redo(&self) -> bool {
        self.current < self.active_end
    }

    /// Absolute number of applied actions.
    pub fn undo_current(&self) -> usize {
        self.current
    }

    /// Absolute index of the oldest retained action.
    pub fn first_index(&self) -> usize {
        self.first_index
    }

    /// Number of live actions (undoable plus redoable).
    pub fn undo_actions(&self) -> usize {
        self.active_end - self.first_index
    }

    /// Action at absolute `index`, if it is live.
    pub fn action(&self, index: usize) -> Option<&UndoAction> {
        if index >= self.active_end {
            return None;
        }
        self.slot(index)
    }

    /// Number of actions in the step that [`undo_step`](Self::undo_step) would walk.
    pub fn start_undo(&mut self) -> usize {
        self.typing_broken = true;
        let mut index = self.current;
        while index > self.first_index {
            index -= 1;
            if self.slot(index).is_none_or(|action| action.start_sequence) {
                break;
            }
        }
        self.current - index
    }

    /// The action the next [`completed_undo_step`](Self::completed_undo_step) will undo.
    pub fn undo_step(&self) -> Option<&UndoAction> {
        self.current.checked_sub(1).and_then(|index| {
            if index >= self.first_index {
                self.slot(index)
            } else {
                None
            }
        })
    }

    /// Move `current` back past one undone action.
    pub fn completed_undo_step(&mut self) {
        if self.current > self.first_index {
            self.current -= 1;
        }
    }

    /// Number of actions in the step that [`redo_step`](Self::redo_step) would walk.
    pub fn start_redo(&mut self) -> usize {
        self.typing_broken = true;
        if self.current >= self.active_end {
            return 0;
        }
        let mut index = self.current + 1;
        while index < self.active_end && self.slot(index).is_some_and(|action| !action.start_sequence) {
            index += 1;
        }
        index - self.current
    }

    /// The action the next [`completed_redo_step`](Self::completed_redo_step) will redo.
    pub fn redo_step(&self) -> Option<&UndoAction> {
        self.action(self.current)
    }

    /// Move `current` forward past one redone action.
    pub fn completed_redo_step(&mut self) {
        if self.current < self.active_end {
            self.current += 1;
        }
    }
}
