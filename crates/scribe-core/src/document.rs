//! Shared documents.
//!
//! A [`Document`] owns the [`CellBuffer`] plus the per-line state that sits beside it: fold
//! levels and the [`ContractionState`]. Several views may edit one document; they share it
//! through a [`DocumentHandle`] and each registers a [`ViewId`] under which the document keeps
//! that view's [`ModelState`] and a weak reference to its [`Selection`]. Every text
//! modification moves the selection of each live view before listeners hear about it, and
//! slots whose view has gone are dropped at that point.
//!
//! # Events
//!
//! Listeners registered with [`Document::subscribe`] receive every [`DocumentEvent`]. They run
//! while the document is mutably borrowed, so a listener must not reach back into the same
//! [`DocumentHandle`].

use crate::cell_buffer::{CellBuffer, CellChange};
use crate::config::DocumentOptions;
use crate::contraction_state::ContractionState;
use crate::decoration::DecorationList;
use crate::error::{CoreError, CoreResult};
use crate::line_ending::{LineEnding, normalize_to_lf};
use crate::model_state::ModelState;
use crate::modification::{DocModification, ModificationFlags};
use crate::processing::{DocumentProcessor, ProcessingEdit};
use crate::search::{self, SearchOptions};
use crate::selection::{Range, Selection};
use crate::undo_history::{ActionType, AppendOutcome, UndoHistory};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;
use std::rc::{Rc, Weak};

/// A line's fold level: a level number plus header and whitespace flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FoldLevel(pub u32);

impl FoldLevel {
    /// Level of top-level lines.
    pub const BASE: Self = Self(0x400);
    /// The line is blank.
    pub const WHITE_FLAG: u32 = 0x1000;
    /// The line starts a fold.
    pub const HEADER_FLAG: u32 = 0x2000;
    /// Bits holding the level number.
    pub const NUMBER_MASK: u32 = 0x0FFF;

    /// The level number without flags.
    pub fn number(self) -> u32 {
        self.0 & Self::NUMBER_MASK
    }

    /// `true` if the line starts a fold.
    pub fn is_header(self) -> bool {
        self.0 & Self::HEADER_FLAG != 0
    }

    /// `true` if the line is blank.
    pub fn is_whitespace(self) -> bool {
        self.0 & Self::WHITE_FLAG != 0
    }

    fn is_subordinate(level_start: u32, level_try: Self) -> bool {
        level_try.is_whitespace() || level_start < level_try.number()
    }
}

impl Default for FoldLevel {
    fn default() -> Self {
        Self::BASE
    }
}

impl BitOr<u32> for FoldLevel {
    type Output = Self;

    fn bitor(self, flags: u32) -> Self {
        Self(self.0 | flags)
    }
}

/// Identity of a view attached to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

/// Identity of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

/// Something that happened to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// Text, styles, indicators or fold levels changed, or are about to.
    Modified(DocModification),
    /// The document returned to its save point.
    SavePointReached,
    /// The document moved away from its save point.
    SavePointLeft,
    /// An edit was rejected because the document is read-only.
    ModifyAttemptReadOnly,
}

/// Callback invoked for each [`DocumentEvent`].
pub type DocumentListener = Box<dyn FnMut(&DocumentEvent)>;

#[derive(Debug)]
struct ViewSlot {
    model_state: Option<ModelState>,
    selection: Weak<RefCell<Selection>>,
}

impl ViewSlot {
    fn is_live(&self) -> bool {
        self.selection.strong_count() > 0
    }
}

/// The text of one file with its styles, undo log and per-line state.
pub struct Document {
    cb: CellBuffer,
    contraction: ContractionState,
    fold_levels: Vec<FoldLevel>,
    line_ending: LineEnding,
    styling_position: usize,
    end_styled: usize,
    views: HashMap<ViewId, ViewSlot>,
    next_view: u64,
    listeners: Vec<(ListenerId, DocumentListener)>,
    next_listener: usize,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("length", &self.length())
            .field("lines", &self.line_count())
            .field("line_ending", &self.line_ending)
            .field("views", &self.views.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(&DocumentOptions::default())
    }
}

impl Document {
    /// Create an empty document.
    pub fn new(options: &DocumentOptions) -> Self {
        Self {
            cb: CellBuffer::new(options),
            contraction: ContractionState::new(),
            fold_levels: vec![FoldLevel::BASE],
            line_ending: options.line_ending,
            styling_position: 0,
            end_styled: 0,
            views: HashMap::new(),
            next_view: 0,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// A document holding `text` at its save point with an empty undo log.
    pub fn from_text(text: &str) -> Self {
        let mut doc = Self::default();
        // A fresh document is writable and every `&str` is valid UTF-8.
        if let Err(err) = doc.load_text(text) {
            tracing::error!(target: "scribe.document", error = %err, "loading text into a new document failed");
        }
        doc
    }

    /// Replace the content without recording undo actions.
    ///
    /// CRLF line endings are normalised to LF and remembered for [`text_for_save`](Self::text_for_save).
    /// The undo log is emptied and the result is the save point.
    pub fn load_text(&mut self, text: &str) -> CoreResult<()> {
        self.line_ending = LineEnding::detect_in_text(text);
        let text = normalize_to_lf(text);
        self.cb.reset_text(&text)?;
        let lines = self.cb.line_count();
        self.contraction.clear();
        self.contraction.insert_lines(1, lines - 1)?;
        self.fold_levels = vec![FoldLevel::BASE; lines];
        self.styling_position = 0;
        self.end_styled = 0;
        self.cb.undo_history_mut().delete_undo_history();
        self.cb.set_save_point();
        let length = self.length();
        for slot in self.views.values_mut() {
            if let Some(selection) = slot.selection.upgrade() {
                selection.borrow_mut().clamp_to(length);
            }
            if let Some(state) = slot.model_state.as_mut() {
                state.clear();
            }
        }
        tracing::debug!(target: "scribe.document", length = self.length(), lines, "loaded text");
        Ok(())
    }

    // Listeners.

    /// Register a listener for every [`DocumentEvent`].
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&DocumentEvent) + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, event: &DocumentEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    fn notify_modified(&mut self, modification: DocModification) {
        if modification.flags.changes_text() {
            self.move_view_selections(&modification);
        }
        self.notify(&DocumentEvent::Modified(modification));
    }

    fn move_view_selections(&mut self, modification: &DocModification) {
        let delta = if modification.flags.contains(ModificationFlags::INSERT_TEXT) {
            modification.length as isize
        } else if modification.flags.contains(ModificationFlags::DELETE_TEXT) {
            -(modification.length as isize)
        } else {
            return;
        };
        let before = self.views.len();
        self.views.retain(|_, slot| match slot.selection.upgrade() {
            Some(selection) => {
                selection.borrow_mut().move_ranges(delta, modification.position);
                true
            }
            None => false,
        });
        if self.views.len() != before {
            tracing::debug!(
                target: "scribe.document",
                dropped = before - self.views.len(),
                views = self.views.len(),
                "dropped slots of views that were not detached"
            );
        }
    }

    fn notify_save_point(&mut self, was_save_point: bool) {
        let now = self.cb.is_save_point();
        if now != was_save_point {
            let event = if now {
                DocumentEvent::SavePointReached
            } else {
                DocumentEvent::SavePointLeft
            };
            self.notify(&event);
        }
    }

    // Views.

    /// Register a view whose `selection` follows every text modification, and return its
    /// identity. The document holds the selection weakly; once the view lets it go the slot is
    /// dropped on the next modification.
    pub fn attach_view(&mut self, selection: &Rc<RefCell<Selection>>) -> ViewId {
        let id = ViewId(self.next_view);
        self.next_view += 1;
        self.views.insert(
            id,
            ViewSlot {
                model_state: None,
                selection: Rc::downgrade(selection),
            },
        );
        tracing::debug!(target: "scribe.document", view = id.0, views = self.views.len(), "view attached");
        id
    }

    /// Forget a view and all of its state.
    pub fn detach_view(&mut self, view: ViewId) -> bool {
        let removed = self.views.remove(&view).is_some();
        if removed {
            tracing::debug!(target: "scribe.document", view = view.0, views = self.views.len(), "view detached");
        }
        removed
    }

    /// Number of attached views that are still alive.
    pub fn view_count(&self) -> usize {
        self.views.values().filter(|slot| slot.is_live()).count()
    }

    /// Store the selection history of `view`.
    pub fn set_view_state(&mut self, view: ViewId, state: ModelState) {
        if let Some(slot) = self.views.get_mut(&view) {
            slot.model_state = Some(state);
        }
    }

    /// The selection history of `view`, if it keeps one.
    pub fn view_state(&self, view: ViewId) -> Option<&ModelState> {
        self.views.get(&view).and_then(|slot| slot.model_state.as_ref())
    }

    /// Mutable access to the selection history of `view`.
    pub fn view_state_mut(&mut self, view: ViewId) -> Option<&mut ModelState> {
        self.views.get_mut(&view).and_then(|slot| slot.model_state.as_mut())
    }

    /// Drop the selection history of `view`.
    pub fn erase_view_state(&mut self, view: ViewId) {
        if let Some(slot) = self.views.get_mut(&view) {
            slot.model_state = None;
        }
    }

    fn retire_snapshots(&mut self, outcome: AppendOutcome) {
        if outcome.truncated_from.is_none() && outcome.evicted_below.is_none() {
            return;
        }
        for state in self.views.values_mut().filter_map(|slot| slot.model_state.as_mut()) {
            if let Some(index) = outcome.truncated_from {
                state.truncate_undo(index + 1);
            }
            if let Some(first) = outcome.evicted_below {
                state.retire_below(first);
            }
        }
    }

    // Text queries.

    /// Length in bytes.
    pub fn length(&self) -> usize {
        self.cb.length()
    }

    /// `true` for an empty document.
    pub fn is_empty(&self) -> bool {
        self.cb.is_empty()
    }

    /// The whole text.
    pub fn text(&self) -> String {
        self.cb.text()
    }

    /// The text of `start..end`.
    pub fn text_range(&self, start: usize, end: usize) -> CoreResult<String> {
        self.cb.text_range(start, end)
    }

    /// Number of lines; always one more than the number of `'\n'`.
    pub fn line_count(&self) -> usize {
        self.cb.line_count()
    }

    /// Text of `line` without its line end.
    pub fn get_line(&self, line: usize) -> CoreResult<String> {
        self.cb.line(line)
    }

    /// Position of the first byte of `line`.
    pub fn line_start(&self, line: usize) -> CoreResult<usize> {
        self.cb.line_start(line)
    }

    /// Position of the line end of `line`, before its `'\n'`.
    pub fn line_end(&self, line: usize) -> CoreResult<usize> {
        self.cb.line_end(line)
    }

    /// Line containing `position`.
    pub fn line_from_position(&self, position: usize) -> usize {
        self.cb.line_from_position(position)
    }

    /// `true` if `position` does not split a character.
    pub fn is_char_boundary(&self, position: usize) -> bool {
        self.cb.is_char_boundary(position)
    }

    /// The underlying buffer.
    pub fn cell_buffer(&self) -> &CellBuffer {
        &self.cb
    }

    /// Line ending used by [`text_for_save`](Self::text_for_save).
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Change the line ending used on save.
    pub fn set_line_ending(&mut self, line_ending: LineEnding) {
        self.line_ending = line_ending;
    }

    /// The text with the document's line ending applied.
    pub fn text_for_save(&self) -> String {
        self.line_ending.apply_to_text(&self.text())
    }

    /// Next match of `query` starting at or after `from`.
    pub fn find_text(&self, query: &str, from: usize, options: SearchOptions) -> CoreResult<Option<Range>> {
        Ok(search::find_next(&self.text(), query, options, from)?)
    }

    /// Last match of `query` ending at or before `before`.
    pub fn find_text_backward(&self, query: &str, before: usize, options: SearchOptions) -> CoreResult<Option<Range>> {
        Ok(search::find_prev(&self.text(), query, options, before)?)
    }

    /// Every match of `query`.
    pub fn find_all(&self, query: &str, options: SearchOptions) -> CoreResult<Vec<Range>> {
        Ok(search::find_all(&self.text(), query, options)?)
    }

    // Editing.

    /// `true` when edits are rejected.
    pub fn is_read_only(&self) -> bool {
        self.cb.is_read_only()
    }

    /// Reject or accept edits.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.cb.set_read_only(read_only);
    }

    fn check_writable(&mut self) -> CoreResult<()> {
        if self.cb.is_read_only() {
            tracing::warn!(target: "scribe.document", "edit rejected: document is read-only");
            self.notify(&DocumentEvent::ModifyAttemptReadOnly);
            return Err(CoreError::ReadOnly);
        }
        Ok(())
    }

    fn starts_action(&self, change: &CellChange) -> bool {
        !change.undo.coalesced
            && self
                .cb
                .undo_history()
                .undo_current()
                .checked_sub(1)
                .and_then(|index| self.cb.undo_history().action(index))
                .is_some_and(|action| action.start_sequence)
    }

    /// Insert `text` at `position`. Returns the inserted length.
    pub fn insert_string(&mut self, position: usize, text: &str) -> CoreResult<usize> {
        Ok(self.insert_with(position, text, false)?.len())
    }

    /// Insert, letting single-character typing merge into the previous undo action.
    pub(crate) fn insert_with(&mut self, position: usize, text: &str, may_coalesce: bool) -> CoreResult<CellChange> {
        self.check_writable()?;
        self.cb.check_position(position)?;
        if text.is_empty() {
            return Ok(CellChange {
                position,
                text: String::new(),
                lines_added: 0,
                undo: AppendOutcome::default(),
            });
        }
        self.notify(&DocumentEvent::Modified(DocModification::with_text(
            ModificationFlags::BEFORE_INSERT | ModificationFlags::PERFORMED_USER,
            position,
            text,
            0,
        )));
        let was_save_point = self.cb.is_save_point();
        let line = self.cb.line_from_position(position);
        let change = self.cb.insert_string(position, text, may_coalesce)?;
        self.lines_changed(line, change.lines_added)?;
        self.retire_snapshots(change.undo);
        self.end_styled = self.end_styled.min(position);
        let mut flags = ModificationFlags::INSERT_TEXT | ModificationFlags::PERFORMED_USER;
        if self.starts_action(&change) {
            flags |= ModificationFlags::START_ACTION;
        }
        self.notify_modified(DocModification::with_text(flags, position, text, change.lines_added));
        self.notify_save_point(was_save_point);
        Ok(change)
    }

    /// Delete `length` bytes at `position`. Returns the removed text.
    pub fn delete_chars(&mut self, position: usize, length: usize) -> CoreResult<String> {
        Ok(self.delete_with(position, length)?.text)
    }

    pub(crate) fn delete_with(&mut self, position: usize, length: usize) -> CoreResult<CellChange> {
        self.check_writable()?;
        let end = position
            .checked_add(length)
            .ok_or_else(|| CoreError::range(position, usize::MAX, self.length()))?;
        let text = self.cb.text_range(position, end)?;
        if text.is_empty() {
            return Ok(CellChange {
                position,
                text,
                lines_added: 0,
                undo: AppendOutcome::default(),
            });
        }
        self.notify(&DocumentEvent::Modified(DocModification::with_text(
            ModificationFlags::BEFORE_DELETE | ModificationFlags::PERFORMED_USER,
            position,
            &text,
            0,
        )));
        let was_save_point = self.cb.is_save_point();
        let line = self.cb.line_from_position(position);
        let change = self.cb.delete_chars(position, length)?;
        self.lines_changed(line, change.lines_added)?;
        self.retire_snapshots(change.undo);
        self.end_styled = self.end_styled.min(position);
        let mut flags = ModificationFlags::DELETE_TEXT | ModificationFlags::PERFORMED_USER;
        if self.starts_action(&change) {
            flags |= ModificationFlags::START_ACTION;
        }
        self.notify_modified(DocModification::with_text(flags, position, &change.text, change.lines_added));
        self.notify_save_point(was_save_point);
        Ok(change)
    }

    /// Replace the whole text as one undo step.
    pub fn set_text(&mut self, text: &str) -> CoreResult<()> {
        self.check_writable()?;
        self.begin_undo_action();
        let result = self
            .delete_with(0, self.length())
            .and_then(|_| self.insert_with(0, &normalize_to_lf(text), false));
        self.end_undo_action();
        result.map(|_| ())
    }

    fn lines_changed(&mut self, line: usize, lines_added: isize) -> CoreResult<()> {
        let count = lines_added.unsigned_abs();
        if lines_added > 0 {
            self.contraction.insert_lines(line + 1, count)?;
            let inherited = FoldLevel(self.fold_level(line).number());
            let at = (line + 1).min(self.fold_levels.len());
            self.fold_levels
                .splice(at..at, std::iter::repeat_n(inherited, count));
        } else if lines_added < 0 {
            self.contraction.delete_lines(line + 1, count)?;
            let start = (line + 1).min(self.fold_levels.len());
            let end = (start + count).min(self.fold_levels.len());
            self.fold_levels.drain(start..end);
        }
        debug_assert_eq!(self.fold_levels.len(), self.cb.line_count());
        debug_assert_eq!(self.contraction.lines_in_doc(), self.cb.line_count());
        Ok(())
    }

    // Undo.

    /// Undo one step. Returns the position the caret should move to, or `None` when there was
    /// nothing to undo.
    pub fn undo(&mut self) -> CoreResult<Option<usize>> {
        self.check_writable()?;
        if !self.cb.undo_history().can_undo() {
            return Ok(None);
        }
        let was_save_point = self.cb.is_save_point();
        let steps = self.cb.start_undo();
        let mut new_position = None;
        let mut multi_line = false;
        for step in 0..steps {
            let Some(action) = self.cb.undo_history().undo_step().cloned() else {
                break;
            };
            let before = match action.kind {
                ActionType::Insert => ModificationFlags::BEFORE_DELETE,
                ActionType::Delete => ModificationFlags::BEFORE_INSERT,
            };
            self.notify(&DocumentEvent::Modified(DocModification::with_text(
                before | ModificationFlags::PERFORMED_UNDO,
                action.position,
                &action.text,
                0,
            )));
            let line = self.cb.line_from_position(action.position);
            self.cb.perform_undo_step()?;
            let newlines = action.text.matches('\n').count() as isize;
            let (mut flags, lines_added, position) = match action.kind {
                ActionType::Insert => (ModificationFlags::DELETE_TEXT, -newlines, action.position),
                ActionType::Delete => (ModificationFlags::INSERT_TEXT, newlines, action.position + action.len()),
            };
            self.lines_changed(line, lines_added)?;
            self.end_styled = self.end_styled.min(action.position);
            new_position = Some(position);
            multi_line |= lines_added != 0;
            flags |= ModificationFlags::PERFORMED_UNDO;
            if steps > 1 {
                flags |= ModificationFlags::MULTI_STEP_UNDO_REDO;
            }
            if step + 1 == steps {
                flags |= ModificationFlags::LAST_STEP_IN_UNDO_REDO;
                if multi_line {
                    flags |= ModificationFlags::MULTILINE_UNDO_REDO;
                }
            }
            self.notify_modified(DocModification::with_text(flags, action.position, &action.text, lines_added));
        }
        tracing::trace!(target: "scribe.document", steps, current = self.cb.undo_history().undo_current(), "undo");
        self.notify_save_point(was_save_point);
        Ok(new_position)
    }

    /// Redo one step. Returns the position the caret should move to, or `None` when there was
    /// nothing to redo.
    pub fn redo(&mut self) -> CoreResult<Option<usize>> {
        self.check_writable()?;
        if !self.cb.undo_history().can_redo() {
            return Ok(None);
        }
        let was_save_point = self.cb.is_save_point();
        let steps = self.cb.start_redo();
        let mut new_position = None;
        let mut multi_line = false;
        for step in 0..steps {
            let Some(action) = self.cb.undo_history().redo_step().cloned() else {
                break;
            };
            let before = match action.kind {
                ActionType::Insert => ModificationFlags::BEFORE_INSERT,
                ActionType::Delete => ModificationFlags::BEFORE_DELETE,
            };
            self.notify(&DocumentEvent::Modified(DocModification::with_text(
                before | ModificationFlags::PERFORMED_REDO,
                action.position,
                &action.text,
                0,
            )));
            let line = self.cb.line_from_position(action.position);
            self.cb.perform_redo_step()?;
            let newlines = action.text.matches('\n').count() as isize;
            let (mut flags, lines_added, position) = match action.kind {
                ActionType::Insert => (ModificationFlags::INSERT_TEXT, newlines, action.position + action.len()),
                ActionType::Delete => (ModificationFlags::DELETE_TEXT, -newlines, action.position),
            };
            self.lines_changed(line, lines_added)?;
            self.end_styled = self.end_styled.min(action.position);
            new_position = Some(position);
            multi_line |= lines_added != 0;
            flags |= ModificationFlags::PERFORMED_REDO;
            if steps > 1 {
                flags |= ModificationFlags::MULTI_STEP_UNDO_REDO;
            }
            if step + 1 == steps {
                flags |= ModificationFlags::LAST_STEP_IN_UNDO_REDO;
                if multi_line {
                    flags |= ModificationFlags::MULTILINE_UNDO_REDO;
                }
            }
            self.notify_modified(DocModification::with_text(flags, action.position, &action.text, lines_added));
        }
        tracing::trace!(target: "scribe.document", steps, current = self.cb.undo_history().undo_current(), "redo");
        self.notify_save_point(was_save_point);
        Ok(new_position)
    }

    /// `true` if there is a step to undo.
    pub fn can_undo(&self) -> bool {
        self.cb.undo_history().can_undo()
    }

    /// `true` if there is a step to redo.
    pub fn can_redo(&self) -> bool {
        self.cb.undo_history().can_redo()
    }

    /// Absolute number of applied undo actions.
    pub fn undo_current(&self) -> usize {
        self.cb.undo_history().undo_current()
    }

    /// The undo log.
    pub fn undo_history(&self) -> &UndoHistory {
        self.cb.undo_history()
    }

    /// Open an undo group; groups nest.
    pub fn begin_undo_action(&mut self) {
        self.cb.undo_history_mut().begin_undo_action();
    }

    /// Close an undo group.
    pub fn end_undo_action(&mut self) {
        self.cb.undo_history_mut().end_undo_action();
    }

    /// Stop the next typed character from merging into the previous action.
    pub fn break_coalescing(&mut self) {
        self.cb.undo_history_mut().break_coalescing();
    }

    /// Suspend or resume undo logging.
    pub fn set_undo_collection(&mut self, collect: bool) {
        self.cb.set_undo_collection(collect);
    }

    /// `true` while edits are logged.
    pub fn is_collecting_undo(&self) -> bool {
        self.cb.is_collecting_undo()
    }

    /// Change the maximum number of retained undo actions.
    pub fn set_undo_limit(&mut self, limit: usize) {
        let evicted_below = self.cb.undo_history_mut().set_limit(limit);
        self.retire_snapshots(AppendOutcome {
            evicted_below,
            ..AppendOutcome::default()
        });
    }

    /// Forget the undo log and every view's selection history.
    pub fn delete_undo_history(&mut self) {
        self.cb.undo_history_mut().delete_undo_history();
        for state in self.views.values_mut().filter_map(|slot| slot.model_state.as_mut()) {
            state.clear();
        }
    }

    /// Mark the current state as saved.
    pub fn set_save_point(&mut self) {
        self.cb.set_save_point();
        self.notify(&DocumentEvent::SavePointReached);
    }

    /// `true` when the text matches the last save point.
    pub fn is_save_point(&self) -> bool {
        self.cb.is_save_point()
    }

    // Styling.

    /// Start a styling pass at `position`.
    pub fn start_styling(&mut self, position: usize) {
        self.styling_position = position.min(self.length());
    }

    /// Style the next `length` bytes of the styling pass with `style`.
    pub fn set_style_for(&mut self, length: usize, style: usize) -> CoreResult<bool> {
        let position = self.styling_position;
        let result = self.cb.set_style_for(position, length, style)?;
        self.styling_position += length;
        self.end_styled = self.styling_position;
        if result.changed {
            self.notify_modified(DocModification::new(
                ModificationFlags::CHANGE_STYLE | ModificationFlags::PERFORMED_USER,
                result.position,
                result.length,
            ));
        }
        Ok(result.changed)
    }

    /// Style consecutive bytes of the styling pass, one style per byte.
    pub fn set_styles(&mut self, styles: &[usize]) -> CoreResult<bool> {
        let start = self.styling_position;
        let end = start + styles.len();
        if end > self.length() {
            return Err(CoreError::range(start, end, self.length()));
        }
        let mut changed: Option<(usize, usize)> = None;
        for (offset, style) in styles.iter().enumerate() {
            let position = start + offset;
            if self.cb.set_style_at(position, *style)? {
                let first = changed.map_or(position, |(first, _)| first);
                changed = Some((first, position + 1));
            }
        }
        self.styling_position = end;
        self.end_styled = end;
        if let Some((first, last)) = changed {
            self.notify_modified(DocModification::new(
                ModificationFlags::CHANGE_STYLE | ModificationFlags::PERFORMED_USER,
                first,
                last - first,
            ));
        }
        Ok(changed.is_some())
    }

    /// Style `position..position + length` without moving the styling pass.
    pub fn fill_styles(&mut self, position: usize, length: usize, style: usize) -> CoreResult<bool> {
        let result = self.cb.set_style_for(position, length, style)?;
        if result.changed {
            self.notify_modified(DocModification::new(
                ModificationFlags::CHANGE_STYLE | ModificationFlags::PERFORMED_USER,
                result.position,
                result.length,
            ));
        }
        Ok(result.changed)
    }

    /// Style at `position`.
    pub fn style_at(&self, position: usize) -> usize {
        self.cb.style_at(position)
    }

    /// Position up to which styles are known to be current.
    pub fn end_styled(&self) -> usize {
        self.end_styled
    }

    // Indicators.

    /// The indicator layers.
    pub fn decorations(&self) -> &DecorationList {
        self.cb.indicators()
    }

    /// Select the indicator that fills apply to.
    pub fn set_indicator_current(&mut self, indicator: usize) {
        self.cb.indicators_mut().set_current_indicator(indicator);
    }

    /// The indicator that fills apply to.
    pub fn indicator_current(&self) -> usize {
        self.cb.indicators().current_indicator()
    }

    /// Value written by [`indicator_fill_range`](Self::indicator_fill_range).
    pub fn set_indicator_value(&mut self, value: u32) {
        self.cb.indicators_mut().set_current_value(value);
    }

    /// Fill the current indicator with the current value.
    pub fn indicator_fill_range(&mut self, position: usize, length: usize) -> CoreResult<bool> {
        let indicator = self.indicator_current();
        let value = self.cb.indicators().current_value();
        self.fill_indicator(indicator, position, value, length)
    }

    /// Clear the current indicator over a range.
    pub fn indicator_clear_range(&mut self, position: usize, length: usize) -> CoreResult<bool> {
        let indicator = self.indicator_current();
        self.fill_indicator(indicator, position, 0, length)
    }

    pub(crate) fn fill_indicator(&mut self, indicator: usize, position: usize, value: u32, length: usize) -> CoreResult<bool> {
        let decorations = self.cb.indicators_mut();
        let previous = decorations.current_indicator();
        decorations.set_current_indicator(indicator);
        let result = decorations.fill_range(position, value, length);
        decorations.set_current_indicator(previous);
        let result = result?;
        if result.changed {
            self.notify_modified(DocModification::new(
                ModificationFlags::CHANGE_INDICATOR | ModificationFlags::PERFORMED_USER,
                result.position,
                result.length,
            ));
        }
        Ok(result.changed)
    }

    /// Value of `indicator` at `position`.
    pub fn indicator_value_at(&self, indicator: usize, position: usize) -> u32 {
        self.cb.indicators().value_at(indicator, position)
    }

    /// Bitmask of indicators set at `position`.
    pub fn indicators_on_for(&self, position: usize) -> u64 {
        self.cb.indicators().all_on_for(position)
    }

    // Folding.

    /// Fold level of `line`; lines past the end report the base level.
    pub fn fold_level(&self, line: usize) -> FoldLevel {
        self.fold_levels.get(line).copied().unwrap_or_default()
    }

    /// Set the fold level of `line` and return the previous one.
    pub fn set_fold_level(&mut self, line: usize, level: FoldLevel) -> CoreResult<FoldLevel> {
        let line_count = self.line_count();
        let slot = self
            .fold_levels
            .get_mut(line)
            .ok_or(CoreError::LineOutOfBounds { line, line_count })?;
        let previous = std::mem::replace(slot, level);
        if previous != level {
            self.notify_modified(DocModification::fold(line, level.0, previous.0));
        }
        Ok(previous)
    }

    /// Last line belonging to the fold that starts at `line_parent`.
    ///
    /// `level` overrides the parent's level number; the scan stops after `last_line` once it
    /// has left trailing blank lines behind.
    pub fn get_last_child(&self, line_parent: usize, level: Option<u32>, last_line: Option<usize>) -> usize {
        let level = level.unwrap_or_else(|| self.fold_level(line_parent).number());
        let max_line = self.line_count();
        let look_last_line = last_line.map(|last| last.min(max_line - 1));
        let mut line_max_subord = line_parent;
        while line_max_subord + 1 < max_line {
            if !FoldLevel::is_subordinate(level, self.fold_level(line_max_subord + 1)) {
                break;
            }
            if look_last_line.is_some_and(|last| line_max_subord >= last)
                && !self.fold_level(line_max_subord).is_whitespace()
            {
                break;
            }
            line_max_subord += 1;
        }
        if line_max_subord > line_parent
            && level > self.fold_level(line_max_subord + 1).number()
            && self.fold_level(line_max_subord).is_whitespace()
        {
            // Trailing blank lines belong to the parent's parent.
            line_max_subord -= 1;
        }
        line_max_subord
    }

    /// The header line of the fold containing `line`.
    pub fn get_fold_parent(&self, line: usize) -> Option<usize> {
        let level = self.fold_level(line).number();
        let mut look = line.checked_sub(1)?;
        while look > 0 {
            let candidate = self.fold_level(look);
            if candidate.is_header() && candidate.number() < level {
                break;
            }
            look -= 1;
        }
        let candidate = self.fold_level(look);
        (candidate.is_header() && candidate.number() < level).then_some(look)
    }

    /// Fold and visibility state of the lines.
    pub fn contraction(&self) -> &ContractionState {
        &self.contraction
    }

    /// Mutable fold and visibility state.
    pub fn contraction_mut(&mut self) -> &mut ContractionState {
        &mut self.contraction
    }

    // Processing.

    /// Apply edits produced by a [`DocumentProcessor`].
    pub fn apply_processing_edits<I>(&mut self, edits: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = ProcessingEdit>,
    {
        for edit in edits {
            match edit {
                ProcessingEdit::FillStyle { start, length, style } => {
                    self.fill_styles(start, length, style)?;
                    self.end_styled = self.end_styled.max(start + length);
                }
                ProcessingEdit::SetIndicator {
                    indicator,
                    start,
                    length,
                    value,
                } => {
                    self.fill_indicator(indicator, start, value, length)?;
                }
                ProcessingEdit::ClearIndicator { indicator } => {
                    if self.cb.indicators_mut().clear_indicator(indicator) {
                        let length = self.length();
                        self.notify_modified(DocModification::new(
                            ModificationFlags::CHANGE_INDICATOR | ModificationFlags::PERFORMED_USER,
                            0,
                            length,
                        ));
                    }
                }
                ProcessingEdit::SetFoldLevel { line, level } => {
                    self.set_fold_level(line, level)?;
                }
            }
        }
        Ok(())
    }

    /// Run a [`DocumentProcessor`] and apply its edits.
    pub fn apply_processor<P>(&mut self, processor: &mut P) -> Result<(), P::Error>
    where
        P: DocumentProcessor,
        P::Error: From<CoreError>,
    {
        let edits = processor.process(self)?;
        self.apply_processing_edits(edits)?;
        Ok(())
    }
}

/// A shared, reference-counted [`Document`].
///
/// Cloning (or [`add_ref`](Self::add_ref)) adds a reference; dropping a handle releases it.
/// The document is destroyed with its last handle. Handles are confined to one thread.
#[derive(Debug, Clone)]
pub struct DocumentHandle(Rc<RefCell<Document>>);

impl DocumentHandle {
    /// Wrap a document in its first handle.
    pub fn new(document: Document) -> Self {
        Self(Rc::new(RefCell::new(document)))
    }

    /// Another handle to the same document.
    pub fn add_ref(&self) -> Self {
        self.clone()
    }

    /// Number of live handles.
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// `true` if both handles refer to the same document.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Borrow the document.
    ///
    /// # Panics
    ///
    /// Panics if the document is mutably borrowed, e.g. from inside a listener.
    pub fn borrow(&self) -> Ref<'_, Document> {
        self.0.borrow()
    }

    /// Borrow the document mutably.
    ///
    /// # Panics
    ///
    /// Panics if the document is already borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, Document> {
        self.0.borrow_mut()
    }

    /// Borrow the document mutably unless it is already borrowed.
    pub fn try_borrow_mut(&self) -> Option<RefMut<'_, Document>> {
        self.0.try_borrow_mut().ok()
    }
}

impl Default for DocumentHandle {
    fn default() -> Self {
        Self::new(Document::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn recorder(doc: &mut Document) -> Rc<RefCell<Vec<DocumentEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        doc.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        events
    }

    #[test]
    fn test_lines_track_edits() {
        let mut doc = Document::default();
        doc.insert_string(0, "line1\nline2").unwrap();
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.get_line(0).unwrap(), "line1");
        assert_eq!(doc.get_line(1).unwrap(), "line2");
        doc.insert_string(5, "\nmid").unwrap();
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.contraction().lines_in_doc(), 3);
        assert_eq!(doc.delete_chars(5, 4).unwrap(), "\nmid");
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.contraction().lines_in_doc(), 2);
    }

    #[test]
    fn test_undo_redo_flags_and_position() {
        let mut doc = Document::default();
        doc.begin_undo_action();
        doc.insert_string(0, "ab").unwrap();
        doc.insert_string(2, "\ncd").unwrap();
        doc.end_undo_action();
        let events = recorder(&mut doc);
        assert_eq!(doc.undo().unwrap(), Some(0));
        assert_eq!(doc.text(), "");
        let flags: Vec<_> = events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                DocumentEvent::Modified(m) if m.flags.changes_text() => Some(m.flags),
                _ => None,
            })
            .collect();
        assert_eq!(flags.len(), 2);
        assert!(flags[0].contains(ModificationFlags::MULTI_STEP_UNDO_REDO));
        assert!(!flags[0].contains(ModificationFlags::LAST_STEP_IN_UNDO_REDO));
        assert!(flags[1].contains(ModificationFlags::LAST_STEP_IN_UNDO_REDO | ModificationFlags::MULTILINE_UNDO_REDO));
        assert!(events.borrow().contains(&DocumentEvent::SavePointReached));
        assert_eq!(doc.undo().unwrap(), None);
        assert_eq!(doc.redo().unwrap(), Some(5));
        assert_eq!(doc.text(), "ab\ncd");
        assert_eq!(doc.line_count(), 2);
    }

    #[test]
    fn test_read_only_rejects_edits() {
        let mut doc = Document::from_text("x");
        let events = recorder(&mut doc);
        doc.set_read_only(true);
        assert!(matches!(doc.insert_string(0, "y"), Err(CoreError::ReadOnly)));
        assert!(matches!(doc.delete_chars(0, 1), Err(CoreError::ReadOnly)));
        assert_eq!(events.borrow().len(), 2);
        assert!(events.borrow().iter().all(|e| *e == DocumentEvent::ModifyAttemptReadOnly));
        assert_eq!(doc.text(), "x");
    }

    #[test]
    fn test_load_normalises_crlf() {
        let mut doc = Document::default();
        doc.load_text("a\r\nb\r\n").unwrap();
        assert_eq!(doc.text(), "a\nb\n");
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.line_ending(), LineEnding::Crlf);
        assert_eq!(doc.text_for_save(), "a\r\nb\r\n");
        assert!(doc.is_save_point());
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_fold_levels_follow_lines() {
        let mut doc = Document::from_text("a\nb\nc");
        doc.set_fold_level(0, FoldLevel::BASE | FoldLevel::HEADER_FLAG).unwrap();
        doc.set_fold_level(1, FoldLevel(FoldLevel::BASE.0 + 1)).unwrap();
        doc.set_fold_level(2, FoldLevel(FoldLevel::BASE.0 + 1)).unwrap();
        assert_eq!(doc.get_last_child(0, None, None), 2);
        doc.insert_string(3, "\nb2").unwrap();
        assert_eq!(doc.line_count(), 4);
        assert_eq!(doc.fold_level(2).number(), FoldLevel::BASE.0 + 1);
        assert_eq!(doc.get_fold_parent(2), Some(0));
        assert_eq!(doc.get_fold_parent(0), None);
        doc.delete_chars(1, 2).unwrap();
        assert_eq!(doc.line_count(), 3);
        assert!(doc.fold_level(0).is_header());
    }

    #[test]
    fn test_styling_pass() {
        let mut doc = Document::from_text("0123456789");
        doc.start_styling(0);
        assert!(doc.set_style_for(5, 1).unwrap());
        assert!(doc.set_styles(&[2, 2]).unwrap());
        assert_eq!(doc.end_styled(), 7);
        assert_eq!(
            doc.cell_buffer().style_runs(),
            vec![(5, 1), (2, 2), (3, 0)]
        );
        doc.insert_string(6, "x").unwrap();
        assert_eq!(doc.end_styled(), 6);
        assert_eq!(doc.style_at(6), 2);
    }

    #[test]
    fn test_indicators_shift_with_text() {
        let mut doc = Document::from_text("hello world");
        doc.set_indicator_current(3);
        doc.set_indicator_value(7);
        assert!(doc.indicator_fill_range(6, 5).unwrap());
        doc.insert_string(0, ">> ").unwrap();
        assert_eq!(doc.indicator_value_at(3, 9), 7);
        assert_eq!(doc.indicator_value_at(3, 8), 0);
        assert_eq!(doc.indicators_on_for(10), 1 << 3);
        assert!(doc.indicator_clear_range(9, 5).unwrap());
        assert_eq!(doc.decorations().indicators().count(), 0);
    }

    #[test]
    fn test_view_selections_follow_edits_and_lose_stale_snapshots() {
        let mut doc = Document::default();
        let sel_a = Rc::new(RefCell::new(Selection::new()));
        let sel_b = Rc::new(RefCell::new(Selection::new()));
        let a = doc.attach_view(&sel_a);
        let b = doc.attach_view(&sel_b);
        let mut state = ModelState::new();
        let sel = Selection::new();
        state.remember_selection_for_undo(0, &sel);
        state.remember_selection_onto_stack(1, 0);
        state.remember_selection_for_redo_onto_stack(1, &sel, 0);
        doc.set_view_state(b, state);

        doc.insert_string(0, "one").unwrap();
        assert_eq!(sel_a.borrow().main_caret(), 3);
        assert_eq!(sel_b.borrow().main_caret(), 3);
        doc.undo().unwrap();
        assert_eq!(sel_b.borrow().main_caret(), 0);
        doc.insert_string(0, "two").unwrap();
        assert!(doc.view_state(b).unwrap().is_empty());
        doc.erase_view_state(b);
        assert!(doc.view_state(b).is_none());
        assert!(doc.detach_view(a));
        assert_eq!(doc.view_count(), 1);
    }

    #[test]
    fn test_slot_of_dropped_view_is_pruned_on_next_edit() {
        let mut doc = Document::from_text("text");
        let kept = Rc::new(RefCell::new(Selection::new()));
        doc.attach_view(&kept);
        let gone = Rc::new(RefCell::new(Selection::new()));
        let view = doc.attach_view(&gone);
        drop(gone);
        assert_eq!(doc.view_count(), 1);
        assert!(doc.views.contains_key(&view));

        doc.insert_string(4, "!").unwrap();
        assert!(!doc.views.contains_key(&view));
        assert_eq!(kept.borrow().main_caret(), 0);
    }

    #[test]
    fn test_rejected_insert_sends_no_events() {
        let mut doc = Document::from_text("größe");
        let events = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&events);
        doc.subscribe(move |_| *seen.borrow_mut() += 1);

        assert!(matches!(
            doc.insert_string(3, "x"),
            Err(CoreError::NotCharBoundary { position: 3 })
        ));
        assert!(doc.delete_chars(2, 1).is_err());
        assert_eq!(*events.borrow(), 0);
        assert_eq!(doc.text(), "größe");
    }

    #[test]
    fn test_set_text_is_one_step() {
        let mut doc = Document::from_text("old");
        doc.set_text("new\r\ntext").unwrap();
        assert_eq!(doc.text(), "new\ntext");
        doc.undo().unwrap();
        assert_eq!(doc.text(), "old");
        assert!(doc.is_save_point());
    }

    #[test]
    fn test_handle_reference_counting() {
        let handle = DocumentHandle::default();
        let second = handle.add_ref();
        assert_eq!(handle.ref_count(), 2);
        assert!(handle.ptr_eq(&second));
        second.borrow_mut().insert_string(0, "shared").unwrap();
        drop(second);
        assert_eq!(handle.ref_count(), 1);
        assert_eq!(handle.borrow().text(), "shared");
    }
}
