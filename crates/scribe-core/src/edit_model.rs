//! Per-view editing state.
//!
//! An [`EditModel`] is one view onto a shared [`Document`]: it owns the [`Selection`], the
//! caret blink state, any inline IME composition and the view flags the renderer reads. All
//! edits go through the model so that the selection snapshots kept in the document's view
//! state stay in step with the undo log:
//!
//! 1. before an edit the current selection is captured at the current undo index;
//! 2. if the edit created a new action the capture is pushed onto the undo stack;
//! 3. the selection after the edit is pushed onto the redo stack;
//! 4. caret movement without an edit drops the capture and breaks typing coalescing.
//!
//! The selection is shared with the document, which moves it as each modification lands,
//! whichever view made it. [`EditModel::update_from_document`] then merges ranges that an edit
//! made touch.

use crate::config::ViewOptions;
use crate::decoration::{INDICATOR_IME_CONVERTED, INDICATOR_IME_INPUT, INDICATOR_IME_TARGET};
use crate::document::{Document, DocumentHandle, ViewId};
use crate::error::{CoreError, CoreResult};
use crate::key_map::EditorCommand;
use crate::model_state::{ModelState, UndoRedo, UndoSelectionHistory};
use crate::platform::{Clipboard, ContextMenu, ListPopup, MenuCommand};
use crate::search::is_word_char;
use crate::selection::{InSelection, Range, Selection, SelectionRange, SelectionType};
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// How fold display text is drawn after contracted lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldDisplayTextStyle {
    /// Not drawn.
    #[default]
    Hidden,
    /// Drawn as plain text.
    Standard,
    /// Drawn inside a box.
    Boxed,
}

/// Bidirectional text handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bidirectional {
    /// Text is laid out left to right only.
    #[default]
    Disabled,
    /// Bidirectional layout with a left-to-right base direction.
    L2R,
    /// Bidirectional layout with a right-to-left base direction.
    R2L,
}

/// What [`EditModel::fold_line`] does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldAction {
    /// Hide the children of a header.
    Contract,
    /// Show the children of a header.
    Expand,
    /// Contract an expanded header, expand a contracted one.
    Toggle,
}

/// Kind of an IME composition segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImeSegment {
    /// Text still being typed.
    Input,
    /// The clause being converted.
    Target,
    /// Converted text.
    Converted,
}

impl ImeSegment {
    fn indicator(self) -> usize {
        match self {
            Self::Input => INDICATOR_IME_INPUT,
            Self::Target => INDICATOR_IME_TARGET,
            Self::Converted => INDICATOR_IME_CONVERTED,
        }
    }
}

/// Caret blink state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    /// The view has focus and shows a caret.
    pub active: bool,
    /// The caret is in the visible half of its blink cycle.
    pub on: bool,
    /// Blink period in milliseconds; `0` disables blinking.
    pub period: u64,
}

impl Default for Caret {
    fn default() -> Self {
        Self {
            active: false,
            on: false,
            period: 500,
        }
    }
}

impl Caret {
    /// Focus or unfocus the caret.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.on = active;
    }

    /// Advance the blink timer by one period. Returns `true` if the caret needs redrawing.
    pub fn tick(&mut self) -> bool {
        if !self.active || self.period == 0 {
            return false;
        }
        self.on = !self.on;
        true
    }

    /// Show the caret at once, as after it moved.
    pub fn reset(&mut self) {
        self.on = self.active;
    }

    /// `true` if the caret should be drawn now.
    pub fn is_visible(&self) -> bool {
        self.active && self.on
    }
}

#[derive(Debug, Clone)]
struct Composition {
    start: usize,
    length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    NewLine,
    Word,
    Punctuation,
}

fn classify(ch: char) -> CharClass {
    if ch == '\n' {
        CharClass::NewLine
    } else if ch.is_whitespace() {
        CharClass::Space
    } else if is_word_char(ch) {
        CharClass::Word
    } else {
        CharClass::Punctuation
    }
}

fn advance_column(column: usize, grapheme: &str, tab_width: usize) -> usize {
    if grapheme == "\t" {
        let tab_width = tab_width.max(1);
        (column / tab_width + 1) * tab_width
    } else {
        column + grapheme.width()
    }
}

fn visual_width(text: &str, tab_width: usize) -> usize {
    text.graphemes(true)
        .fold(0, |column, grapheme| advance_column(column, grapheme, tab_width))
}

fn check_position(doc: &Document, position: usize) -> CoreResult<()> {
    if position > doc.length() {
        return Err(CoreError::OutOfBounds {
            position,
            length: doc.length(),
        });
    }
    if !doc.is_char_boundary(position) {
        return Err(CoreError::NotCharBoundary { position });
    }
    Ok(())
}

fn column_in(doc: &Document, position: usize, tab_width: usize) -> CoreResult<usize> {
    check_position(doc, position)?;
    let start = doc.line_start(doc.line_from_position(position))?;
    Ok(visual_width(&doc.text_range(start, position)?, tab_width))
}

fn position_at_column(doc: &Document, line: usize, column: usize, tab_width: usize) -> CoreResult<usize> {
    let start = doc.line_start(line)?;
    let text = doc.get_line(line)?;
    let mut current = 0;
    for (offset, grapheme) in text.grapheme_indices(true) {
        let next = advance_column(current, grapheme, tab_width);
        if next > column {
            return Ok(start + offset);
        }
        current = next;
    }
    Ok(start + text.len())
}

fn next_position(doc: &Document, position: usize) -> CoreResult<usize> {
    let length = doc.length();
    if position >= length {
        return Ok(length);
    }
    let line = doc.line_from_position(position);
    let end = doc.line_end(line)?;
    if position >= end {
        return Ok(position + 1);
    }
    let rest = doc.text_range(position, end)?;
    Ok(rest.graphemes(true).next().map_or(end, |g| position + g.len()))
}

fn previous_position(doc: &Document, position: usize) -> CoreResult<usize> {
    if position == 0 {
        return Ok(0);
    }
    let start = doc.line_start(doc.line_from_position(position))?;
    if position <= start {
        return Ok(position - 1);
    }
    let before = doc.text_range(start, position)?;
    Ok(before.graphemes(true).next_back().map_or(start, |g| position - g.len()))
}

fn next_word_start(text: &str, position: usize) -> usize {
    let rest = &text[position..];
    let Some(first) = rest.chars().next() else {
        return position;
    };
    let start_class = classify(first);
    let mut in_start_run = start_class != CharClass::Space;
    for (offset, ch) in rest.char_indices() {
        let class = classify(ch);
        if in_start_run {
            if class == start_class {
                continue;
            }
            in_start_run = false;
        }
        if class != CharClass::Space {
            return position + offset;
        }
    }
    text.len()
}

fn previous_word_start(text: &str, position: usize) -> usize {
    let mut chars = text[..position].char_indices().rev().peekable();
    while chars.next_if(|&(_, ch)| classify(ch) == CharClass::Space).is_some() {}
    let Some(&(_, ch)) = chars.peek() else {
        return 0;
    };
    let class = classify(ch);
    let mut start = position;
    for (offset, ch) in chars {
        if classify(ch) != class {
            break;
        }
        start = offset;
    }
    start
}

fn expand_children(doc: &mut Document, line: usize) -> CoreResult<()> {
    let last_child = doc.get_last_child(line, None, None);
    let mut line = line + 1;
    while line <= last_child {
        doc.contraction_mut().set_visible(line, line, true)?;
        if doc.fold_level(line).is_header() {
            if doc.contraction().expanded(line) {
                expand_children(doc, line)?;
            } else {
                line = doc.get_last_child(line, None, None);
            }
        }
        line += 1;
    }
    Ok(())
}

/// One view's editing state over a shared document.
#[derive(Debug)]
pub struct EditModel {
    doc: DocumentHandle,
    view: ViewId,
    sel: Rc<RefCell<Selection>>,
    caret: Caret,
    in_overstrike: bool,
    undo_selection_history: UndoSelectionHistory,
    top_line: usize,
    tab_width: usize,
    fold_display_text_style: FoldDisplayTextStyle,
    default_fold_display_text: Option<String>,
    bidirectional: Bidirectional,
    hotspot: Option<Range>,
    hotspot_single_line: bool,
    hover_indicator_pos: Option<usize>,
    composition: Option<Composition>,
}

impl EditModel {
    /// Attach a new view to `doc`.
    pub fn new(doc: DocumentHandle, options: &ViewOptions) -> Self {
        let sel = Rc::new(RefCell::new(Selection::new()));
        let view = doc.borrow_mut().attach_view(&sel);
        let model = Self {
            doc,
            view,
            sel,
            caret: Caret {
                period: options.caret_period_ms,
                ..Caret::default()
            },
            in_overstrike: false,
            undo_selection_history: options.undo_selection_history,
            top_line: 0,
            tab_width: options.tab_width.max(1),
            fold_display_text_style: options.fold_display_text_style,
            default_fold_display_text: options.default_fold_display_text.clone().filter(|t| !t.is_empty()),
            bidirectional: options.bidirectional,
            hotspot: None,
            hotspot_single_line: true,
            hover_indicator_pos: None,
            composition: None,
        };
        model.ensure_model_state();
        tracing::debug!(target: "scribe.edit_model", view = ?view, "edit model created");
        model
    }

    /// The shared document.
    pub fn document(&self) -> &DocumentHandle {
        &self.doc
    }

    /// This view's identity within the document.
    pub fn view_id(&self) -> ViewId {
        self.view
    }

    /// The current selection, already moved for every modification made so far.
    ///
    /// Release the guard before editing through this model or the document.
    pub fn selection(&self) -> Ref<'_, Selection> {
        self.sel.borrow()
    }

    /// Caret blink state.
    pub fn caret(&self) -> &Caret {
        &self.caret
    }

    /// Mutable caret blink state.
    pub fn caret_mut(&mut self) -> &mut Caret {
        &mut self.caret
    }

    /// First visible document line.
    pub fn top_line(&self) -> usize {
        self.top_line
    }

    /// Record the first visible document line, as reported by the renderer.
    pub fn set_top_line(&mut self, line: usize) {
        self.top_line = line;
    }

    /// Columns per tab stop.
    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Change the tab stop width; `0` is treated as `1`.
    pub fn set_tab_width(&mut self, tab_width: usize) {
        self.tab_width = tab_width.max(1);
    }

    // Selection snapshots.

    fn ensure_model_state(&self) {
        if self.undo_selection_history == UndoSelectionHistory::Disabled {
            return;
        }
        let mut doc = self.doc.borrow_mut();
        if doc.view_state(self.view).is_none() {
            doc.set_view_state(self.view, ModelState::new());
        }
    }

    /// Whether undo and redo restore this view's selection.
    pub fn undo_selection_history(&self) -> UndoSelectionHistory {
        self.undo_selection_history
    }

    /// Change whether undo and redo restore the selection. Disabling drops every snapshot.
    pub fn change_undo_selection_history(&mut self, option: UndoSelectionHistory) {
        self.undo_selection_history = option;
        if option == UndoSelectionHistory::Disabled {
            self.doc.borrow_mut().erase_view_state(self.view);
        } else {
            self.ensure_model_state();
        }
    }

    fn with_model_state(&self, f: impl FnOnce(&mut ModelState)) {
        if self.undo_selection_history == UndoSelectionHistory::Disabled {
            return;
        }
        if let Some(state) = self.doc.borrow_mut().view_state_mut(self.view) {
            f(state);
        }
    }

    fn restore_from_stack(&mut self, index: usize, history: UndoRedo) -> CoreResult<bool> {
        if self.undo_selection_history == UndoSelectionHistory::Disabled {
            return Ok(false);
        }
        let (snapshot, length) = {
            let doc = self.doc.borrow();
            let snapshot = doc
                .view_state(self.view)
                .and_then(|state| state.selection_from_stack(index, history))
                .cloned();
            (snapshot, doc.length())
        };
        let Some(snapshot) = snapshot else {
            return Ok(false);
        };
        let mut restored: Selection = snapshot.selection.parse()?;
        restored.clamp_to(length);
        tracing::trace!(target: "scribe.edit_model", index, selection = %snapshot.selection, "restored selection");
        if restored.is_rectangular() {
            let corners = restored.rectangular();
            self.set_rectangular_selection(corners.anchor.position(), corners.caret.position())?;
            self.sel.borrow_mut().set_selection_type(restored.selection_type());
        } else {
            *self.sel.borrow_mut() = restored;
        }
        if self.undo_selection_history == UndoSelectionHistory::Scroll {
            self.top_line = snapshot.top_line;
        }
        Ok(true)
    }

    /// After the text has been undone or redone, restore the snapshot at `index` or fall back to
    /// a caret at `position`. The text change stands either way.
    fn restore_or_place_caret(&mut self, index: usize, history: UndoRedo, position: usize) {
        let restored = self.restore_from_stack(index, history).unwrap_or_else(|err| {
            tracing::warn!(target: "scribe.edit_model", index, ?history, error = %err, "selection snapshot not restored");
            false
        });
        if !restored {
            self.sel.borrow_mut().set_caret(position);
        }
    }

    // Document synchronisation.

    /// Merge ranges that edits since the last operation made overlap or touch.
    pub fn update_from_document(&mut self) {
        self.sel.borrow_mut().merge_overlapping();
    }

    fn caret_moved(&mut self) {
        self.with_model_state(ModelState::forget_selection_for_undo);
        self.doc.borrow_mut().break_coalescing();
        self.caret.reset();
    }

    /// Run an edit with the selection-snapshot protocol around it.
    fn edit<R>(&mut self, f: impl FnOnce(&mut Self) -> CoreResult<R>) -> CoreResult<R> {
        self.update_from_document();
        let before = self.doc.borrow().undo_current();
        let sel = self.sel.borrow().clone();
        self.with_model_state(|state| state.remember_selection_for_undo(before, &sel));
        let result = f(self);
        self.update_from_document();
        let (after, collecting) = {
            let doc = self.doc.borrow();
            (doc.undo_current(), doc.is_collecting_undo())
        };
        if collecting {
            let top_line = self.top_line;
            let sel = self.sel.borrow().clone();
            self.with_model_state(|state| {
                if after > before {
                    state.remember_selection_onto_stack(before + 1, top_line);
                }
                state.remember_selection_for_redo_onto_stack(after, &sel, top_line);
            });
        }
        self.caret.reset();
        result
    }

    fn grouped<R>(&mut self, group: bool, f: impl FnOnce(&mut Self) -> CoreResult<R>) -> CoreResult<R> {
        if group {
            self.doc.borrow_mut().begin_undo_action();
        }
        let result = f(self);
        if group {
            self.doc.borrow_mut().end_undo_action();
        }
        result
    }

    fn delete_range_text(&mut self, index: usize) -> CoreResult<()> {
        let range = *self.sel.borrow().range(index)?;
        if !range.is_empty() {
            let start = range.start().position();
            self.doc.borrow_mut().delete_with(start, range.len())?;
        }
        Ok(())
    }

    fn insert_at_ranges(&mut self, text: &str, typing: bool) -> CoreResult<()> {
        let group = self.sel.borrow().count() > 1 || !self.sel.borrow().is_empty() || (typing && self.in_overstrike);
        self.edit(|model| {
            model.grouped(group, |model| {
                let count = model.sel.borrow().count();
                for index in 0..count {
                    model.delete_range_text(index)?;
                    let position = model.sel.borrow().range(index)?.caret.position();
                    if typing && model.in_overstrike {
                        let mut doc = model.doc.borrow_mut();
                        let line_end = doc.line_end(doc.line_from_position(position))?;
                        if position < line_end {
                            let next = next_position(&doc, position)?;
                            doc.delete_with(position, next - position)?;
                        }
                    }
                    model.doc.borrow_mut().insert_with(position, text, typing)?;
                }
                Ok(())
            })
        })
    }

    // Editing.

    /// Type `ch` at every selection, replacing selected text.
    ///
    /// Consecutive keystrokes at one caret merge into a single undo action until the caret is
    /// moved.
    pub fn insert_character(&mut self, ch: char) -> CoreResult<()> {
        let mut buf = [0u8; 4];
        self.insert_at_ranges(ch.encode_utf8(&mut buf), true)
    }

    /// Replace every selection with `text` as one undo step.
    pub fn replace_selection(&mut self, text: &str) -> CoreResult<()> {
        self.insert_at_ranges(text, false)
    }

    /// Delete the selected text, or the grapheme before each empty selection.
    pub fn delete_back(&mut self) -> CoreResult<()> {
        self.delete_at_ranges(false)
    }

    /// Delete the selected text, or the grapheme after each empty selection.
    pub fn delete_forward(&mut self) -> CoreResult<()> {
        self.delete_at_ranges(true)
    }

    fn delete_at_ranges(&mut self, forward: bool) -> CoreResult<()> {
        let group = self.sel.borrow().count() > 1;
        self.edit(|model| {
            model.grouped(group, |model| {
                let count = model.sel.borrow().count();
                for index in 0..count {
                    let range = *model.sel.borrow().range(index)?;
                    if !range.is_empty() {
                        model.delete_range_text(index)?;
                        continue;
                    }
                    let caret = range.caret.position();
                    let mut doc = model.doc.borrow_mut();
                    let (start, end) = if forward {
                        (caret, next_position(&doc, caret)?)
                    } else {
                        (previous_position(&doc, caret)?, caret)
                    };
                    if end > start {
                        doc.delete_with(start, end - start)?;
                    }
                }
                Ok(())
            })
        })
    }

    /// Delete the text of every non-empty selection.
    pub fn clear_selection_text(&mut self) -> CoreResult<()> {
        if self.sel.borrow().is_empty() {
            return Ok(());
        }
        let group = self.sel.borrow().count() > 1;
        self.edit(|model| {
            model.grouped(group, |model| {
                let count = model.sel.borrow().count();
                for index in 0..count {
                    model.delete_range_text(index)?;
                }
                Ok(())
            })
        })
    }

    /// Selected text. Rectangular selections end each line with `'\n'`.
    pub fn selected_text(&self) -> CoreResult<String> {
        let doc = self.doc.borrow();
        let mut ranges: Vec<Range> = self.sel.borrow().ranges().iter().map(SelectionRange::as_range).collect();
        ranges.sort_by_key(|range| range.start);
        let mut text = String::new();
        for range in ranges {
            text.push_str(&doc.text_range(range.start, range.end)?);
            if self.sel.borrow().is_rectangular() {
                text.push('\n');
            }
        }
        Ok(text)
    }

    /// Put the selected text on the clipboard.
    pub fn copy(&self, clipboard: &mut dyn Clipboard) -> CoreResult<()> {
        if self.sel.borrow().is_empty() {
            return Ok(());
        }
        clipboard.set_text(&self.selected_text()?, self.sel.borrow().is_rectangular());
        Ok(())
    }

    /// Copy, then delete the selected text.
    pub fn cut(&mut self, clipboard: &mut dyn Clipboard) -> CoreResult<()> {
        if self.doc.borrow().is_read_only() {
            return Err(CoreError::ReadOnly);
        }
        self.copy(clipboard)?;
        self.clear_selection_text()
    }

    /// Insert the clipboard text, column by column when it was copied from a rectangle.
    pub fn paste(&mut self, clipboard: &dyn Clipboard) -> CoreResult<()> {
        let Some(text) = clipboard.text().map(str::to_string) else {
            return Ok(());
        };
        if clipboard.is_rectangular() {
            self.paste_rectangular(&text)
        } else {
            self.replace_selection(&text)
        }
    }

    fn paste_rectangular(&mut self, text: &str) -> CoreResult<()> {
        let tab_width = self.tab_width;
        self.edit(|model| {
            model.grouped(true, |model| {
                let count = model.sel.borrow().count();
                for index in 0..count {
                    model.delete_range_text(index)?;
                }
                let caret = model.sel.borrow().main_caret();
                let mut doc = model.doc.borrow_mut();
                let first_line = doc.line_from_position(caret);
                let column = column_in(&doc, caret, tab_width)?;
                let pieces = text.strip_suffix('\n').unwrap_or(text).split('\n');
                let mut last = caret;
                for (offset, piece) in pieces.enumerate() {
                    let line = first_line + offset;
                    if line >= doc.line_count() {
                        let end = doc.length();
                        doc.insert_with(end, "\n", false)?;
                    }
                    let line_end = doc.line_end(line)?;
                    let line_width = column_in(&doc, line_end, tab_width)?;
                    let position = if line_width < column {
                        doc.insert_with(line_end, &" ".repeat(column - line_width), false)?;
                        doc.line_end(line)?
                    } else {
                        position_at_column(&doc, line, column, tab_width)?
                    };
                    doc.insert_with(position, piece, false)?;
                    last = position + piece.len();
                }
                drop(doc);
                model.sel.borrow_mut().set_caret(last);
                Ok(())
            })
        })
    }

    /// Toggle between inserting and overwriting typed characters.
    pub fn set_overstrike(&mut self, overstrike: bool) {
        self.in_overstrike = overstrike;
    }

    /// `true` when typing overwrites.
    pub fn in_overstrike(&self) -> bool {
        self.in_overstrike
    }

    // Undo.

    /// Undo one step and restore the selection from before it. Returns `false` when there was
    /// nothing to undo.
    pub fn undo(&mut self) -> CoreResult<bool> {
        self.ime_cancel()?;
        self.update_from_document();
        let Some(position) = self.doc.borrow_mut().undo()? else {
            return Ok(false);
        };
        self.update_from_document();
        let current = self.doc.borrow().undo_current();
        self.restore_or_place_caret(current + 1, UndoRedo::Undo, position);
        self.caret_moved();
        Ok(true)
    }

    /// Redo one step and restore the selection from after it. Returns `false` when there was
    /// nothing to redo.
    pub fn redo(&mut self) -> CoreResult<bool> {
        self.ime_cancel()?;
        self.update_from_document();
        let Some(position) = self.doc.borrow_mut().redo()? else {
            return Ok(false);
        };
        self.update_from_document();
        let current = self.doc.borrow().undo_current();
        self.restore_or_place_caret(current, UndoRedo::Redo, position);
        self.caret_moved();
        Ok(true)
    }

    // Selection.

    /// Select `anchor..caret` as a single range.
    pub fn set_selection(&mut self, anchor: usize, caret: usize) -> CoreResult<()> {
        {
            let doc = self.doc.borrow();
            check_position(&doc, anchor)?;
            check_position(&doc, caret)?;
        }
        self.update_from_document();
        self.sel.borrow_mut().set_selection(SelectionRange::new(anchor, caret));
        self.caret_moved();
        Ok(())
    }

    /// Place a single caret.
    pub fn set_empty_selection(&mut self, position: usize) -> CoreResult<()> {
        self.set_selection(position, position)
    }

    /// Add a range and make it the main one.
    pub fn add_selection(&mut self, anchor: usize, caret: usize) -> CoreResult<()> {
        {
            let doc = self.doc.borrow();
            check_position(&doc, anchor)?;
            check_position(&doc, caret)?;
        }
        self.update_from_document();
        self.sel.borrow_mut().add_range(SelectionRange::new(anchor, caret));
        self.sel.borrow_mut().merge_overlapping();
        self.caret_moved();
        Ok(())
    }

    /// Remove range `index`. Returns `false` if it was the only range.
    pub fn drop_selection(&mut self, index: usize) -> CoreResult<bool> {
        let dropped = self.sel.borrow_mut().drop_range(index)?;
        if dropped {
            self.caret_moved();
        }
        Ok(dropped)
    }

    /// Select the whole document.
    pub fn select_all(&mut self) {
        let length = self.doc.borrow().length();
        self.sel.borrow_mut().set_selection(SelectionRange::new(0, length));
        self.caret_moved();
    }

    /// Select a rectangle with corners at `anchor` and `caret`, one range per line.
    ///
    /// Columns are visual columns with tabs expanded; lines shorter than the rectangle get a
    /// range ending at their line end.
    pub fn set_rectangular_selection(&mut self, anchor: usize, caret: usize) -> CoreResult<()> {
        self.update_from_document();
        let (ranges, main) = {
            let doc = self.doc.borrow();
            check_position(&doc, anchor)?;
            check_position(&doc, caret)?;
            let anchor_line = doc.line_from_position(anchor);
            let caret_line = doc.line_from_position(caret);
            let anchor_column = column_in(&doc, anchor, self.tab_width)?;
            let caret_column = column_in(&doc, caret, self.tab_width)?;
            let (first, last) = (anchor_line.min(caret_line), anchor_line.max(caret_line));
            let (left, right) = (anchor_column.min(caret_column), anchor_column.max(caret_column));
            let mut ranges = Vec::with_capacity(last - first + 1);
            for line in first..=last {
                let start = position_at_column(&doc, line, left, self.tab_width)?;
                let end = position_at_column(&doc, line, right, self.tab_width)?;
                ranges.push(if caret_column >= anchor_column {
                    SelectionRange::new(start, end)
                } else {
                    SelectionRange::new(end, start)
                });
            }
            (ranges, caret_line - first)
        };
        self.sel.borrow_mut().set_ranges(ranges, main);
        self.sel.borrow_mut().set_selection_type(SelectionType::Rectangle);
        self.sel.borrow_mut().set_rectangular(SelectionRange::new(anchor, caret));
        self.caret_moved();
        Ok(())
    }

    fn move_carets<F>(&mut self, extend: bool, target: F) -> CoreResult<()>
    where
        F: Fn(&Document, &SelectionRange) -> CoreResult<usize>,
    {
        self.update_from_document();
        let ranges = {
            let doc = self.doc.borrow();
            self.sel
                .borrow()
                .ranges()
                .iter()
                .map(|range| {
                    let caret = target(&doc, range)?;
                    Ok(if extend {
                        SelectionRange::new(range.anchor.position(), caret)
                    } else {
                        SelectionRange::caret_at(caret)
                    })
                })
                .collect::<CoreResult<Vec<_>>>()?
        };
        let main = self.sel.borrow().main();
        self.sel.borrow_mut().set_ranges(ranges, main);
        self.sel.borrow_mut().set_selection_type(SelectionType::Stream);
        self.sel.borrow_mut().merge_overlapping();
        self.caret_moved();
        Ok(())
    }

    /// Move each caret one grapheme left. Without `extend` a selection collapses to its start.
    pub fn char_left(&mut self, extend: bool) -> CoreResult<()> {
        self.move_carets(extend, |doc, range| {
            if !extend && !range.is_empty() {
                Ok(range.start().position())
            } else {
                previous_position(doc, range.caret.position())
            }
        })
    }

    /// Move each caret one grapheme right. Without `extend` a selection collapses to its end.
    pub fn char_right(&mut self, extend: bool) -> CoreResult<()> {
        self.move_carets(extend, |doc, range| {
            if !extend && !range.is_empty() {
                Ok(range.end().position())
            } else {
                next_position(doc, range.caret.position())
            }
        })
    }

    /// Move each caret to the previous word start.
    pub fn word_left(&mut self, extend: bool) -> CoreResult<()> {
        let text = self.doc.borrow().text();
        self.move_carets(extend, |_, range| Ok(previous_word_start(&text, range.caret.position())))
    }

    /// Move each caret to the next word start.
    pub fn word_right(&mut self, extend: bool) -> CoreResult<()> {
        let text = self.doc.borrow().text();
        self.move_carets(extend, |_, range| Ok(next_word_start(&text, range.caret.position())))
    }

    /// Move each caret `lines` visible lines down (negative for up), keeping its column.
    pub fn line_move(&mut self, lines: isize, extend: bool) -> CoreResult<()> {
        let tab_width = self.tab_width;
        self.move_carets(extend, |doc, range| {
            let caret = range.caret.position();
            let column = column_in(doc, caret, tab_width)?;
            let contraction = doc.contraction();
            let display = contraction.display_from_doc(doc.line_from_position(caret));
            let last_display = contraction.lines_displayed().saturating_sub(1);
            let target = display.saturating_add_signed(lines).min(last_display);
            let line = contraction.doc_from_display(target);
            position_at_column(doc, line, column, tab_width)
        })
    }

    /// Move each caret to the start of its line.
    pub fn home(&mut self, extend: bool) -> CoreResult<()> {
        self.move_carets(extend, |doc, range| {
            doc.line_start(doc.line_from_position(range.caret.position()))
        })
    }

    /// Move each caret to the end of its line.
    pub fn line_end(&mut self, extend: bool) -> CoreResult<()> {
        self.move_carets(extend, |doc, range| doc.line_end(doc.line_from_position(range.caret.position())))
    }

    /// Move the caret to the start of the document.
    pub fn document_start(&mut self, extend: bool) -> CoreResult<()> {
        self.move_carets(extend, |_, _| Ok(0))?;
        self.collapse_to_main();
        Ok(())
    }

    /// Move the caret to the end of the document.
    pub fn document_end(&mut self, extend: bool) -> CoreResult<()> {
        self.move_carets(extend, |doc, _| Ok(doc.length()))?;
        self.collapse_to_main();
        Ok(())
    }

    fn collapse_to_main(&mut self) {
        let main = *self.sel.borrow().range_main();
        self.sel.borrow_mut().set_selection(main);
    }

    /// Drop every range but the main one, and any IME composition.
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.ime_cancel()?;
        self.collapse_to_main();
        self.caret_moved();
        Ok(())
    }

    // Line and column.

    /// Visual column of `position`, with tabs expanded.
    pub fn column_of(&self, position: usize) -> CoreResult<usize> {
        column_in(&self.doc.borrow(), position, self.tab_width)
    }

    /// Position on `line` at visual `column`, or the line end when the line is shorter.
    pub fn position_from_line_column(&self, line: usize, column: usize) -> CoreResult<usize> {
        position_at_column(&self.doc.borrow(), line, column, self.tab_width)
    }

    // Folding.

    /// Contract, expand or toggle the fold headed by `line`.
    ///
    /// Toggling a line that is not a header acts on its fold parent. A caret hidden by
    /// contracting moves to the end of the header line.
    pub fn fold_line(&mut self, line: usize, action: FoldAction) -> CoreResult<()> {
        let hidden = {
            let mut doc = self.doc.borrow_mut();
            let line_count = doc.line_count();
            if line >= line_count {
                return Err(CoreError::LineOutOfBounds { line, line_count });
            }
            let mut line = line;
            let mut action = action;
            if action == FoldAction::Toggle {
                if !doc.fold_level(line).is_header() {
                    match doc.get_fold_parent(line) {
                        Some(parent) => line = parent,
                        None => return Ok(()),
                    }
                }
                action = if doc.contraction().expanded(line) {
                    FoldAction::Contract
                } else {
                    FoldAction::Expand
                };
            }
            if action == FoldAction::Contract {
                let last_child = doc.get_last_child(line, None, None);
                if last_child > line {
                    doc.contraction_mut().set_expanded(line, false)?;
                    doc.contraction_mut().set_visible(line + 1, last_child, false)?;
                    let caret_line = doc.line_from_position(self.sel.borrow().main_caret());
                    (caret_line > line && caret_line <= last_child)
                        .then(|| doc.line_end(line))
                        .transpose()?
                } else {
                    None
                }
            } else {
                doc.contraction_mut().set_visible(line, line, true)?;
                doc.contraction_mut().set_expanded(line, true)?;
                expand_children(&mut doc, line)?;
                None
            }
        };
        if let Some(position) = hidden {
            self.sel.borrow_mut().set_caret(position);
            self.caret_moved();
        }
        Ok(())
    }

    /// Show every child of `line`, recursing into expanded child headers.
    pub fn expand_line(&mut self, line: usize) -> CoreResult<()> {
        let mut doc = self.doc.borrow_mut();
        let line_count = doc.line_count();
        if line >= line_count {
            return Err(CoreError::LineOutOfBounds { line, line_count });
        }
        expand_children(&mut doc, line)
    }

    /// How fold display text is drawn.
    pub fn fold_display_text_style(&self) -> FoldDisplayTextStyle {
        self.fold_display_text_style
    }

    /// Change how fold display text is drawn.
    pub fn set_fold_display_text_style(&mut self, style: FoldDisplayTextStyle) {
        self.fold_display_text_style = style;
    }

    /// Text shown after contracted lines without their own. Empty text clears it.
    pub fn set_default_fold_display_text(&mut self, text: Option<&str>) {
        self.default_fold_display_text = text.filter(|t| !t.is_empty()).map(str::to_string);
    }

    /// The default fold display text.
    pub fn default_fold_display_text(&self) -> Option<&str> {
        self.default_fold_display_text.as_deref()
    }

    /// Text to draw after `line`: `None` while hidden by style or while the line is expanded.
    pub fn get_fold_display_text(&self, line: usize) -> Option<String> {
        let doc = self.doc.borrow();
        if self.fold_display_text_style == FoldDisplayTextStyle::Hidden || doc.contraction().expanded(line) {
            return None;
        }
        doc.contraction()
            .fold_display_text(line)
            .map(str::to_string)
            .or_else(|| self.default_fold_display_text.clone())
    }

    /// Whether the line end of `line` is drawn selected.
    pub fn line_end_in_selection(&self, line: usize) -> CoreResult<InSelection> {
        let position_after_line_end = self.doc.borrow().line_start(line + 1)?;
        Ok(self.sel.borrow().in_selection_for_eol(position_after_line_end))
    }

    // View flags.

    /// Bidirectional mode.
    pub fn bidirectional(&self) -> Bidirectional {
        self.bidirectional
    }

    /// Change the bidirectional mode.
    pub fn set_bidirectional(&mut self, bidirectional: Bidirectional) {
        self.bidirectional = bidirectional;
    }

    /// `true` when bidirectional layout is on. Documents are always UTF-8.
    pub fn bidirectional_enabled(&self) -> bool {
        self.bidirectional != Bidirectional::Disabled
    }

    /// `true` for a right-to-left base direction.
    pub fn bidirectional_r2l(&self) -> bool {
        self.bidirectional == Bidirectional::R2L
    }

    /// The active hotspot.
    pub fn hotspot(&self) -> Option<Range> {
        self.hotspot
    }

    /// Set the active hotspot. Returns `true` if it changed.
    pub fn set_hotspot(&mut self, hotspot: Option<Range>) -> bool {
        std::mem::replace(&mut self.hotspot, hotspot) != hotspot
    }

    /// `true` when hotspots stop at line ends.
    pub fn hotspot_single_line(&self) -> bool {
        self.hotspot_single_line
    }

    /// Let hotspots span lines or not.
    pub fn set_hotspot_single_line(&mut self, single_line: bool) {
        self.hotspot_single_line = single_line;
    }

    /// Position of the pointer over text, for indicator hover appearance.
    pub fn hover_indicator_pos(&self) -> Option<usize> {
        self.hover_indicator_pos
    }

    /// Move the hover position. Returns `true` if it changed.
    pub fn set_hover_indicator_pos(&mut self, position: Option<usize>) -> bool {
        std::mem::replace(&mut self.hover_indicator_pos, position) != position
    }

    /// Bitmask of indicators under the hover position.
    pub fn hover_indicators(&self) -> u64 {
        self.hover_indicator_pos
            .map_or(0, |position| self.doc.borrow().indicators_on_for(position))
    }

    // IME.

    /// `true` while an inline composition is open.
    pub fn is_composing(&self) -> bool {
        self.composition.is_some()
    }

    /// The composition text's range.
    pub fn composition_range(&self) -> Option<Range> {
        self.composition
            .as_ref()
            .map(|composition| Range::new(composition.start, composition.start + composition.length))
    }

    /// Open an inline composition at the main caret, deleting any selected text first.
    pub fn ime_start(&mut self) -> CoreResult<()> {
        self.ime_cancel()?;
        self.clear_selection_text()?;
        self.collapse_to_main();
        self.composition = Some(Composition {
            start: self.sel.borrow().main_caret(),
            length: 0,
        });
        Ok(())
    }

    fn remove_composition_text(&mut self) -> CoreResult<usize> {
        let Some(composition) = self.composition.as_mut() else {
            return Ok(self.sel.borrow().main_caret());
        };
        let (start, length) = (composition.start, composition.length);
        composition.length = 0;
        let mut doc = self.doc.borrow_mut();
        let collecting = doc.is_collecting_undo();
        doc.set_undo_collection(false);
        let result = doc.delete_with(start, length);
        doc.set_undo_collection(collecting);
        result.map(|_| start)
    }

    /// Replace the composition text. `segments` are byte ranges relative to the text start.
    ///
    /// Composition text is not recorded for undo.
    pub fn ime_update(&mut self, text: &str, segments: &[(Range, ImeSegment)]) -> CoreResult<()> {
        if self.composition.is_none() {
            self.ime_start()?;
        }
        let start = self.remove_composition_text()?;
        let mut doc = self.doc.borrow_mut();
        let collecting = doc.is_collecting_undo();
        doc.set_undo_collection(false);
        let inserted = doc.insert_with(start, text, false);
        doc.set_undo_collection(collecting);
        inserted?;
        for (range, segment) in segments {
            let end = range.end.min(text.len());
            if range.start < end {
                doc.fill_indicator(segment.indicator(), start + range.start, 1, end - range.start)?;
            }
        }
        drop(doc);
        if let Some(composition) = self.composition.as_mut() {
            composition.start = start;
            composition.length = text.len();
        }
        self.sel.borrow_mut().set_caret(start + text.len());
        self.caret.reset();
        Ok(())
    }

    /// Close the composition and insert `text` as an ordinary undoable edit.
    pub fn ime_commit(&mut self, text: &str) -> CoreResult<()> {
        if self.composition.is_none() {
            return self.replace_selection(text);
        }
        let start = self.remove_composition_text()?;
        self.composition = None;
        self.sel.borrow_mut().set_caret(start);
        tracing::debug!(target: "scribe.edit_model", position = start, length = text.len(), "ime commit");
        self.replace_selection(text)
    }

    /// Remove the composition text and close the composition.
    pub fn ime_cancel(&mut self) -> CoreResult<()> {
        if self.composition.is_none() {
            return Ok(());
        }
        let start = self.remove_composition_text()?;
        self.composition = None;
        self.sel.borrow_mut().set_caret(start);
        Ok(())
    }

    // Commands.

    /// Run a key-bound command.
    pub fn execute(&mut self, command: EditorCommand, clipboard: &mut dyn Clipboard) -> CoreResult<()> {
        use EditorCommand as C;
        match command {
            C::LineDown => self.line_move(1, false),
            C::LineDownExtend => self.line_move(1, true),
            C::LineUp => self.line_move(-1, false),
            C::LineUpExtend => self.line_move(-1, true),
            C::CharLeft => self.char_left(false),
            C::CharLeftExtend => self.char_left(true),
            C::CharRight => self.char_right(false),
            C::CharRightExtend => self.char_right(true),
            C::WordLeft => self.word_left(false),
            C::WordLeftExtend => self.word_left(true),
            C::WordRight => self.word_right(false),
            C::WordRightExtend => self.word_right(true),
            C::Home => self.home(false),
            C::HomeExtend => self.home(true),
            C::LineEnd => self.line_end(false),
            C::LineEndExtend => self.line_end(true),
            C::DocumentStart => self.document_start(false),
            C::DocumentStartExtend => self.document_start(true),
            C::DocumentEnd => self.document_end(false),
            C::DocumentEndExtend => self.document_end(true),
            C::DeleteBack => self.delete_back(),
            C::Clear => self.delete_forward(),
            C::Tab => self.insert_character('\t'),
            C::NewLine => self.replace_selection("\n"),
            C::Cancel => self.cancel(),
            C::EditToggleOvertype => {
                self.in_overstrike = !self.in_overstrike;
                Ok(())
            }
            C::Undo => self.undo().map(|_| ()),
            C::Redo => self.redo().map(|_| ()),
            C::Cut => self.cut(clipboard),
            C::Copy => self.copy(clipboard),
            C::Paste => self.paste(clipboard),
            C::SelectAll => {
                self.select_all();
                Ok(())
            }
        }
    }

    /// Fill `menu` with the edit commands and their enabled states, then show it.
    pub fn populate_context_menu(&self, menu: &mut dyn ContextMenu, x: i32, y: i32) {
        let doc = self.doc.borrow();
        let writable = !doc.is_read_only();
        let has_selection = !self.sel.borrow().is_empty();
        menu.clear();
        menu.add_item("Undo", MenuCommand::Undo, writable && doc.can_undo());
        menu.add_item("Redo", MenuCommand::Redo, writable && doc.can_redo());
        menu.add_separator();
        menu.add_item("Cut", MenuCommand::Cut, writable && has_selection);
        menu.add_item("Copy", MenuCommand::Copy, has_selection);
        menu.add_item("Paste", MenuCommand::Paste, writable);
        menu.add_item("Delete", MenuCommand::Delete, writable && has_selection);
        menu.add_separator();
        menu.add_item("Select All", MenuCommand::SelectAll, true);
        menu.show(x, y);
    }

    /// Run a command chosen from the context menu.
    pub fn execute_menu_command(&mut self, command: MenuCommand, clipboard: &mut dyn Clipboard) -> CoreResult<()> {
        match command {
            MenuCommand::Undo => self.execute(EditorCommand::Undo, clipboard),
            MenuCommand::Redo => self.execute(EditorCommand::Redo, clipboard),
            MenuCommand::Cut => self.execute(EditorCommand::Cut, clipboard),
            MenuCommand::Copy => self.execute(EditorCommand::Copy, clipboard),
            MenuCommand::Paste => self.execute(EditorCommand::Paste, clipboard),
            MenuCommand::Delete => self.clear_selection_text(),
            MenuCommand::SelectAll => self.execute(EditorCommand::SelectAll, clipboard),
        }
    }

    // Completion.

    /// The word characters immediately before the main caret.
    pub fn word_prefix_at_caret(&self) -> CoreResult<String> {
        let doc = self.doc.borrow();
        let caret = self.sel.borrow().main_caret();
        let start = doc.line_start(doc.line_from_position(caret))?;
        let before = doc.text_range(start, caret)?;
        let prefix_start = before
            .char_indices()
            .rev()
            .take_while(|&(_, ch)| is_word_char(ch))
            .last()
            .map_or(before.len(), |(offset, _)| offset);
        Ok(before[prefix_start..].to_string())
    }

    /// Offer the document's words that extend the prefix at the caret. Returns how many were
    /// offered; the list is shown only when there is at least one.
    pub fn autocomplete_words(&self, popup: &mut dyn ListPopup) -> CoreResult<usize> {
        let prefix = self.word_prefix_at_caret()?;
        popup.clear();
        if prefix.is_empty() {
            popup.show(false);
            return Ok(0);
        }
        let text = self.doc.borrow().text();
        let words: BTreeSet<&str> = text
            .split(|ch: char| !is_word_char(ch))
            .filter(|word| word.len() > prefix.len() && word.starts_with(prefix.as_str()))
            .collect();
        for word in &words {
            popup.append(word);
        }
        popup.select((!words.is_empty()).then_some(0));
        popup.show(!words.is_empty());
        Ok(words.len())
    }

    /// Replace the prefix at the caret with the selected completion.
    pub fn accept_completion(&mut self, popup: &mut dyn ListPopup) -> CoreResult<bool> {
        let Some(word) = popup.selection().and_then(|index| popup.value(index)).map(str::to_string) else {
            return Ok(false);
        };
        let prefix = self.word_prefix_at_caret()?;
        let caret = self.sel.borrow().main_caret();
        self.collapse_to_main();
        self.sel.borrow_mut().set_selection(SelectionRange::new(caret - prefix.len(), caret));
        self.replace_selection(&word)?;
        popup.show(false);
        Ok(true)
    }
}

impl Drop for EditModel {
    fn drop(&mut self) {
        match self.doc.try_borrow_mut() {
            Some(mut doc) => {
                doc.detach_view(self.view);
            }
            None => {
                // The slot goes on the document's next text modification, once `sel` is gone.
                tracing::warn!(
                    target: "scribe.edit_model",
                    view = ?self.view,
                    "document busy while dropping view; detaching lazily"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FoldLevel;
    use crate::platform::{LocalClipboard, RecordingMenu, VecListPopup};
    use pretty_assertions::assert_eq;

    fn model(text: &str) -> EditModel {
        EditModel::new(DocumentHandle::new(Document::from_text(text)), &ViewOptions::default())
    }

    fn text(model: &EditModel) -> String {
        model.document().borrow().text()
    }

    #[test]
    fn test_typing_coalesces_until_caret_moves() {
        let mut m = model("");
        for ch in "abc".chars() {
            m.insert_character(ch).unwrap();
        }
        m.set_empty_selection(1).unwrap();
        m.set_empty_selection(3).unwrap();
        m.insert_character('d').unwrap();
        assert_eq!(text(&m), "abcd");
        assert_eq!(m.document().borrow().undo_current(), 2);
        assert!(m.undo().unwrap());
        assert_eq!(text(&m), "abc");
        assert_eq!(m.selection().to_string(), "3");
        assert!(m.undo().unwrap());
        assert_eq!(text(&m), "");
        assert_eq!(m.selection().to_string(), "0");
        assert!(!m.undo().unwrap());
        assert!(m.redo().unwrap());
        assert_eq!(m.selection().to_string(), "3");
    }

    #[test]
    fn test_undo_restores_selection_replaced_by_typing() {
        let mut m = model("hello world");
        m.set_selection(6, 11).unwrap();
        m.insert_character('X').unwrap();
        assert_eq!(text(&m), "hello X");
        m.undo().unwrap();
        assert_eq!(text(&m), "hello world");
        assert_eq!(m.selection().to_string(), "6-11");
        m.redo().unwrap();
        assert_eq!(m.selection().to_string(), "7");
    }

    #[test]
    fn test_disabled_history_places_caret_at_change() {
        let mut m = model("abc");
        m.change_undo_selection_history(UndoSelectionHistory::Disabled);
        assert!(m.document().borrow().view_state(m.view_id()).is_none());
        m.set_selection(0, 3).unwrap();
        m.delete_back().unwrap();
        m.undo().unwrap();
        assert_eq!(m.selection().to_string(), "3");
    }

    #[test]
    fn test_delete_back_removes_grapheme() {
        let mut m = model("ae\u{301}\n");
        m.set_empty_selection(4).unwrap();
        m.delete_back().unwrap();
        assert_eq!(text(&m), "a\n");
        assert_eq!(m.selection().main_caret(), 1);
        m.set_empty_selection(1).unwrap();
        m.delete_forward().unwrap();
        assert_eq!(text(&m), "a");
    }

    #[test]
    fn test_multiple_carets_type_together() {
        let mut m = model("ab\ncd");
        m.set_empty_selection(1).unwrap();
        m.add_selection(4, 4).unwrap();
        m.insert_character('x').unwrap();
        assert_eq!(text(&m), "axb\ncxd");
        assert_eq!(m.selection().to_string(), "2,6#1");
        m.undo().unwrap();
        assert_eq!(text(&m), "ab\ncd");
        assert_eq!(m.selection().to_string(), "1,4#1");
    }

    #[test]
    fn test_overstrike_replaces_next_character() {
        let mut m = model("abc\n");
        m.set_overstrike(true);
        m.set_empty_selection(1).unwrap();
        m.insert_character('X').unwrap();
        m.set_empty_selection(3).unwrap();
        m.insert_character('Y').unwrap();
        assert_eq!(text(&m), "aXcY\n");
    }

    #[test]
    fn test_word_and_line_movement() {
        let mut m = model("foo.bar  baz\n\tqux");
        m.word_right(false).unwrap();
        assert_eq!(m.selection().main_caret(), 3);
        m.word_right(false).unwrap();
        assert_eq!(m.selection().main_caret(), 4);
        m.word_right(false).unwrap();
        assert_eq!(m.selection().main_caret(), 9);
        m.word_left(true).unwrap();
        assert_eq!(m.selection().to_string(), "9-4");
        m.set_empty_selection(9).unwrap();
        m.line_move(1, false).unwrap();
        assert_eq!(m.selection().main_caret(), 15);
        assert_eq!(m.column_of(15).unwrap(), 9);
        m.line_end(false).unwrap();
        assert_eq!(m.selection().main_caret(), 17);
        m.home(true).unwrap();
        assert_eq!(m.selection().to_string(), "17-13");
        m.char_left(false).unwrap();
        assert_eq!(m.selection().main_caret(), 13);
    }

    #[test]
    fn test_rectangular_selection_copy_and_paste() {
        let mut m = model("abcd\nefgh\nij");
        m.set_rectangular_selection(1, 8).unwrap();
        assert_eq!(m.selection().count(), 2);
        let mut clipboard = LocalClipboard::new();
        m.copy(&mut clipboard).unwrap();
        assert_eq!(clipboard.text(), Some("bc\nfg\n"));
        assert!(clipboard.is_rectangular());
        m.set_empty_selection(12).unwrap();
        m.paste(&clipboard).unwrap();
        assert_eq!(text(&m), "abcd\nefgh\nijbc\n  fg");
        m.undo().unwrap();
        assert_eq!(text(&m), "abcd\nefgh\nij");
    }

    #[test]
    fn test_fold_line_hides_children_and_moves_caret() {
        let handle = DocumentHandle::new(Document::from_text("a\n b\n c\nd"));
        {
            let mut doc = handle.borrow_mut();
            doc.set_fold_level(0, FoldLevel::BASE | FoldLevel::HEADER_FLAG).unwrap();
            doc.set_fold_level(1, FoldLevel(0x401)).unwrap();
            doc.set_fold_level(2, FoldLevel(0x401)).unwrap();
        }
        let options = ViewOptions {
            fold_display_text_style: FoldDisplayTextStyle::Standard,
            default_fold_display_text: Some("...".to_string()),
            ..ViewOptions::default()
        };
        let mut m = EditModel::new(handle, &options);
        m.set_empty_selection(4).unwrap();
        m.fold_line(1, FoldAction::Toggle).unwrap();
        assert_eq!(m.document().borrow().contraction().lines_displayed(), 2);
        assert_eq!(m.selection().main_caret(), 1);
        assert_eq!(m.get_fold_display_text(0).as_deref(), Some("..."));
        m.line_move(1, false).unwrap();
        assert_eq!(m.selection().main_caret(), 9);
        m.fold_line(0, FoldAction::Expand).unwrap();
        assert_eq!(m.document().borrow().contraction().lines_displayed(), 4);
        assert_eq!(m.get_fold_display_text(0), None);
    }

    #[test]
    fn test_ime_composition_is_not_undoable() {
        let mut m = model("ab");
        m.set_empty_selection(1).unwrap();
        m.ime_start().unwrap();
        m.ime_update("ka", &[(Range::new(0, 2), ImeSegment::Input)]).unwrap();
        assert_eq!(text(&m), "akab");
        assert_eq!(m.document().borrow().indicator_value_at(INDICATOR_IME_INPUT, 2), 1);
        assert!(!m.document().borrow().can_undo());
        m.ime_update("か", &[(Range::new(0, 3), ImeSegment::Target)]).unwrap();
        assert_eq!(text(&m), "aかb");
        m.ime_commit("か").unwrap();
        assert!(!m.is_composing());
        assert_eq!(text(&m), "aかb");
        assert_eq!(m.document().borrow().indicators_on_for(2), 0);
        m.undo().unwrap();
        assert_eq!(text(&m), "ab");
        assert_eq!(m.selection().main_caret(), 1);
    }

    #[test]
    fn test_context_menu_reflects_state() {
        let mut m = model("abc");
        let mut menu = RecordingMenu::new();
        m.populate_context_menu(&mut menu, 3, 4);
        assert_eq!(menu.is_enabled(MenuCommand::Undo), Some(false));
        assert_eq!(menu.is_enabled(MenuCommand::Copy), Some(false));
        assert_eq!(menu.shown_at(), Some((3, 4)));
        m.select_all();
        m.populate_context_menu(&mut menu, 0, 0);
        assert_eq!(menu.is_enabled(MenuCommand::Cut), Some(true));
        let mut clipboard = LocalClipboard::new();
        m.execute_menu_command(MenuCommand::Cut, &mut clipboard).unwrap();
        assert_eq!(clipboard.text(), Some("abc"));
        m.populate_context_menu(&mut menu, 0, 0);
        assert_eq!(menu.is_enabled(MenuCommand::Undo), Some(true));
        m.document().borrow_mut().set_read_only(true);
        m.populate_context_menu(&mut menu, 0, 0);
        assert_eq!(menu.is_enabled(MenuCommand::Paste), Some(false));
    }

    #[test]
    fn test_word_completion() {
        let mut m = model("alpha alphabet beta al");
        m.document_end(false).unwrap();
        let mut popup = VecListPopup::new();
        assert_eq!(m.autocomplete_words(&mut popup).unwrap(), 2);
        assert_eq!(popup.items(), &["alpha".to_string(), "alphabet".to_string()]);
        assert!(popup.is_visible());
        popup.select(Some(1));
        assert!(m.accept_completion(&mut popup).unwrap());
        assert_eq!(text(&m), "alpha alphabet beta alphabet");
        assert!(!popup.is_visible());
    }

    #[test]
    fn test_drop_detaches_view() {
        let handle = DocumentHandle::new(Document::from_text("x"));
        let m = EditModel::new(handle.add_ref(), &ViewOptions::default());
        assert_eq!(handle.borrow().view_count(), 1);
        assert_eq!(handle.ref_count(), 2);
        drop(m);
        assert_eq!(handle.borrow().view_count(), 0);
        assert_eq!(handle.ref_count(), 1);
    }

    #[test]
    fn test_view_dropped_while_document_borrowed_is_detached_later() {
        let handle = DocumentHandle::new(Document::from_text("x"));
        let m = EditModel::new(handle.add_ref(), &ViewOptions::default());
        {
            let mut doc = handle.borrow_mut();
            drop(m);
            assert_eq!(doc.view_count(), 0);
            doc.insert_string(1, "y").unwrap();
        }
        let fresh = EditModel::new(handle.add_ref(), &ViewOptions::default());
        assert_eq!(handle.borrow().view_count(), 1);
        drop(fresh);
        assert_eq!(handle.borrow().view_count(), 0);
    }

    #[test]
    fn test_caret_blink() {
        let mut caret = Caret::default();
        assert!(!caret.tick());
        caret.set_active(true);
        assert!(caret.is_visible());
        assert!(caret.tick());
        assert!(!caret.is_visible());
        caret.reset();
        assert!(caret.is_visible());
        caret.period = 0;
        assert!(!caret.tick());
    }
}
