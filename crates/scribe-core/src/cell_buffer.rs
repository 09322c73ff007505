//! Text storage with parallel style, indicator and line tables.
//!
//! [`CellBuffer`] owns the UTF-8 bytes of a document in a gap buffer and keeps every table that
//! is indexed by byte position the same length as the text: the lexical style runs, the
//! indicator layers and the line-start partitioning. Each insertion and deletion is logged in
//! the [`UndoHistory`] before it is applied, unless collection is suspended.
//!
//! Positions are byte offsets and must fall on character boundaries. Only `'\n'` ends a line;
//! text arriving with other line endings is normalised before it reaches the buffer.

use crate::config::DocumentOptions;
use crate::decoration::DecorationList;
use crate::error::{CoreError, CoreResult};
use crate::partitioning::Partitioning;
use crate::run_styles::{FillResult, RunStyles};
use crate::split_vector::SplitVector;
use crate::undo_history::{ActionType, AppendOutcome, UndoAction, UndoHistory};

/// The effect of one buffer mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    /// Byte position of the change.
    pub position: usize,
    /// The inserted or removed text.
    pub text: String,
    /// Lines added (negative when lines were removed).
    pub lines_added: isize,
    /// How the undo log recorded the change.
    pub undo: AppendOutcome,
}

impl CellChange {
    /// Byte length of the affected text.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// `true` when no text was affected.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Text bytes plus their style, indicator and line tables and the undo log.
#[derive(Debug, Clone)]
pub struct CellBuffer {
    substance: SplitVector<u8>,
    style: RunStyles<usize>,
    has_styles: bool,
    indicators: DecorationList,
    lines: Partitioning,
    undo: UndoHistory,
    collecting_undo: bool,
    read_only: bool,
}

impl Default for CellBuffer {
    fn default() -> Self {
        Self::new(&DocumentOptions::default())
    }
}

impl CellBuffer {
    /// Create an empty buffer.
    pub fn new(options: &DocumentOptions) -> Self {
        Self {
            substance: SplitVector::with_grow_size(64),
            style: RunStyles::new(),
            has_styles: !options.styles_none,
            indicators: DecorationList::new(),
            lines: Partitioning::new(8),
            undo: UndoHistory::new(options.undo_limit, options.coalesce_limit),
            collecting_undo: options.collect_undo,
            read_only: false,
        }
    }

    /// Length in bytes.
    pub fn length(&self) -> usize {
        self.substance.len()
    }

    /// `true` for an empty buffer.
    pub fn is_empty(&self) -> bool {
        self.substance.is_empty()
    }

    /// Byte at `position`, `0` past the end.
    pub fn byte_at(&self, position: usize) -> u8 {
        self.substance.value_at(position)
    }

    /// `true` if `position` does not split a multi-byte character.
    pub fn is_char_boundary(&self, position: usize) -> bool {
        position == 0 || position >= self.length() || (self.byte_at(position) & 0xC0) != 0x80
    }

    /// Fail unless `position` is within the text and on a character boundary.
    pub(crate) fn check_position(&self, position: usize) -> CoreResult<()> {
        if position > self.length() {
            return Err(CoreError::out_of_bounds(position, self.length()));
        }
        if !self.is_char_boundary(position) {
            return Err(CoreError::NotCharBoundary { position });
        }
        Ok(())
    }

    fn check_range(&self, start: usize, end: usize) -> CoreResult<()> {
        if start > end || end > self.length() {
            return Err(CoreError::range(start, end, self.length()));
        }
        if !self.is_char_boundary(start) {
            return Err(CoreError::NotCharBoundary { position: start });
        }
        if !self.is_char_boundary(end) {
            return Err(CoreError::NotCharBoundary { position: end });
        }
        Ok(())
    }

    /// The whole text.
    pub fn text(&self) -> String {
        let bytes: Vec<u8> = self.substance.iter().collect();
        debug_assert!(std::str::from_utf8(&bytes).is_ok(), "buffer holds invalid UTF-8");
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Text of `start..end`.
    pub fn text_range(&self, start: usize, end: usize) -> CoreResult<String> {
        self.check_range(start, end)?;
        let bytes = self.substance.copy_range(start, end - start);
        String::from_utf8(bytes).map_err(|e| CoreError::from(e.utf8_error()))
    }

    /// The whole text as one slice, closing the gap if needed.
    pub fn contiguous_bytes(&mut self) -> &[u8] {
        let length = self.length();
        self.substance.as_contiguous(0, length)
    }

    /// Number of lines; an empty buffer has one.
    pub fn line_count(&self) -> usize {
        self.lines.partitions()
    }

    /// Byte position where `line` starts. `line_count()` yields the buffer length.
    pub fn line_start(&self, line: usize) -> CoreResult<usize> {
        self.lines.position_from_partition(line)
    }

    /// Byte position of the end of `line`, before its `'\n'`.
    pub fn line_end(&self, line: usize) -> CoreResult<usize> {
        if line >= self.line_count() {
            return Err(CoreError::LineOutOfBounds {
                line,
                line_count: self.line_count(),
            });
        }
        let next = self.lines.position_from_partition(line + 1)?;
        if line + 1 < self.line_count() {
            Ok(next - 1)
        } else {
            Ok(next)
        }
    }

    /// Line containing `position`. Positions past the end map to the last line.
    pub fn line_from_position(&self, position: usize) -> usize {
        self.lines.partition_from_position(position)
    }

    /// Text of `line` without its line ending.
    pub fn line(&self, line: usize) -> CoreResult<String> {
        let start = self.line_start(line)?;
        let end = self.line_end(line)?;
        self.text_range(start, end)
    }

    /// All line starts plus the trailing length.
    pub fn line_starts(&self) -> Vec<usize> {
        self.lines.starts()
    }

    /// `true` when edits are rejected.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Reject or accept edits.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Insert `text` at `position`, logging it for undo.
    ///
    /// `may_coalesce` marks single-character typing that may merge with the previous action.
    pub fn insert_string(&mut self, position: usize, text: &str, may_coalesce: bool) -> CoreResult<CellChange> {
        if self.read_only {
            return Err(CoreError::ReadOnly);
        }
        self.check_position(position)?;
        let undo = if self.collecting_undo && !text.is_empty() {
            self.undo.append_action(ActionType::Insert, position, text, may_coalesce)
        } else {
            AppendOutcome::default()
        };
        let lines_added = self.basic_insert_string(position, text)?;
        Ok(CellChange {
            position,
            text: text.to_string(),
            lines_added,
            undo,
        })
    }

    /// Delete `delete_length` bytes at `position`, logging them for undo.
    pub fn delete_chars(&mut self, position: usize, delete_length: usize) -> CoreResult<CellChange> {
        if self.read_only {
            return Err(CoreError::ReadOnly);
        }
        let end = position
            .checked_add(delete_length)
            .ok_or_else(|| CoreError::range(position, usize::MAX, self.length()))?;
        let text = self.text_range(position, end)?;
        let undo = if self.collecting_undo && !text.is_empty() {
            self.undo.append_action(ActionType::Delete, position, &text, false)
        } else {
            AppendOutcome::default()
        };
        let lines_added = self.basic_delete_chars(position, delete_length)?;
        Ok(CellChange {
            position,
            text,
            lines_added,
            undo,
        })
    }

    fn basic_insert_string(&mut self, position: usize, text: &str) -> CoreResult<isize> {
        if text.is_empty() {
            return Ok(0);
        }
        let bytes = text.as_bytes();
        let insert_length = bytes.len();
        self.substance.insert_from_slice(position, bytes);
        self.style.insert_space(position, insert_length)?;
        self.indicators.insert_space(position, insert_length)?;

        let line_insert = self.lines.partition_from_position(position) + 1;
        self.lines.insert_text(line_insert - 1, insert_length as isize)?;
        let mut line = line_insert;
        for (i, byte) in bytes.iter().enumerate() {
            if *byte == b'\n' {
                self.lines.insert_partition(line, position + i + 1)?;
                line += 1;
            }
        }
        debug_assert_eq!(self.style.length(), self.length());
        Ok((line - line_insert) as isize)
    }

    fn basic_delete_chars(&mut self, position: usize, delete_length: usize) -> CoreResult<isize> {
        if delete_length == 0 {
            return Ok(0);
        }
        let removed_lines = self
            .substance
            .copy_range(position, delete_length)
            .iter()
            .filter(|b| **b == b'\n')
            .count();
        let line_remove = self.lines.partition_from_position(position) + 1;
        self.lines.insert_text(line_remove - 1, -(delete_length as isize))?;
        for _ in 0..removed_lines {
            self.lines.remove_partition(line_remove)?;
        }
        self.substance.delete_range(position, delete_length);
        self.style.delete_range(position, delete_length)?;
        self.indicators.delete_range(position, delete_length)?;
        debug_assert_eq!(self.style.length(), self.length());
        Ok(-(removed_lines as isize))
    }

    /// Replace the whole content without touching the undo log.
    pub(crate) fn reset_text(&mut self, text: &str) -> CoreResult<()> {
        self.substance.delete_all();
        self.style.delete_all();
        self.indicators.delete_all();
        self.lines.delete_all();
        self.basic_insert_string(0, text)?;
        Ok(())
    }

    // Undo log controls.

    /// Suspend or resume undo logging.
    pub fn set_undo_collection(&mut self, collect: bool) {
        self.collecting_undo = collect;
    }

    /// `true` while edits are logged.
    pub fn is_collecting_undo(&self) -> bool {
        self.collecting_undo
    }

    /// The undo log.
    pub fn undo_history(&self) -> &UndoHistory {
        &self.undo
    }

    /// Mutable access to the undo log for group and limit control.
    pub fn undo_history_mut(&mut self) -> &mut UndoHistory {
        &mut self.undo
    }

    /// Mark the current state as saved.
    pub fn set_save_point(&mut self) {
        self.undo.set_save_point();
    }

    /// `true` when the text matches the last save point.
    pub fn is_save_point(&self) -> bool {
        self.undo.is_save_point()
    }

    /// Number of actions in the next undo step.
    pub fn start_undo(&mut self) -> usize {
        self.undo.start_undo()
    }

    /// Undo one action of the current step and return it.
    pub fn perform_undo_step(&mut self) -> CoreResult<UndoAction> {
        let Some(action) = self.undo.undo_step().cloned() else {
            return Err(CoreError::out_of_bounds(self.undo.undo_current(), self.undo.undo_current()));
        };
        match action.kind {
            ActionType::Insert => {
                self.check_range(action.position, action.position + action.len())?;
                self.basic_delete_chars(action.position, action.len())?;
            }
            ActionType::Delete => {
                self.check_position(action.position)?;
                self.basic_insert_string(action.position, &action.text)?;
            }
        }
        self.undo.completed_undo_step();
        Ok(action)
    }

    /// Number of actions in the next redo step.
    pub fn start_redo(&mut self) -> usize {
        self.undo.start_redo()
    }

    /// Redo one action of the current step and return it.
    pub fn perform_redo_step(&mut self) -> CoreResult<UndoAction> {
        let Some(action) = self.undo.redo_step().cloned() else {
            return Err(CoreError::out_of_bounds(self.undo.undo_current(), self.undo.undo_current()));
        };
        match action.kind {
            ActionType::Insert => {
                self.check_position(action.position)?;
                self.basic_insert_string(action.position, &action.text)?;
            }
            ActionType::Delete => {
                self.check_range(action.position, action.position + action.len())?;
                self.basic_delete_chars(action.position, action.len())?;
            }
        }
        self.undo.completed_redo_step();
        Ok(action)
    }

    // Styles and indicators.

    /// `true` unless the buffer was created without a style layer.
    pub fn has_styles(&self) -> bool {
        self.has_styles
    }

    /// Style number at `position`; the end position reports the last run.
    pub fn style_at(&self, position: usize) -> usize {
        if !self.has_styles {
            return 0;
        }
        self.style.value_at(position.min(self.length())).unwrap_or(0)
    }

    /// Set the style of one byte. Returns `true` if it changed.
    pub fn set_style_at(&mut self, position: usize, style: usize) -> CoreResult<bool> {
        if !self.has_styles {
            return Ok(false);
        }
        if position >= self.length() {
            return Err(CoreError::out_of_bounds(position, self.length()));
        }
        self.style.set_value_at(position, style)
    }

    /// Set the style of `position..position + length`.
    pub fn set_style_for(&mut self, position: usize, length: usize, style: usize) -> CoreResult<FillResult> {
        if !self.has_styles {
            return Ok(FillResult {
                changed: false,
                position,
                length,
            });
        }
        self.style.fill_range(position, style, length)
    }

    /// The style runs as `(length, style)` pairs.
    pub fn style_runs(&self) -> Vec<(usize, usize)> {
        self.style.run_list()
    }

    /// Read access to the style layer.
    pub fn styles(&self) -> &RunStyles<usize> {
        &self.style
    }

    /// The indicator layers.
    pub fn indicators(&self) -> &DecorationList {
        &self.indicators
    }

    /// Mutable access to the indicator layers.
    pub fn indicators_mut(&mut self) -> &mut DecorationList {
        &mut self.indicators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buffer(text: &str) -> CellBuffer {
        let mut cb = CellBuffer::default();
        cb.set_undo_collection(false);
        cb.insert_string(0, text, false).unwrap();
        cb.set_undo_collection(true);
        cb
    }

    #[test]
    fn test_insert_tracks_lines() {
        let mut cb = buffer("line1\nline2");
        assert_eq!(cb.line_count(), 2);
        assert_eq!(cb.line(0).unwrap(), "line1");
        assert_eq!(cb.line(1).unwrap(), "line2");
        let change = cb.insert_string(3, "X\nY\n", false).unwrap();
        assert_eq!(change.lines_added, 2);
        assert_eq!(cb.text(), "linX\nY\ne1\nline2");
        assert_eq!(cb.line_starts(), vec![0, 5, 7, 10, 15]);
        assert_eq!(cb.line_from_position(6), 1);
        assert_eq!(cb.line_end(0).unwrap(), 4);
    }

    #[test]
    fn test_delete_removes_lines_and_returns_text() {
        let mut cb = buffer("a\nb\nc\nd");
        let change = cb.delete_chars(1, 4).unwrap();
        assert_eq!(change.text, "\nb\nc");
        assert_eq!(change.lines_added, -2);
        assert_eq!(cb.text(), "a\nd");
        assert_eq!(cb.line_starts(), vec![0, 2, 3]);
    }

    #[test]
    fn test_bounds_and_boundaries_are_checked() {
        let mut cb = buffer("héllo");
        assert!(matches!(
            cb.insert_string(9, "x", false),
            Err(CoreError::OutOfBounds { position: 9, length: 6 })
        ));
        assert!(matches!(
            cb.insert_string(2, "x", false),
            Err(CoreError::NotCharBoundary { position: 2 })
        ));
        assert!(matches!(cb.delete_chars(4, 5), Err(CoreError::RangeOutOfBounds { .. })));
        cb.set_read_only(true);
        assert!(matches!(cb.insert_string(0, "x", false), Err(CoreError::ReadOnly)));
    }

    #[test]
    fn test_styles_follow_text() {
        let mut cb = buffer("0123456789");
        cb.set_style_for(0, 5, 1).unwrap();
        cb.set_style_for(2, 2, 2).unwrap();
        assert_eq!(cb.style_runs(), vec![(2, 1), (2, 2), (1, 1), (5, 0)]);
        cb.insert_string(3, "ab", false).unwrap();
        assert_eq!(cb.style_at(4), 2);
        assert_eq!(cb.style_runs(), vec![(2, 1), (4, 2), (1, 1), (5, 0)]);
        cb.delete_chars(0, 7).unwrap();
        assert_eq!(cb.style_runs(), vec![(5, 0)]);
    }

    #[test]
    fn test_undo_and_redo_steps() {
        let mut cb = CellBuffer::default();
        cb.insert_string(0, "hello", false).unwrap();
        cb.delete_chars(1, 3).unwrap();
        assert_eq!(cb.text(), "ho");
        assert_eq!(cb.start_undo(), 1);
        let action = cb.perform_undo_step().unwrap();
        assert_eq!(action.kind, ActionType::Delete);
        assert_eq!(cb.text(), "hello");
        cb.start_undo();
        cb.perform_undo_step().unwrap();
        assert_eq!(cb.text(), "");
        assert!(cb.is_save_point());
        assert_eq!(cb.start_redo(), 1);
        cb.perform_redo_step().unwrap();
        assert_eq!(cb.text(), "hello");
        assert!(!cb.is_save_point());
    }

    #[test]
    fn test_styles_none_ignores_fills() {
        let options = DocumentOptions {
            styles_none: true,
            ..DocumentOptions::default()
        };
        let mut cb = CellBuffer::new(&options);
        cb.insert_string(0, "abc", false).unwrap();
        assert!(!cb.set_style_for(0, 3, 4).unwrap().changed);
        assert_eq!(cb.style_at(1), 0);
    }
}
