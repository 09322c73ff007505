//! Fold and visibility state of document lines.
//!
//! [`ContractionState`] answers "which document line is on display line N" and the reverse,
//! taking hidden lines and multi-row lines into account. While every line is visible, expanded
//! and one row tall the mapping is the identity and no per-line data is stored at all; the
//! first call that breaks this builds the per-line tables.

use crate::error::{CoreError, CoreResult};
use crate::partitioning::Partitioning;
use crate::run_styles::RunStyles;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct LineTables {
    visible: RunStyles<bool>,
    expanded: RunStyles<bool>,
    heights: RunStyles<usize>,
    fold_display_texts: BTreeMap<usize, String>,
    // Partition n starts at the first display line of document line n.
    display_lines: Partitioning,
}

/// Per-line expanded/visible flags, fold display text and height.
#[derive(Debug, Clone)]
pub struct ContractionState {
    tables: Option<LineTables>,
    lines_in_document: usize,
}

impl Default for ContractionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractionState {
    /// A state for a one-line document with everything visible.
    pub fn new() -> Self {
        Self {
            tables: None,
            lines_in_document: 1,
        }
    }

    /// `true` while document and display lines map one to one.
    pub fn is_one_to_one(&self) -> bool {
        self.tables.is_none()
    }

    fn check_line(&self, line: usize) -> CoreResult<()> {
        if line >= self.lines_in_doc() {
            return Err(CoreError::LineOutOfBounds {
                line,
                line_count: self.lines_in_doc(),
            });
        }
        Ok(())
    }

    fn ensure_data(&mut self) -> CoreResult<&mut LineTables> {
        let tables = match self.tables.take() {
            Some(tables) => tables,
            None => {
                let mut tables = LineTables {
                    visible: RunStyles::new(),
                    expanded: RunStyles::new(),
                    heights: RunStyles::new(),
                    fold_display_texts: BTreeMap::new(),
                    display_lines: Partitioning::new(4),
                };
                for line in 0..self.lines_in_document {
                    Self::insert_table_line(&mut tables, line)?;
                }
                tracing::trace!(
                    target: "scribe.document",
                    lines = self.lines_in_document,
                    "built contraction tables"
                );
                tables
            }
        };
        Ok(self.tables.insert(tables))
    }

    fn insert_table_line(tables: &mut LineTables, line: usize) -> CoreResult<()> {
        tables.visible.insert_space(line, 1)?;
        tables.visible.set_value_at(line, true)?;
        tables.expanded.insert_space(line, 1)?;
        tables.expanded.set_value_at(line, true)?;
        tables.heights.insert_space(line, 1)?;
        tables.heights.set_value_at(line, 1)?;
        let shifted: Vec<(usize, String)> = tables.fold_display_texts.split_off(&line).into_iter().collect();
        tables
            .fold_display_texts
            .extend(shifted.into_iter().map(|(l, text)| (l + 1, text)));
        let line_display = tables.display_lines.position_from_partition(line)?;
        tables.display_lines.insert_partition(line, line_display)?;
        tables.display_lines.insert_text(line, 1)?;
        Ok(())
    }

    fn delete_table_line(tables: &mut LineTables, line: usize) -> CoreResult<()> {
        if tables.visible.value_at(line)? {
            let height = tables.heights.value_at(line)?;
            tables.display_lines.insert_text(line, -(height as isize))?;
        }
        tables.display_lines.remove_partition(line)?;
        tables.visible.delete_range(line, 1)?;
        tables.expanded.delete_range(line, 1)?;
        tables.heights.delete_range(line, 1)?;
        let mut shifted = tables.fold_display_texts.split_off(&line);
        shifted.remove(&line);
        tables
            .fold_display_texts
            .extend(shifted.into_iter().map(|(l, text)| (l - 1, text)));
        Ok(())
    }

    /// Number of document lines tracked.
    pub fn lines_in_doc(&self) -> usize {
        match &self.tables {
            None => self.lines_in_document,
            Some(tables) => tables.display_lines.partitions() - 1,
        }
    }

    /// Number of display lines, counting heights and skipping hidden lines.
    pub fn lines_displayed(&self) -> usize {
        match &self.tables {
            None => self.lines_in_document,
            Some(tables) => tables.display_lines.length(),
        }
    }

    /// First display line of document line `line_doc` (clamped to the end).
    pub fn display_from_doc(&self, line_doc: usize) -> usize {
        match &self.tables {
            None => line_doc.min(self.lines_in_document),
            Some(tables) => {
                let line = line_doc.min(tables.display_lines.partitions());
                tables.display_lines.position_from_partition(line).unwrap_or(0)
            }
        }
    }

    /// Last display line of document line `line_doc`.
    pub fn display_last_from_doc(&self, line_doc: usize) -> usize {
        (self.display_from_doc(line_doc) + self.height(line_doc)).saturating_sub(1)
    }

    /// Document line shown on display line `line_display` (clamped to the last line).
    pub fn doc_from_display(&self, line_display: usize) -> usize {
        match &self.tables {
            None => line_display,
            Some(tables) => {
                let displayed = tables.display_lines.length();
                tables
                    .display_lines
                    .partition_from_position(line_display.min(displayed))
            }
        }
    }

    /// Track `line_count` new lines starting at `line_doc`; new lines are visible and expanded.
    pub fn insert_lines(&mut self, line_doc: usize, line_count: usize) -> CoreResult<()> {
        if line_doc > self.lines_in_doc() {
            return Err(CoreError::LineOutOfBounds {
                line: line_doc,
                line_count: self.lines_in_doc(),
            });
        }
        match &mut self.tables {
            None => self.lines_in_document += line_count,
            Some(tables) => {
                for offset in 0..line_count {
                    Self::insert_table_line(tables, line_doc + offset)?;
                }
            }
        }
        Ok(())
    }

    /// Stop tracking `line_count` lines starting at `line_doc`.
    pub fn delete_lines(&mut self, line_doc: usize, line_count: usize) -> CoreResult<()> {
        if line_doc + line_count > self.lines_in_doc() {
            return Err(CoreError::LineOutOfBounds {
                line: line_doc + line_count,
                line_count: self.lines_in_doc(),
            });
        }
        match &mut self.tables {
            None => self.lines_in_document -= line_count,
            Some(tables) => {
                for _ in 0..line_count {
                    Self::delete_table_line(tables, line_doc)?;
                }
            }
        }
        Ok(())
    }

    /// Whether `line_doc` is shown. Lines past the end count as visible.
    pub fn visible(&self, line_doc: usize) -> bool {
        match &self.tables {
            None => true,
            Some(tables) => {
                line_doc >= tables.visible.length() || tables.visible.value_at(line_doc).unwrap_or(true)
            }
        }
    }

    /// Show or hide `line_start..=line_end`. Returns `true` if the display changed.
    pub fn set_visible(&mut self, line_start: usize, line_end: usize, visible: bool) -> CoreResult<bool> {
        if self.is_one_to_one() && visible {
            return Ok(false);
        }
        if line_start > line_end || line_end >= self.lines_in_doc() {
            return Err(CoreError::LineOutOfBounds {
                line: line_end,
                line_count: self.lines_in_doc(),
            });
        }
        let tables = self.ensure_data()?;
        let mut delta: isize = 0;
        for line in line_start..=line_end {
            if tables.visible.value_at(line)? != visible {
                let height = tables.heights.value_at(line)? as isize;
                let difference = if visible { height } else { -height };
                tables.visible.set_value_at(line, visible)?;
                tables.display_lines.insert_text(line, difference)?;
                delta += difference;
            }
        }
        Ok(delta != 0)
    }

    /// `true` if any line is hidden.
    pub fn hidden_lines(&self) -> bool {
        match &self.tables {
            None => false,
            Some(tables) => !tables.visible.all_same_as(true),
        }
    }

    /// Per-line fold display text, if one was set.
    pub fn fold_display_text(&self, line_doc: usize) -> Option<&str> {
        self.tables
            .as_ref()
            .and_then(|tables| tables.fold_display_texts.get(&line_doc))
            .map(String::as_str)
    }

    /// Set or clear the fold display text of `line_doc`. Returns `true` on change.
    pub fn set_fold_display_text(&mut self, line_doc: usize, text: Option<&str>) -> CoreResult<bool> {
        self.check_line(line_doc)?;
        let text = text.filter(|t| !t.is_empty());
        if self.fold_display_text(line_doc) == text {
            return Ok(false);
        }
        let tables = self.ensure_data()?;
        match text {
            Some(text) => {
                tables.fold_display_texts.insert(line_doc, text.to_string());
            }
            None => {
                tables.fold_display_texts.remove(&line_doc);
            }
        }
        Ok(true)
    }

    /// Whether `line_doc` is expanded.
    pub fn expanded(&self, line_doc: usize) -> bool {
        match &self.tables {
            None => true,
            Some(tables) => tables.expanded.value_at(line_doc).unwrap_or(true),
        }
    }

    /// Expand or contract `line_doc`. Returns `true` on change.
    pub fn set_expanded(&mut self, line_doc: usize, expanded: bool) -> CoreResult<bool> {
        if self.is_one_to_one() && expanded {
            return Ok(false);
        }
        self.check_line(line_doc)?;
        let tables = self.ensure_data()?;
        if tables.expanded.value_at(line_doc)? == expanded {
            return Ok(false);
        }
        tables.expanded.set_value_at(line_doc, expanded)?;
        Ok(true)
    }

    /// `true` when `line_doc` is contracted and has a fold display text to show.
    pub fn fold_display_text_shown(&self, line_doc: usize) -> bool {
        !self.expanded(line_doc) && self.fold_display_text(line_doc).is_some()
    }

    /// First contracted line at or after `line_doc_start`.
    pub fn contracted_next(&self, line_doc_start: usize) -> Option<usize> {
        let tables = self.tables.as_ref()?;
        if line_doc_start >= self.lines_in_doc() {
            return None;
        }
        if !tables.expanded.value_at(line_doc_start).unwrap_or(true) {
            return Some(line_doc_start);
        }
        let next_change = tables.expanded.end_run(line_doc_start);
        (next_change < self.lines_in_doc()).then_some(next_change)
    }

    /// Number of display rows used by `line_doc`.
    pub fn height(&self, line_doc: usize) -> usize {
        match &self.tables {
            None => 1,
            Some(tables) => tables.heights.value_at(line_doc).unwrap_or(1),
        }
    }

    /// Set the number of display rows of `line_doc`. Returns `true` on change.
    pub fn set_height(&mut self, line_doc: usize, height: usize) -> CoreResult<bool> {
        if self.is_one_to_one() && height == 1 {
            return Ok(false);
        }
        self.check_line(line_doc)?;
        let tables = self.ensure_data()?;
        let current = tables.heights.value_at(line_doc)?;
        if current == height {
            return Ok(false);
        }
        if tables.visible.value_at(line_doc)? {
            tables
                .display_lines
                .insert_text(line_doc, height as isize - current as isize)?;
        }
        tables.heights.set_value_at(line_doc, height)?;
        Ok(true)
    }

    /// Make every line visible, expanded and one row tall again.
    pub fn show_all(&mut self) {
        let lines = self.lines_in_doc();
        self.tables = None;
        self.lines_in_document = lines;
    }

    /// Reset to a single visible line.
    pub fn clear(&mut self) {
        self.tables = None;
        self.lines_in_document = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_lines(lines: usize) -> ContractionState {
        let mut cs = ContractionState::new();
        cs.insert_lines(1, lines - 1).unwrap();
        cs
    }

    #[test]
    fn test_one_to_one_by_default() {
        let cs = state_with_lines(5);
        assert!(cs.is_one_to_one());
        assert_eq!(cs.lines_in_doc(), 5);
        assert_eq!(cs.lines_displayed(), 5);
        assert_eq!(cs.display_from_doc(3), 3);
        assert_eq!(cs.doc_from_display(4), 4);
        assert!(cs.expanded(2));
        assert_eq!(cs.contracted_next(0), None);
    }

    #[test]
    fn test_hiding_lines_shifts_display_lines() {
        let mut cs = state_with_lines(6);
        cs.set_expanded(1, false).unwrap();
        assert!(cs.set_visible(2, 3, false).unwrap());
        assert!(!cs.set_visible(2, 3, false).unwrap());
        assert_eq!(cs.lines_displayed(), 4);
        assert!(cs.hidden_lines());
        assert_eq!(cs.display_from_doc(4), 2);
        assert_eq!(cs.doc_from_display(2), 4);
        assert_eq!(cs.contracted_next(0), Some(1));
        assert_eq!(cs.contracted_next(2), None);
        cs.set_visible(2, 3, true).unwrap();
        assert_eq!(cs.lines_displayed(), 6);
        assert!(!cs.hidden_lines());
    }

    #[test]
    fn test_heights() {
        let mut cs = state_with_lines(3);
        assert!(!cs.set_height(1, 1).unwrap());
        assert!(cs.set_height(1, 3).unwrap());
        assert_eq!(cs.lines_displayed(), 5);
        assert_eq!(cs.display_from_doc(2), 4);
        assert_eq!(cs.display_last_from_doc(1), 3);
        assert_eq!(cs.doc_from_display(3), 1);
    }

    #[test]
    fn test_insert_and_delete_lines_keep_texts_aligned() {
        let mut cs = state_with_lines(4);
        cs.set_fold_display_text(2, Some("...")).unwrap();
        cs.set_expanded(2, false).unwrap();
        cs.insert_lines(1, 2).unwrap();
        assert_eq!(cs.lines_in_doc(), 6);
        assert_eq!(cs.fold_display_text(4), Some("..."));
        assert!(!cs.expanded(4));
        assert!(cs.fold_display_text_shown(4));
        cs.delete_lines(0, 2).unwrap();
        assert_eq!(cs.fold_display_text(2), Some("..."));
        assert_eq!(cs.lines_displayed(), 4);
        assert!(cs.delete_lines(3, 2).is_err());
    }

    #[test]
    fn test_show_all_resets_tables() {
        let mut cs = state_with_lines(4);
        cs.set_visible(1, 2, false).unwrap();
        cs.show_all();
        assert!(cs.is_one_to_one());
        assert_eq!(cs.lines_displayed(), 4);
    }

    #[test]
    fn test_fold_display_text_updates() {
        let mut cs = state_with_lines(2);
        assert!(cs.set_fold_display_text(0, Some("{...}")).unwrap());
        assert!(!cs.set_fold_display_text(0, Some("{...}")).unwrap());
        assert!(cs.set_fold_display_text(0, Some("")).unwrap());
        assert_eq!(cs.fold_display_text(0), None);
    }
}
