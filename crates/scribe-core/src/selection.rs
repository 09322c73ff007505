//! Multiple selection ranges.
//!
//! A [`Selection`] holds one or more [`SelectionRange`]s, each an anchor and a caret, one of
//! which is the *main* range. Positions are byte offsets into the document; line and column are
//! derived from the document's line table when needed. Positions can carry virtual space, the
//! columns past a line end that rectangular selections reach into.
//!
//! Selections serialize to a compact string so undo history can store them:
//!
//! ```text
//! 3-7,12#1      two stream ranges, the second one main
//! R0-20         a rectangular selection from 0 to 20
//! 5v2           a caret at 5 with two columns of virtual space
//! ```

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::str::FromStr;

/// A simple `start..end` byte range where `start` may exceed `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    /// One end of the range.
    pub start: usize,
    /// The other end of the range.
    pub end: usize,
}

impl Range {
    /// Create a range.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// An empty range at `position`.
    pub fn at(position: usize) -> Self {
        Self::new(position, position)
    }

    /// `true` when both ends are equal.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Distance between the ends.
    pub fn len(&self) -> usize {
        self.start.abs_diff(self.end)
    }

    /// The lower end.
    pub fn first(&self) -> usize {
        self.start.min(self.end)
    }

    /// The upper end.
    pub fn last(&self) -> usize {
        self.start.max(self.end)
    }

    /// Is `position` within the range, ends included?
    pub fn contains(&self, position: usize) -> bool {
        self.first() <= position && position <= self.last()
    }

    /// Is the character after `position` within the range?
    pub fn contains_character(&self, position: usize) -> bool {
        self.first() <= position && position < self.last()
    }

    /// Does the range contain both ends of `other`?
    pub fn contains_range(&self, other: Range) -> bool {
        self.contains(other.start) && self.contains(other.end)
    }

    /// Do the ranges share at least one position?
    pub fn overlaps(&self, other: Range) -> bool {
        self.contains(other.start)
            || self.contains(other.end)
            || other.contains(self.start)
            || other.contains(self.end)
    }
}

/// A byte position plus columns of virtual space past a line end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SelectionPosition {
    position: usize,
    virtual_space: usize,
}

impl SelectionPosition {
    /// A position without virtual space.
    pub fn new(position: usize) -> Self {
        Self {
            position,
            virtual_space: 0,
        }
    }

    /// A position with virtual space.
    pub fn with_virtual_space(position: usize, virtual_space: usize) -> Self {
        Self {
            position,
            virtual_space,
        }
    }

    /// Byte position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move to `position`, dropping virtual space.
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
        self.virtual_space = 0;
    }

    /// Columns of virtual space.
    pub fn virtual_space(&self) -> usize {
        self.virtual_space
    }

    /// Set the columns of virtual space.
    pub fn set_virtual_space(&mut self, virtual_space: usize) {
        self.virtual_space = virtual_space;
    }

    /// `true` if any virtual space is set.
    pub fn is_virtual(&self) -> bool {
        self.virtual_space > 0
    }

    /// Adjust for an insertion or deletion of `length` bytes at `start`.
    ///
    /// Insertions move positions at or after `start`; text inserted exactly at a position fills
    /// its virtual space first. Positions inside a deleted span collapse to its start.
    pub fn move_for_insert_delete(&mut self, insertion: bool, start: usize, length: usize) {
        if insertion {
            if self.position == start {
                self.virtual_space -= self.virtual_space.min(length);
                self.position += length;
            } else if self.position > start {
                self.position += length;
            }
        } else if self.position > start {
            let end_deletion = start + length;
            if self.position > end_deletion {
                self.position -= length;
            } else {
                self.position = start;
                self.virtual_space = 0;
            }
        }
    }
}

impl fmt::Display for SelectionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.position)?;
        if self.virtual_space > 0 {
            write!(f, "v{}", self.virtual_space)?;
        }
        Ok(())
    }
}

impl FromStr for SelectionPosition {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |text: &str| {
            text.parse::<usize>()
                .map_err(|_| CoreError::ParseSelection(format!("bad position `{s}`")))
        };
        match s.split_once('v') {
            Some((position, virtual_space)) => Ok(Self::with_virtual_space(parse(position)?, parse(virtual_space)?)),
            None => Ok(Self::new(parse(s)?)),
        }
    }
}

/// One selection range: the fixed `anchor` and the moving `caret`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionRange {
    /// Where the caret is drawn.
    pub caret: SelectionPosition,
    /// The other end of the range.
    pub anchor: SelectionPosition,
}

impl SelectionRange {
    /// A range from `anchor` to `caret`.
    pub fn new(anchor: usize, caret: usize) -> Self {
        Self {
            caret: SelectionPosition::new(caret),
            anchor: SelectionPosition::new(anchor),
        }
    }

    /// An empty range (a plain caret) at `position`.
    pub fn caret_at(position: usize) -> Self {
        Self::new(position, position)
    }

    /// A range from explicit selection positions.
    pub fn from_positions(anchor: SelectionPosition, caret: SelectionPosition) -> Self {
        Self { caret, anchor }
    }

    /// `true` when anchor and caret coincide.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.caret
    }

    /// Selected byte count.
    pub fn len(&self) -> usize {
        self.anchor.position.abs_diff(self.caret.position)
    }

    /// The lower end.
    pub fn start(&self) -> SelectionPosition {
        self.anchor.min(self.caret)
    }

    /// The upper end.
    pub fn end(&self) -> SelectionPosition {
        self.anchor.max(self.caret)
    }

    /// `true` if the caret is before the anchor.
    pub fn is_backward(&self) -> bool {
        self.caret < self.anchor
    }

    /// The covered bytes as a plain range.
    pub fn as_range(&self) -> Range {
        Range::new(self.start().position, self.end().position)
    }

    /// Collapse both ends onto `position`.
    pub fn reset_to(&mut self, position: usize) {
        self.anchor = SelectionPosition::new(position);
        self.caret = self.anchor;
    }

    /// Is `position` within the range, ends included?
    pub fn contains(&self, position: usize) -> bool {
        self.as_range().contains(position)
    }

    /// Is the character after `position` within the range?
    pub fn contains_character(&self, position: usize) -> bool {
        self.as_range().contains_character(position)
    }

    /// Do the ranges overlap or touch?
    pub fn overlaps(&self, other: &SelectionRange) -> bool {
        self.as_range().overlaps(other.as_range())
    }

    /// The part of `start..end` this range covers.
    pub fn intersect(&self, start: usize, end: usize) -> Option<Range> {
        let first = self.start().position.max(start);
        let last = self.end().position.min(end);
        (first < last).then(|| Range::new(first, last))
    }

    /// Exchange anchor and caret.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.anchor, &mut self.caret);
    }

    /// Drop virtual space from both ends.
    pub fn clear_virtual_space(&mut self) {
        self.anchor.virtual_space = 0;
        self.caret.virtual_space = 0;
    }

    /// Adjust both ends for an insertion or deletion.
    pub fn move_for_insert_delete(&mut self, insertion: bool, start: usize, length: usize) {
        self.caret.move_for_insert_delete(insertion, start, length);
        self.anchor.move_for_insert_delete(insertion, start, length);
    }
}

impl fmt::Display for SelectionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.anchor)?;
        if !self.is_empty() {
            write!(f, "-{}", self.caret)?;
        }
        Ok(())
    }
}

impl FromStr for SelectionRange {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((anchor, caret)) => Ok(Self::from_positions(anchor.parse()?, caret.parse()?)),
            None => {
                let position: SelectionPosition = s.parse()?;
                Ok(Self::from_positions(position, position))
            }
        }
    }
}

/// How the ranges of a selection were made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionType {
    /// Ordinary character ranges.
    #[default]
    Stream,
    /// A rectangle, one range per line.
    Rectangle,
    /// Whole lines.
    Lines,
    /// A zero-width rectangle.
    Thin,
}

/// Whether a position is selected, and by which range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InSelection {
    /// Not selected.
    None,
    /// Selected by the main range.
    Main,
    /// Selected by another range.
    Additional,
}

/// The ranges selected in one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    ranges: Vec<SelectionRange>,
    range_rectangular: SelectionRange,
    main: usize,
    sel_type: SelectionType,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

impl Selection {
    /// A single caret at 0.
    pub fn new() -> Self {
        Self {
            ranges: vec![SelectionRange::default()],
            range_rectangular: SelectionRange::default(),
            main: 0,
            sel_type: SelectionType::Stream,
        }
    }

    /// How the selection was made.
    pub fn selection_type(&self) -> SelectionType {
        self.sel_type
    }

    /// Change how the selection is interpreted.
    pub fn set_selection_type(&mut self, sel_type: SelectionType) {
        self.sel_type = sel_type;
    }

    /// `true` for rectangular and thin selections.
    pub fn is_rectangular(&self) -> bool {
        matches!(self.sel_type, SelectionType::Rectangle | SelectionType::Thin)
    }

    /// The rectangle corners of a rectangular selection.
    pub fn rectangular(&self) -> SelectionRange {
        self.range_rectangular
    }

    /// Set the rectangle corners. Per-line ranges are computed by the caller.
    pub fn set_rectangular(&mut self, range: SelectionRange) {
        self.range_rectangular = range;
    }

    /// Number of ranges.
    pub fn count(&self) -> usize {
        self.ranges.len()
    }

    /// All ranges in order.
    pub fn ranges(&self) -> &[SelectionRange] {
        &self.ranges
    }

    /// Index of the main range.
    pub fn main(&self) -> usize {
        self.main
    }

    /// Make range `index` the main one.
    pub fn set_main(&mut self, index: usize) -> CoreResult<()> {
        self.check_index(index)?;
        self.main = index;
        Ok(())
    }

    fn check_index(&self, index: usize) -> CoreResult<()> {
        if index >= self.ranges.len() {
            return Err(CoreError::InvalidSelectionIndex {
                index,
                count: self.ranges.len(),
            });
        }
        Ok(())
    }

    /// Range `index`.
    pub fn range(&self, index: usize) -> CoreResult<&SelectionRange> {
        self.check_index(index)?;
        Ok(&self.ranges[index])
    }

    /// Mutable range `index`.
    pub fn range_mut(&mut self, index: usize) -> CoreResult<&mut SelectionRange> {
        self.check_index(index)?;
        Ok(&mut self.ranges[index])
    }

    /// The main range.
    pub fn range_main(&self) -> &SelectionRange {
        &self.ranges[self.main]
    }

    /// Mutable main range.
    pub fn range_main_mut(&mut self) -> &mut SelectionRange {
        &mut self.ranges[self.main]
    }

    /// Caret of the main range.
    pub fn main_caret(&self) -> usize {
        self.range_main().caret.position
    }

    /// Anchor of the main range.
    pub fn main_anchor(&self) -> usize {
        self.range_main().anchor.position
    }

    /// `true` if every range is empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.iter().all(SelectionRange::is_empty)
    }

    /// Total selected bytes.
    pub fn length(&self) -> usize {
        self.ranges.iter().map(SelectionRange::len).sum()
    }

    /// The span from the lowest to the highest selected position.
    pub fn limits(&self) -> Range {
        let first = self.ranges.iter().map(|r| r.start().position).min().unwrap_or(0);
        let last = self.ranges.iter().map(|r| r.end().position).max().unwrap_or(0);
        Range::new(first, last)
    }

    /// Replace everything with one stream range.
    pub fn set_selection(&mut self, range: SelectionRange) {
        self.ranges.clear();
        self.ranges.push(range);
        self.main = 0;
        self.sel_type = SelectionType::Stream;
    }

    /// Replace everything with one caret at `position`.
    pub fn set_caret(&mut self, position: usize) {
        self.set_selection(SelectionRange::caret_at(position));
    }

    /// Replace the ranges wholesale. An empty list leaves a caret at 0.
    pub fn set_ranges(&mut self, ranges: Vec<SelectionRange>, main: usize) {
        if ranges.is_empty() {
            self.set_caret(0);
            return;
        }
        self.main = main.min(ranges.len() - 1);
        self.ranges = ranges;
    }

    /// Reset to a single caret at 0.
    pub fn clear(&mut self) {
        self.set_caret(0);
        self.range_rectangular = SelectionRange::default();
    }

    /// Append a range and make it main.
    pub fn add_range(&mut self, range: SelectionRange) {
        self.ranges.push(range);
        self.main = self.ranges.len() - 1;
    }

    /// Remove range `index`. Returns `false` when it is the only range, which is kept.
    ///
    /// The main range stays on the same range when possible, otherwise moves to the nearest
    /// remaining one.
    pub fn drop_range(&mut self, index: usize) -> CoreResult<bool> {
        self.check_index(index)?;
        if self.ranges.len() == 1 {
            return Ok(false);
        }
        self.ranges.remove(index);
        if self.main > index {
            self.main -= 1;
        } else if self.main == index {
            self.main = index.min(self.ranges.len() - 1);
        }
        Ok(true)
    }

    /// Adjust every range for an insertion (`delta > 0`) or deletion (`delta < 0`) at
    /// `from_position`.
    pub fn move_ranges(&mut self, delta: isize, from_position: usize) {
        let insertion = delta > 0;
        let length = delta.unsigned_abs();
        if length == 0 {
            return;
        }
        for range in &mut self.ranges {
            range.move_for_insert_delete(insertion, from_position, length);
        }
        self.range_rectangular
            .move_for_insert_delete(insertion, from_position, length);
    }

    /// Merge ranges that overlap or touch, leaving them sorted by start.
    ///
    /// A merged range keeps the direction of its leftmost part. The main range becomes the
    /// merged range that absorbed it.
    pub fn merge_overlapping(&mut self) {
        if self.ranges.len() <= 1 {
            return;
        }
        let main_range = self.ranges[self.main];
        let mut ordered: Vec<(SelectionRange, bool)> = self
            .ranges
            .iter()
            .enumerate()
            .map(|(i, r)| (*r, i == self.main))
            .collect();
        ordered.sort_by(|(a, _), (b, _)| a.start().cmp(&b.start()).then_with(|| a.end().cmp(&b.end())));

        let mut merged: Vec<(SelectionRange, bool)> = Vec::with_capacity(ordered.len());
        for (range, is_main) in ordered {
            if let Some((last, last_main)) = merged.last_mut() {
                if range.start().position <= last.end().position {
                    let start = last.start().min(range.start());
                    let end = last.end().max(range.end());
                    *last = if last.is_backward() {
                        SelectionRange::from_positions(end, start)
                    } else {
                        SelectionRange::from_positions(start, end)
                    };
                    *last_main |= is_main;
                    continue;
                }
            }
            merged.push((range, is_main));
        }

        self.main = merged
            .iter()
            .position(|(_, is_main)| *is_main)
            .or_else(|| merged.iter().position(|(r, _)| r.contains(main_range.caret.position)))
            .unwrap_or(0);
        self.ranges = merged.into_iter().map(|(r, _)| r).collect();
    }

    /// Whether a position just after a line end counts as selected, for drawing the
    /// selection across the end of a line.
    pub fn in_selection_for_eol(&self, position: usize) -> InSelection {
        for (i, range) in self.ranges.iter().enumerate() {
            if !range.is_empty() && position > range.start().position && position <= range.end().position {
                return self.classify(i);
            }
        }
        InSelection::None
    }

    /// Whether the character after `position` is selected.
    pub fn character_in_selection(&self, position: usize) -> InSelection {
        self.ranges
            .iter()
            .position(|range| range.contains_character(position))
            .map_or(InSelection::None, |i| self.classify(i))
    }

    fn classify(&self, index: usize) -> InSelection {
        if index == self.main {
            InSelection::Main
        } else {
            InSelection::Additional
        }
    }

    /// Clamp every position to `limit`, e.g. after another view shortened the document.
    pub fn clamp_to(&mut self, limit: usize) {
        for end in self.positions_mut() {
            if end.position > limit {
                end.set_position(limit);
            }
        }
    }

    /// All range boundaries, for callers that need to adjust them together.
    pub(crate) fn positions_mut(&mut self) -> impl Iterator<Item = &mut SelectionPosition> {
        self.ranges
            .iter_mut()
            .chain(std::iter::once(&mut self.range_rectangular))
            .flat_map(|range| [&mut range.anchor, &mut range.caret])
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sel_type {
            SelectionType::Rectangle => write!(f, "R")?,
            SelectionType::Lines => write!(f, "L")?,
            SelectionType::Thin => write!(f, "T")?,
            SelectionType::Stream => {}
        }
        if self.is_rectangular() {
            write!(f, "{}", self.range_rectangular)?;
        } else {
            for (i, range) in self.ranges.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{range}")?;
            }
        }
        // A rectangle's main range follows from its corners.
        if self.main > 0 && !self.is_rectangular() {
            write!(f, "#{}", self.main)?;
        }
        Ok(())
    }
}

impl FromStr for Selection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sel_type, rest) = match s.chars().next() {
            Some('R') => (SelectionType::Rectangle, &s[1..]),
            Some('L') => (SelectionType::Lines, &s[1..]),
            Some('T') => (SelectionType::Thin, &s[1..]),
            _ => (SelectionType::Stream, s),
        };
        let (body, main) = match rest.split_once('#') {
            Some((body, main)) => (
                body,
                main.parse::<usize>()
                    .map_err(|_| CoreError::ParseSelection(format!("bad main index in `{s}`")))?,
            ),
            None => (rest, 0),
        };
        if body.is_empty() {
            return Err(CoreError::ParseSelection(format!("no ranges in `{s}`")));
        }
        let ranges = body
            .split(',')
            .map(str::parse)
            .collect::<CoreResult<Vec<SelectionRange>>>()?;
        let mut selection = Selection::new();
        let rectangular = matches!(sel_type, SelectionType::Rectangle | SelectionType::Thin);
        if rectangular {
            selection.range_rectangular = ranges[0];
        }
        let main = if rectangular { 0 } else { main };
        if main >= ranges.len() {
            return Err(CoreError::ParseSelection(format!("main index out of range in `{s}`")));
        }
        selection.ranges = ranges;
        selection.main = main.min(selection.ranges.len() - 1);
        selection.sel_type = sel_type;
        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_ranges() -> Selection {
        let mut sel = Selection::new();
        sel.set_selection(SelectionRange::new(0, 3));
        sel.add_range(SelectionRange::new(5, 8));
        sel
    }

    #[test]
    fn test_delete_shifts_later_ranges() {
        let mut sel = two_ranges();
        sel.move_ranges(-3, 0);
        assert_eq!(sel.ranges()[0], SelectionRange::caret_at(0));
        assert_eq!(sel.ranges()[1], SelectionRange::new(2, 5));
    }

    #[test]
    fn test_insert_shifts_positions_at_or_after() {
        let mut sel = two_ranges();
        sel.move_ranges(2, 5);
        assert_eq!(sel.ranges()[0], SelectionRange::new(0, 3));
        assert_eq!(sel.ranges()[1], SelectionRange::new(7, 10));
    }

    #[test]
    fn test_delete_collapses_inner_positions() {
        let mut sel = Selection::new();
        sel.set_selection(SelectionRange::new(2, 9));
        sel.move_ranges(-4, 4);
        assert_eq!(sel.ranges()[0], SelectionRange::new(2, 5));
        sel.set_selection(SelectionRange::new(5, 6));
        sel.move_ranges(-4, 4);
        assert_eq!(sel.ranges()[0], SelectionRange::caret_at(4));
    }

    #[test]
    fn test_drop_range_reindexes_main() {
        let mut sel = two_ranges();
        sel.add_range(SelectionRange::caret_at(12));
        assert_eq!(sel.main(), 2);
        assert!(sel.drop_range(0).unwrap());
        assert_eq!(sel.main(), 1);
        assert!(sel.drop_range(1).unwrap());
        assert_eq!(sel.main(), 0);
        assert!(!sel.drop_range(0).unwrap());
        assert!(matches!(
            sel.drop_range(3),
            Err(CoreError::InvalidSelectionIndex { index: 3, count: 1 })
        ));
    }

    #[test]
    fn test_merge_overlapping() {
        let mut sel = Selection::new();
        sel.set_selection(SelectionRange::new(10, 6));
        sel.add_range(SelectionRange::new(0, 4));
        sel.add_range(SelectionRange::new(4, 7));
        sel.add_range(SelectionRange::caret_at(20));
        sel.set_main(2).unwrap();
        sel.merge_overlapping();
        assert_eq!(
            sel.ranges(),
            &[SelectionRange::new(0, 10), SelectionRange::caret_at(20)]
        );
        assert_eq!(sel.main(), 0);
    }

    #[test]
    fn test_merge_keeps_separate_carets() {
        let mut sel = Selection::new();
        sel.set_caret(8);
        sel.add_range(SelectionRange::caret_at(3));
        sel.add_range(SelectionRange::caret_at(8));
        sel.merge_overlapping();
        assert_eq!(
            sel.ranges(),
            &[SelectionRange::caret_at(3), SelectionRange::caret_at(8)]
        );
        assert_eq!(sel.main(), 1);
    }

    #[test]
    fn test_in_selection_queries() {
        let sel = two_ranges();
        assert_eq!(sel.in_selection_for_eol(0), InSelection::None);
        assert_eq!(sel.in_selection_for_eol(3), InSelection::Additional);
        assert_eq!(sel.in_selection_for_eol(8), InSelection::Main);
        assert_eq!(sel.character_in_selection(5), InSelection::Main);
        assert_eq!(sel.character_in_selection(8), InSelection::None);
        assert_eq!(sel.limits(), Range::new(0, 8));
        assert_eq!(sel.length(), 6);
    }

    #[test]
    fn test_string_form() {
        let mut sel = two_ranges();
        sel.range_mut(0).unwrap().caret.set_virtual_space(2);
        let text = sel.to_string();
        assert_eq!(text, "0-3v2,5-8#1");
        let parsed: Selection = text.parse().unwrap();
        assert_eq!(parsed, sel);

        let rect: Selection = "R4-17".parse().unwrap();
        assert!(rect.is_rectangular());
        assert_eq!(rect.rectangular(), SelectionRange::new(4, 17));
        assert_eq!(rect.to_string(), "R4-17");

        assert!("".parse::<Selection>().is_err());
        assert!("3-x".parse::<Selection>().is_err());
    }

    #[test]
    fn test_insert_at_caret_consumes_virtual_space() {
        let mut caret = SelectionPosition::with_virtual_space(5, 3);
        caret.move_for_insert_delete(true, 5, 2);
        assert_eq!(caret, SelectionPosition::with_virtual_space(7, 1));
        caret.move_for_insert_delete(true, 7, 4);
        assert_eq!(caret, SelectionPosition::new(11));

        let mut later = SelectionPosition::with_virtual_space(9, 2);
        later.move_for_insert_delete(true, 5, 2);
        assert_eq!(later, SelectionPosition::with_virtual_space(11, 2));
    }

    #[test]
    fn test_rectangle_string_form_omits_main() {
        let mut sel = Selection::new();
        sel.set_ranges(vec![SelectionRange::new(1, 2), SelectionRange::new(6, 7)], 1);
        sel.set_selection_type(SelectionType::Rectangle);
        sel.set_rectangular(SelectionRange::new(1, 7));
        assert_eq!(sel.to_string(), "R1-7");

        // A main index on a rectangle is ignored.
        let parsed: Selection = "R1-8#1".parse().unwrap();
        assert_eq!(parsed.rectangular(), SelectionRange::new(1, 8));
        assert_eq!(parsed.main(), 0);
    }

    #[test]
    fn test_range_queries() {
        let range = Range::new(8, 3);
        assert_eq!(range.len(), 5);
        assert!(range.contains(8));
        assert!(!range.contains_character(8));
        assert!(range.overlaps(Range::new(8, 12)));
        assert!(!range.overlaps(Range::new(9, 12)));
    }
}
