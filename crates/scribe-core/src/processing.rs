//! Style and fold assignment seam.
//!
//! Lexers and other derived-state producers do not touch the buffer directly. They read a
//! [`Document`] and return [`ProcessingEdit`] values, which
//! [`Document::apply_processing_edits`] applies in order. Later edits win where they overlap.

use crate::document::{Document, FoldLevel};
use crate::error::{CoreError, CoreResult};
use regex::Regex;

/// A change to derived document state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingEdit {
    /// Set the lexical style of a byte range.
    FillStyle {
        /// First byte.
        start: usize,
        /// Number of bytes.
        length: usize,
        /// Style number.
        style: usize,
    },
    /// Set an indicator value over a byte range.
    SetIndicator {
        /// Indicator number.
        indicator: usize,
        /// First byte.
        start: usize,
        /// Number of bytes.
        length: usize,
        /// Value to store; `0` clears.
        value: u32,
    },
    /// Remove an indicator from the whole document.
    ClearIndicator {
        /// Indicator number.
        indicator: usize,
    },
    /// Set the fold level of a line.
    SetFoldLevel {
        /// Document line.
        line: usize,
        /// New level.
        level: FoldLevel,
    },
}

/// A producer of [`ProcessingEdit`]s for a document.
pub trait DocumentProcessor {
    /// The error type returned by [`DocumentProcessor::process`].
    type Error;

    /// Compute the edits to apply. Implementations only read `doc`.
    fn process(&mut self, doc: &Document) -> Result<Vec<ProcessingEdit>, Self::Error>;
}

/// A single regex styling rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    style: usize,
    capture_group: Option<usize>,
}

impl RegexRule {
    /// Style every match of `pattern` with `style`.
    pub fn new(pattern: &str, style: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            style,
            capture_group: None,
        })
    }

    /// Style only a capture group of each match.
    pub fn with_capture_group(mut self, group: usize) -> Self {
        self.capture_group = Some(group);
        self
    }

    /// The style applied by this rule.
    pub fn style(&self) -> usize {
        self.style
    }

    fn matches<'t>(&'t self, line: &'t str) -> impl Iterator<Item = (usize, usize)> + 't {
        self.regex.captures_iter(line).filter_map(|caps| {
            let m = match self.capture_group {
                Some(group) => caps.get(group)?,
                None => caps.get(0)?,
            };
            (!m.is_empty()).then(|| (m.start(), m.end()))
        })
    }
}

/// A line-by-line regex styler.
///
/// Every line is first reset to `default_style`; then each rule's matches are filled in rule
/// order, so later rules override earlier ones.
#[derive(Debug, Clone)]
pub struct RegexStyler {
    rules: Vec<RegexRule>,
    default_style: usize,
}

impl RegexStyler {
    /// A styler with the given rules.
    pub fn new(rules: Vec<RegexRule>, default_style: usize) -> Self {
        Self { rules, default_style }
    }

    /// The rules in application order.
    pub fn rules(&self) -> &[RegexRule] {
        &self.rules
    }

    /// A small INI grammar: section names, keys and comments.
    pub fn ini_default(section: usize, key: usize, comment: usize) -> Result<Self, regex::Error> {
        Ok(Self::new(
            vec![
                RegexRule::new(r"^\s*\[([^\]]+)\]\s*$", section)?.with_capture_group(1),
                RegexRule::new(r"^\s*([^=\s]+)\s*=", key)?.with_capture_group(1),
                RegexRule::new(r"^\s*[;#].*$", comment)?,
            ],
            0,
        ))
    }

    /// Styling edits for lines `first..=last` of `doc`.
    pub fn style_lines(&self, doc: &Document, first: usize, last: usize) -> CoreResult<Vec<ProcessingEdit>> {
        let mut edits = Vec::new();
        for line in first..=last.min(doc.line_count().saturating_sub(1)) {
            let start = doc.line_start(line)?;
            let text = doc.get_line(line)?;
            let end = if line + 1 < doc.line_count() {
                doc.line_start(line + 1)?
            } else {
                doc.length()
            };
            if end > start {
                edits.push(ProcessingEdit::FillStyle {
                    start,
                    length: end - start,
                    style: self.default_style,
                });
            }
            for rule in &self.rules {
                for (from, to) in rule.matches(&text) {
                    edits.push(ProcessingEdit::FillStyle {
                        start: start + from,
                        length: to - from,
                        style: rule.style,
                    });
                }
            }
        }
        Ok(edits)
    }
}

impl DocumentProcessor for RegexStyler {
    type Error = CoreError;

    fn process(&mut self, doc: &Document) -> Result<Vec<ProcessingEdit>, Self::Error> {
        let from = doc.line_from_position(doc.end_styled());
        self.style_lines(doc, from, doc.line_count().saturating_sub(1))
    }
}

/// Fold levels from indentation.
///
/// A line's level number is `FoldLevel::BASE` plus its indentation in columns divided by
/// `indent_width`. Blank lines take the level of the next non-blank line and get the
/// whitespace flag. A line becomes a header when the next non-blank line is indented deeper.
#[derive(Debug, Clone, Copy)]
pub struct IndentFolder {
    /// Columns per fold level.
    pub indent_width: usize,
}

impl Default for IndentFolder {
    fn default() -> Self {
        Self { indent_width: 4 }
    }
}

impl IndentFolder {
    fn indent_of(&self, line: &str) -> Option<u32> {
        if line.trim().is_empty() {
            return None;
        }
        let columns: usize = line
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .map(|c| if c == '\t' { self.indent_width } else { 1 })
            .sum();
        Some((columns / self.indent_width.max(1)) as u32)
    }
}

impl DocumentProcessor for IndentFolder {
    type Error = CoreError;

    fn process(&mut self, doc: &Document) -> Result<Vec<ProcessingEdit>, Self::Error> {
        let indents = (0..doc.line_count())
            .map(|line| doc.get_line(line).map(|text| self.indent_of(&text)))
            .collect::<CoreResult<Vec<_>>>()?;
        let mut edits = Vec::with_capacity(indents.len());
        let mut next_indent = 0;
        for (line, indent) in indents.iter().enumerate().rev() {
            let level = match indent {
                None => FoldLevel(FoldLevel::BASE.0 + next_indent) | FoldLevel::WHITE_FLAG,
                Some(indent) => {
                    let mut level = FoldLevel(FoldLevel::BASE.0 + indent);
                    if next_indent > *indent {
                        level = level | FoldLevel::HEADER_FLAG;
                    }
                    next_indent = *indent;
                    level
                }
            };
            edits.push(ProcessingEdit::SetFoldLevel { line, level });
        }
        edits.reverse();
        Ok(edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_regex_styler_fills_lines() {
        let mut doc = Document::from_text("[core]\nname = x\n; note");
        let mut styler = RegexStyler::ini_default(1, 2, 3).unwrap();
        doc.apply_processor(&mut styler).unwrap();
        assert_eq!(doc.style_at(0), 0);
        assert_eq!(doc.style_at(1), 1);
        assert_eq!(doc.style_at(4), 1);
        assert_eq!(doc.style_at(5), 0);
        assert_eq!(doc.style_at(6), 0);
        assert_eq!(doc.style_at(7), 2);
        assert_eq!(doc.style_at(11), 0);
        assert_eq!(doc.style_at(17), 3);
        assert_eq!(doc.end_styled(), doc.length());
    }

    #[test]
    fn test_indent_folder_marks_headers() {
        let mut doc = Document::from_text("fn a\n    body\n\n    more\nend");
        doc.apply_processor(&mut IndentFolder::default()).unwrap();
        assert!(doc.fold_level(0).is_header());
        assert_eq!(doc.fold_level(1).number(), FoldLevel::BASE.0 + 1);
        assert!(doc.fold_level(2).is_whitespace());
        assert_eq!(doc.fold_level(4), FoldLevel::BASE);
        assert_eq!(doc.get_last_child(0, None, None), 3);
        assert_eq!(doc.get_fold_parent(3), Some(0));
    }
}
