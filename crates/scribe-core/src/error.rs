//! Error types shared by the editing core.

use crate::search::SearchError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

/// Recoverable failures reported by buffer, selection and loader operations.
///
/// Structural invariant violations inside the core are bugs and are asserted in debug builds;
/// they never show up here.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("position {position} is outside 0..={length}")]
    /// A position lies past the end of the buffer.
    OutOfBounds {
        /// The offending position.
        position: usize,
        /// Length of the buffer at the time of the call.
        length: usize,
    },
    #[error("range {start}..{end} is outside 0..={length}")]
    /// A range is reversed or extends past the end of the buffer.
    RangeOutOfBounds {
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
        /// Length of the buffer at the time of the call.
        length: usize,
    },
    #[error("line {line} is outside 0..{line_count}")]
    /// A line index does not exist.
    LineOutOfBounds {
        /// The offending line.
        line: usize,
        /// Number of lines in the document.
        line_count: usize,
    },
    #[error("position {position} is not on a UTF-8 character boundary")]
    /// A position splits a multi-byte character.
    NotCharBoundary {
        /// The offending position.
        position: usize,
    },
    #[error("selection index {index} is invalid for {count} ranges")]
    /// A selection range index does not exist.
    InvalidSelectionIndex {
        /// The offending index.
        index: usize,
        /// Number of ranges in the selection.
        count: usize,
    },
    #[error("document is read-only")]
    /// The document rejects modification.
    ReadOnly,
    #[error("cannot parse selection: {0}")]
    /// A serialized selection string is malformed.
    ParseSelection(String),
    #[error("text is not valid UTF-8: {0}")]
    /// Loaded bytes are not UTF-8.
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("loader failed: {0}")]
    /// Bulk loading could not complete.
    LoadFailed(String),
    #[error(transparent)]
    /// A search pattern failed to compile.
    Search(#[from] SearchError),
}

impl CoreError {
    pub(crate) fn out_of_bounds(position: usize, length: usize) -> Self {
        Self::OutOfBounds { position, length }
    }

    pub(crate) fn range(start: usize, end: usize, length: usize) -> Self {
        Self::RangeOutOfBounds { start, end, length }
    }
}
