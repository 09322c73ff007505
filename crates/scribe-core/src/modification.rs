//! Document change notifications.

use bitflags::bitflags;

bitflags! {
    /// What a [`DocModification`] describes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModificationFlags: u32 {
        /// Text was inserted.
        const INSERT_TEXT = 0x1;
        /// Text was deleted.
        const DELETE_TEXT = 0x2;
        /// Styles changed.
        const CHANGE_STYLE = 0x4;
        /// Fold levels changed.
        const CHANGE_FOLD = 0x8;
        /// The change was made by a user edit.
        const PERFORMED_USER = 0x10;
        /// The change was made by undo.
        const PERFORMED_UNDO = 0x20;
        /// The change was made by redo.
        const PERFORMED_REDO = 0x40;
        /// Part of an undo or redo step with several actions.
        const MULTI_STEP_UNDO_REDO = 0x80;
        /// The last action of an undo or redo step.
        const LAST_STEP_IN_UNDO_REDO = 0x100;
        /// Sent before text is inserted.
        const BEFORE_INSERT = 0x400;
        /// Sent before text is deleted.
        const BEFORE_DELETE = 0x800;
        /// An undo or redo step affected several lines.
        const MULTILINE_UNDO_REDO = 0x1000;
        /// The first action of a step.
        const START_ACTION = 0x2000;
        /// Indicators changed.
        const CHANGE_INDICATOR = 0x4000;
    }
}

impl ModificationFlags {
    /// `true` for changes that insert or delete text.
    pub fn changes_text(self) -> bool {
        self.intersects(Self::INSERT_TEXT | Self::DELETE_TEXT)
    }
}

/// One change to a document, as delivered to listeners and applied to view selections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocModification {
    /// Kind of change.
    pub flags: ModificationFlags,
    /// Byte position of the change.
    pub position: usize,
    /// Byte length of the change.
    pub length: usize,
    /// Lines added (negative when removed).
    pub lines_added: isize,
    /// Inserted or deleted text, when text changed.
    pub text: Option<String>,
    /// Line whose fold level changed.
    pub line: usize,
    /// New fold level.
    pub fold_level_now: u32,
    /// Previous fold level.
    pub fold_level_prev: u32,
}

impl DocModification {
    /// A text or style change.
    pub fn new(flags: ModificationFlags, position: usize, length: usize) -> Self {
        Self {
            flags,
            position,
            length,
            ..Self::default()
        }
    }

    /// A text change with its text and line delta.
    pub fn with_text(flags: ModificationFlags, position: usize, text: &str, lines_added: isize) -> Self {
        Self {
            flags,
            position,
            length: text.len(),
            lines_added,
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    /// A fold level change.
    pub fn fold(line: usize, fold_level_now: u32, fold_level_prev: u32) -> Self {
        Self {
            flags: ModificationFlags::CHANGE_FOLD,
            line,
            fold_level_now,
            fold_level_prev,
            ..Self::default()
        }
    }

    /// Signed length change of the document.
    pub fn delta(&self) -> isize {
        if self.flags.contains(ModificationFlags::INSERT_TEXT) {
            self.length as isize
        } else if self.flags.contains(ModificationFlags::DELETE_TEXT) {
            -(self.length as isize)
        } else {
            0
        }
    }
}
