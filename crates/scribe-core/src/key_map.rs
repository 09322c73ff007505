//! Key bindings.
//!
//! A [`KeyMap`] maps a key plus modifier set to an [`EditorCommand`]. Hosts translate their
//! native key events into [`Keys`] and [`KeyMod`] and hand the command found here to
//! [`EditModel::execute`](crate::edit_model::EditModel::execute).

use bitflags::bitflags;
use std::collections::BTreeMap;

bitflags! {
    /// Modifier keys held with a key.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct KeyMod: u32 {
        /// Shift.
        const SHIFT = 1;
        /// Control (Command on macOS hosts).
        const CTRL = 2;
        /// Alt / Option.
        const ALT = 4;
        /// Windows / Super.
        const SUPER = 8;
        /// Control on macOS hosts.
        const META = 16;
    }
}

/// A key, independent of the host's key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum Keys {
    Down,
    Up,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
    Insert,
    Escape,
    Back,
    Tab,
    Return,
    /// A printable character, compared case-sensitively.
    Char(char),
}

/// A command a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum EditorCommand {
    LineDown,
    LineDownExtend,
    LineUp,
    LineUpExtend,
    CharLeft,
    CharLeftExtend,
    CharRight,
    CharRightExtend,
    WordLeft,
    WordLeftExtend,
    WordRight,
    WordRightExtend,
    Home,
    HomeExtend,
    LineEnd,
    LineEndExtend,
    DocumentStart,
    DocumentStartExtend,
    DocumentEnd,
    DocumentEndExtend,
    DeleteBack,
    Clear,
    Tab,
    NewLine,
    Cancel,
    EditToggleOvertype,
    Undo,
    Redo,
    Cut,
    Copy,
    Paste,
    SelectAll,
}

/// A key and its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyModifiers {
    /// The key.
    pub key: Keys,
    /// Held modifiers.
    pub modifiers: KeyMod,
}

impl KeyModifiers {
    /// Pair a key with modifiers.
    pub fn new(key: Keys, modifiers: KeyMod) -> Self {
        Self { key, modifiers }
    }
}

const DEFAULT_BINDINGS: &[(Keys, KeyMod, EditorCommand)] = &[
    (Keys::Down, KeyMod::empty(), EditorCommand::LineDown),
    (Keys::Down, KeyMod::SHIFT, EditorCommand::LineDownExtend),
    (Keys::Up, KeyMod::empty(), EditorCommand::LineUp),
    (Keys::Up, KeyMod::SHIFT, EditorCommand::LineUpExtend),
    (Keys::Left, KeyMod::empty(), EditorCommand::CharLeft),
    (Keys::Left, KeyMod::SHIFT, EditorCommand::CharLeftExtend),
    (Keys::Left, KeyMod::CTRL, EditorCommand::WordLeft),
    (Keys::Left, KeyMod::SHIFT.union(KeyMod::CTRL), EditorCommand::WordLeftExtend),
    (Keys::Right, KeyMod::empty(), EditorCommand::CharRight),
    (Keys::Right, KeyMod::SHIFT, EditorCommand::CharRightExtend),
    (Keys::Right, KeyMod::CTRL, EditorCommand::WordRight),
    (Keys::Right, KeyMod::SHIFT.union(KeyMod::CTRL), EditorCommand::WordRightExtend),
    (Keys::Home, KeyMod::empty(), EditorCommand::Home),
    (Keys::Home, KeyMod::SHIFT, EditorCommand::HomeExtend),
    (Keys::Home, KeyMod::CTRL, EditorCommand::DocumentStart),
    (Keys::Home, KeyMod::SHIFT.union(KeyMod::CTRL), EditorCommand::DocumentStartExtend),
    (Keys::End, KeyMod::empty(), EditorCommand::LineEnd),
    (Keys::End, KeyMod::SHIFT, EditorCommand::LineEndExtend),
    (Keys::End, KeyMod::CTRL, EditorCommand::DocumentEnd),
    (Keys::End, KeyMod::SHIFT.union(KeyMod::CTRL), EditorCommand::DocumentEndExtend),
    (Keys::Delete, KeyMod::empty(), EditorCommand::Clear),
    (Keys::Delete, KeyMod::SHIFT, EditorCommand::Cut),
    (Keys::Insert, KeyMod::empty(), EditorCommand::EditToggleOvertype),
    (Keys::Insert, KeyMod::SHIFT, EditorCommand::Paste),
    (Keys::Insert, KeyMod::CTRL, EditorCommand::Copy),
    (Keys::Escape, KeyMod::empty(), EditorCommand::Cancel),
    (Keys::Back, KeyMod::empty(), EditorCommand::DeleteBack),
    (Keys::Back, KeyMod::SHIFT, EditorCommand::DeleteBack),
    (Keys::Back, KeyMod::ALT, EditorCommand::Undo),
    (Keys::Tab, KeyMod::empty(), EditorCommand::Tab),
    (Keys::Return, KeyMod::empty(), EditorCommand::NewLine),
    (Keys::Return, KeyMod::SHIFT, EditorCommand::NewLine),
    (Keys::Char('z'), KeyMod::CTRL, EditorCommand::Undo),
    (Keys::Char('y'), KeyMod::CTRL, EditorCommand::Redo),
    (Keys::Char('z'), KeyMod::CTRL.union(KeyMod::SHIFT), EditorCommand::Redo),
    (Keys::Char('x'), KeyMod::CTRL, EditorCommand::Cut),
    (Keys::Char('c'), KeyMod::CTRL, EditorCommand::Copy),
    (Keys::Char('v'), KeyMod::CTRL, EditorCommand::Paste),
    (Keys::Char('a'), KeyMod::CTRL, EditorCommand::SelectAll),
];

/// Key bindings ordered by key, then modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    bindings: BTreeMap<KeyModifiers, EditorCommand>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyMap {
    /// A key map with the default bindings.
    pub fn new() -> Self {
        let bindings = DEFAULT_BINDINGS
            .iter()
            .map(|&(key, modifiers, command)| (KeyModifiers::new(key, modifiers), command))
            .collect();
        Self { bindings }
    }

    /// Remove every binding.
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// Bind a key, replacing any existing binding.
    pub fn assign_cmd_key(&mut self, key: Keys, modifiers: KeyMod, command: EditorCommand) {
        self.bindings.insert(KeyModifiers::new(key, modifiers), command);
    }

    /// Remove a binding. Returns the command it was bound to.
    pub fn unassign(&mut self, key: Keys, modifiers: KeyMod) -> Option<EditorCommand> {
        self.bindings.remove(&KeyModifiers::new(key, modifiers))
    }

    /// The command bound to a key.
    pub fn find(&self, key: Keys, modifiers: KeyMod) -> Option<EditorCommand> {
        self.bindings.get(&KeyModifiers::new(key, modifiers)).copied()
    }

    /// Every binding in key order.
    pub fn key_map(&self) -> &BTreeMap<KeyModifiers, EditorCommand> {
        &self.bindings
    }
}
