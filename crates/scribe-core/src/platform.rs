//! Capabilities the core needs from a windowing backend.
//!
//! Each capability is a small trait: [`TextSurface`] realises fonts and measures text,
//! [`ListPopup`] shows completion lists, [`ContextMenu`] shows the edit menu and [`Clipboard`]
//! carries cut and paste. The in-memory implementations here back headless use and tests.

use crate::style::{ColourRgba, FONT_SIZE_MULTIPLIER, FontSpecification};
use thiserror::Error;

/// Handle of a font allocated by a [`TextSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub u32);

/// Font realisation failures.
#[derive(Debug, Error)]
pub enum FontError {
    /// The backend has no face with this name.
    #[error("font not available: {0}")]
    Unavailable(String),
    /// The backend failed for another reason.
    #[error("font backend error: {0}")]
    Backend(String),
}

/// Host defaults for fonts, colours and timing.
#[derive(Debug, Clone, Copy)]
pub struct PlatformDefaults;

impl PlatformDefaults {
    /// Face used by the default style.
    pub const DEFAULT_FONT: &'static str = "Courier New";
    /// Default size in points.
    pub const DEFAULT_FONT_SIZE: i32 = 11;
    /// Window chrome background.
    pub const CHROME: ColourRgba = ColourRgba::from_rgb_hex(0xF0F0F0);
    /// Highlighted chrome.
    pub const CHROME_HIGHLIGHT: ColourRgba = ColourRgba::from_rgb_hex(0x0078D4);
    /// Maximum delay between the clicks of a double click, in milliseconds.
    pub const DOUBLE_CLICK_TIME_MS: u64 = 500;
}

/// Font allocation and text measurement.
pub trait TextSurface {
    /// Allocate a font at `device_height` points.
    fn allocate_font(&mut self, spec: &FontSpecification, device_height: f32) -> Result<FontId, FontError>;
    /// Convert a size in hundredths of a point to device units.
    fn device_height_font(&self, size: i32) -> f32 {
        size as f32
    }
    /// Ascent of `font`.
    fn ascent(&self, font: FontId) -> f32;
    /// Descent of `font`.
    fn descent(&self, font: FontId) -> f32;
    /// Internal leading of `font`.
    fn internal_leading(&self, font: FontId) -> f32;
    /// Line height of `font`.
    fn height(&self, font: FontId) -> f32;
    /// Average character width of `font`.
    fn average_char_width(&self, font: FontId) -> f32;
    /// Width of `text` drawn in `font`.
    fn width_text(&self, font: FontId, text: &str) -> f32;
}

/// A surface that measures every font with fixed metrics.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    allocated: Vec<FontSpecification>,
    missing: Vec<String>,
}

impl HeadlessSurface {
    /// Ascent reported for every font.
    pub const ASCENT: f32 = 10.0;
    /// Descent reported for every font.
    pub const DESCENT: f32 = 3.0;
    /// Internal leading reported for every font.
    pub const INTERNAL_LEADING: f32 = 0.0;
    /// Line height reported for every font.
    pub const HEIGHT: f32 = 13.0;
    /// Width of every character.
    pub const AVERAGE_CHAR_WIDTH: f32 = 7.0;

    /// A surface that realises every font.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make allocation of the named face fail.
    pub fn with_missing_font(mut self, name: &str) -> Self {
        self.missing.push(name.to_string());
        self
    }

    /// Number of fonts allocated so far.
    pub fn allocated(&self) -> usize {
        self.allocated.len()
    }
}

impl TextSurface for HeadlessSurface {
    fn allocate_font(&mut self, spec: &FontSpecification, _device_height: f32) -> Result<FontId, FontError> {
        if let Some(name) = spec.font_name.as_deref().filter(|name| self.missing.iter().any(|m| m == name)) {
            return Err(FontError::Unavailable(name.to_string()));
        }
        self.allocated.push(spec.clone());
        Ok(FontId(self.allocated.len() as u32 - 1))
    }

    fn device_height_font(&self, size: i32) -> f32 {
        size as f32 / FONT_SIZE_MULTIPLIER as f32
    }

    fn ascent(&self, _font: FontId) -> f32 {
        Self::ASCENT
    }

    fn descent(&self, _font: FontId) -> f32 {
        Self::DESCENT
    }

    fn internal_leading(&self, _font: FontId) -> f32 {
        Self::INTERNAL_LEADING
    }

    fn height(&self, _font: FontId) -> f32 {
        Self::HEIGHT
    }

    fn average_char_width(&self, _font: FontId) -> f32 {
        Self::AVERAGE_CHAR_WIDTH
    }

    fn width_text(&self, _font: FontId, text: &str) -> f32 {
        text.chars().count() as f32 * Self::AVERAGE_CHAR_WIDTH
    }
}

/// A pop-up list, used for word completion.
pub trait ListPopup {
    /// Remove every item.
    fn clear(&mut self);
    /// Add an item at the end.
    fn append(&mut self, item: &str);
    /// Number of items.
    fn len(&self) -> usize;
    /// `true` when there are no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Select an item, or nothing.
    fn select(&mut self, index: Option<usize>);
    /// The selected item.
    fn selection(&self) -> Option<usize>;
    /// First item starting with `prefix`.
    fn find(&self, prefix: &str) -> Option<usize>;
    /// Text of an item.
    fn value(&self, index: usize) -> Option<&str>;
    /// Show or hide the list.
    fn show(&mut self, visible: bool);
    /// Rows visible without scrolling.
    fn visible_rows(&self) -> usize {
        10
    }
}

/// An in-memory [`ListPopup`].
#[derive(Debug, Clone, Default)]
pub struct VecListPopup {
    items: Vec<String>,
    selection: Option<usize>,
    visible: bool,
}

impl VecListPopup {
    /// An empty hidden list.
    pub fn new() -> Self {
        Self::default()
    }

    /// The items in order.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// `true` while shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl ListPopup for VecListPopup {
    fn clear(&mut self) {
        self.items.clear();
        self.selection = None;
    }

    fn append(&mut self, item: &str) {
        self.items.push(item.to_string());
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn select(&mut self, index: Option<usize>) {
        self.selection = index.filter(|i| *i < self.items.len());
    }

    fn selection(&self) -> Option<usize> {
        self.selection
    }

    fn find(&self, prefix: &str) -> Option<usize> {
        self.items.iter().position(|item| item.starts_with(prefix))
    }

    fn value(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    fn show(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// Commands offered by the edit context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum MenuCommand {
    Undo = 10,
    Redo = 11,
    Cut = 12,
    Copy = 13,
    Paste = 14,
    Delete = 15,
    SelectAll = 16,
}

impl MenuCommand {
    /// Numeric menu id.
    pub fn id(self) -> u32 {
        self as u32
    }

    /// The command with menu id `id`.
    pub fn from_id(id: u32) -> Option<Self> {
        [
            Self::Undo,
            Self::Redo,
            Self::Cut,
            Self::Copy,
            Self::Paste,
            Self::Delete,
            Self::SelectAll,
        ]
        .into_iter()
        .find(|command| command.id() == id)
    }
}

/// A pop-up menu.
pub trait ContextMenu {
    /// Remove every entry.
    fn clear(&mut self);
    /// Add a command entry.
    fn add_item(&mut self, label: &str, command: MenuCommand, enabled: bool);
    /// Add a separator.
    fn add_separator(&mut self);
    /// Show the menu at a point in view coordinates.
    fn show(&mut self, x: i32, y: i32);
}

/// One entry of a [`RecordingMenu`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    /// A command.
    Item {
        /// Display label.
        label: String,
        /// Command run when chosen.
        command: MenuCommand,
        /// `false` greys the entry out.
        enabled: bool,
    },
    /// A separator line.
    Separator,
}

/// A [`ContextMenu`] that records what was added.
#[derive(Debug, Clone, Default)]
pub struct RecordingMenu {
    entries: Vec<MenuEntry>,
    shown_at: Option<(i32, i32)>,
}

impl RecordingMenu {
    /// An empty menu.
    pub fn new() -> Self {
        Self::default()
    }

    /// The entries in order.
    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    /// Where the menu was last shown.
    pub fn shown_at(&self) -> Option<(i32, i32)> {
        self.shown_at
    }

    /// Whether `command` is present and enabled.
    pub fn is_enabled(&self, command: MenuCommand) -> Option<bool> {
        self.entries.iter().find_map(|entry| match entry {
            MenuEntry::Item { command: c, enabled, .. } if *c == command => Some(*enabled),
            _ => None,
        })
    }
}

impl ContextMenu for RecordingMenu {
    fn clear(&mut self) {
        self.entries.clear();
        self.shown_at = None;
    }

    fn add_item(&mut self, label: &str, command: MenuCommand, enabled: bool) {
        self.entries.push(MenuEntry::Item {
            label: label.to_string(),
            command,
            enabled,
        });
    }

    fn add_separator(&mut self) {
        self.entries.push(MenuEntry::Separator);
    }

    fn show(&mut self, x: i32, y: i32) {
        self.shown_at = Some((x, y));
    }
}

/// Clipboard access.
pub trait Clipboard {
    /// Replace the clipboard content. `rectangular` marks a column block.
    fn set_text(&mut self, text: &str, rectangular: bool);
    /// The clipboard text, if any.
    fn text(&self) -> Option<&str>;
    /// `true` when the content was copied from a rectangular selection.
    fn is_rectangular(&self) -> bool;
}

/// A clipboard private to the process.
#[derive(Debug, Clone, Default)]
pub struct LocalClipboard {
    text: Option<String>,
    rectangular: bool,
}

impl LocalClipboard {
    /// An empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for LocalClipboard {
    fn set_text(&mut self, text: &str, rectangular: bool) {
        self.text = Some(text.to_string());
        self.rectangular = rectangular;
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn is_rectangular(&self) -> bool {
        self.rectangular
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_surface_metrics() {
        let mut surface = HeadlessSurface::new().with_missing_font("Nope");
        let font = surface.allocate_font(&FontSpecification::default(), 10.0).unwrap();
        assert_eq!(surface.ascent(font), 10.0);
        assert_eq!(surface.descent(font), 3.0);
        assert_eq!(surface.width_text(font, "abc"), 21.0);
        let missing = FontSpecification::new(Some("Nope"), 1000);
        assert!(matches!(surface.allocate_font(&missing, 10.0), Err(FontError::Unavailable(_))));
        assert_eq!(surface.allocated(), 1);
    }

    #[test]
    fn test_list_popup_find_and_select() {
        let mut list = VecListPopup::new();
        for item in ["alpha", "beta", "betamax"] {
            list.append(item);
        }
        assert_eq!(list.find("bet"), Some(1));
        assert_eq!(list.find("z"), None);
        list.select(Some(5));
        assert_eq!(list.selection(), None);
        list.select(Some(2));
        assert_eq!(list.value(2), Some("betamax"));
    }

    #[test]
    fn test_menu_ids() {
        assert_eq!(MenuCommand::Undo.id(), 10);
        assert_eq!(MenuCommand::from_id(16), Some(MenuCommand::SelectAll));
        assert_eq!(MenuCommand::from_id(17), None);
    }
}
