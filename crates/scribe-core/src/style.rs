//! Font and colour attributes of a class of text.

use crate::platform::{FontId, PlatformDefaults};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Font sizes are stored in hundredths of a point.
pub const FONT_SIZE_MULTIPLIER: i32 = 100;

/// An RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColourRgba {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha; 0xFF is opaque.
    pub a: u8,
}

impl ColourRgba {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(0xFF, 0xFF, 0xFF);

    /// An opaque colour.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    /// An opaque colour from `0xRRGGBB`.
    pub const fn from_rgb_hex(rgb: u32) -> Self {
        Self::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// The same colour with a different alpha.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// `0xRRGGBB` without alpha.
    pub const fn to_rgb_hex(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// `true` when alpha is 0xFF.
    pub const fn is_opaque(self) -> bool {
        self.a == 0xFF
    }
}

impl fmt::Display for ColourRgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if !self.is_opaque() {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

/// Font weight, 100 to 900.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FontWeight(pub u16);

impl FontWeight {
    /// Regular text.
    pub const NORMAL: Self = Self(400);
    /// Semi-bold text.
    pub const SEMI_BOLD: Self = Self(600);
    /// Bold text.
    pub const BOLD: Self = Self(700);
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Font width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[allow(missing_docs)]
pub enum FontStretch {
    UltraCondensed,
    ExtraCondensed,
    Condensed,
    SemiCondensed,
    #[default]
    Normal,
    SemiExpanded,
    Expanded,
    ExtraExpanded,
    UltraExpanded,
}

/// Antialiasing requested for a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[allow(missing_docs)]
pub enum FontQuality {
    #[default]
    Default,
    NonAntialiased,
    Antialiased,
    LcdOptimized,
}

/// Character set hint passed to the font backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharacterSet(pub u8);

impl CharacterSet {
    /// ANSI.
    pub const ANSI: Self = Self(0);
    /// Platform default.
    pub const DEFAULT: Self = Self(1);
}

impl Default for CharacterSet {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything needed to realise a font.
///
/// Ordering compares the font name, then weight, italic, size, stretch, character set, quality
/// and the monospace check, so equal specifications share one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FontSpecification {
    /// Face name; `None` leaves the choice to the backend.
    pub font_name: Option<String>,
    /// Weight.
    pub weight: FontWeight,
    /// Italic.
    pub italic: bool,
    /// Size in hundredths of a point.
    pub size: i32,
    /// Width.
    pub stretch: FontStretch,
    /// Character set.
    pub character_set: CharacterSet,
    /// Antialiasing.
    pub extra_font_flag: FontQuality,
    /// Measure ASCII glyphs to detect a monospaced font.
    pub check_monospaced: bool,
}

impl Default for FontSpecification {
    fn default() -> Self {
        Self::new(None, 10 * FONT_SIZE_MULTIPLIER)
    }
}

impl FontSpecification {
    /// A specification with default attributes.
    pub fn new(font_name: Option<&str>, size: i32) -> Self {
        Self {
            font_name: font_name.map(str::to_string),
            weight: FontWeight::NORMAL,
            italic: false,
            size,
            stretch: FontStretch::Normal,
            character_set: CharacterSet::DEFAULT,
            extra_font_flag: FontQuality::Default,
            check_monospaced: false,
        }
    }
}

/// Measurements of a realised font.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMeasurements {
    /// Distance from baseline to top.
    pub ascent: f32,
    /// Distance from baseline to bottom.
    pub descent: f32,
    /// Top of a capital letter to baseline.
    pub capital_height: f32,
    /// Average character width.
    pub ave_char_width: f32,
    /// Width of one character when the font is monospaced.
    pub monospace_character_width: f32,
    /// Width of a space.
    pub space_width: f32,
    /// `true` when every printable ASCII character has the same width.
    pub monospace_ascii: bool,
    /// Zoomed size in hundredths of a point.
    pub size_zoomed: i32,
}

impl Default for FontMeasurements {
    fn default() -> Self {
        Self {
            ascent: 1.0,
            descent: 1.0,
            capital_height: 1.0,
            ave_char_width: 1.0,
            monospace_character_width: 1.0,
            space_width: 1.0,
            monospace_ascii: false,
            size_zoomed: 2,
        }
    }
}

/// Case conversion applied when displaying a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum CaseForce {
    #[default]
    Mixed,
    Upper,
    Lower,
    Camel,
}

impl CaseForce {
    /// Apply the conversion to `text`.
    pub fn apply(self, text: &str) -> String {
        match self {
            Self::Mixed => text.to_string(),
            Self::Upper => text.to_uppercase(),
            Self::Lower => text.to_lowercase(),
            Self::Camel => {
                let mut out = String::with_capacity(text.len());
                let mut previous_was_word = false;
                for ch in text.chars() {
                    if previous_was_word {
                        out.extend(ch.to_lowercase());
                    } else {
                        out.extend(ch.to_uppercase());
                    }
                    previous_was_word = ch.is_alphanumeric();
                }
                out
            }
        }
    }
}

/// A style: font specification, colours and display flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    /// The requested font.
    pub font: FontSpecification,
    /// Measurements copied from the realised font.
    pub measurements: FontMeasurements,
    /// Text colour.
    pub fore: ColourRgba,
    /// Background colour.
    pub back: ColourRgba,
    /// Fill the background past the line end.
    pub eol_filled: bool,
    /// Underline the text.
    pub underline: bool,
    /// Display case conversion.
    pub case_force: CaseForce,
    /// Draw the text at all.
    pub visible: bool,
    /// Allow edits inside text of this style.
    pub changeable: bool,
    /// Treat as a clickable hotspot.
    pub hotspot: bool,
    /// Text drawn in place of invisible text.
    pub invisible_representation: String,
    /// The realised font, once [`ViewStyle::refresh`](crate::view_style::ViewStyle::refresh) ran.
    pub realised: Option<FontId>,
}

impl Default for Style {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Style {
    /// A style in the platform's default font size.
    pub fn new(font_name: Option<&str>) -> Self {
        Self {
            font: FontSpecification::new(font_name, PlatformDefaults::DEFAULT_FONT_SIZE * FONT_SIZE_MULTIPLIER),
            measurements: FontMeasurements::default(),
            fore: ColourRgba::BLACK,
            back: ColourRgba::WHITE,
            eol_filled: false,
            underline: false,
            case_force: CaseForce::Mixed,
            visible: true,
            changeable: true,
            hotspot: false,
            invisible_representation: String::new(),
            realised: None,
        }
    }

    /// Take the font and measurements of a realised font.
    pub fn copy_realised(&mut self, font: Option<FontId>, measurements: FontMeasurements) {
        self.realised = font;
        self.measurements = measurements;
    }

    /// Reset every attribute to those of `source`.
    pub fn clear_to(&mut self, source: &Style) {
        *self = source.clone();
    }

    /// `true` when text in this style cannot be edited or seen.
    pub fn is_protected(&self) -> bool {
        !(self.changeable && self.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_specification_ordering() {
        let mut a = FontSpecification::new(Some("Mono"), 1000);
        let mut b = a.clone();
        assert_eq!(a, b);
        b.italic = true;
        assert!(a < b);
        a.weight = FontWeight::BOLD;
        assert!(a > b);
        let unnamed = FontSpecification::default();
        assert!(unnamed < a);
    }

    #[test]
    fn test_style_defaults() {
        let style = Style::default();
        assert_eq!(style.font.size, 1100);
        assert_eq!(style.fore, ColourRgba::BLACK);
        assert_eq!(style.back, ColourRgba::WHITE);
        assert!(!style.is_protected());
        let hidden = Style {
            visible: false,
            ..Style::default()
        };
        assert!(hidden.is_protected());
        assert_eq!(style.measurements.size_zoomed, 2);
    }

    #[test]
    fn test_colour_and_case() {
        assert_eq!(ColourRgba::from_rgb_hex(0x0078D4), ColourRgba::rgb(0, 0x78, 0xD4));
        assert_eq!(ColourRgba::from_rgb_hex(0x0078D4).to_string(), "#0078D4");
        assert_eq!(ColourRgba::BLACK.with_alpha(0x80).to_string(), "#00000080");
        assert_eq!(CaseForce::Camel.apply("hello wORLD"), "Hello World");
        assert_eq!(CaseForce::Upper.apply("abc"), "ABC");
    }
}
