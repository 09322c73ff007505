//! How a document is to be viewed.
//!
//! [`ViewStyle`] collects the styles indexed by style number, the indicator appearances, the
//! margins and the caret, selection and wrap settings of one view. It also owns the cache of
//! realised fonts; [`ViewStyle::refresh`] rebuilds it through a [`TextSurface`] and derives the
//! line metrics everything else is laid out with.

use crate::decoration::INDICATOR_MAX;
use crate::indicator::{Indicator, IndicatorStyle};
use crate::platform::{FontError, FontId, PlatformDefaults, TextSurface};
use crate::style::{CaseForce, ColourRgba, FONT_SIZE_MULTIPLIER, FontMeasurements, FontQuality, FontSpecification, Style};
use bitflags::bitflags;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// The default style.
pub const STYLE_DEFAULT: usize = 32;
/// Line number margin.
pub const STYLE_LINE_NUMBER: usize = 33;
/// Matched brace.
pub const STYLE_BRACE_LIGHT: usize = 34;
/// Unmatched brace.
pub const STYLE_BRACE_BAD: usize = 35;
/// Control characters.
pub const STYLE_CONTROL_CHAR: usize = 36;
/// Indentation guides.
pub const STYLE_INDENT_GUIDE: usize = 37;
/// Call tips.
pub const STYLE_CALL_TIP: usize = 38;
/// Text shown after a folded line.
pub const STYLE_FOLD_DISPLAY_TEXT: usize = 39;
/// First style number handed out by [`ViewStyle::allocate_extended_styles`].
pub const STYLE_FIRST_EXTENDED: usize = 256;
/// Number of margins.
pub const MARGIN_COUNT: usize = 5;
/// Marker bits reserved for fold markers.
pub const MASK_FOLDERS: u32 = 0xFE00_0000;

/// What a margin shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum MarginType {
    #[default]
    Symbol,
    Number,
    Back,
    Fore,
    Text,
    RText,
    Colour,
}

/// Pointer shape over a margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum CursorShape {
    Normal,
    Arrow,
    Wait,
    #[default]
    ReverseArrow,
}

/// One margin.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginStyle {
    /// What the margin shows.
    pub style: MarginType,
    /// Background colour.
    pub back: ColourRgba,
    /// Width in pixels.
    pub width: i32,
    /// Marker bits drawn in this margin.
    pub mask: u32,
    /// Clicks are reported to the host.
    pub sensitive: bool,
    /// Pointer shape.
    pub cursor: CursorShape,
}

impl MarginStyle {
    /// A margin of the given kind.
    pub fn new(style: MarginType, width: i32, mask: u32) -> Self {
        Self {
            style,
            back: ColourRgba::BLACK,
            width,
            mask,
            sensitive: false,
            cursor: CursorShape::ReverseArrow,
        }
    }

    /// `true` when fold markers go here.
    pub fn shows_folding(&self) -> bool {
        self.mask & MASK_FOLDERS != 0
    }
}

impl Default for MarginStyle {
    fn default() -> Self {
        Self::new(MarginType::Symbol, 0, 0)
    }
}

/// Colourable parts of the view that are not text styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum Element {
    SelectionText,
    SelectionBack,
    SelectionAdditionalText,
    SelectionAdditionalBack,
    SelectionSecondaryText,
    SelectionSecondaryBack,
    SelectionInactiveText,
    SelectionInactiveBack,
    Caret,
    CaretAdditional,
    CaretLineBack,
    WhiteSpace,
    WhiteSpaceBack,
    HotSpotActive,
    HotSpotActiveBack,
    FoldLine,
    HiddenLine,
}

bitflags! {
    /// Caret drawing style. The low four bits choose the insert-mode shape.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CaretStyle: u32 {
        /// Insert mode: a line.
        const LINE = 1;
        /// Insert mode: a block.
        const BLOCK = 2;
        /// Overstrike mode draws a block instead of a bar.
        const OVERSTRIKE_BLOCK = 0x10;
        /// Terminal-style carets for additional selections.
        const CURSES = 0x20;
        /// Draw a block caret after the selection instead of inside it.
        const BLOCK_AFTER = 0x100;
    }
}

impl CaretStyle {
    /// Bits selecting the insert-mode shape.
    pub const INS_MASK: u32 = 0xF;

    fn insert_shape(self) -> u32 {
        self.bits() & Self::INS_MASK
    }
}

impl Default for CaretStyle {
    fn default() -> Self {
        Self::LINE
    }
}

/// The shape to draw a caret with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CaretShape {
    Invisible,
    Line,
    Block,
    Bar,
}

/// Caret appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaretAppearance {
    /// Drawing style.
    pub style: CaretStyle,
    /// Width in pixels.
    pub width: i32,
}

impl Default for CaretAppearance {
    fn default() -> Self {
        Self {
            style: CaretStyle::LINE,
            width: 1,
        }
    }
}

/// Line wrapping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum Wrap {
    #[default]
    None,
    Word,
    Char,
    WhiteSpace,
}

bitflags! {
    /// Where wrap indicators are drawn.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WrapVisualFlag: u32 {
        /// At the end of wrapped sub-lines.
        const END = 0x1;
        /// At the start of continuation sub-lines.
        const START = 0x2;
        /// In the line number margin.
        const MARGIN = 0x4;
    }
}

bitflags! {
    /// Whether wrap indicators sit next to the text or the border.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WrapVisualLocation: u32 {
        /// End indicator next to the text.
        const END_BY_TEXT = 0x1;
        /// Start indicator next to the text.
        const START_BY_TEXT = 0x2;
    }
}

/// Indentation of continuation sub-lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum WrapIndentMode {
    #[default]
    Fixed,
    Same,
    Indent,
    DeepIndent,
}

/// Wrap settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WrapAppearance {
    /// Wrapping mode.
    pub state: Wrap,
    /// Indicator placement.
    pub visual_flags: WrapVisualFlag,
    /// Indicator location.
    pub visual_flags_location: WrapVisualLocation,
    /// Indent of continuation sub-lines, in average character widths.
    pub visual_start_indent: i32,
    /// How continuation sub-lines are indented.
    pub indent_mode: WrapIndentMode,
}

/// Whitespace visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum WhiteSpace {
    #[default]
    Invisible,
    VisibleAlways,
    VisibleAfterIndent,
    VisibleOnlyInIndent,
}

/// A vertical edge line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeProperties {
    /// Column of the edge.
    pub column: usize,
    /// Edge colour.
    pub colour: ColourRgba,
}

/// A realised font and its measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontRealised {
    /// Backend handle.
    pub font: FontId,
    /// Measurements.
    pub measurements: FontMeasurements,
}

impl FontRealised {
    /// Allocate `spec` on `surface` at `zoom_level` and measure it.
    pub fn realise(surface: &mut dyn TextSurface, zoom_level: i32, spec: &FontSpecification) -> Result<Self, FontError> {
        let size_zoomed = (spec.size + zoom_level * FONT_SIZE_MULTIPLIER).max(2 * FONT_SIZE_MULTIPLIER);
        let device_height = surface.device_height_font(size_zoomed);
        let font = surface.allocate_font(spec, device_height)?;
        let ascent = surface.ascent(font);
        let ave_char_width = surface.average_char_width(font);
        let mut measurements = FontMeasurements {
            ascent,
            descent: surface.descent(font),
            capital_height: ascent - surface.internal_leading(font),
            ave_char_width,
            monospace_character_width: ave_char_width,
            space_width: surface.width_text(font, " "),
            monospace_ascii: false,
            size_zoomed,
        };
        if spec.check_monospaced {
            let width = surface.width_text(font, "A");
            measurements.monospace_ascii = (' '..='~').all(|ch| {
                let mut buf = [0u8; 4];
                surface.width_text(font, ch.encode_utf8(&mut buf)) == width
            });
            if measurements.monospace_ascii {
                measurements.monospace_character_width = width;
            }
        }
        Ok(Self { font, measurements })
    }
}

/// Realised fonts keyed by specification.
#[derive(Debug, Clone, Default)]
pub struct FontCache {
    fonts: BTreeMap<FontSpecification, FontRealised>,
}

impl FontCache {
    /// The realised font for exactly `spec`, if cached.
    pub fn find(&self, spec: &FontSpecification) -> Option<&FontRealised> {
        self.fonts.get(spec)
    }

    /// Cache a realised font.
    pub fn insert(&mut self, spec: FontSpecification, font: FontRealised) {
        self.fonts.insert(spec, font);
    }

    /// `true` if `spec` is cached.
    pub fn contains(&self, spec: &FontSpecification) -> bool {
        self.fonts.contains_key(spec)
    }

    /// Number of cached fonts.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Drop every font.
    pub fn clear(&mut self) {
        self.fonts.clear();
    }
}

/// Styles, indicators, margins and appearance settings of a view.
#[derive(Debug, Clone)]
pub struct ViewStyle {
    fonts: FontCache,
    /// Styles indexed by style number.
    pub styles: Vec<Style>,
    next_extended_style: usize,
    /// Indicator appearances indexed by indicator number.
    pub indicators: Vec<Indicator>,
    /// Some indicator changes appearance on hover.
    pub indicators_dynamic: bool,
    /// Some indicator recolours text.
    pub indicators_set_fore: bool,
    /// Height of a line in pixels.
    pub line_height: i32,
    /// Pixels by which adjacent lines may overlap.
    pub line_overlap: i32,
    /// Largest ascent over all styles plus `extra_ascent`.
    pub max_ascent: f32,
    /// Largest descent over all styles plus `extra_descent`.
    pub max_descent: f32,
    /// Average character width of the default style.
    pub ave_char_width: f32,
    /// Space width of the default style.
    pub space_width: f32,
    /// Width of a tab.
    pub tab_width: f32,
    /// Character drawn for control characters; below 32 draws the mnemonic.
    pub control_char_symbol: u32,
    /// Width of the control character symbol.
    pub control_char_width: f32,
    /// Selection margin colour.
    pub selbar: ColourRgba,
    /// Selection margin highlight colour.
    pub selbarlight: ColourRgba,
    /// Underline active hotspots.
    pub hotspot_underline: bool,
    /// Blank pixels left of the text.
    pub left_margin_width: i32,
    /// Blank pixels right of the text.
    pub right_margin_width: i32,
    /// Markers drawn in the text because no margin shows them.
    pub mask_in_line: u32,
    /// Markers always drawn in the text.
    pub mask_draw_in_text: u32,
    /// The margins, left to right.
    pub margins: Vec<MarginStyle>,
    /// Total width of the margins.
    pub fixed_column_width: i32,
    /// Margins are part of the text view.
    pub margin_inside: bool,
    /// X of the first text pixel.
    pub text_start: i32,
    /// Zoom in points added to every font.
    pub zoom_level: i32,
    /// Whitespace visibility.
    pub view_whitespace: WhiteSpace,
    /// Size of whitespace dots.
    pub whitespace_size: i32,
    /// Show line ends.
    pub view_eol: bool,
    /// Caret appearance.
    pub caret: CaretAppearance,
    /// Some style is protected.
    pub some_styles_protected: bool,
    /// Some style converts case.
    pub some_styles_force_case: bool,
    /// Antialiasing applied to every style.
    pub extra_font_flag: FontQuality,
    /// Pixels added above each line.
    pub extra_ascent: i32,
    /// Pixels added below each line.
    pub extra_descent: i32,
    /// Vertical edges, sorted by column.
    pub multi_edge: Vec<EdgeProperties>,
    element_colours: HashMap<Element, Option<ColourRgba>>,
    element_base_colours: HashMap<Element, Option<ColourRgba>>,
    element_allows_translucent: BTreeSet<Element>,
    /// Wrap settings.
    pub wrap: WrapAppearance,
}

impl Default for ViewStyle {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ViewStyle {
    /// A view style with `styles_size` default styles.
    pub fn new(styles_size: usize) -> Self {
        let mut vs = Self {
            fonts: FontCache::default(),
            styles: Vec::new(),
            next_extended_style: STYLE_FIRST_EXTENDED,
            indicators: vec![Indicator::default(); INDICATOR_MAX + 1],
            indicators_dynamic: false,
            indicators_set_fore: false,
            line_height: 1,
            line_overlap: 0,
            max_ascent: 1.0,
            max_descent: 1.0,
            ave_char_width: 8.0,
            space_width: 8.0,
            tab_width: 64.0,
            control_char_symbol: 0,
            control_char_width: 0.0,
            selbar: PlatformDefaults::CHROME,
            selbarlight: PlatformDefaults::CHROME_HIGHLIGHT,
            hotspot_underline: true,
            left_margin_width: 1,
            right_margin_width: 1,
            mask_in_line: u32::MAX,
            mask_draw_in_text: 0,
            margins: Vec::new(),
            fixed_column_width: 0,
            margin_inside: true,
            text_start: 0,
            zoom_level: 0,
            view_whitespace: WhiteSpace::Invisible,
            whitespace_size: 1,
            view_eol: false,
            caret: CaretAppearance::default(),
            some_styles_protected: false,
            some_styles_force_case: false,
            extra_font_flag: FontQuality::Default,
            extra_ascent: 0,
            extra_descent: 0,
            multi_edge: Vec::new(),
            element_colours: HashMap::new(),
            element_base_colours: HashMap::new(),
            element_allows_translucent: BTreeSet::new(),
            wrap: WrapAppearance::default(),
        };
        vs.alloc_styles(styles_size.max(STYLE_FOLD_DISPLAY_TEXT + 1));
        vs.reset_default_style();

        vs.indicators[0] = Indicator::new(IndicatorStyle::Squiggle, ColourRgba::rgb(0, 0x7F, 0));
        vs.indicators[1] = Indicator::new(IndicatorStyle::TT, ColourRgba::rgb(0, 0, 0xFF));
        vs.indicators[2] = Indicator::new(IndicatorStyle::Plain, ColourRgba::rgb(0xFF, 0, 0));

        for (element, colour) in [
            (Element::SelectionBack, ColourRgba::rgb(0xC0, 0xC0, 0xC0)),
            (Element::SelectionAdditionalText, ColourRgba::rgb(0xFF, 0xFF, 0xFF)),
            (Element::SelectionAdditionalBack, ColourRgba::rgb(0xD7, 0xD7, 0xD7)),
            (Element::SelectionSecondaryBack, ColourRgba::rgb(0xB0, 0xB0, 0xB0)),
            (Element::SelectionInactiveBack, ColourRgba::rgb(0xB0, 0xB0, 0xB0)),
            (Element::Caret, ColourRgba::BLACK),
            (Element::CaretAdditional, ColourRgba::rgb(0x7F, 0x7F, 0x7F)),
        ] {
            vs.element_base_colours.insert(element, Some(colour));
        }
        vs.element_allows_translucent.extend([
            Element::SelectionText,
            Element::SelectionBack,
            Element::SelectionAdditionalText,
            Element::SelectionAdditionalBack,
            Element::SelectionSecondaryText,
            Element::SelectionSecondaryBack,
            Element::SelectionInactiveText,
            Element::SelectionInactiveBack,
            Element::CaretLineBack,
            Element::WhiteSpaceBack,
            Element::HotSpotActiveBack,
        ]);

        vs.margins = vec![MarginStyle::default(); MARGIN_COUNT];
        vs.margins[0] = MarginStyle::new(MarginType::Number, 0, 0);
        vs.margins[1] = MarginStyle::new(MarginType::Symbol, 16, !MASK_FOLDERS);
        vs.margins[2] = MarginStyle::new(MarginType::Symbol, 0, 0);
        vs.calculate_margin_width_and_mask();
        vs.text_start = vs.fixed_column_width;
        vs
    }

    fn alloc_styles(&mut self, size: usize) {
        if size <= self.styles.len() {
            return;
        }
        let template = self.styles.get(STYLE_DEFAULT).cloned().unwrap_or_default();
        self.styles.resize(size, template);
    }

    /// The realised font cache.
    pub fn fonts(&self) -> &FontCache {
        &self.fonts
    }

    /// Make sure style `index` exists, creating missing styles like the default style.
    pub fn ensure_style(&mut self, index: usize) {
        if index >= self.styles.len() {
            self.alloc_styles(index + 1);
        }
    }

    /// `true` if style `index` exists.
    pub fn valid_style(&self, index: usize) -> bool {
        index < self.styles.len()
    }

    /// Style `index`, created on demand.
    pub fn style_mut(&mut self, index: usize) -> &mut Style {
        self.ensure_style(index);
        &mut self.styles[index]
    }

    /// Reserve `count` consecutive style numbers above the fixed styles; returns the first.
    pub fn allocate_extended_styles(&mut self, count: usize) -> usize {
        let start = self.next_extended_style;
        self.next_extended_style += count;
        self.ensure_style(self.next_extended_style);
        let default = self.styles[STYLE_DEFAULT].clone();
        for style in &mut self.styles[start..self.next_extended_style] {
            style.clear_to(&default);
        }
        start
    }

    /// Hand out extended styles from the start again.
    pub fn release_all_extended_styles(&mut self) {
        self.next_extended_style = STYLE_FIRST_EXTENDED;
    }

    /// Reset the default style to the platform font and black on white.
    pub fn reset_default_style(&mut self) {
        self.styles[STYLE_DEFAULT] = Style::new(Some(PlatformDefaults::DEFAULT_FONT));
    }

    /// Reset every style to the default style.
    pub fn clear_styles(&mut self) {
        let default = self.styles[STYLE_DEFAULT].clone();
        for (index, style) in self.styles.iter_mut().enumerate() {
            if index != STYLE_DEFAULT {
                style.clear_to(&default);
            }
        }
        self.styles[STYLE_LINE_NUMBER].back = PlatformDefaults::CHROME;
        self.styles[STYLE_CALL_TIP].back = ColourRgba::WHITE;
        self.styles[STYLE_CALL_TIP].fore = ColourRgba::rgb(0x80, 0x80, 0x80);
    }

    /// Change the font face of a style.
    pub fn set_style_font_name(&mut self, index: usize, name: Option<&str>) {
        self.style_mut(index).font.font_name = name.map(str::to_string);
    }

    /// `true` when some style protects its text from editing.
    pub fn protection_active(&self) -> bool {
        self.some_styles_protected
    }

    /// Realise fonts and recompute every derived metric.
    pub fn refresh(&mut self, surface: &mut dyn TextSurface, tab_in_chars: usize) {
        self.fonts.clear();
        self.selbar = PlatformDefaults::CHROME;
        self.selbarlight = PlatformDefaults::CHROME_HIGHLIGHT;
        for style in &mut self.styles {
            style.font.extra_font_flag = self.extra_font_flag;
        }

        let default_spec = self.styles[STYLE_DEFAULT].font.clone();
        let fallback = match FontRealised::realise(surface, self.zoom_level, &default_spec) {
            Ok(realised) => {
                self.fonts.insert(default_spec, realised);
                Some(realised)
            }
            Err(err) => {
                tracing::warn!(target: "scribe.view_style", error = %err, "default font unavailable");
                None
            }
        };
        for index in 0..self.styles.len() {
            let spec = self.styles[index].font.clone();
            let realised = match self.fonts.find(&spec) {
                Some(realised) => Some(*realised),
                None => match FontRealised::realise(surface, self.zoom_level, &spec) {
                    Ok(realised) => {
                        self.fonts.insert(spec, realised);
                        Some(realised)
                    }
                    Err(err) => {
                        tracing::warn!(target: "scribe.view_style", style = index, error = %err, "using default font metrics");
                        fallback
                    }
                },
            };
            match realised {
                Some(realised) => self.styles[index].copy_realised(Some(realised.font), realised.measurements),
                None => self.styles[index].copy_realised(None, FontMeasurements::default()),
            }
        }

        self.indicators_dynamic = self.indicators.iter().any(Indicator::is_dynamic);
        self.indicators_set_fore = self.indicators.iter().any(Indicator::overrides_text_fore);

        self.find_max_ascent_descent();
        self.line_height = (self.max_ascent + self.max_descent).round() as i32;
        self.line_overlap = (self.line_height / 10).max(2).min(self.line_height);

        self.some_styles_protected = self.styles.iter().any(Style::is_protected);
        self.some_styles_force_case = self.styles.iter().any(|style| style.case_force != CaseForce::Mixed);

        let default = &self.styles[STYLE_DEFAULT].measurements;
        self.ave_char_width = default.ave_char_width;
        self.space_width = default.space_width;
        self.tab_width = self.space_width * tab_in_chars as f32;

        self.control_char_width = 0.0;
        if self.control_char_symbol >= 32
            && let (Some(ch), Some(font)) = (char::from_u32(self.control_char_symbol), self.styles[STYLE_CONTROL_CHAR].realised)
        {
            let mut buf = [0u8; 4];
            self.control_char_width = surface.width_text(font, ch.encode_utf8(&mut buf));
        }

        self.calculate_margin_width_and_mask();
        self.text_start = if self.margin_inside {
            self.fixed_column_width
        } else {
            self.left_margin_width
        };
        tracing::debug!(
            target: "scribe.view_style",
            fonts = self.fonts.len(),
            line_height = self.line_height,
            "refreshed view style"
        );
    }

    fn find_max_ascent_descent(&mut self) {
        self.max_ascent = 1.0;
        self.max_descent = 1.0;
        for style in &self.styles {
            self.max_ascent = self.max_ascent.max(style.measurements.ascent);
            self.max_descent = self.max_descent.max(style.measurements.descent);
        }
        self.max_ascent += self.extra_ascent as f32;
        self.max_descent += self.extra_descent as f32;
    }

    /// Total margin width and the markers that have no margin to go to.
    pub fn calculate_margin_width_and_mask(&mut self) {
        self.fixed_column_width = if self.margin_inside { self.left_margin_width } else { 0 };
        self.mask_in_line = u32::MAX;
        for margin in &self.margins {
            self.fixed_column_width += margin.width;
            if margin.width > 0 {
                self.mask_in_line &= !margin.mask;
            }
        }
        self.mask_draw_in_text = 0;
    }

    /// Margin width outside the text view.
    pub fn external_margin_width(&self) -> i32 {
        if self.margin_inside { 0 } else { self.fixed_column_width }
    }

    /// Index of the margin at view x coordinate `x`.
    pub fn margin_from_location(&self, x: i32) -> Option<usize> {
        let mut margin = None;
        let mut left = if self.margin_inside { 0 } else { -self.fixed_column_width };
        for (index, style) in self.margins.iter().enumerate() {
            if x >= left && x < left + style.width {
                margin = Some(index);
            }
            left += style.width;
        }
        margin
    }

    /// Add an edge line, keeping the list sorted by column.
    pub fn add_multi_edge(&mut self, column: usize, colour: ColourRgba) {
        let at = self.multi_edge.partition_point(|edge| edge.column <= column);
        self.multi_edge.insert(at, EdgeProperties { column, colour });
    }

    // Element colours.

    /// Colour of `element`: the explicit colour, else the base colour.
    pub fn element_colour(&self, element: Element) -> Option<ColourRgba> {
        self.element_colours
            .get(&element)
            .copied()
            .flatten()
            .or_else(|| self.element_base_colours.get(&element).copied().flatten())
    }

    /// Colour of `element`, opaque black when unset.
    pub fn element_colour_forced(&self, element: Element) -> ColourRgba {
        self.element_colour(element).unwrap_or(ColourRgba::BLACK)
    }

    /// `true` if `element` may be drawn translucently.
    pub fn element_allows_translucent(&self, element: Element) -> bool {
        self.element_allows_translucent.contains(&element)
    }

    /// Remove the explicit colour. Returns `true` if one was set.
    pub fn reset_element(&mut self, element: Element) -> bool {
        self.element_colours.remove(&element).flatten().is_some()
    }

    /// Set the explicit colour. Returns `true` if it changed.
    pub fn set_element_colour(&mut self, element: Element, colour: ColourRgba) -> bool {
        self.element_colours.insert(element, Some(colour)) != Some(Some(colour))
    }

    /// Set or clear the explicit colour. Returns `true` if it changed.
    pub fn set_element_colour_optional(&mut self, element: Element, colour: Option<ColourRgba>) -> bool {
        match colour {
            Some(colour) => self.set_element_colour(element, colour),
            None => self.reset_element(element),
        }
    }

    /// Set the RGB of `element`, keeping its alpha.
    pub fn set_element_rgb(&mut self, element: Element, rgb: u32) {
        let current = self.element_colour_forced(element);
        self.element_colours
            .insert(element, Some(ColourRgba::from_rgb_hex(rgb).with_alpha(current.a)));
    }

    /// Set the alpha of `element`, keeping its RGB.
    pub fn set_element_alpha(&mut self, element: Element, alpha: u8) {
        let current = self.element_colour_forced(element);
        self.element_colours.insert(element, Some(current.with_alpha(alpha)));
    }

    /// `true` if an explicit colour is set.
    pub fn element_is_set(&self, element: Element) -> bool {
        self.element_colours.get(&element).copied().flatten().is_some()
    }

    /// Set the base colour used when no explicit colour is set. Returns `true` if it changed.
    pub fn set_element_base(&mut self, element: Element, colour: ColourRgba) -> bool {
        self.element_base_colours.insert(element, Some(colour)) != Some(Some(colour))
    }

    // Wrapping.

    /// Returns `true` if the mode changed.
    pub fn set_wrap_state(&mut self, state: Wrap) -> bool {
        std::mem::replace(&mut self.wrap.state, state) != state
    }

    /// Returns `true` if the flags changed.
    pub fn set_wrap_visual_flags(&mut self, flags: WrapVisualFlag) -> bool {
        std::mem::replace(&mut self.wrap.visual_flags, flags) != flags
    }

    /// Returns `true` if the location changed.
    pub fn set_wrap_visual_flags_location(&mut self, location: WrapVisualLocation) -> bool {
        std::mem::replace(&mut self.wrap.visual_flags_location, location) != location
    }

    /// Returns `true` if the indent changed.
    pub fn set_wrap_visual_start_indent(&mut self, indent: i32) -> bool {
        std::mem::replace(&mut self.wrap.visual_start_indent, indent) != indent
    }

    /// Returns `true` if the mode changed.
    pub fn set_wrap_indent_mode(&mut self, mode: WrapIndentMode) -> bool {
        std::mem::replace(&mut self.wrap.indent_mode, mode) != mode
    }

    /// `true` if whitespace is drawn inside (or outside) the indentation.
    pub fn white_space_visible(&self, in_indent: bool) -> bool {
        match self.view_whitespace {
            WhiteSpace::Invisible => false,
            WhiteSpace::VisibleAlways => true,
            WhiteSpace::VisibleAfterIndent => !in_indent,
            WhiteSpace::VisibleOnlyInIndent => in_indent,
        }
    }

    // Caret.

    /// `true` if some mode draws a block caret.
    pub fn is_block_caret_style(&self) -> bool {
        self.caret.style.insert_shape() == CaretStyle::BLOCK.bits()
            || self.caret.style.intersects(CaretStyle::OVERSTRIKE_BLOCK | CaretStyle::CURSES)
    }

    /// `true` if the caret of a selection is drawn at all.
    pub fn is_caret_visible(&self, is_main_selection: bool) -> bool {
        self.caret.width > 0
            && (self.caret.style.insert_shape() != 0
                || (self.caret.style.contains(CaretStyle::CURSES) && !is_main_selection))
    }

    /// `true` if a block caret covers the last selected character.
    pub fn draw_caret_inside_selection(&self, in_overstrike: bool, ime_caret_block_override: bool) -> bool {
        if self.caret.style.contains(CaretStyle::BLOCK_AFTER) {
            return false;
        }
        self.caret.style.insert_shape() == CaretStyle::BLOCK.bits()
            || (in_overstrike && self.caret.style.contains(CaretStyle::OVERSTRIKE_BLOCK))
            || ime_caret_block_override
            || self.caret.style.contains(CaretStyle::CURSES)
    }

    /// The shape of a caret in the given mode.
    pub fn caret_shape_for_mode(&self, in_overstrike: bool, is_main_selection: bool) -> CaretShape {
        if in_overstrike {
            return if self.caret.style.contains(CaretStyle::OVERSTRIKE_BLOCK) {
                CaretShape::Block
            } else {
                CaretShape::Bar
            };
        }
        if self.caret.style.contains(CaretStyle::CURSES) && !is_main_selection {
            return CaretShape::Block;
        }
        match self.caret.style.insert_shape() {
            0 => CaretShape::Invisible,
            2 => CaretShape::Block,
            _ => CaretShape::Line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessSurface;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reserved_styles_and_extended_allocation() {
        let mut vs = ViewStyle::default();
        assert_eq!(vs.styles.len(), 256);
        assert_eq!(vs.styles[STYLE_DEFAULT].font.font_name.as_deref(), Some("Courier New"));
        vs.styles[STYLE_DEFAULT].fore = ColourRgba::rgb(1, 2, 3);
        let base = vs.allocate_extended_styles(4);
        assert_eq!(base, STYLE_FIRST_EXTENDED);
        assert_eq!(vs.allocate_extended_styles(2), STYLE_FIRST_EXTENDED + 4);
        assert!(vs.valid_style(STYLE_FIRST_EXTENDED + 6));
        assert_eq!(vs.styles[base + 3].fore, ColourRgba::rgb(1, 2, 3));
        vs.release_all_extended_styles();
        assert_eq!(vs.allocate_extended_styles(1), STYLE_FIRST_EXTENDED);
        vs.ensure_style(300);
        assert_eq!(vs.styles[300].fore, ColourRgba::rgb(1, 2, 3));
    }

    #[test]
    fn test_refresh_caches_fonts_and_computes_metrics() {
        let mut vs = ViewStyle::default();
        vs.styles[5].font.italic = true;
        vs.styles[6].font.italic = true;
        vs.styles[7].visible = false;
        let mut surface = HeadlessSurface::new();
        vs.refresh(&mut surface, 4);
        assert_eq!(vs.fonts().len(), 2);
        assert_eq!(surface.allocated(), 2);
        assert_eq!(vs.line_height, 13);
        assert_eq!(vs.line_overlap, 2);
        assert_eq!(vs.ave_char_width, 7.0);
        assert_eq!(vs.tab_width, 28.0);
        assert!(vs.some_styles_protected);
        assert!(!vs.indicators_dynamic);
        assert_eq!(vs.text_start, 17);
        assert!(vs.styles[5].realised.is_some());
    }

    #[test]
    fn test_refresh_falls_back_to_default_metrics() {
        let mut vs = ViewStyle::default();
        vs.set_style_font_name(9, Some("Missing Sans"));
        let mut surface = HeadlessSurface::new().with_missing_font("Missing Sans");
        vs.refresh(&mut surface, 8);
        assert_eq!(vs.styles[9].measurements, vs.styles[STYLE_DEFAULT].measurements);
        assert_eq!(vs.styles[9].realised, vs.styles[STYLE_DEFAULT].realised);
    }

    #[test]
    fn test_margins() {
        let mut vs = ViewStyle::default();
        assert_eq!(vs.fixed_column_width, 17);
        assert_eq!(vs.margin_from_location(0), Some(1));
        assert_eq!(vs.margin_from_location(15), Some(1));
        assert_eq!(vs.margin_from_location(16), None);
        vs.margins[0].width = 30;
        vs.calculate_margin_width_and_mask();
        assert_eq!(vs.fixed_column_width, 47);
        assert_eq!(vs.margin_from_location(29), Some(0));
        assert!(!vs.margins[1].shows_folding());
        assert_eq!(vs.mask_in_line, MASK_FOLDERS);
    }

    #[test]
    fn test_element_colours() {
        let mut vs = ViewStyle::default();
        assert_eq!(vs.element_colour(Element::SelectionBack), Some(ColourRgba::rgb(0xC0, 0xC0, 0xC0)));
        assert!(!vs.element_is_set(Element::SelectionBack));
        assert!(vs.set_element_colour(Element::SelectionBack, ColourRgba::WHITE));
        assert!(!vs.set_element_colour(Element::SelectionBack, ColourRgba::WHITE));
        vs.set_element_alpha(Element::SelectionBack, 0x40);
        assert_eq!(vs.element_colour(Element::SelectionBack), Some(ColourRgba::WHITE.with_alpha(0x40)));
        assert!(vs.reset_element(Element::SelectionBack));
        assert!(!vs.reset_element(Element::SelectionBack));
        assert_eq!(vs.element_colour(Element::FoldLine), None);
        assert_eq!(vs.element_colour_forced(Element::FoldLine), ColourRgba::BLACK);
        assert!(vs.element_allows_translucent(Element::CaretLineBack));
        assert!(!vs.element_allows_translucent(Element::Caret));
    }

    #[test]
    fn test_caret_shapes() {
        let mut vs = ViewStyle::default();
        assert_eq!(vs.caret_shape_for_mode(false, true), CaretShape::Line);
        assert_eq!(vs.caret_shape_for_mode(true, true), CaretShape::Bar);
        assert!(vs.is_caret_visible(true));
        vs.caret.style = CaretStyle::BLOCK | CaretStyle::OVERSTRIKE_BLOCK;
        assert!(vs.is_block_caret_style());
        assert_eq!(vs.caret_shape_for_mode(true, true), CaretShape::Block);
        assert!(vs.draw_caret_inside_selection(false, false));
        vs.caret.style = CaretStyle::CURSES;
        assert!(!vs.is_caret_visible(true));
        assert!(vs.is_caret_visible(false));
        assert_eq!(vs.caret_shape_for_mode(false, false), CaretShape::Block);
        assert_eq!(vs.caret_shape_for_mode(false, true), CaretShape::Invisible);
    }

    #[test]
    fn test_wrap_setters_report_changes() {
        let mut vs = ViewStyle::default();
        assert!(vs.set_wrap_state(Wrap::Word));
        assert!(!vs.set_wrap_state(Wrap::Word));
        assert!(vs.set_wrap_visual_flags(WrapVisualFlag::END | WrapVisualFlag::MARGIN));
        assert!(!vs.set_wrap_visual_start_indent(0));
        assert!(vs.set_wrap_indent_mode(WrapIndentMode::DeepIndent));
        vs.view_whitespace = WhiteSpace::VisibleAfterIndent;
        assert!(vs.white_space_visible(false));
        assert!(!vs.white_space_visible(true));
        vs.add_multi_edge(80, ColourRgba::BLACK);
        vs.add_multi_edge(40, ColourRgba::WHITE);
        assert_eq!(vs.multi_edge[0].column, 40);
    }
}
