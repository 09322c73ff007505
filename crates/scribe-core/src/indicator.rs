//! Indicator appearance.
//!
//! Indicators are decorations drawn over or under text independently of lexical styles. The
//! values they decorate live in [`DecorationList`](crate::decoration::DecorationList); this
//! module only says how a set value looks.

use crate::style::ColourRgba;
use bitflags::bitflags;

/// Bits of an indicator value that carry a colour when [`IndicFlag::VALUE_FORE`] is set.
pub const INDICATOR_VALUE_MASK: u32 = 0x00FF_FFFF;

/// How an indicator is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum IndicatorStyle {
    #[default]
    Plain,
    Squiggle,
    TT,
    Diagonal,
    Strike,
    Hidden,
    Box,
    RoundBox,
    StraightBox,
    Dash,
    Dots,
    SquiggleLow,
    DotBox,
    SquigglePixmap,
    CompositionThick,
    CompositionThin,
    FullBox,
    TextFore,
    Point,
    PointCharacter,
    Gradient,
    CentreGradient,
    PointTop,
}

bitflags! {
    /// Indicator behaviour flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IndicFlag: u32 {
        /// Take the foreground colour from the indicator value.
        const VALUE_FORE = 0x1;
    }
}

/// Which appearance to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    /// The pointer is elsewhere.
    Normal,
    /// The pointer hovers over the decorated text.
    Hover,
}

/// A drawing style and its colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleAndColour {
    /// Drawing style.
    pub style: IndicatorStyle,
    /// Foreground colour.
    pub fore: ColourRgba,
}

impl Default for StyleAndColour {
    fn default() -> Self {
        Self::new(IndicatorStyle::Plain, ColourRgba::BLACK)
    }
}

impl StyleAndColour {
    /// Pair a style with a colour.
    pub fn new(style: IndicatorStyle, fore: ColourRgba) -> Self {
        Self { style, fore }
    }
}

/// What a renderer needs to draw one indicator run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPaint {
    /// Style and colour to draw with.
    pub appearance: StyleAndColour,
    /// Draw under the text instead of over it.
    pub under: bool,
    /// Alpha of filled shapes.
    pub fill_alpha: u8,
    /// Alpha of outlines.
    pub outline_alpha: u8,
    /// Line width in pixels.
    pub stroke_width: f32,
}

/// The appearance of one indicator number.
#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    /// Appearance when not hovered.
    pub normal: StyleAndColour,
    /// Appearance when hovered.
    pub hover: StyleAndColour,
    /// Draw under the text.
    pub under: bool,
    /// Alpha of filled shapes.
    pub fill_alpha: u8,
    /// Alpha of outlines.
    pub outline_alpha: u8,
    flags: IndicFlag,
    /// Line width in pixels.
    pub stroke_width: f32,
}

impl Default for Indicator {
    fn default() -> Self {
        Self::new(IndicatorStyle::Plain, ColourRgba::BLACK)
    }
}

impl Indicator {
    /// An indicator with the same normal and hover appearance.
    pub fn new(style: IndicatorStyle, fore: ColourRgba) -> Self {
        let appearance = StyleAndColour::new(style, fore);
        Self {
            normal: appearance,
            hover: appearance,
            under: false,
            fill_alpha: 30,
            outline_alpha: 50,
            flags: IndicFlag::empty(),
            stroke_width: 1.0,
        }
    }

    /// `true` when hovering changes the appearance, so pointer moves need a redraw.
    pub fn is_dynamic(&self) -> bool {
        self.normal != self.hover
    }

    /// `true` when the indicator recolours the text itself.
    pub fn overrides_text_fore(&self) -> bool {
        self.normal.style == IndicatorStyle::TextFore || self.hover.style == IndicatorStyle::TextFore
    }

    /// Behaviour flags.
    pub fn flags(&self) -> IndicFlag {
        self.flags
    }

    /// Replace the behaviour flags.
    pub fn set_flags(&mut self, flags: IndicFlag) {
        self.flags = flags;
    }

    /// Resolve the paint for a run holding `value`, drawn in `state`.
    pub fn paint(&self, state: IndicatorState, value: u32) -> IndicatorPaint {
        let mut appearance = self.normal;
        if self.flags.contains(IndicFlag::VALUE_FORE) {
            appearance.fore = ColourRgba::from_rgb_hex(value & INDICATOR_VALUE_MASK);
        }
        if state == IndicatorState::Hover {
            appearance = self.hover;
        }
        IndicatorPaint {
            appearance,
            under: self.under,
            fill_alpha: self.fill_alpha,
            outline_alpha: self.outline_alpha,
            stroke_width: self.stroke_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_dynamic() {
        let mut indicator = Indicator::default();
        assert_eq!(indicator.fill_alpha, 30);
        assert_eq!(indicator.outline_alpha, 50);
        assert!(!indicator.is_dynamic());
        indicator.hover = StyleAndColour::new(IndicatorStyle::TextFore, ColourRgba::WHITE);
        assert!(indicator.is_dynamic());
        assert!(indicator.overrides_text_fore());
    }

    #[test]
    fn test_paint_uses_value_colour() {
        let mut indicator = Indicator::new(IndicatorStyle::Box, ColourRgba::BLACK);
        indicator.set_flags(IndicFlag::VALUE_FORE);
        let paint = indicator.paint(IndicatorState::Normal, 0x01_FF0000);
        assert_eq!(paint.appearance.fore, ColourRgba::rgb(0xFF, 0, 0));
        assert_eq!(paint.appearance.style, IndicatorStyle::Box);
        let hover = indicator.paint(IndicatorState::Hover, 0xFF0000);
        assert_eq!(hover.appearance.fore, ColourRgba::BLACK);
    }
}
