//! Indicator layers.
//!
//! Indicators decorate text independently of lexical styling: spell-check squiggles, search
//! matches, IME composition segments and so on. Each indicator number owns one
//! [`RunStyles<u32>`] layer parallel to the text, where `0` means "not set" and any other value
//! is passed through to the renderer. Several indicators can cover the same position;
//! [`DecorationList::all_on_for`] reports them as a bitmask.

use crate::error::CoreResult;
use crate::run_styles::{FillResult, RunStyles};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Highest valid indicator number.
pub const INDICATOR_MAX: usize = 35;
/// First indicator reserved for containers (applications) rather than lexers.
pub const INDICATOR_CONTAINER: usize = 8;
/// IME composition: text being entered.
pub const INDICATOR_IME_INPUT: usize = 32;
/// IME composition: the target clause.
pub const INDICATOR_IME_TARGET: usize = 33;
/// IME composition: already converted clauses.
pub const INDICATOR_IME_CONVERTED: usize = 34;
/// IME composition: clauses of unknown state.
pub const INDICATOR_IME_UNKNOWN: usize = 35;

/// The set of indicator layers attached to a buffer.
#[derive(Debug, Clone)]
pub struct DecorationList {
    layers: BTreeMap<usize, RunStyles<u32>>,
    current_indicator: usize,
    current_value: u32,
    length: usize,
}

impl Default for DecorationList {
    fn default() -> Self {
        Self::new()
    }
}

impl DecorationList {
    /// Create an empty list for an empty buffer.
    pub fn new() -> Self {
        Self {
            layers: BTreeMap::new(),
            current_indicator: 0,
            current_value: 1,
            length: 0,
        }
    }

    /// Length of the text the layers cover.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Indicator used by [`fill_range`](Self::fill_range).
    pub fn current_indicator(&self) -> usize {
        self.current_indicator
    }

    /// Select the indicator for later fills. Numbers above [`INDICATOR_MAX`] are ignored.
    pub fn set_current_indicator(&mut self, indicator: usize) -> bool {
        if indicator > INDICATOR_MAX {
            return false;
        }
        self.current_indicator = indicator;
        true
    }

    /// Value written by [`fill_range`](Self::fill_range).
    pub fn current_value(&self) -> u32 {
        self.current_value
    }

    /// Set the value for later fills.
    pub fn set_current_value(&mut self, value: u32) {
        self.current_value = value;
    }

    /// Indicators that currently have a layer.
    pub fn indicators(&self) -> impl Iterator<Item = usize> + '_ {
        self.layers.keys().copied()
    }

    /// Fill `position..position + fill_length` of the current indicator with `value`.
    ///
    /// A value of `0` clears. Layers that end up entirely clear are dropped.
    pub fn fill_range(&mut self, position: usize, value: u32, fill_length: usize) -> CoreResult<FillResult> {
        let indicator = self.current_indicator;
        let length = self.length;
        if value == 0 && !self.layers.contains_key(&indicator) {
            return Ok(FillResult {
                changed: false,
                position,
                length: fill_length,
            });
        }
        let layer = match self.layers.entry(indicator) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut layer = RunStyles::new();
                layer.insert_space(0, length)?;
                entry.insert(layer)
            }
        };
        let result = layer.fill_range(position, value, fill_length);
        if layer.all_same_as(0) {
            self.layers.remove(&indicator);
        }
        result
    }

    /// Fill the current indicator with the current value.
    pub fn fill_current(&mut self, position: usize, fill_length: usize) -> CoreResult<FillResult> {
        self.fill_range(position, self.current_value, fill_length)
    }

    /// Clear the current indicator over a range.
    pub fn clear_range(&mut self, position: usize, clear_length: usize) -> CoreResult<FillResult> {
        self.fill_range(position, 0, clear_length)
    }

    /// Clear `indicator` everywhere.
    pub fn clear_indicator(&mut self, indicator: usize) -> bool {
        self.layers.remove(&indicator).is_some()
    }

    /// Open `insert_length` positions in every layer.
    pub fn insert_space(&mut self, position: usize, insert_length: usize) -> CoreResult<()> {
        for layer in self.layers.values_mut() {
            layer.insert_space(position, insert_length)?;
        }
        self.length += insert_length;
        Ok(())
    }

    /// Remove `delete_length` positions from every layer.
    pub fn delete_range(&mut self, position: usize, delete_length: usize) -> CoreResult<()> {
        for layer in self.layers.values_mut() {
            layer.delete_range(position, delete_length)?;
        }
        self.layers.retain(|_, layer| !layer.all_same_as(0));
        self.length -= delete_length.min(self.length);
        Ok(())
    }

    /// Value of `indicator` at `position`, `0` when unset.
    pub fn value_at(&self, indicator: usize, position: usize) -> u32 {
        self.layers
            .get(&indicator)
            .and_then(|layer| {
                if position < layer.length() {
                    layer.value_at(position).ok()
                } else {
                    None
                }
            })
            .unwrap_or(0)
    }

    /// Start of the run of `indicator` containing `position`.
    pub fn start(&self, indicator: usize, position: usize) -> usize {
        self.layers
            .get(&indicator)
            .map(|layer| layer.start_run(position))
            .unwrap_or(0)
    }

    /// End of the run of `indicator` containing `position`.
    pub fn end(&self, indicator: usize, position: usize) -> usize {
        self.layers
            .get(&indicator)
            .map(|layer| layer.end_run(position))
            .unwrap_or(0)
    }

    /// Bitmask of the indicators set at `position`.
    pub fn all_on_for(&self, position: usize) -> u64 {
        self.layers
            .iter()
            .filter(|(indicator, _)| self.value_at(**indicator, position) != 0)
            .fold(0u64, |mask, (indicator, _)| mask | (1u64 << indicator))
    }

    /// Drop every layer and reset the covered length.
    pub fn delete_all(&mut self) {
        self.layers.clear();
        self.length = 0;
    }

    /// Runs of `indicator` as `(length, value)` pairs, empty when the indicator has no layer.
    pub fn runs(&self, indicator: usize) -> Vec<(usize, u32)> {
        self.layers
            .get(&indicator)
            .map(RunStyles::run_list)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(len: usize) -> DecorationList {
        let mut list = DecorationList::new();
        list.insert_space(0, len).unwrap();
        list
    }

    #[test]
    fn test_fill_creates_and_drops_layers() {
        let mut list = list(10);
        list.set_current_indicator(3);
        list.fill_range(2, 5, 3).unwrap();
        assert_eq!(list.indicators().collect::<Vec<_>>(), vec![3]);
        assert_eq!(list.value_at(3, 3), 5);
        assert_eq!(list.value_at(3, 5), 0);
        assert_eq!(list.start(3, 3), 2);
        assert_eq!(list.end(3, 3), 5);
        list.clear_range(0, 10).unwrap();
        assert_eq!(list.indicators().count(), 0);
    }

    #[test]
    fn test_all_on_for_reports_overlapping_indicators() {
        let mut list = list(8);
        list.set_current_indicator(0);
        list.fill_current(0, 4).unwrap();
        list.set_current_indicator(INDICATOR_IME_INPUT);
        list.fill_current(2, 4).unwrap();
        assert_eq!(list.all_on_for(1), 1);
        assert_eq!(list.all_on_for(3), 1 | (1 << 32));
        assert_eq!(list.all_on_for(5), 1 << 32);
        assert_eq!(list.all_on_for(7), 0);
    }

    #[test]
    fn test_layers_follow_edits() {
        let mut list = list(6);
        list.set_current_indicator(1);
        list.fill_current(2, 2).unwrap();
        list.insert_space(0, 3).unwrap();
        assert_eq!(list.length(), 9);
        assert_eq!(list.runs(1), vec![(5, 0), (2, 1), (2, 0)]);
        list.delete_range(4, 4).unwrap();
        assert_eq!(list.indicators().count(), 0);
        assert_eq!(list.length(), 5);
    }

    #[test]
    fn test_invalid_indicator_is_ignored() {
        let mut list = list(2);
        assert!(!list.set_current_indicator(INDICATOR_MAX + 1));
        assert_eq!(list.current_indicator(), 0);
    }
}
