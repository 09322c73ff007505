//! Run-length encoded values over positions.
//!
//! [`RunStyles`] maps every position in `0..length` to a value by storing runs of equal
//! values: a [`Partitioning`] holds where each run starts and a [`SplitVector`] holds the run
//! values. The lexical style layer of a document, each indicator layer and the per-line fold
//! state of [`ContractionState`](crate::ContractionState) are run styles.
//!
//! Adjacent runs never share a value; every mutating operation re-merges neighbours.

use crate::error::{CoreError, CoreResult};
use crate::partitioning::Partitioning;
use crate::split_vector::SplitVector;

/// Outcome of [`RunStyles::fill_range`]: whether anything changed and the sub-range that did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillResult {
    /// `true` when at least one position received a new value.
    pub changed: bool,
    /// Start of the changed range.
    pub position: usize,
    /// Length of the changed range.
    pub length: usize,
}

/// A run-length encoded map from position to value.
#[derive(Debug, Clone)]
pub struct RunStyles<V> {
    starts: Partitioning,
    // One value per run plus a trailing sentinel.
    styles: SplitVector<V>,
}

impl<V: Copy + PartialEq + Default> Default for RunStyles<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Copy + PartialEq + Default> RunStyles<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        let mut styles = SplitVector::new();
        styles.insert_value(0, 2, V::default());
        Self {
            starts: Partitioning::new(8),
            styles,
        }
    }

    /// Number of positions covered.
    pub fn length(&self) -> usize {
        self.starts.length()
    }

    /// Number of runs.
    pub fn runs(&self) -> usize {
        self.starts.partitions()
    }

    fn start_of(&self, run: usize) -> usize {
        // Runs handed to this helper always exist.
        self.starts.position_from_partition(run).unwrap_or(0)
    }

    fn check_position(&self, position: usize) -> CoreResult<()> {
        if position > self.length() {
            return Err(CoreError::out_of_bounds(position, self.length()));
        }
        Ok(())
    }

    fn check_range(&self, position: usize, len: usize) -> CoreResult<()> {
        let end = position.checked_add(len);
        match end {
            Some(end) if end <= self.length() => Ok(()),
            _ => Err(CoreError::range(position, position.saturating_add(len), self.length())),
        }
    }

    /// First run that starts at or contains `position`.
    fn run_from_position(&self, position: usize) -> usize {
        let mut run = self.starts.partition_from_position(position);
        // Step back over empty runs that start at the same position.
        while run > 0 && position == self.start_of(run - 1) {
            run -= 1;
        }
        run
    }

    /// Split the run containing `position` so a run starts exactly there; returns that run.
    fn split_run(&mut self, position: usize) -> CoreResult<usize> {
        let mut run = self.run_from_position(position);
        let pos_run = self.start_of(run);
        if pos_run < position {
            let run_style = self.value_at(position)?;
            run += 1;
            self.starts.insert_partition(run, position)?;
            self.styles.insert(run, run_style);
        }
        Ok(run)
    }

    fn remove_run(&mut self, run: usize) -> CoreResult<()> {
        self.starts.remove_partition(run)?;
        self.styles.delete(run);
        Ok(())
    }

    fn remove_run_if_empty(&mut self, run: usize) -> CoreResult<()> {
        if run < self.starts.partitions()
            && self.starts.partitions() > 1
            && self.start_of(run) == self.start_of(run + 1)
        {
            self.remove_run(run)?;
        }
        Ok(())
    }

    fn remove_run_if_same_as_previous(&mut self, run: usize) -> CoreResult<()> {
        if run > 0
            && run < self.starts.partitions()
            && self.styles.value_at(run - 1) == self.styles.value_at(run)
        {
            self.remove_run(run)?;
        }
        Ok(())
    }

    /// Value at `position`. The end position reports the value of the last run.
    pub fn value_at(&self, position: usize) -> CoreResult<V> {
        self.check_position(position)?;
        Ok(self
            .styles
            .value_at(self.starts.partition_from_position(position)))
    }

    /// Position after `position` where the value changes, or `end + 1` if none before `end`.
    pub fn find_next_change(&self, position: usize, end: usize) -> usize {
        let run = self.starts.partition_from_position(position);
        if run < self.starts.partitions() {
            let run_change = self.start_of(run);
            if run_change > position {
                return run_change;
            }
            let next_change = self.start_of(run + 1);
            if next_change > position {
                return next_change;
            }
            if position < end {
                return end;
            }
        }
        end + 1
    }

    /// Start of the run containing `position`.
    pub fn start_run(&self, position: usize) -> usize {
        self.start_of(self.starts.partition_from_position(position))
    }

    /// End (exclusive) of the run containing `position`.
    pub fn end_run(&self, position: usize) -> usize {
        self.start_of(self.starts.partition_from_position(position) + 1)
    }

    /// Set `[position, position + fill_length)` to `value`, merging with equal neighbours.
    pub fn fill_range(
        &mut self,
        mut position: usize,
        value: V,
        mut fill_length: usize,
    ) -> CoreResult<FillResult> {
        self.check_range(position, fill_length)?;
        let no_change = FillResult {
            changed: false,
            position,
            length: fill_length,
        };
        if fill_length == 0 {
            return Ok(no_change);
        }
        let mut end = position + fill_length;
        let mut run_end = self.run_from_position(end);
        if self.styles.value_at(run_end) == value {
            // End already has the value so trim the range.
            end = self.start_of(run_end);
            if position >= end {
                return Ok(no_change);
            }
            fill_length = end - position;
        } else {
            run_end = self.split_run(end)?;
        }
        let mut run_start = self.run_from_position(position);
        if self.styles.value_at(run_start) == value {
            // Start already has the value so trim the range.
            run_start += 1;
            position = self.start_of(run_start);
            fill_length = end.saturating_sub(position);
        } else if self.start_of(run_start) < position {
            run_start = self.split_run(position)?;
            run_end += 1;
        }
        if run_start >= run_end {
            return Ok(no_change);
        }
        let result = FillResult {
            changed: true,
            position,
            length: fill_length,
        };
        self.styles.set_value_at(run_start, value);
        for _ in run_start + 1..run_end {
            self.remove_run(run_start + 1)?;
        }
        let run_end = self.run_from_position(end);
        self.remove_run_if_same_as_previous(run_end)?;
        self.remove_run_if_same_as_previous(run_start)?;
        let run_end = self.run_from_position(end);
        self.remove_run_if_empty(run_end)?;
        Ok(result)
    }

    /// Set a single position to `value`.
    pub fn set_value_at(&mut self, position: usize, value: V) -> CoreResult<bool> {
        Ok(self.fill_range(position, value, 1)?.changed)
    }

    /// Open `insert_length` positions at `position`, extending the run that contains it.
    ///
    /// The inserted positions take the value found at `position` (the last run's value at the
    /// end). Callers wanting a different value fill the range afterwards.
    pub fn insert_space(&mut self, position: usize, insert_length: usize) -> CoreResult<()> {
        self.check_position(position)?;
        if insert_length == 0 {
            return Ok(());
        }
        let run = self.run_from_position(position);
        self.starts.insert_text(run, insert_length as isize)
    }

    /// Remove `delete_length` positions starting at `position`.
    pub fn delete_range(&mut self, position: usize, delete_length: usize) -> CoreResult<()> {
        self.check_range(position, delete_length)?;
        if delete_length == 0 {
            return Ok(());
        }
        let end = position + delete_length;
        let run_start = self.run_from_position(position);
        let run_end = self.run_from_position(end);
        if run_start == run_end {
            // Deleting from inside one run.
            self.starts.insert_text(run_start, -(delete_length as isize))?;
            self.remove_run_if_empty(run_start)?;
        } else {
            let run_start = self.split_run(position)?;
            let run_end = self.split_run(end)?;
            self.starts.insert_text(run_start, -(delete_length as isize))?;
            for _ in run_start..run_end {
                self.remove_run(run_start)?;
            }
            self.remove_run_if_empty(run_start)?;
            self.remove_run_if_same_as_previous(run_start)?;
        }
        Ok(())
    }

    /// Reset to an empty map.
    pub fn delete_all(&mut self) {
        self.starts.delete_all();
        self.styles.delete_all();
        self.styles.insert_value(0, 2, V::default());
    }

    /// `true` when every position has the same value.
    pub fn all_same(&self) -> bool {
        let first = self.styles.value_at(0);
        (1..self.runs()).all(|run| self.styles.value_at(run) == first)
    }

    /// `true` when every position has `value`.
    pub fn all_same_as(&self, value: V) -> bool {
        self.all_same() && self.styles.value_at(0) == value
    }

    /// First position at or after `start` holding `value`.
    pub fn find(&self, value: V, start: usize) -> Option<usize> {
        if start >= self.length() {
            return None;
        }
        let mut run = if start > 0 {
            self.starts.partition_from_position(start)
        } else {
            0
        };
        if self.styles.value_at(run) == value {
            return Some(start);
        }
        run += 1;
        while run < self.runs() {
            if self.styles.value_at(run) == value {
                return Some(self.start_of(run));
            }
            run += 1;
        }
        None
    }

    /// The runs as `(length, value)` pairs, in order.
    pub fn run_list(&self) -> Vec<(usize, V)> {
        (0..self.runs())
            .map(|run| {
                (
                    self.start_of(run + 1) - self.start_of(run),
                    self.styles.value_at(run),
                )
            })
            .collect()
    }

    /// Debug check of the structural invariants.
    pub fn check(&self) -> bool {
        let runs = self.run_list();
        let lengths_ok = runs.iter().all(|(len, _)| *len > 0) || self.length() == 0;
        let compact = runs.windows(2).all(|pair| pair[0].1 != pair[1].1);
        let total: usize = runs.iter().map(|(len, _)| len).sum();
        lengths_ok && compact && total == self.length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(len: usize) -> RunStyles<u32> {
        let mut rs = RunStyles::new();
        rs.insert_space(0, len).unwrap();
        rs
    }

    #[test]
    fn test_empty_map() {
        let rs: RunStyles<u32> = RunStyles::new();
        assert_eq!(rs.length(), 0);
        assert_eq!(rs.runs(), 1);
        assert_eq!(rs.value_at(0).unwrap(), 0);
        assert!(rs.value_at(1).is_err());
    }

    #[test]
    fn test_fill_splits_and_merges() {
        let mut rs = filled(10);
        rs.fill_range(0, 1, 5).unwrap();
        rs.fill_range(2, 2, 2).unwrap();
        assert_eq!(rs.run_list(), vec![(2, 1), (2, 2), (1, 1), (5, 0)]);
        rs.fill_range(2, 1, 2).unwrap();
        assert_eq!(rs.run_list(), vec![(5, 1), (5, 0)]);
        assert!(rs.check());
    }

    #[test]
    fn test_fill_reports_trimmed_range() {
        let mut rs = filled(10);
        rs.fill_range(0, 3, 4).unwrap();
        let result = rs.fill_range(2, 3, 4).unwrap();
        assert_eq!(
            result,
            FillResult {
                changed: true,
                position: 4,
                length: 2
            }
        );
        let unchanged = rs.fill_range(1, 3, 3).unwrap();
        assert!(!unchanged.changed);
    }

    #[test]
    fn test_value_at_end_is_last_run() {
        let mut rs = filled(4);
        rs.fill_range(2, 9, 2).unwrap();
        assert_eq!(rs.value_at(4).unwrap(), 9);
        assert_eq!(rs.start_run(3), 2);
        assert_eq!(rs.end_run(0), 2);
    }

    #[test]
    fn test_insert_space_extends_containing_run() {
        let mut rs = filled(6);
        rs.fill_range(2, 7, 2).unwrap();
        rs.insert_space(2, 3).unwrap();
        assert_eq!(rs.run_list(), vec![(2, 0), (5, 7), (2, 0)]);
        rs.insert_space(9, 1).unwrap();
        assert_eq!(rs.run_list(), vec![(2, 0), (5, 7), (3, 0)]);
    }

    #[test]
    fn test_delete_range_merges_neighbours() {
        let mut rs = filled(9);
        rs.fill_range(3, 5, 3).unwrap();
        rs.delete_range(2, 5).unwrap();
        assert_eq!(rs.run_list(), vec![(4, 0)]);
        assert!(rs.check());
        assert!(rs.delete_range(3, 2).is_err());
    }

    #[test]
    fn test_find_next_change_and_find() {
        let mut rs = filled(10);
        rs.fill_range(4, 1, 3).unwrap();
        assert_eq!(rs.find_next_change(0, 10), 4);
        assert_eq!(rs.find_next_change(4, 10), 7);
        assert_eq!(rs.find_next_change(8, 10), 10);
        assert_eq!(rs.find(1, 0), Some(4));
        assert_eq!(rs.find(0, 5), Some(7));
        assert_eq!(rs.find(2, 0), None);
        assert!(!rs.all_same());
        rs.fill_range(4, 0, 3).unwrap();
        assert!(rs.all_same_as(0));
    }
}
