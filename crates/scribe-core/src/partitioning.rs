//! Partition boundaries with lazy shifting.
//!
//! A [`Partitioning`] divides `0..length` into consecutive partitions by storing the start of
//! each one plus a final entry holding the total length. Line starts of a document and run
//! starts of a [`RunStyles`](crate::RunStyles) are both partitionings.
//!
//! Text edits move every boundary after the edit point. Rather than touching all of them, the
//! pending shift is remembered as a `(step_partition, step_length)` pair and folded into the
//! stored values only when a query or a further edit needs them. Consecutive typing on one
//! line therefore costs O(1) per keystroke, and lookups stay O(log n).

use crate::error::{CoreError, CoreResult};
use crate::split_vector::SplitVector;

/// Ordered partition start positions.
///
/// Invariant: partition 0 starts at 0, starts are non-decreasing, and the entry after the last
/// partition holds the total length.
#[derive(Debug, Clone)]
pub struct Partitioning {
    // Stored values after `step_partition` lag their real value by `step_length`.
    body: SplitVector<usize>,
    step_partition: usize,
    step_length: isize,
}

impl Default for Partitioning {
    fn default() -> Self {
        Self::new(8)
    }
}

impl Partitioning {
    /// Create a partitioning holding one empty partition.
    pub fn new(grow_size: usize) -> Self {
        let mut body = SplitVector::with_grow_size(grow_size);
        body.insert(0, 0);
        body.insert(1, 0);
        Self {
            body,
            step_partition: 0,
            step_length: 0,
        }
    }

    /// Number of partitions (always at least one).
    pub fn partitions(&self) -> usize {
        self.body.len() - 1
    }

    /// Total length covered by all partitions.
    pub fn length(&self) -> usize {
        self.start_of(self.partitions())
    }

    fn apply_step(&mut self, partition_up_to: usize) {
        if self.step_length != 0 {
            let delta = self.step_length;
            self.body.update_range(
                self.step_partition + 1,
                partition_up_to - self.step_partition,
                |v| *v = v.wrapping_add_signed(delta),
            );
        }
        self.step_partition = partition_up_to;
        if self.step_partition >= self.body.len() - 1 {
            self.step_partition = self.partitions();
            self.step_length = 0;
        }
    }

    fn back_step(&mut self, partition_down_to: usize) {
        if self.step_length != 0 {
            let delta = -self.step_length;
            self.body.update_range(
                partition_down_to + 1,
                self.step_partition - partition_down_to,
                |v| *v = v.wrapping_add_signed(delta),
            );
        }
        self.step_partition = partition_down_to;
    }

    fn check_partition(&self, partition: usize, limit: usize) -> CoreResult<()> {
        if partition > limit {
            return Err(CoreError::LineOutOfBounds {
                line: partition,
                line_count: self.partitions(),
            });
        }
        Ok(())
    }

    fn start_of(&self, partition: usize) -> usize {
        let pos = self.body.value_at(partition);
        if partition > self.step_partition {
            pos.wrapping_add_signed(self.step_length)
        } else {
            pos
        }
    }

    /// Insert a new partition boundary at index `partition` starting at `pos`.
    pub fn insert_partition(&mut self, partition: usize, pos: usize) -> CoreResult<()> {
        self.check_partition(partition, self.partitions())?;
        if self.step_partition < partition {
            self.apply_step(partition);
        }
        self.body.insert(partition, pos);
        self.step_partition += 1;
        Ok(())
    }

    /// Move the start of `partition` to `pos`.
    pub fn set_partition_start_position(&mut self, partition: usize, pos: usize) -> CoreResult<()> {
        self.check_partition(partition, self.partitions())?;
        if partition > self.step_partition {
            self.apply_step(partition);
        }
        self.body.set_value_at(partition, pos);
        Ok(())
    }

    /// Shift every boundary after `partition_insert` by `delta`.
    pub fn insert_text(&mut self, partition_insert: usize, delta: isize) -> CoreResult<()> {
        self.check_partition(partition_insert, self.partitions())?;
        if self.step_length != 0 {
            if partition_insert >= self.step_partition {
                // Fill in up to the new insertion point.
                self.apply_step(partition_insert);
                self.step_length += delta;
            } else if partition_insert + self.body.len() / 10 >= self.step_partition {
                // Close to the step but before it, so move the step back.
                self.back_step(partition_insert);
                self.step_length += delta;
            } else {
                self.apply_step(self.partitions());
                self.step_partition = partition_insert;
                self.step_length = delta;
            }
        } else {
            self.step_partition = partition_insert;
            self.step_length = delta;
        }
        Ok(())
    }

    /// Remove boundary `partition`, merging it into the previous partition.
    ///
    /// Removing partition 0 is only meaningful while the following start is being shifted back
    /// to 0, as run deletion does.
    pub fn remove_partition(&mut self, partition: usize) -> CoreResult<()> {
        if partition >= self.partitions() {
            return Err(CoreError::LineOutOfBounds {
                line: partition,
                line_count: self.partitions(),
            });
        }
        if self.step_partition == 0 {
            self.apply_step(self.partitions());
        } else if partition > self.step_partition {
            self.apply_step(partition);
        }
        self.step_partition -= 1;
        self.body.delete(partition);
        Ok(())
    }

    /// Start position of `partition`; `partitions()` yields the total length.
    pub fn position_from_partition(&self, partition: usize) -> CoreResult<usize> {
        self.check_partition(partition, self.partitions())?;
        Ok(self.start_of(partition))
    }

    /// Partition containing `pos`. Positions at or past the end map to the last partition.
    pub fn partition_from_position(&self, pos: usize) -> usize {
        if self.body.len() <= 1 {
            return 0;
        }
        if pos >= self.start_of(self.partitions()) {
            return self.partitions() - 1;
        }
        let mut lower = 0;
        let mut upper = self.partitions();
        while lower < upper {
            let middle = (upper + lower).div_ceil(2);
            if pos < self.start_of(middle) {
                upper = middle - 1;
            } else {
                lower = middle;
            }
        }
        lower
    }

    /// Reset to a single empty partition.
    pub fn delete_all(&mut self) {
        self.body.delete_all();
        self.step_partition = 0;
        self.step_length = 0;
        self.body.insert(0, 0);
        self.body.insert(1, 0);
    }

    /// All partition starts including the trailing total length.
    pub fn starts(&self) -> Vec<usize> {
        (0..=self.partitions()).map(|p| self.start_of(p)).collect()
    }
}
