//! Gap buffer storage.
//!
//! [`SplitVector`] keeps its elements in a single allocation split in two by a movable gap.
//! Insertions and deletions near the previous edit only move the gap, which makes the typing
//! pattern of an editor cheap. The text bytes of a [`CellBuffer`](crate::CellBuffer) and the
//! internal vectors of [`Partitioning`](crate::Partitioning) and
//! [`RunStyles`](crate::RunStyles) are all split vectors.
//!
//! Positions passed to the mutating methods are trusted: callers validate them first and an
//! out of range position is a bug, asserted in debug builds and ignored in release builds.

/// A vector with a movable gap, generic over small `Copy` element types.
#[derive(Debug, Clone)]
pub struct SplitVector<T> {
    body: Vec<T>,
    length: usize,
    part1_length: usize,
    gap_length: usize,
    grow_size: usize,
}

impl<T: Copy + Default> Default for SplitVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default> SplitVector<T> {
    /// Create an empty split vector.
    pub fn new() -> Self {
        Self::with_grow_size(8)
    }

    /// Create an empty split vector that grows in steps of at least `grow_size` elements.
    pub fn with_grow_size(grow_size: usize) -> Self {
        Self {
            body: Vec::new(),
            length: 0,
            part1_length: 0,
            gap_length: 0,
            grow_size: grow_size.max(1),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Position of the gap, i.e. the length of the first part.
    pub fn gap_position(&self) -> usize {
        self.part1_length
    }

    /// Move the gap so that it starts at `position`.
    fn gap_to(&mut self, position: usize) {
        if position == self.part1_length {
            return;
        }
        if self.gap_length > 0 {
            if position < self.part1_length {
                // Moving the gap towards the start: shift elements towards the end.
                self.body.copy_within(
                    position..self.part1_length,
                    position + self.gap_length,
                );
            } else {
                self.body.copy_within(
                    self.part1_length + self.gap_length..position + self.gap_length,
                    self.part1_length,
                );
            }
        }
        self.part1_length = position;
    }

    /// Make sure the gap can hold `insertion_length` more elements.
    fn room_for(&mut self, insertion_length: usize) {
        if self.gap_length < insertion_length {
            while self.grow_size < self.length / 6 {
                self.grow_size *= 2;
            }
            self.reallocate(self.length + insertion_length + self.grow_size);
        }
    }

    fn reallocate(&mut self, new_size: usize) {
        if new_size > self.body.len() {
            // Move the gap to the end so the new space joins it.
            self.gap_to(self.length);
            self.gap_length += new_size - self.body.len();
            self.body.resize(new_size, T::default());
        }
    }

    /// Element at `position`, or `T::default()` past the end.
    pub fn value_at(&self, position: usize) -> T {
        if position < self.part1_length {
            self.body[position]
        } else if position < self.length {
            self.body[self.gap_length + position]
        } else {
            T::default()
        }
    }

    /// Element at `position`, or `None` past the end.
    pub fn get(&self, position: usize) -> Option<T> {
        (position < self.length).then(|| self.value_at(position))
    }

    /// Overwrite the element at `position`.
    pub fn set_value_at(&mut self, position: usize, value: T) {
        debug_assert!(position < self.length, "set_value_at past end");
        if position < self.part1_length {
            self.body[position] = value;
        } else if position < self.length {
            self.body[self.gap_length + position] = value;
        }
    }

    /// Insert one element at `position`.
    pub fn insert(&mut self, position: usize, value: T) {
        self.insert_value(position, 1, value);
    }

    /// Insert `count` copies of `value` at `position`.
    pub fn insert_value(&mut self, position: usize, count: usize, value: T) {
        debug_assert!(position <= self.length, "insert past end");
        if count == 0 || position > self.length {
            return;
        }
        self.room_for(count);
        self.gap_to(position);
        self.body[self.part1_length..self.part1_length + count].fill(value);
        self.length += count;
        self.part1_length += count;
        self.gap_length -= count;
    }

    /// Insert a slice of elements at `position`.
    pub fn insert_from_slice(&mut self, position: usize, values: &[T]) {
        debug_assert!(position <= self.length, "insert past end");
        if values.is_empty() || position > self.length {
            return;
        }
        self.room_for(values.len());
        self.gap_to(position);
        self.body[self.part1_length..self.part1_length + values.len()].copy_from_slice(values);
        self.length += values.len();
        self.part1_length += values.len();
        self.gap_length -= values.len();
    }

    /// Grow with default elements until at least `wanted` elements exist.
    pub fn ensure_length(&mut self, wanted: usize) {
        if self.length < wanted {
            self.insert_value(self.length, wanted - self.length, T::default());
        }
    }

    /// Remove the element at `position`.
    pub fn delete(&mut self, position: usize) {
        self.delete_range(position, 1);
    }

    /// Remove `delete_length` elements starting at `position`.
    pub fn delete_range(&mut self, position: usize, delete_length: usize) {
        debug_assert!(position + delete_length <= self.length, "delete past end");
        if delete_length == 0 || position + delete_length > self.length {
            return;
        }
        if position == 0 && delete_length == self.length {
            self.delete_all();
            return;
        }
        self.gap_to(position);
        self.length -= delete_length;
        self.gap_length += delete_length;
    }

    /// Remove every element and release the allocation.
    pub fn delete_all(&mut self) {
        self.body = Vec::new();
        self.length = 0;
        self.part1_length = 0;
        self.gap_length = 0;
        self.grow_size = 8;
    }

    /// Apply `f` to each element in `start..start + len` without moving the gap.
    pub fn update_range(&mut self, start: usize, len: usize, mut f: impl FnMut(&mut T)) {
        let end = (start + len).min(self.length);
        let mut i = start;
        let split = end.min(self.part1_length);
        while i < split {
            f(&mut self.body[i]);
            i += 1;
        }
        while i < end {
            f(&mut self.body[i + self.gap_length]);
            i += 1;
        }
    }

    /// Copy `len` elements starting at `position` into a new vector.
    pub fn copy_range(&self, position: usize, len: usize) -> Vec<T> {
        let end = (position + len).min(self.length);
        let mut out = Vec::with_capacity(end.saturating_sub(position));
        if position >= end {
            return out;
        }
        if position < self.part1_length {
            let first_end = end.min(self.part1_length);
            out.extend_from_slice(&self.body[position..first_end]);
        }
        if end > self.part1_length {
            let second_start = position.max(self.part1_length);
            out.extend_from_slice(
                &self.body[second_start + self.gap_length..end + self.gap_length],
            );
        }
        out
    }

    /// Borrow `len` elements starting at `position` as one slice, moving the gap if the range
    /// straddles it.
    pub fn as_contiguous(&mut self, position: usize, len: usize) -> &[T] {
        let end = (position + len).min(self.length);
        let position = position.min(end);
        if position < self.part1_length {
            if end > self.part1_length {
                self.gap_to(position);
                let start = position + self.gap_length;
                &self.body[start..start + (end - position)]
            } else {
                &self.body[position..end]
            }
        } else {
            let start = position + self.gap_length;
            &self.body[start..start + (end - position)]
        }
    }

    /// Iterate over all elements in order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.body[..self.part1_length]
            .iter()
            .chain(self.body[self.part1_length + self.gap_length..self.length + self.gap_length].iter())
            .copied()
    }
}
