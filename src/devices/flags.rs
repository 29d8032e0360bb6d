// MIT License - Copyright (c) 2026 The dsc2mqtt Developers
// Indexed boolean containers for zone and PGM status

use std::ops::Range;

/// Number of entities the panel reports per status group.
pub const GROUP_SIZE: usize = 8;

/// A fixed-size set of booleans addressed by 0-based index.
///
/// Replaces the panel's bit-packed bytes (8 entities per byte) so callers never
/// do bit arithmetic. Out-of-range indices read as `false` and writes to them
/// are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagBank<const N: usize> {
    bits: [bool; N],
}

impl<const N: usize> Default for FlagBank<N> {
    fn default() -> Self {
        Self { bits: [false; N] }
    }
}

impl<const N: usize> FlagBank<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn get(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    pub fn set(&mut self, index: usize, value: bool) {
        if let Some(bit) = self.bits.get_mut(index) {
            *bit = value;
        }
    }

    /// True if any index inside `range` (clamped to the bank size) is set.
    pub fn any_set_in_range(&self, range: Range<usize>) -> bool {
        let end = range.end.min(N);
        let start = range.start.min(end);
        self.bits[start..end].iter().any(|b| *b)
    }

    pub fn any(&self) -> bool {
        self.any_set_in_range(0..N)
    }

    /// Indices of all set entries, ascending.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.then_some(i))
    }

    /// Indices set inside `range`, ascending.
    pub fn iter_set_in_range(&self, range: Range<usize>) -> impl Iterator<Item = usize> + '_ {
        self.iter_set().filter(move |i| range.contains(i))
    }

    pub fn clear(&mut self) {
        self.bits = [false; N];
    }
}

/// Range of 0-based indices covered by status group `group`.
pub fn group_range(group: usize) -> Range<usize> {
    let start = group * GROUP_SIZE;
    start..start + GROUP_SIZE
}

/// Current state plus per-entity change tracking for a batched category
/// (zones, PGM outputs).
///
/// `pending` is the category-level "something changed" flag. It is set by the
/// collaborator alongside any per-entity flag and cleared by the publisher only
/// after a scan in which every changed entity published successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeBank<const N: usize> {
    state: FlagBank<N>,
    changed: FlagBank<N>,
    pending: bool,
}

impl<const N: usize> ChangeBank<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Current state of entity `index` (0-based).
    pub fn state(&self, index: usize) -> bool {
        self.state.get(index)
    }

    /// Record a new state for `index`. Marks the entity and the category as
    /// changed only when the value differs. Returns whether it changed.
    pub fn update(&mut self, index: usize, value: bool) -> bool {
        if index >= N || self.state.get(index) == value {
            return false;
        }
        self.state.set(index, value);
        self.mark_changed(index);
        true
    }

    /// Force entity `index` to be re-published on the next scan.
    pub fn mark_changed(&mut self, index: usize) {
        if index < N {
            self.changed.set(index, true);
            self.pending = true;
        }
    }

    pub fn is_changed(&self, index: usize) -> bool {
        self.changed.get(index)
    }

    pub fn clear_changed(&mut self, index: usize) {
        self.changed.set(index, false);
    }

    pub fn changed(&self) -> &FlagBank<N> {
        &self.changed
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn clear_pending(&mut self) {
        self.pending = false;
    }
}
