use std::ops::{Index, IndexMut};
use crate::device::{ShaderSlot, ShaderStage, SlotKey};

/// Dense stage x slot storage.
///
/// One cell per (ShaderStage, ShaderSlot) pair, laid out stage-major in a
/// single allocation. Lookups are O(1) and cannot go out of range: the grid
/// is sized from `ShaderStage::COUNT` and `ShaderSlot::COUNT`, and every
/// `SlotKey` maps to a distinct cell below that size.
///
/// # Example
///
/// ```ignore
/// let mut grid: SlotGrid<u32> = SlotGrid::new();
/// let key = SlotKey::new(ShaderStage::Pixel, ShaderSlot::PerDraw);
/// grid[key] += 1;
/// ```
pub struct SlotGrid<T> {
    cells: Vec<T>,
}

impl<T: Default> SlotGrid<T> {
    /// Create a grid with every cell set to `T::default()`
    pub fn new() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> SlotGrid<T> {
    /// Total number of cells (stages x slots)
    pub const LEN: usize = ShaderStage::COUNT * ShaderSlot::COUNT;

    /// Create a grid by evaluating `f` once per key, in key order
    pub fn from_fn(mut f: impl FnMut(SlotKey) -> T) -> Self {
        let mut cells = Vec::with_capacity(Self::LEN);
        for key in SlotKey::all() {
            debug_assert_eq!(Self::offset(key), cells.len(), "slot key order mismatch: {:?}", key);
            cells.push(f(key));
        }
        Self { cells }
    }

    fn offset(key: SlotKey) -> usize {
        key.stage.index() * ShaderSlot::COUNT + key.slot.index()
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false: the grid has one cell per key
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate `(key, cell)` pairs in stage-major order
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &T)> {
        SlotKey::all().zip(self.cells.iter())
    }

    /// Iterate `(key, cell)` pairs mutably in stage-major order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotKey, &mut T)> {
        SlotKey::all().zip(self.cells.iter_mut())
    }
}

impl<T: Default> Default for SlotGrid<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<SlotKey> for SlotGrid<T> {
    type Output = T;

    fn index(&self, key: SlotKey) -> &T {
        &self.cells[Self::offset(key)]
    }
}

impl<T> IndexMut<SlotKey> for SlotGrid<T> {
    fn index_mut(&mut self, key: SlotKey) -> &mut T {
        &mut self.cells[Self::offset(key)]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "slot_grid_tests.rs"]
mod tests;
