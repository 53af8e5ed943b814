/// Small containers shared by the cache internals

pub mod slot_grid;

pub use slot_grid::SlotGrid;
