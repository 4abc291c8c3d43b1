//! Local pixel store: the cell map the renderer draws from.
//!
//! The store is owned by the engine. Placements write into it optimistically,
//! and the periodic snapshot replaces it wholesale. Every write bumps a
//! monotonically increasing stamp recorded on the cell, so a late placement
//! result can tell whether the cell still holds the write it made.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::transform::{CellCoord, GridSize};

/// Per-write sequence number.
pub type Stamp = u64;

/// A painted cell as stored locally and on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pixel {
    /// CSS colour string, e.g. `"#FF4500"`.
    pub color: String,
    #[serde(default)]
    pub placed_by: Option<String>,
}

impl Pixel {
    #[must_use]
    pub fn new(color: &str, placed_by: Option<&str>) -> Self {
        Self { color: color.to_owned(), placed_by: placed_by.map(str::to_owned) }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StoredCell {
    pixel: Pixel,
    stamp: Stamp,
}

/// Sparse cell map bounded by the grid.
#[derive(Debug, Clone)]
pub struct PixelStore {
    grid: GridSize,
    cells: HashMap<CellCoord, StoredCell>,
    next_stamp: Stamp,
}

impl PixelStore {
    #[must_use]
    pub fn new(grid: GridSize) -> Self {
        Self { grid, cells: HashMap::new(), next_stamp: 1 }
    }

    #[must_use]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<&Pixel> {
        self.cells.get(&cell).map(|c| &c.pixel)
    }

    /// Stamp of the last write to `cell`, if it is painted.
    #[must_use]
    pub fn stamp(&self, cell: CellCoord) -> Option<Stamp> {
        self.cells.get(&cell).map(|c| c.stamp)
    }

    /// Write a pixel and return the stamp it was written with.
    /// Cells outside the grid are rejected with `None`.
    pub fn put(&mut self, cell: CellCoord, pixel: Pixel) -> Option<Stamp> {
        if !self.grid.contains(cell) {
            return None;
        }
        let stamp = self.bump();
        self.cells.insert(cell, StoredCell { pixel, stamp });
        Some(stamp)
    }

    /// Put back what a cell held before a write, but only while that write
    /// (identified by `stamp`) is still the latest. Returns whether anything changed.
    pub fn restore_if(&mut self, cell: CellCoord, stamp: Stamp, previous: Option<Pixel>) -> bool {
        if self.stamp(cell) != Some(stamp) {
            return false;
        }
        match previous {
            Some(pixel) => {
                let stamp = self.bump();
                self.cells.insert(cell, StoredCell { pixel, stamp });
            }
            None => {
                self.cells.remove(&cell);
            }
        }
        true
    }

    /// Replace every cell with an authoritative snapshot. Cells outside the
    /// grid are dropped; returns how many were kept.
    pub fn load_snapshot(&mut self, pixels: impl IntoIterator<Item = (CellCoord, Pixel)>) -> usize {
        self.cells.clear();
        for (cell, pixel) in pixels {
            if self.grid.contains(cell) {
                let stamp = self.bump();
                self.cells.insert(cell, StoredCell { pixel, stamp });
            }
        }
        self.cells.len()
    }

    /// Painted cells with `x` in `[min_x, max_x]` and `y` in `[min_y, max_y]`.
    pub fn iter_range(&self, min: CellCoord, max: CellCoord) -> impl Iterator<Item = (CellCoord, &Pixel)> {
        self.cells
            .iter()
            .filter(move |(c, _)| c.x >= min.x && c.x <= max.x && c.y >= min.y && c.y <= max.y)
            .map(|(c, stored)| (*c, &stored.pixel))
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &Pixel)> {
        self.cells.iter().map(|(c, stored)| (*c, &stored.pixel))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn bump(&mut self) -> Stamp {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }
}
