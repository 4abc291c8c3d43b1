//! Coordinate conversions between screen, device, and grid space.
//!
//! Screen space is CSS pixels relative to the page. The canvas element sits at
//! `origin` (its content box, after any border or padding), so the local
//! canvas coordinate of a screen point is `screen - origin`. World space is
//! measured in cells: `world = local / (cell_size_px * zoom) - offset`.
//!
//! Everything here is pure. The viewport hands in a [`ViewState`] snapshot and
//! nothing is cached between calls.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use serde::{Deserialize, Serialize};

use crate::config::SnapRule;

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[must_use]
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }
}

/// Integer cell index on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: u32,
    pub y: u32,
}

impl CellCoord {
    #[must_use]
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Grid dimensions in cells. Fixed for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn contains(self, cell: CellCoord) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Whether a fractional world point lies on the grid surface.
    #[must_use]
    pub fn contains_world(self, world: Point) -> bool {
        world.is_finite()
            && world.x >= 0.0
            && world.y >= 0.0
            && world.x < f64::from(self.width)
            && world.y < f64::from(self.height)
    }
}

/// Camera parameters needed for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub zoom: f64,
    pub offset: Point,
}

impl Default for ViewState {
    fn default() -> Self {
        Self { zoom: 1.0, offset: Point::default() }
    }
}

/// Axis-aligned world rectangle, `min` inclusive and `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    pub min: Point,
    pub max: Point,
}

/// Static geometry of the draw surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransformer {
    /// Screen position of the canvas content box's top-left corner.
    pub origin: Point,
    pub cell_size_px: f64,
    pub device_pixel_ratio: f64,
    pub grid: GridSize,
    pub snap: SnapRule,
}

impl CoordinateTransformer {
    #[must_use]
    pub fn new(grid: GridSize, cell_size_px: f64, snap: SnapRule) -> Self {
        Self {
            origin: Point::default(),
            cell_size_px,
            device_pixel_ratio: 1.0,
            grid,
            snap,
        }
    }

    /// Screen pixels covered by one cell at `zoom`.
    #[must_use]
    pub fn cell_px(&self, zoom: f64) -> f64 {
        self.cell_size_px * zoom
    }

    /// Convert a screen point to a fractional world point.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point, view: ViewState) -> Point {
        let scale = self.cell_px(view.zoom);
        Point {
            x: (screen.x - self.origin.x) / scale - view.offset.x,
            y: (screen.y - self.origin.y) / scale - view.offset.y,
        }
    }

    /// Convert a world point back to screen pixels. Exact inverse of
    /// [`Self::screen_to_world`].
    #[must_use]
    pub fn world_to_screen(&self, world: Point, view: ViewState) -> Point {
        let scale = self.cell_px(view.zoom);
        Point {
            x: (world.x + view.offset.x) * scale + self.origin.x,
            y: (world.y + view.offset.y) * scale + self.origin.y,
        }
    }

    /// Resolve the grid cell under a screen point.
    ///
    /// Returns `None` when the point is non-finite or lands outside the grid.
    /// Inside the grid the snapped index is clamped to the last row/column, so
    /// round-to-nearest cannot step past the far edge.
    #[must_use]
    pub fn screen_to_cell(&self, screen: Point, view: ViewState) -> Option<CellCoord> {
        if !screen.is_finite() || !(view.zoom.is_finite() && view.zoom > 0.0) {
            return None;
        }
        let world = self.screen_to_world(screen, view);
        if !self.grid.contains_world(world) {
            return None;
        }
        Some(CellCoord {
            x: snap_axis(self.snap, world.x, self.grid.width),
            y: snap_axis(self.snap, world.y, self.grid.height),
        })
    }

    /// Top-left screen corner of a cell.
    #[must_use]
    pub fn cell_to_screen(&self, cell: CellCoord, view: ViewState) -> Point {
        self.world_to_screen(Point::new(f64::from(cell.x), f64::from(cell.y)), view)
    }

    /// Canvas-local device pixels for a screen point.
    #[must_use]
    pub fn screen_to_device(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.origin.x) * self.device_pixel_ratio,
            y: (screen.y - self.origin.y) * self.device_pixel_ratio,
        }
    }

    #[must_use]
    pub fn device_to_screen(&self, device: Point) -> Point {
        Point {
            x: device.x / self.device_pixel_ratio + self.origin.x,
            y: device.y / self.device_pixel_ratio + self.origin.y,
        }
    }

    /// World rectangle visible in a canvas of `width` × `height` CSS pixels.
    #[must_use]
    pub fn visible_world_rect(&self, view: ViewState, width: f64, height: f64) -> WorldRect {
        let scale = self.cell_px(view.zoom);
        WorldRect {
            min: Point::new(-view.offset.x, -view.offset.y),
            max: Point::new(width / scale - view.offset.x, height / scale - view.offset.y),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn snap_axis(rule: SnapRule, value: f64, extent: u32) -> u32 {
    let last = f64::from(extent.saturating_sub(1));
    rule.apply(value).clamp(0.0, last) as u32
}
