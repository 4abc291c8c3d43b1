//! Rendering: draws the grid scene onto a [`Surface`].
//!
//! Layers, bottom first: void fill with a diagonal hatch over the whole
//! canvas, the in-bounds background, painted cells in the visible range (plus
//! a margin), grid lines when zoomed in far enough, and the placement preview.
//! Every call redraws the full viewport. Nothing here mutates engine state.
//!
//! [`Surface`] is implemented for the browser 2D context; fallible calls
//! propagate its `JsValue` errors. Drawing happens in canvas-local CSS pixels
//! with the device pixel ratio applied once per frame as a transform.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use serde::Serialize;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::consts::{
    BACKGROUND_FILL, GRID_LINE_COLOR, PREVIEW_ALPHA, PREVIEW_OUTLINE, RENDER_MARGIN_PX, VOID_FILL, VOID_HATCH,
    VOID_HATCH_SPACING_PX,
};
use crate::store::PixelStore;
use crate::transform::{CellCoord, CoordinateTransformer, Point, ViewState};

/// Minimal 2D drawing surface.
pub trait Surface {
    type Error;

    /// Reset the transform to a uniform scale (the device pixel ratio).
    ///
    /// # Errors
    ///
    /// Returns the surface's error if the transform cannot be set.
    fn set_scale(&mut self, scale: f64) -> Result<(), Self::Error>;
    fn clear(&mut self, width: f64, height: f64);
    fn set_fill(&mut self, color: &str);
    fn set_stroke(&mut self, color: &str, width: f64);
    fn set_alpha(&mut self, alpha: f64);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn stroke(&mut self);
    fn save(&mut self);
    fn restore(&mut self);
}

impl Surface for CanvasRenderingContext2d {
    type Error = JsValue;

    fn set_scale(&mut self, scale: f64) -> Result<(), JsValue> {
        self.set_transform(scale, 0.0, 0.0, scale, 0.0, 0.0)
    }

    fn clear(&mut self, width: f64, height: f64) {
        self.clear_rect(0.0, 0.0, width, height);
    }

    fn set_fill(&mut self, color: &str) {
        self.set_fill_style_str(color);
    }

    fn set_stroke(&mut self, color: &str, width: f64) {
        self.set_stroke_style_str(color);
        self.set_line_width(width);
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.set_global_alpha(alpha);
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        CanvasRenderingContext2d::fill_rect(self, x, y, w, h);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        CanvasRenderingContext2d::stroke_rect(self, x, y, w, h);
    }

    fn begin_path(&mut self) {
        CanvasRenderingContext2d::begin_path(self);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        CanvasRenderingContext2d::move_to(self, x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        CanvasRenderingContext2d::line_to(self, x, y);
    }

    fn stroke(&mut self) {
        CanvasRenderingContext2d::stroke(self);
    }

    fn save(&mut self) {
        CanvasRenderingContext2d::save(self);
    }

    fn restore(&mut self) {
        CanvasRenderingContext2d::restore(self);
    }
}

/// Hovered cell drawn in the selected colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preview<'a> {
    pub cell: CellCoord,
    pub color: &'a str,
}

/// Read-only inputs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub store: &'a PixelStore,
    pub transformer: &'a CoordinateTransformer,
    pub view: ViewState,
    /// Canvas size in CSS pixels.
    pub width: f64,
    pub height: f64,
    pub show_grid: bool,
    pub grid_line_zoom_threshold: f64,
    pub preview: Option<Preview<'a>>,
}

/// What a frame drew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    pub cells_drawn: usize,
    pub grid_lines: bool,
    pub preview: bool,
}

/// Inclusive cell index range on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    pub min: CellCoord,
    pub max: CellCoord,
}

/// Draw the full scene.
///
/// # Errors
///
/// Returns `Err` if the surface rejects a call.
pub fn draw<S: Surface>(surface: &mut S, scene: &Scene<'_>) -> Result<RenderStats, S::Error> {
    let mut stats = RenderStats::default();
    let (w, h) = (scene.width, scene.height);
    if !(w > 0.0 && h > 0.0) {
        return Ok(stats);
    }

    // Layer 1: clear and scale for the device.
    surface.set_scale(scene.transformer.device_pixel_ratio)?;
    surface.clear(w, h);
    surface.set_alpha(1.0);

    // Layer 2: void area.
    surface.set_fill(VOID_FILL);
    surface.fill_rect(0.0, 0.0, w, h);
    draw_hatch(surface, w, h);

    let scale = scene.transformer.cell_px(scene.view.zoom);
    if !(scale.is_finite() && scale > 0.0) {
        return Ok(stats);
    }

    // Layer 3: in-bounds background, cut to the canvas.
    let grid = scene.transformer.grid;
    let top_left = to_local(scene, Point::new(0.0, 0.0));
    let bottom_right = to_local(scene, Point::new(f64::from(grid.width), f64::from(grid.height)));
    let bx0 = top_left.x.max(0.0);
    let by0 = top_left.y.max(0.0);
    let bx1 = bottom_right.x.min(w);
    let by1 = bottom_right.y.min(h);
    if bx1 <= bx0 || by1 <= by0 {
        return Ok(stats);
    }
    surface.set_fill(BACKGROUND_FILL);
    surface.fill_rect(bx0, by0, bx1 - bx0, by1 - by0);

    let Some(span) = visible_cells(scene.transformer, scene.view, w, h) else {
        return Ok(stats);
    };

    // Layer 4: painted cells.
    for (cell, pixel) in scene.store.iter_range(span.min, span.max) {
        let corner = to_local(scene, cell_origin(cell));
        surface.set_fill(&pixel.color);
        surface.fill_rect(corner.x, corner.y, scale, scale);
        stats.cells_drawn += 1;
    }

    // Layer 5: grid lines.
    if scene.show_grid && scene.view.zoom > scene.grid_line_zoom_threshold {
        draw_grid_lines(surface, scene, span, scale);
        stats.grid_lines = true;
    }

    // Layer 6: placement preview.
    if let Some(preview) = scene.preview
        && grid.contains(preview.cell)
    {
        let corner = to_local(scene, cell_origin(preview.cell));
        surface.set_alpha(PREVIEW_ALPHA);
        surface.set_fill(preview.color);
        surface.fill_rect(corner.x, corner.y, scale, scale);
        surface.set_alpha(1.0);
        surface.set_stroke(PREVIEW_OUTLINE, 2.0);
        surface.stroke_rect(corner.x, corner.y, scale, scale);
        stats.preview = true;
    }

    Ok(stats)
}

/// Cells intersecting the canvas widened by [`RENDER_MARGIN_PX`], clamped to
/// the grid. `None` when the visible area misses the grid entirely.
#[must_use]
pub fn visible_cells(transformer: &CoordinateTransformer, view: ViewState, width: f64, height: f64) -> Option<CellSpan> {
    let scale = transformer.cell_px(view.zoom);
    if !(scale.is_finite() && scale > 0.0) {
        return None;
    }
    let rect = transformer.visible_world_rect(view, width, height);
    let margin = RENDER_MARGIN_PX / scale;
    let grid = transformer.grid;
    let (x0, x1) = axis_span(rect.min.x - margin, rect.max.x + margin, grid.width)?;
    let (y0, y1) = axis_span(rect.min.y - margin, rect.max.y + margin, grid.height)?;
    Some(CellSpan { min: CellCoord::new(x0, y0), max: CellCoord::new(x1, y1) })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn axis_span(lo: f64, hi: f64, extent: u32) -> Option<(u32, u32)> {
    let last = f64::from(extent.checked_sub(1)?);
    if !(lo.is_finite() && hi.is_finite()) || hi < 0.0 || lo >= last + 1.0 {
        return None;
    }
    let first = lo.floor().clamp(0.0, last);
    let end = hi.floor().clamp(0.0, last);
    Some((first as u32, end as u32))
}

fn cell_origin(cell: CellCoord) -> Point {
    Point::new(f64::from(cell.x), f64::from(cell.y))
}

/// World point to canvas-local CSS pixels.
fn to_local(scene: &Scene<'_>, world: Point) -> Point {
    let scale = scene.transformer.cell_px(scene.view.zoom);
    Point::new((world.x + scene.view.offset.x) * scale, (world.y + scene.view.offset.y) * scale)
}

fn draw_hatch<S: Surface>(surface: &mut S, w: f64, h: f64) {
    surface.set_stroke(VOID_HATCH, 1.0);
    surface.begin_path();
    let mut x = -h;
    while x < w {
        surface.move_to(x, 0.0);
        surface.line_to(x + h, h);
        x += VOID_HATCH_SPACING_PX;
    }
    surface.stroke();
}

fn draw_grid_lines<S: Surface>(surface: &mut S, scene: &Scene<'_>, span: CellSpan, scale: f64) {
    let zoom = scene.view.zoom;
    let threshold = scene.grid_line_zoom_threshold.max(f64::EPSILON);
    // Lines fade in and thicken as cells grow.
    let alpha = ((zoom - threshold) / threshold).clamp(0.1, 0.35);
    let width = (scale / 40.0).clamp(0.5, 1.5);

    let top = to_local(scene, Point::new(f64::from(span.min.x), f64::from(span.min.y)));
    let bottom = to_local(scene, Point::new(f64::from(span.max.x + 1), f64::from(span.max.y + 1)));

    surface.save();
    surface.set_alpha(alpha);
    surface.set_stroke(GRID_LINE_COLOR, width);
    surface.begin_path();
    for x in span.min.x..=span.max.x + 1 {
        let sx = to_local(scene, Point::new(f64::from(x), 0.0)).x;
        surface.move_to(sx, top.y);
        surface.line_to(sx, bottom.y);
    }
    for y in span.min.y..=span.max.y + 1 {
        let sy = to_local(scene, Point::new(0.0, f64::from(y))).y;
        surface.move_to(top.x, sy);
        surface.line_to(bottom.x, sy);
    }
    surface.stroke();
    surface.restore();
}
