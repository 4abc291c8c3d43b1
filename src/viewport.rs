//! Camera state for the grid: zoom, offset, animation target, and momentum.
//!
//! The viewport keeps two offsets. `offset` is what the renderer draws with;
//! `target` is where animated pans (keys, wheel, spring-back) are heading. Each
//! [`Viewport::step`] moves `offset` a fixed fraction of the way to `target`,
//! integrates momentum, and pulls the target back when it rests outside the
//! allowed range.
//!
//! BOUNDARIES
//! ==========
//! Each axis has an allowed range and, past it, an overshoot band.
//! [`Viewport::constrain_offset`] projects into allowed + overshoot and is
//! idempotent. The rubber-band feel comes from how motion is applied:
//! outward motion past the allowed range is mapped onto the overshoot band
//! so the band edge is approached but never hit, and a released view
//! springs back.
//!
//! Focal points passed to the zoom methods are canvas-local CSS pixels (the
//! caller subtracts the canvas origin).

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use serde::Serialize;

use crate::config::{EngineConfig, InputProfile};
use crate::consts::SETTLE_EPSILON;
use crate::transform::{GridSize, Point, ViewState};

/// Scales rubber-band strength into band stiffness `1 + strength × scale`.
/// Right at the edge, outward motion runs at `1 / stiffness` of finger speed
/// (a third at strength 0.2).
const RESISTANCE_SCALE: f64 = 10.0;

/// Tunables that shape zoom limits and motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportPolicy {
    pub min_zoom_floor: f64,
    pub max_zoom: f64,
    pub default_zoom: f64,
    pub safety_margin: f64,
    pub friction: f64,
    pub momentum_threshold: f64,
    pub interpolation: f64,
    pub rubber_band_strength: f64,
    pub slack_fraction: f64,
    pub overshoot_fraction: f64,
}

impl ViewportPolicy {
    #[must_use]
    pub fn from_config(config: &EngineConfig, profile: InputProfile) -> Self {
        Self {
            min_zoom_floor: config.min_zoom,
            max_zoom: config.max_zoom,
            default_zoom: config.default_zoom,
            safety_margin: config.safety_margin(profile),
            friction: config.animation.friction,
            momentum_threshold: config.animation.momentum_threshold,
            interpolation: config.animation.interpolation,
            rubber_band_strength: config.animation.rubber_band_strength,
            slack_fraction: config.animation.slack_fraction,
            overshoot_fraction: config.animation.overshoot_fraction,
        }
    }
}

impl Default for ViewportPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default(), InputProfile::Desktop)
    }
}

/// Largest zoom at which the whole grid fits the viewport, scaled by the
/// safety margin, kept within `[floor, max_zoom]`.
#[must_use]
pub fn min_zoom(viewport_px: Point, grid: GridSize, cell_size_px: f64, policy: &ViewportPolicy) -> f64 {
    let ceiling = policy.max_zoom.max(policy.min_zoom_floor);
    if !(viewport_px.x > 0.0 && viewport_px.y > 0.0 && cell_size_px > 0.0) {
        return policy.min_zoom_floor.min(ceiling);
    }
    let fit_x = viewport_px.x / (f64::from(grid.width) * cell_size_px);
    let fit_y = viewport_px.y / (f64::from(grid.height) * cell_size_px);
    let fit = fit_x.min(fit_y) * policy.safety_margin;
    if !fit.is_finite() {
        return policy.min_zoom_floor.min(ceiling);
    }
    fit.max(policy.min_zoom_floor).min(ceiling)
}

/// Allowed offset range on one axis plus the overshoot band around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisBounds {
    pub lo: f64,
    pub hi: f64,
    pub overshoot: f64,
}

impl AxisBounds {
    /// Bounds for an axis where `view` world units are visible over a grid of
    /// `grid` cells.
    #[must_use]
    pub fn compute(view: f64, grid: f64, slack_fraction: f64, overshoot_fraction: f64) -> Self {
        let overshoot = (view * overshoot_fraction).max(f64::EPSILON);
        if view >= grid {
            let centre = (view - grid) * 0.5;
            let slack = view * slack_fraction;
            Self { lo: centre - slack, hi: centre + slack, overshoot }
        } else {
            Self { lo: -(grid - view), hi: 0.0, overshoot }
        }
    }

    /// Project into the envelope. Idempotent.
    #[must_use]
    pub fn constrain(self, value: f64) -> f64 {
        if !value.is_finite() {
            return (self.lo + self.hi) * 0.5;
        }
        value.clamp(self.lo - self.overshoot, self.hi + self.overshoot)
    }

    /// Signed distance past the allowed range; zero inside it.
    #[must_use]
    pub fn excess(self, value: f64) -> f64 {
        if value < self.lo {
            value - self.lo
        } else if value > self.hi {
            value - self.hi
        } else {
            0.0
        }
    }

    /// Apply `delta` to `value`, damping any motion that goes further past the
    /// allowed range.
    ///
    /// The raw excursion past the edge `r` shows as `o·r / (r + o·stiffness)`
    /// for an overshoot band `o`, so the result stays strictly inside the
    /// envelope however large the delta.
    #[must_use]
    pub fn resist(self, value: f64, delta: f64, strength: f64) -> f64 {
        let proposed = value + delta;
        let before = self.excess(value);
        let after = self.excess(proposed);
        if after.abs() <= before.abs() {
            return self.constrain(proposed);
        }
        let stiffness = 1.0 + strength.max(0.0) * RESISTANCE_SCALE;
        let raw = if before != 0.0 && before.signum() == after.signum() {
            self.stretch(before.abs(), stiffness) + (after.abs() - before.abs())
        } else {
            after.abs()
        };
        let shown = self.overshoot * raw / (raw + self.overshoot * stiffness);
        let edge = if after > 0.0 { self.hi } else { self.lo };
        self.constrain(edge + shown.copysign(after))
    }

    /// Raw excursion that displays as `shown` past the edge.
    fn stretch(self, shown: f64, stiffness: f64) -> f64 {
        let shown = shown.min(self.overshoot * (1.0 - f64::EPSILON));
        shown * self.overshoot * stiffness / (self.overshoot - shown)
    }

    /// Whether `value` sits on the outer edge of the envelope.
    #[must_use]
    pub fn is_pinned(self, value: f64) -> bool {
        self.excess(value).abs() >= self.overshoot
    }
}

/// Pan/zoom camera over a fixed grid.
#[derive(Debug, Clone)]
pub struct Viewport {
    zoom: f64,
    offset: Point,
    target: Point,
    /// Screen pixels per tick.
    velocity: Point,
    size_px: Point,
    grid: GridSize,
    cell_size_px: f64,
    policy: ViewportPolicy,
    held: bool,
}

impl Viewport {
    #[must_use]
    pub fn new(grid: GridSize, cell_size_px: f64, policy: ViewportPolicy) -> Self {
        Self {
            zoom: policy.default_zoom,
            offset: Point::default(),
            target: Point::default(),
            velocity: Point::default(),
            size_px: Point::default(),
            grid,
            cell_size_px,
            policy,
            held: false,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn view(&self) -> ViewState {
        ViewState { zoom: self.zoom, offset: self.offset }
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn offset(&self) -> Point {
        self.offset
    }

    #[must_use]
    pub fn target(&self) -> Point {
        self.target
    }

    #[must_use]
    pub fn velocity(&self) -> Point {
        self.velocity
    }

    #[must_use]
    pub fn size_px(&self) -> Point {
        self.size_px
    }

    #[must_use]
    pub fn policy(&self) -> &ViewportPolicy {
        &self.policy
    }

    #[must_use]
    pub fn has_momentum(&self) -> bool {
        self.velocity != Point::default()
    }

    #[must_use]
    pub fn min_zoom(&self) -> f64 {
        min_zoom(self.size_px, self.grid, self.cell_size_px, &self.policy)
    }

    #[must_use]
    pub fn max_zoom(&self) -> f64 {
        self.policy.max_zoom.max(self.min_zoom())
    }

    /// Boundary policy for both axes at the current zoom.
    #[must_use]
    pub fn bounds(&self) -> (AxisBounds, AxisBounds) {
        self.bounds_at(self.zoom)
    }

    fn bounds_at(&self, zoom: f64) -> (AxisBounds, AxisBounds) {
        let scale = self.cell_size_px * zoom;
        let p = &self.policy;
        let axis = |view: f64, cells: u32| {
            AxisBounds::compute(view / scale, f64::from(cells), p.slack_fraction, p.overshoot_fraction)
        };
        (axis(self.size_px.x, self.grid.width), axis(self.size_px.y, self.grid.height))
    }

    /// Project an offset into the boundary envelope at the current zoom.
    #[must_use]
    pub fn constrain_offset(&self, offset: Point) -> Point {
        let (bx, by) = self.bounds();
        Point::new(bx.constrain(offset.x), by.constrain(offset.y))
    }

    /// True when nothing is left to animate.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        if self.has_momentum() {
            return false;
        }
        let gap = Point::new(self.offset.x - self.target.x, self.offset.y - self.target.y);
        if gap.x.abs() > SETTLE_EPSILON || gap.y.abs() > SETTLE_EPSILON {
            return false;
        }
        if self.held {
            return true;
        }
        let (bx, by) = self.bounds();
        bx.excess(self.target.x) == 0.0 && by.excess(self.target.y) == 0.0
    }

    // --- Layout ---

    /// Update the visible area. The first non-empty size recentres the grid.
    pub fn resize(&mut self, width_px: f64, height_px: f64) {
        let first_layout = !(self.size_px.x > 0.0 && self.size_px.y > 0.0);
        self.size_px = Point::new(width_px.max(0.0), height_px.max(0.0));
        if first_layout {
            self.reset();
            return;
        }
        self.zoom = self.zoom.clamp(self.min_zoom(), self.max_zoom());
        self.offset = self.constrain_offset(self.offset);
        self.target = self.constrain_offset(self.target);
    }

    /// Default zoom, grid centred, motion cleared.
    pub fn reset(&mut self) {
        self.zoom = self.policy.default_zoom.clamp(self.min_zoom(), self.max_zoom());
        let scale = self.cell_size_px * self.zoom;
        let centred = Point::new(
            (self.size_px.x / scale - f64::from(self.grid.width)) * 0.5,
            (self.size_px.y / scale - f64::from(self.grid.height)) * 0.5,
        );
        self.offset = self.constrain_offset(centred);
        self.target = self.offset;
        self.velocity = Point::default();
    }

    /// Swap the tunables (e.g. after the input profile changes) and re-clamp.
    pub fn set_policy(&mut self, policy: ViewportPolicy) {
        self.policy = policy;
        if self.size_px.x > 0.0 && self.size_px.y > 0.0 {
            self.zoom = self.zoom.clamp(self.min_zoom(), self.max_zoom());
            self.offset = self.constrain_offset(self.offset);
            self.target = self.constrain_offset(self.target);
        }
    }

    // --- Zoom ---

    /// Change zoom by `delta`, keeping the world point under `focal` (or the
    /// viewport centre) fixed on screen.
    pub fn adjust_zoom(&mut self, delta: f64, focal: Option<Point>) -> bool {
        self.zoom_to(self.zoom + delta, focal)
    }

    /// Multiply zoom by `factor` around `focal`.
    pub fn zoom_by(&mut self, factor: f64, focal: Option<Point>) -> bool {
        self.zoom_to(self.zoom * factor, focal)
    }

    /// Set zoom, clamped to the current limits. Returns whether anything moved.
    pub fn zoom_to(&mut self, zoom: f64, focal: Option<Point>) -> bool {
        if !zoom.is_finite() {
            return false;
        }
        let next = zoom.clamp(self.min_zoom(), self.max_zoom());
        if next == self.zoom {
            return false;
        }
        let focal = focal
            .filter(|p| p.is_finite())
            .unwrap_or_else(|| Point::new(self.size_px.x * 0.5, self.size_px.y * 0.5));
        let old_scale = self.cell_size_px * self.zoom;
        let new_scale = self.cell_size_px * next;
        let world = Point::new(focal.x / old_scale - self.offset.x, focal.y / old_scale - self.offset.y);

        self.zoom = next;
        let offset = Point::new(focal.x / new_scale - world.x, focal.y / new_scale - world.y);
        self.offset = self.constrain_offset(offset);
        self.target = self.offset;
        self.velocity = Point::default();
        true
    }

    // --- Pan ---

    /// Direct manipulation: move content by a screen delta (finger motion).
    /// Offset and target move together.
    pub fn pan_by_screen(&mut self, dx: f64, dy: f64) {
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        let scale = self.cell_size_px * self.zoom;
        let (bx, by) = self.bounds();
        let strength = self.policy.rubber_band_strength;
        self.offset = Point::new(
            bx.resist(self.offset.x, dx / scale, strength),
            by.resist(self.offset.y, dy / scale, strength),
        );
        self.target = self.offset;
        self.velocity = Point::default();
    }

    /// Animated pan: move the target by a screen delta and let `step` catch up.
    pub fn pan_target_by_screen(&mut self, dx: f64, dy: f64) {
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        let scale = self.cell_size_px * self.zoom;
        let (bx, by) = self.bounds();
        let strength = self.policy.rubber_band_strength;
        self.target = Point::new(
            bx.resist(self.target.x, dx / scale, strength),
            by.resist(self.target.y, dy / scale, strength),
        );
        self.velocity = Point::default();
    }

    /// A pointer is holding the view: no spring-back, no momentum.
    pub fn hold(&mut self) {
        self.held = true;
        self.velocity = Point::default();
        self.target = self.offset;
    }

    pub fn release(&mut self) {
        self.held = false;
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held
    }

    // --- Momentum ---

    /// Start coasting with a velocity in screen pixels per tick. Ignored below
    /// the momentum threshold.
    pub fn start_momentum(&mut self, vx: f64, vy: f64) -> bool {
        if !(vx.is_finite() && vy.is_finite()) || vx.hypot(vy) < self.policy.momentum_threshold {
            return false;
        }
        self.velocity = Point::new(vx, vy);
        self.target = self.offset;
        true
    }

    /// Stop coasting and any animated pan where the view is now.
    pub fn halt(&mut self) {
        self.velocity = Point::default();
        self.target = self.offset;
    }

    /// Advance one animation tick. Returns `true` while more ticks are needed.
    pub fn step(&mut self) -> bool {
        let (bx, by) = self.bounds();
        let p = self.policy;

        if self.has_momentum() {
            let scale = self.cell_size_px * self.zoom;
            let strength = p.rubber_band_strength;
            self.offset = Point::new(
                bx.resist(self.offset.x, self.velocity.x / scale, strength),
                by.resist(self.offset.y, self.velocity.y / scale, strength),
            );
            self.target = self.offset;

            let mut vx = self.velocity.x * p.friction;
            let mut vy = self.velocity.y * p.friction;
            // Past the allowed range the coast bleeds off faster.
            if bx.excess(self.offset.x) != 0.0 {
                vx *= 1.0 - p.rubber_band_strength;
            }
            if by.excess(self.offset.y) != 0.0 {
                vy *= 1.0 - p.rubber_band_strength;
            }
            if bx.is_pinned(self.offset.x) {
                vx = 0.0;
            }
            if by.is_pinned(self.offset.y) {
                vy = 0.0;
            }
            self.velocity = if vx.hypot(vy) < p.momentum_threshold {
                Point::default()
            } else {
                Point::new(vx, vy)
            };
        } else if !self.held {
            self.target = Point::new(
                spring_back(bx, self.target.x, p.rubber_band_strength),
                spring_back(by, self.target.y, p.rubber_band_strength),
            );
        }

        self.offset = Point::new(
            bx.constrain(chase(self.offset.x, self.target.x, p.interpolation)),
            by.constrain(chase(self.offset.y, self.target.y, p.interpolation)),
        );

        !self.is_settled()
    }
}

/// Move `from` a fraction of the way to `to`, snapping once close.
fn chase(from: f64, to: f64, fraction: f64) -> f64 {
    let next = from + (to - from) * fraction;
    if (to - next).abs() <= SETTLE_EPSILON { to } else { next }
}

/// Pull a value back toward the allowed range by `excess × strength`.
fn spring_back(bounds: AxisBounds, value: f64, strength: f64) -> f64 {
    let excess = bounds.excess(value);
    if excess == 0.0 {
        return value;
    }
    let next = value - excess * strength;
    if bounds.excess(next).abs() > SETTLE_EPSILON {
        next
    } else if excess < 0.0 {
        bounds.lo
    } else {
        bounds.hi
    }
}
