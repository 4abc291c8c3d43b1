//! Shared numeric constants for the pixelboard crate.
//!
//! Most of these are defaults that [`crate::config::EngineConfig`] exposes as
//! tunables; the rest are fixed tolerances used by the math modules.

// ── Grid ────────────────────────────────────────────────────────

/// Default grid width in cells.
pub const DEFAULT_GRID_WIDTH: u32 = 100;

/// Default grid height in cells.
pub const DEFAULT_GRID_HEIGHT: u32 = 100;

/// Default edge length of one cell at zoom 1.0, in CSS pixels.
pub const DEFAULT_CELL_SIZE_PX: f64 = 10.0;

// ── Zoom ────────────────────────────────────────────────────────

/// Floor below which zoom is never allowed, whatever the grid size.
pub const DEFAULT_MIN_ZOOM: f64 = 0.02;

/// Upper zoom bound.
pub const DEFAULT_MAX_ZOOM: f64 = 40.0;

/// Zoom applied on startup and on reset.
pub const DEFAULT_ZOOM: f64 = 1.0;

/// Grid lines are only drawn above this zoom.
pub const DEFAULT_GRID_LINE_ZOOM_THRESHOLD: f64 = 1.5;

/// Fraction of the fit-to-screen zoom kept as min zoom on desktop.
pub const DESKTOP_SAFETY_MARGIN: f64 = 0.95;

/// Fraction of the fit-to-screen zoom kept as min zoom on touch devices.
pub const TOUCH_SAFETY_MARGIN: f64 = 0.90;

// ── Animation ───────────────────────────────────────────────────

/// Per-tick velocity multiplier while coasting.
pub const DEFAULT_FRICTION: f64 = 0.92;

/// Momentum stops once speed drops below this, in screen px per tick.
pub const DEFAULT_MOMENTUM_THRESHOLD: f64 = 0.5;

/// Frame rate cap for the animation loop.
pub const DEFAULT_MAX_FPS: f64 = 60.0;

/// Fraction of the remaining distance covered per tick when chasing the target offset.
pub const DEFAULT_INTERPOLATION: f64 = 0.25;

/// Rubber-band pull-back per tick, and resistance strength while dragging past an edge.
pub const DEFAULT_RUBBER_BAND_STRENGTH: f64 = 0.2;

/// Allowed deviation from centre when the grid is smaller than the viewport,
/// as a fraction of the viewport size.
pub const DEFAULT_SLACK_FRACTION: f64 = 0.25;

/// Width of the overshoot band past the allowed range, as a fraction of the viewport size.
pub const DEFAULT_OVERSHOOT_FRACTION: f64 = 0.1;

/// Offsets closer than this (world units) to their target count as settled.
pub const SETTLE_EPSILON: f64 = 1e-3;

// ── Gestures ────────────────────────────────────────────────────

/// Movement below this many screen pixels keeps a mouse press a click.
pub const DEFAULT_MOUSE_DRAG_THRESHOLD_PX: f64 = 3.0;

/// Movement below this many screen pixels keeps a touch a tap.
pub const DEFAULT_TOUCH_DRAG_THRESHOLD_PX: f64 = 10.0;

/// Presses held longer than this are not taps.
pub const DEFAULT_TAP_MAX_MS: f64 = 300.0;

/// Minimum spacing between processed pointer moves.
pub const DEFAULT_MOVE_THROTTLE_MS: f64 = 8.0;

/// Screen distance covered by one arrow-key press.
pub const DEFAULT_KEY_PAN_PX: f64 = 60.0;

/// Additive zoom change per `+`/`-` key press, relative to the current zoom.
pub const DEFAULT_KEY_ZOOM_STEP: f64 = 0.25;

/// Exponent scale applied to wheel `deltaY` for ctrl-wheel zoom.
pub const DEFAULT_WHEEL_ZOOM_SENSITIVITY: f64 = 0.002;

/// Largest zoom factor a single wheel event may apply (its inverse bounds zoom-out).
pub const DEFAULT_MAX_WHEEL_ZOOM_FACTOR: f64 = 1.25;

/// A drag that paused this long before release ends with zero velocity.
pub const VELOCITY_STALE_MS: f64 = 100.0;

/// Weight of the newest sample in the pointer velocity moving average.
pub const VELOCITY_SMOOTHING: f64 = 0.8;

// ── Rendering ───────────────────────────────────────────────────

/// Extra screen distance rendered past each viewport edge.
pub const RENDER_MARGIN_PX: f64 = 32.0;

/// Spacing of the void hatch pattern in screen pixels.
pub const VOID_HATCH_SPACING_PX: f64 = 12.0;

/// Void area fill.
pub const VOID_FILL: &str = "#2B2D31";

/// Void hatch stroke.
pub const VOID_HATCH: &str = "#34363C";

/// In-bounds background fill.
pub const BACKGROUND_FILL: &str = "#FFFFFF";

/// Grid line stroke.
pub const GRID_LINE_COLOR: &str = "#000000";

/// Colour selected before the user picks one.
pub const DEFAULT_COLOR: &str = "#000000";

/// Preview outline stroke.
pub const PREVIEW_OUTLINE: &str = "#1E90FF";

/// Opacity of the preview fill.
pub const PREVIEW_ALPHA: f64 = 0.55;

// ── Budget / network ────────────────────────────────────────────

/// Placements per window for signed-in users.
pub const DEFAULT_AUTH_MAX_PER_WINDOW: u32 = 20;

/// Placements per window for anonymous users.
pub const DEFAULT_ANON_MAX_PER_WINDOW: u32 = 5;

/// Budget window length.
pub const DEFAULT_WINDOW_SECONDS: u32 = 60;

/// Interval between authoritative canvas snapshots.
pub const DEFAULT_POLL_INTERVAL_MS: f64 = 5000.0;

/// Number of history entries requested per refresh.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Status code the server uses for an exhausted budget.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;
