//! Engine configuration parsed from the host's JSON options.
//!
//! Every field has a default, so `{}` is a valid configuration. Keys are
//! camelCase on the wire (`cellSizePx`, `gridLineZoomThreshold`, ...).
//! [`EngineConfig::from_json`] parses and validates in one step; hosts that
//! build the struct by hand should call [`EngineConfig::validate`].

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::*;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid engine config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// How a fractional world coordinate picks its cell index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapRule {
    /// Cell `k` covers world `[k, k + 1)`.
    #[default]
    Floor,
    /// Nearest integer; the far edge is clamped back into the grid.
    Round,
}

impl SnapRule {
    #[must_use]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::Floor => value.floor(),
            Self::Round => value.round(),
        }
    }
}

/// Who is placing pixels; selects the budget limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Authenticated,
    #[default]
    Anonymous,
}

/// Primary input device class. Affects min-zoom margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputProfile {
    #[default]
    Desktop,
    Touch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationConfig {
    pub friction: f64,
    pub momentum_threshold: f64,
    pub max_fps: f64,
    pub interpolation: f64,
    pub rubber_band_strength: f64,
    pub slack_fraction: f64,
    pub overshoot_fraction: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            friction: DEFAULT_FRICTION,
            momentum_threshold: DEFAULT_MOMENTUM_THRESHOLD,
            max_fps: DEFAULT_MAX_FPS,
            interpolation: DEFAULT_INTERPOLATION,
            rubber_band_strength: DEFAULT_RUBBER_BAND_STRENGTH,
            slack_fraction: DEFAULT_SLACK_FRACTION,
            overshoot_fraction: DEFAULT_OVERSHOOT_FRACTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GestureConfig {
    pub mouse_drag_threshold_px: f64,
    pub touch_drag_threshold_px: f64,
    pub tap_max_ms: f64,
    pub move_throttle_ms: f64,
    pub key_pan_px: f64,
    pub key_zoom_step: f64,
    pub wheel_zoom_sensitivity: f64,
    pub max_wheel_zoom_factor: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            mouse_drag_threshold_px: DEFAULT_MOUSE_DRAG_THRESHOLD_PX,
            touch_drag_threshold_px: DEFAULT_TOUCH_DRAG_THRESHOLD_PX,
            tap_max_ms: DEFAULT_TAP_MAX_MS,
            move_throttle_ms: DEFAULT_MOVE_THROTTLE_MS,
            key_pan_px: DEFAULT_KEY_PAN_PX,
            key_zoom_step: DEFAULT_KEY_ZOOM_STEP,
            wheel_zoom_sensitivity: DEFAULT_WHEEL_ZOOM_SENSITIVITY,
            max_wheel_zoom_factor: DEFAULT_MAX_WHEEL_ZOOM_FACTOR,
        }
    }
}

/// Placement budget for one role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BudgetLimits {
    pub max_pixels_per_window: u32,
    pub window_seconds: u32,
    /// Minimum spacing between two placements; `0` disables it.
    pub cooldown_seconds: f64,
}

impl Default for BudgetLimits {
    fn default() -> Self {
        Self {
            max_pixels_per_window: DEFAULT_ANON_MAX_PER_WINDOW,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            cooldown_seconds: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoleLimits {
    pub authenticated: BudgetLimits,
    pub anonymous: BudgetLimits,
}

impl Default for RoleLimits {
    fn default() -> Self {
        Self {
            authenticated: BudgetLimits {
                max_pixels_per_window: DEFAULT_AUTH_MAX_PER_WINDOW,
                ..BudgetLimits::default()
            },
            anonymous: BudgetLimits::default(),
        }
    }
}

impl RoleLimits {
    #[must_use]
    pub fn for_role(&self, role: Role) -> BudgetLimits {
        match role {
            Role::Authenticated => self.authenticated,
            Role::Anonymous => self.anonymous,
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub canvas_id: String,
    pub width: u32,
    pub height: u32,
    pub cell_size_px: f64,
    pub snap: SnapRule,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub default_zoom: f64,
    pub grid_line_zoom_threshold: f64,
    pub desktop_safety_margin: f64,
    pub touch_safety_margin: f64,
    pub animation: AnimationConfig,
    pub gestures: GestureConfig,
    pub limits: RoleLimits,
    pub poll_interval_ms: f64,
    pub history_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canvas_id: "main".to_owned(),
            width: DEFAULT_GRID_WIDTH,
            height: DEFAULT_GRID_HEIGHT,
            cell_size_px: DEFAULT_CELL_SIZE_PX,
            snap: SnapRule::default(),
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            default_zoom: DEFAULT_ZOOM,
            grid_line_zoom_threshold: DEFAULT_GRID_LINE_ZOOM_THRESHOLD,
            desktop_safety_margin: DESKTOP_SAFETY_MARGIN,
            touch_safety_margin: TOUCH_SAFETY_MARGIN,
            animation: AnimationConfig::default(),
            gestures: GestureConfig::default(),
            limits: RoleLimits::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON options object.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges that the engine math relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(invalid("width", "must be at least 1"));
        }
        if self.height == 0 {
            return Err(invalid("height", "must be at least 1"));
        }
        require_positive("cellSizePx", self.cell_size_px)?;
        require_positive("minZoom", self.min_zoom)?;
        require_positive("maxZoom", self.max_zoom)?;
        if self.min_zoom > self.max_zoom {
            return Err(invalid("minZoom", "must not exceed maxZoom"));
        }
        require_positive("defaultZoom", self.default_zoom)?;
        require_unit_interval("desktopSafetyMargin", self.desktop_safety_margin)?;
        require_unit_interval("touchSafetyMargin", self.touch_safety_margin)?;

        let anim = &self.animation;
        if !(anim.friction > 0.0 && anim.friction < 1.0) {
            return Err(invalid("animation.friction", "must be strictly between 0 and 1"));
        }
        require_positive("animation.momentumThreshold", anim.momentum_threshold)?;
        require_positive("animation.maxFps", anim.max_fps)?;
        require_unit_interval("animation.interpolation", anim.interpolation)?;
        require_unit_interval("animation.rubberBandStrength", anim.rubber_band_strength)?;
        require_non_negative("animation.slackFraction", anim.slack_fraction)?;
        require_positive("animation.overshootFraction", anim.overshoot_fraction)?;

        let g = &self.gestures;
        require_non_negative("gestures.mouseDragThresholdPx", g.mouse_drag_threshold_px)?;
        require_non_negative("gestures.touchDragThresholdPx", g.touch_drag_threshold_px)?;
        require_positive("gestures.tapMaxMs", g.tap_max_ms)?;
        require_non_negative("gestures.moveThrottleMs", g.move_throttle_ms)?;
        if g.max_wheel_zoom_factor < 1.0 {
            return Err(invalid("gestures.maxWheelZoomFactor", "must be at least 1"));
        }

        let roles = [
            ("limits.authenticated", self.limits.authenticated),
            ("limits.anonymous", self.limits.anonymous),
        ];
        for (field, limits) in roles {
            if limits.window_seconds == 0 {
                return Err(invalid(field, "windowSeconds must be at least 1"));
            }
            if !limits.cooldown_seconds.is_finite() || limits.cooldown_seconds < 0.0 {
                return Err(invalid(field, "cooldownSeconds must be non-negative"));
            }
        }
        require_positive("pollIntervalMs", self.poll_interval_ms)?;
        Ok(())
    }

    #[must_use]
    pub fn safety_margin(&self, profile: InputProfile) -> f64 {
        match profile {
            InputProfile::Desktop => self.desktop_safety_margin,
            InputProfile::Touch => self.touch_safety_margin,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.to_owned() }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a finite number greater than 0"))
    }
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a finite number of at least 0"))
    }
}

fn require_unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be in (0, 1]"))
    }
}
