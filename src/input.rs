//! Input model: raw pointer/wheel/key events in, semantic gestures out.
//!
//! The host translates DOM events into [`InputEvent`]s (screen-space CSS
//! pixels, timestamps in milliseconds) and feeds them to the
//! [`crate::gesture::GestureRouter`], which answers with [`GestureEvent`]s.
//! Nothing here depends on the browser.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::Serialize;

use crate::transform::Point;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl or Meta; either turns a wheel event into a zoom.
    #[must_use]
    pub fn zoom_chord(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer identifier as reported by the browser (`PointerEvent.pointerId`).
pub type PointerId = i32;

/// What kind of device produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

impl PointerKind {
    /// Parse `PointerEvent.pointerType`. Unknown types behave like a mouse.
    #[must_use]
    pub fn from_dom(pointer_type: &str) -> Self {
        match pointer_type {
            "touch" => Self::Touch,
            "pen" => Self::Pen,
            _ => Self::Mouse,
        }
    }
}

/// A keyboard key, holding `KeyboardEvent.key` (e.g. `"ArrowLeft"`, `"+"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Wheel / trackpad scroll delta in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive is down.
    pub dy: f64,
}

/// Raw input fed to the router.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { id: PointerId, kind: PointerKind, position: Point, time_ms: f64 },
    PointerMove { id: PointerId, kind: PointerKind, position: Point, buttons: bool, time_ms: f64 },
    PointerUp { id: PointerId, position: Point, time_ms: f64 },
    /// The browser took the pointer away (scroll takeover, palm rejection, ...).
    PointerCancel { id: PointerId },
    /// The pointer left the canvas.
    PointerLeave,
    Wheel { position: Point, delta: WheelDelta, modifiers: Modifiers },
    KeyDown { key: Key, modifiers: Modifiers },
    KeyUp { key: Key, modifiers: Modifiers },
}

/// Semantic gestures produced by the router.
///
/// Pan deltas use two conventions. `Drag` carries finger motion (content
/// follows it). `WheelPan` and `KeyPan` carry camera motion (content moves
/// the opposite way). All deltas are screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GestureEvent {
    /// Short press without movement, at the press position.
    Tap { position: Point },
    /// Pointer moved past the drag threshold; emitted per processed move.
    Drag { dx: f64, dy: f64, velocity: Point },
    /// Drag finished. `velocity` is screen px per millisecond.
    DragEnd { velocity: Point },
    /// Two-finger scale relative to the previous tick, around `center`.
    PinchZoom { scale: f64, center: Point },
    /// Ctrl/meta wheel; `factor` already clamped per event.
    WheelZoom { factor: f64, center: Point },
    WheelPan { dx: f64, dy: f64 },
    KeyPan { dx: f64, dy: f64 },
    /// Positive steps zoom in.
    KeyZoom { steps: i32 },
    Reset,
    ToggleGrid,
    /// Mouse moving with no button pressed.
    Hover { position: Point },
    HoverEnd,
}

impl GestureEvent {
    /// Whether the event starts or continues direct manipulation of the view.
    #[must_use]
    pub fn is_manipulation(&self) -> bool {
        matches!(self, Self::Drag { .. } | Self::PinchZoom { .. })
    }
}
