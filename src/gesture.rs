//! Gesture router: raw pointer, wheel, and key input in; semantic gestures out.
//!
//! The router is a small state machine over the set of active pointers:
//!
//! ```text
//! Idle ──down──▶ Tracking ──moved past threshold──▶ Dragging ──up──▶ Idle (DragEnd)
//!                   │ up, short and still ─▶ Idle (Tap)
//!                   │ up, moved past threshold ─▶ Idle (Drag, DragEnd)
//!                   └──second pointer──▶ Pinching ──all up──▶ Idle
//! ```
//!
//! Pointer moves are throttled to `moveThrottleMs`. Skipped moves still update
//! the tracked position, so the next processed move carries the whole delta.
//! [`GestureBus`] fans routed events out to subscribers.

#[cfg(test)]
#[path = "gesture_test.rs"]
mod gesture_test;

use serde::Serialize;

use crate::config::GestureConfig;
use crate::consts::{VELOCITY_SMOOTHING, VELOCITY_STALE_MS};
use crate::input::{GestureEvent, InputEvent, Key, Modifiers, PointerId, PointerKind, WheelDelta};
use crate::transform::Point;

/// One pointer currently pressed on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPointer {
    pub id: PointerId,
    pub kind: PointerKind,
    pub start: Point,
    pub current: Point,
    pub start_ms: f64,
}

/// Active gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum GestureState {
    #[default]
    Idle,
    /// One pointer down, not yet past the drag threshold.
    Tracking { id: PointerId },
    /// One pointer dragging the view. `last` is the position of the last emitted drag.
    Dragging { id: PointerId, last: Point },
    /// Two or more pointers. `distance` is the pointer spread at the last emitted pinch.
    Pinching { distance: f64 },
}

#[derive(Debug, Clone)]
pub struct GestureRouter {
    config: GestureConfig,
    pointers: Vec<TrackedPointer>,
    state: GestureState,
    last_processed_ms: Option<f64>,
    velocity: Point,
    last_sample_ms: Option<f64>,
    /// Set once two pointers were down; suppresses taps until every pointer is up.
    multi_touch: bool,
}

impl GestureRouter {
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            pointers: Vec::new(),
            state: GestureState::Idle,
            last_processed_ms: None,
            velocity: Point::default(),
            last_sample_ms: None,
            multi_touch: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> GestureState {
        self.state
    }

    #[must_use]
    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    /// Whether a pointer currently holds the view (drag or pinch in progress).
    #[must_use]
    pub fn is_manipulating(&self) -> bool {
        matches!(self.state, GestureState::Dragging { .. } | GestureState::Pinching { .. })
    }

    /// Drop every tracked pointer, e.g. when the canvas loses focus.
    pub fn reset(&mut self) {
        self.pointers.clear();
        self.state = GestureState::Idle;
        self.last_processed_ms = None;
        self.clear_velocity();
        self.multi_touch = false;
    }

    /// Route one raw input event.
    pub fn handle(&mut self, event: &InputEvent) -> Vec<GestureEvent> {
        match event {
            InputEvent::PointerDown { id, kind, position, time_ms } => {
                self.pointer_down(*id, *kind, *position, *time_ms)
            }
            InputEvent::PointerMove { id, kind, position, buttons, time_ms } => {
                self.pointer_move(*id, *kind, *position, *buttons, *time_ms)
            }
            InputEvent::PointerUp { id, position, time_ms } => self.pointer_up(*id, *position, *time_ms),
            InputEvent::PointerCancel { id } => self.pointer_cancel(*id),
            InputEvent::PointerLeave => vec![GestureEvent::HoverEnd],
            InputEvent::Wheel { position, delta, modifiers } => self.wheel(*position, *delta, *modifiers),
            InputEvent::KeyDown { key, modifiers } => self.key_down(key, *modifiers),
            InputEvent::KeyUp { .. } => Vec::new(),
        }
    }

    fn pointer_down(&mut self, id: PointerId, kind: PointerKind, position: Point, time_ms: f64) -> Vec<GestureEvent> {
        if !position.is_finite() || self.pointer(id).is_some() {
            return Vec::new();
        }
        self.pointers.push(TrackedPointer { id, kind, start: position, current: position, start_ms: time_ms });

        let mut out = Vec::new();
        match self.pointers.len() {
            1 => {
                self.state = GestureState::Tracking { id };
                self.last_processed_ms = None;
                self.clear_velocity();
            }
            2 => {
                if matches!(self.state, GestureState::Dragging { .. }) {
                    out.push(GestureEvent::DragEnd { velocity: Point::default() });
                }
                self.multi_touch = true;
                self.clear_velocity();
                self.state = GestureState::Pinching { distance: self.spread() };
            }
            _ => {}
        }
        out
    }

    fn pointer_move(
        &mut self,
        id: PointerId,
        kind: PointerKind,
        position: Point,
        buttons: bool,
        time_ms: f64,
    ) -> Vec<GestureEvent> {
        if !position.is_finite() {
            return Vec::new();
        }
        let Some(tracked) = self.pointers.iter_mut().find(|p| p.id == id) else {
            if kind == PointerKind::Mouse && !buttons && self.pointers.is_empty() {
                return vec![GestureEvent::Hover { position }];
            }
            return Vec::new();
        };
        tracked.current = position;

        if let Some(last) = self.last_processed_ms
            && time_ms - last < self.config.move_throttle_ms
        {
            return Vec::new();
        }
        self.last_processed_ms = Some(time_ms);
        self.process_motion(id, time_ms)
    }

    fn process_motion(&mut self, id: PointerId, time_ms: f64) -> Vec<GestureEvent> {
        match self.state {
            GestureState::Idle => Vec::new(),
            GestureState::Tracking { id: tracked } => {
                let Some(p) = self.pointer(tracked).filter(|_| tracked == id) else {
                    return Vec::new();
                };
                if p.start.distance(p.current) < self.drag_threshold(p.kind) {
                    return Vec::new();
                }
                self.state = GestureState::Dragging { id, last: p.current };
                self.sample_velocity(p.current.x - p.start.x, p.current.y - p.start.y, time_ms, p.start_ms);
                vec![GestureEvent::Drag {
                    dx: p.current.x - p.start.x,
                    dy: p.current.y - p.start.y,
                    velocity: self.velocity,
                }]
            }
            GestureState::Dragging { id: tracked, last } => {
                let Some(p) = self.pointer(tracked).filter(|_| tracked == id) else {
                    return Vec::new();
                };
                self.drag_to(tracked, last, p.current, time_ms).into_iter().collect()
            }
            GestureState::Pinching { distance } => {
                if self.pointers.len() != 2 {
                    return Vec::new();
                }
                let spread = self.spread();
                if distance <= 0.0 || spread <= 0.0 {
                    self.state = GestureState::Pinching { distance: spread };
                    return Vec::new();
                }
                self.state = GestureState::Pinching { distance: spread };
                vec![GestureEvent::PinchZoom { scale: spread / distance, center: self.pinch_center() }]
            }
        }
    }

    fn drag_to(&mut self, id: PointerId, last: Point, current: Point, time_ms: f64) -> Option<GestureEvent> {
        let dx = current.x - last.x;
        let dy = current.y - last.y;
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        let since = self.last_sample_ms.unwrap_or(time_ms);
        self.sample_velocity(dx, dy, time_ms, since);
        self.state = GestureState::Dragging { id, last: current };
        Some(GestureEvent::Drag { dx, dy, velocity: self.velocity })
    }

    fn pointer_up(&mut self, id: PointerId, position: Point, time_ms: f64) -> Vec<GestureEvent> {
        let Some(tracked) = self.pointers.iter_mut().find(|p| p.id == id) else {
            return Vec::new();
        };
        if position.is_finite() {
            tracked.current = position;
        }
        let p = *tracked;
        let mut out = Vec::new();

        match self.state {
            GestureState::Tracking { id: tracked } if tracked == id => {
                let still = p.start.distance(p.current) < self.drag_threshold(p.kind);
                let quick = time_ms - p.start_ms < self.config.tap_max_ms;
                if still {
                    if quick && !self.multi_touch {
                        out.push(GestureEvent::Tap { position: p.start });
                    }
                } else {
                    // The move that crossed the threshold was throttled away.
                    out.extend(self.process_motion(id, time_ms));
                    out.push(self.drag_end(time_ms));
                }
            }
            GestureState::Dragging { id: tracked, last } if tracked == id => {
                // Flush motion the throttle held back.
                out.extend(self.drag_to(id, last, p.current, time_ms));
                out.push(self.drag_end(time_ms));
            }
            _ => {}
        }

        self.remove_pointer(id);
        out
    }

    /// Release of a drag; a drag that paused before release does not coast.
    fn drag_end(&self, time_ms: f64) -> GestureEvent {
        let stale = self.last_sample_ms.is_none_or(|t| time_ms - t > VELOCITY_STALE_MS);
        let velocity = if stale { Point::default() } else { self.velocity };
        GestureEvent::DragEnd { velocity }
    }

    fn pointer_cancel(&mut self, id: PointerId) -> Vec<GestureEvent> {
        if self.pointer(id).is_none() {
            return Vec::new();
        }
        let mut out = Vec::new();
        if matches!(self.state, GestureState::Dragging { id: tracked, .. } if tracked == id) {
            out.push(GestureEvent::DragEnd { velocity: Point::default() });
        }
        self.remove_pointer(id);
        out
    }

    /// Forget a pointer and pick the state that the remaining pointers imply.
    fn remove_pointer(&mut self, id: PointerId) {
        self.pointers.retain(|p| p.id != id);
        match self.pointers.len() {
            0 => {
                self.state = GestureState::Idle;
                self.multi_touch = false;
                self.last_processed_ms = None;
            }
            1 => {
                if matches!(self.state, GestureState::Pinching { .. })
                    && let Some(survivor) = self.pointers.first_mut()
                {
                    // The surviving finger may drag from where it is, but never taps.
                    survivor.start = survivor.current;
                    self.state = GestureState::Tracking { id: survivor.id };
                    self.clear_velocity();
                }
            }
            _ => {
                self.state = GestureState::Pinching { distance: self.spread() };
            }
        }
    }

    fn wheel(&self, position: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<GestureEvent> {
        if !delta.dx.is_finite() || !delta.dy.is_finite() {
            return Vec::new();
        }
        if modifiers.zoom_chord() {
            if delta.dy == 0.0 {
                return Vec::new();
            }
            let max = self.config.max_wheel_zoom_factor;
            let factor = (-delta.dy * self.config.wheel_zoom_sensitivity).exp().clamp(1.0 / max, max);
            return vec![GestureEvent::WheelZoom { factor, center: position }];
        }
        let (dx, dy) = if modifiers.shift {
            let horizontal = if delta.dx == 0.0 { delta.dy } else { delta.dx };
            (horizontal, 0.0)
        } else {
            (delta.dx, delta.dy)
        };
        if dx == 0.0 && dy == 0.0 {
            return Vec::new();
        }
        vec![GestureEvent::WheelPan { dx, dy }]
    }

    fn key_down(&self, key: &Key, modifiers: Modifiers) -> Vec<GestureEvent> {
        let step = self.config.key_pan_px;
        let event = match key.as_str() {
            "ArrowLeft" => GestureEvent::KeyPan { dx: -step, dy: 0.0 },
            "ArrowRight" => GestureEvent::KeyPan { dx: step, dy: 0.0 },
            "ArrowUp" => GestureEvent::KeyPan { dx: 0.0, dy: -step },
            "ArrowDown" => GestureEvent::KeyPan { dx: 0.0, dy: step },
            "+" | "=" => GestureEvent::KeyZoom { steps: 1 },
            "-" | "_" => GestureEvent::KeyZoom { steps: -1 },
            "0" | "Home" => GestureEvent::Reset,
            "g" | "G" if !modifiers.zoom_chord() => GestureEvent::ToggleGrid,
            _ => return Vec::new(),
        };
        vec![event]
    }

    fn pointer(&self, id: PointerId) -> Option<TrackedPointer> {
        self.pointers.iter().find(|p| p.id == id).copied()
    }

    fn drag_threshold(&self, kind: PointerKind) -> f64 {
        match kind {
            PointerKind::Touch => self.config.touch_drag_threshold_px,
            PointerKind::Mouse | PointerKind::Pen => self.config.mouse_drag_threshold_px,
        }
    }

    /// Distance between the first two pointers.
    fn spread(&self) -> f64 {
        match self.pointers.as_slice() {
            [a, b, ..] => a.current.distance(b.current),
            _ => 0.0,
        }
    }

    fn pinch_center(&self) -> Point {
        match self.pointers.as_slice() {
            [a, b, ..] => a.current.midpoint(b.current),
            _ => Point::default(),
        }
    }

    /// Fold a motion sample into the smoothed velocity (px/ms).
    fn sample_velocity(&mut self, dx: f64, dy: f64, time_ms: f64, since_ms: f64) {
        let dt = time_ms - since_ms;
        if dt > 0.0 {
            let k = VELOCITY_SMOOTHING;
            self.velocity = Point::new(
                k * (dx / dt) + (1.0 - k) * self.velocity.x,
                k * (dy / dt) + (1.0 - k) * self.velocity.y,
            );
        }
        self.last_sample_ms = Some(time_ms);
    }

    fn clear_velocity(&mut self) {
        self.velocity = Point::default();
        self.last_sample_ms = None;
    }
}

/// Handle returned by [`GestureBus::subscribe`].
pub type SubscriberId = u64;

type Listener = Box<dyn FnMut(&GestureEvent)>;

/// Typed fan-out of routed gestures to any number of listeners.
#[derive(Default)]
pub struct GestureBus {
    next_id: SubscriberId,
    listeners: Vec<(SubscriberId, Listener)>,
}

impl std::fmt::Debug for GestureBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureBus").field("listeners", &self.listeners.len()).finish()
    }
}

impl GestureBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&GestureEvent) + 'static) -> SubscriberId {
        self.next_id += 1;
        self.listeners.push((self.next_id, Box::new(listener)));
        self.next_id
    }

    /// Returns whether a listener was removed.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Deliver `event` to every listener in subscription order.
    pub fn publish(&mut self, event: &GestureEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
