//! Engine context: owns every component and turns input, frames, and network
//! results into [`Action`]s for the host.
//!
//! [`EngineCore`] holds all logic and never touches the browser, so it is
//! tested natively. [`Engine`] is the `wasm-bindgen` face: it owns the
//! `<canvas>` element and its 2D context, reads the clock, and converts
//! actions to plain JS objects.
//!
//! Flow per event: raw input → [`GestureRouter`] → gestures published on the
//! [`GestureBus`] and applied to the viewport or the placement controller →
//! actions (render, animation frame, network calls, notices) back to the host.
//! The host runs at most one animation loop: the core asks for a frame only
//! when none is pending and lets the loop die once the viewport settles.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::api::{ApiError, CanvasState, HistoryEntry, PlaceRequest, PlaceResponse};
use crate::budget::{BudgetStatus, RateBudget};
use crate::config::{ConfigError, EngineConfig, InputProfile, Role};
use crate::consts::DEFAULT_COLOR;
use crate::gesture::{GestureBus, GestureRouter, GestureState, SubscriberId};
use crate::input::{GestureEvent, InputEvent, Key, Modifiers, PointerKind, WheelDelta};
use crate::placement::{PlacementController, PlacementError, Resolution};
use crate::render::{self, Preview, RenderStats, Scene, Surface};
use crate::store::PixelStore;
use crate::transform::{CellCoord, CoordinateTransformer, GridSize, Point};
use crate::viewport::{Viewport, ViewportPolicy};

/// Frames may arrive this much early and still count as on time.
const FRAME_SLACK_MS: f64 = 1.0;

/// Instructions returned to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    RenderNeeded,
    RequestAnimationFrame,
    PlacePixel(PlaceRequest),
    FetchCanvasState {
        #[serde(rename = "requestId")]
        request_id: u32,
    },
    FetchHistory { limit: u32 },
    Notify(Notice),
}

/// User-facing outcome the host may surface (toast, status line, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notice {
    PlacementConfirmed { x: u32, y: u32, color: String },
    PlacementFailed { x: u32, y: u32, message: String },
    #[serde(rename_all = "camelCase")]
    RateLimited { retry_after_ms: f64 },
    SyncFailed { message: String },
    HistoryUpdated { count: usize },
    GridToggled { visible: bool },
}

/// State dump for debugging overlays and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSnapshot {
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub offset: Point,
    pub target: Point,
    pub velocity: Point,
    pub held: bool,
    pub animating: bool,
    pub gesture: GestureState,
    pub active_pointers: usize,
    pub hover_cell: Option<CellCoord>,
    pub cells: usize,
    pub pending_placements: usize,
    pub budget: BudgetStatus,
    pub role: Role,
    pub profile: InputProfile,
    pub show_grid: bool,
    pub history_entries: usize,
    pub subscribers: usize,
}

/// All engine state that does not depend on the browser.
#[derive(Debug)]
pub struct EngineCore {
    config: EngineConfig,
    profile: InputProfile,
    role: Role,
    viewport: Viewport,
    transformer: CoordinateTransformer,
    router: GestureRouter,
    bus: GestureBus,
    store: PixelStore,
    budget: RateBudget,
    placement: PlacementController,
    show_grid: bool,
    hover: Option<Point>,
    history: Vec<HistoryEntry>,
    animating: bool,
    last_frame_ms: Option<f64>,
    next_poll_ms: Option<f64>,
    snapshot_seq: u32,
    applied_snapshot: u32,
}

impl EngineCore {
    /// Build an engine from validated configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let profile = InputProfile::default();
        let role = Role::default();
        let grid = GridSize::new(config.width, config.height);
        Self {
            profile,
            role,
            viewport: Viewport::new(grid, config.cell_size_px, ViewportPolicy::from_config(&config, profile)),
            transformer: CoordinateTransformer::new(grid, config.cell_size_px, config.snap),
            router: GestureRouter::new(config.gestures.clone()),
            bus: GestureBus::new(),
            store: PixelStore::new(grid),
            budget: RateBudget::from_limits(config.limits.for_role(role)),
            placement: PlacementController::new(&config.canvas_id, DEFAULT_COLOR),
            show_grid: true,
            hover: None,
            history: Vec::new(),
            animating: false,
            last_frame_ms: None,
            next_poll_ms: None,
            snapshot_seq: 0,
            applied_snapshot: 0,
            config,
        }
    }

    /// Parse host options and build an engine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the JSON is malformed or a value is out of range.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        match EngineConfig::from_json(raw) {
            Ok(config) => Ok(Self::new(config)),
            Err(err) => {
                warn!(error = %err, "engine config rejected");
                Err(err)
            }
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub fn transformer(&self) -> &CoordinateTransformer {
        &self.transformer
    }

    #[must_use]
    pub fn store(&self) -> &PixelStore {
        &self.store
    }

    #[must_use]
    pub fn budget(&self) -> &RateBudget {
        &self.budget
    }

    #[must_use]
    pub fn placement(&self) -> &PlacementController {
        &self.placement
    }

    #[must_use]
    pub fn router(&self) -> &GestureRouter {
        &self.router
    }

    /// Latest history list, newest first.
    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    #[must_use]
    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.animating
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Cell under the hovering mouse, if any.
    #[must_use]
    pub fn hover_cell(&self) -> Option<CellCoord> {
        self.hover.and_then(|p| self.transformer.screen_to_cell(p, self.viewport.view()))
    }

    #[must_use]
    pub fn debug_snapshot(&self, now_ms: f64) -> DebugSnapshot {
        DebugSnapshot {
            zoom: self.viewport.zoom(),
            min_zoom: self.viewport.min_zoom(),
            max_zoom: self.viewport.max_zoom(),
            offset: self.viewport.offset(),
            target: self.viewport.target(),
            velocity: self.viewport.velocity(),
            held: self.viewport.is_held(),
            animating: self.animating,
            gesture: self.router.state(),
            active_pointers: self.router.active_pointers(),
            hover_cell: self.hover_cell(),
            cells: self.store.len(),
            pending_placements: self.placement.pending_count(),
            budget: self.budget.status(now_ms),
            role: self.role,
            profile: self.profile,
            show_grid: self.show_grid,
            history_entries: self.history.len(),
            subscribers: self.bus.len(),
        }
    }

    // --- Subscribers ---

    pub fn subscribe(&mut self, listener: impl FnMut(&GestureEvent) + 'static) -> SubscriberId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    // --- Host setup ---

    /// Canvas size in CSS pixels and the device pixel ratio.
    pub fn set_viewport(&mut self, width: f64, height: f64, dpr: f64) -> Vec<Action> {
        self.viewport.resize(width, height);
        if dpr.is_finite() && dpr > 0.0 {
            self.transformer.device_pixel_ratio = dpr;
        }
        vec![Action::RenderNeeded]
    }

    /// Screen position of the canvas content box.
    pub fn set_origin(&mut self, x: f64, y: f64) {
        let origin = Point::new(x, y);
        if origin.is_finite() {
            self.transformer.origin = origin;
        }
    }

    pub fn set_color(&mut self, color: &str) -> Vec<Action> {
        if self.placement.set_color(color) && self.hover.is_some() {
            return vec![Action::RenderNeeded];
        }
        Vec::new()
    }

    /// Identity changed: rebuild the budget for the new role.
    pub fn set_role(&mut self, role: Role, placed_by: Option<&str>) {
        self.role = role;
        self.budget = RateBudget::from_limits(self.config.limits.for_role(role));
        self.placement.set_placed_by(placed_by);
        info!(?role, "placement budget reset for role");
    }

    pub fn set_input_profile(&mut self, profile: InputProfile) -> Vec<Action> {
        if profile == self.profile {
            return Vec::new();
        }
        self.profile = profile;
        self.viewport.set_policy(ViewportPolicy::from_config(&self.config, profile));
        vec![Action::RenderNeeded]
    }

    /// Begin syncing: fetch the canvas now and schedule the poll.
    pub fn start(&mut self, now_ms: f64) -> Vec<Action> {
        self.next_poll_ms = Some(now_ms + self.config.poll_interval_ms);
        self.fetch_actions()
    }

    // --- Clock ---

    /// Drive periodic work. Call from a host timer.
    pub fn tick(&mut self, now_ms: f64) -> Vec<Action> {
        match self.next_poll_ms {
            Some(due) if now_ms >= due => {
                self.next_poll_ms = Some(now_ms + self.config.poll_interval_ms);
                self.fetch_actions()
            }
            _ => Vec::new(),
        }
    }

    /// Animation frame callback.
    pub fn on_frame(&mut self, now_ms: f64) -> Vec<Action> {
        if !self.animating {
            return Vec::new();
        }
        let min_interval = 1000.0 / self.config.animation.max_fps;
        if let Some(last) = self.last_frame_ms
            && now_ms - last + FRAME_SLACK_MS < min_interval
        {
            return vec![Action::RequestAnimationFrame];
        }
        self.last_frame_ms = Some(now_ms);

        if self.viewport.step() {
            vec![Action::RenderNeeded, Action::RequestAnimationFrame]
        } else {
            self.animating = false;
            self.last_frame_ms = None;
            vec![Action::RenderNeeded]
        }
    }

    // --- Input ---

    pub fn handle_input(&mut self, event: &InputEvent, now_ms: f64) -> Vec<Action> {
        let pressed = self.router.active_pointers();
        let gestures = self.router.handle(event);
        if self.router.active_pointers() > pressed {
            // A new press grabs the view where it is, so a tap resolves
            // against what was under the finger.
            self.viewport.halt();
        }
        let mut actions = Vec::new();
        for gesture in gestures {
            self.bus.publish(&gesture);
            actions.extend(self.apply_gesture(gesture, now_ms));
        }
        // A pinch ends without a gesture of its own.
        if self.viewport.is_held() && !self.router.is_manipulating() {
            self.viewport.release();
            actions.extend(self.wake());
        }
        coalesce(actions)
    }

    fn apply_gesture(&mut self, gesture: GestureEvent, now_ms: f64) -> Vec<Action> {
        match gesture {
            GestureEvent::Tap { position } => self.place_at(position, now_ms),
            GestureEvent::Drag { dx, dy, .. } => {
                self.hover = None;
                self.viewport.hold();
                self.viewport.pan_by_screen(dx, dy);
                vec![Action::RenderNeeded]
            }
            GestureEvent::DragEnd { velocity } => {
                self.viewport.release();
                // Pointer velocity is px/ms; the viewport coasts in px per tick.
                let tick_ms = 1000.0 / self.config.animation.max_fps;
                self.viewport.start_momentum(velocity.x * tick_ms, velocity.y * tick_ms);
                self.wake()
            }
            GestureEvent::PinchZoom { scale, center } => {
                self.viewport.hold();
                self.viewport.zoom_by(scale, Some(self.local(center)));
                vec![Action::RenderNeeded]
            }
            GestureEvent::WheelZoom { factor, center } => {
                if self.viewport.zoom_by(factor, Some(self.local(center))) {
                    self.wake()
                } else {
                    Vec::new()
                }
            }
            GestureEvent::WheelPan { dx, dy } | GestureEvent::KeyPan { dx, dy } => {
                // Camera motion: content moves the other way.
                self.viewport.pan_target_by_screen(-dx, -dy);
                self.wake()
            }
            GestureEvent::KeyZoom { steps } => {
                let delta = f64::from(steps) * self.config.gestures.key_zoom_step * self.viewport.zoom();
                if self.viewport.adjust_zoom(delta, None) {
                    self.wake()
                } else {
                    Vec::new()
                }
            }
            GestureEvent::Reset => {
                self.viewport.reset();
                vec![Action::RenderNeeded]
            }
            GestureEvent::ToggleGrid => {
                self.show_grid = !self.show_grid;
                vec![Action::RenderNeeded, Action::Notify(Notice::GridToggled { visible: self.show_grid })]
            }
            GestureEvent::Hover { position } => {
                let before = self.hover_cell();
                self.hover = Some(position);
                if self.hover_cell() == before { Vec::new() } else { vec![Action::RenderNeeded] }
            }
            GestureEvent::HoverEnd => {
                let had_preview = self.hover_cell().is_some();
                self.hover = None;
                if had_preview { vec![Action::RenderNeeded] } else { Vec::new() }
            }
        }
    }

    fn place_at(&mut self, position: Point, now_ms: f64) -> Vec<Action> {
        let result = self.placement.attempt(
            position,
            &self.transformer,
            self.viewport.view(),
            &mut self.store,
            &mut self.budget,
            now_ms,
        );
        match result {
            Ok(request) => vec![Action::RenderNeeded, Action::PlacePixel(request)],
            Err(PlacementError::OutOfBounds) => Vec::new(),
            Err(PlacementError::RateLimited { retry_after_ms }) => {
                vec![Action::Notify(Notice::RateLimited { retry_after_ms })]
            }
            Err(err) => vec![Action::Notify(Notice::SyncFailed { message: err.to_string() })],
        }
    }

    // --- Network results ---

    pub fn resolve_placement(&mut self, id: Uuid, result: Result<PlaceResponse, ApiError>, now_ms: f64) -> Vec<Action> {
        match self.placement.resolve(id, result, &mut self.store, &mut self.budget, now_ms) {
            Resolution::Unknown => Vec::new(),
            Resolution::Confirmed { cell, pixel } => vec![
                Action::RenderNeeded,
                Action::Notify(Notice::PlacementConfirmed { x: cell.x, y: cell.y, color: pixel.color }),
            ],
            Resolution::RolledBack { cell, error, .. } => {
                let notice = match error {
                    PlacementError::RateLimited { retry_after_ms } => Notice::RateLimited { retry_after_ms },
                    other => Notice::PlacementFailed { x: cell.x, y: cell.y, message: other.to_string() },
                };
                vec![Action::RenderNeeded, Action::Notify(notice)]
            }
        }
    }

    /// Replace the store with an authoritative snapshot. Results older than the
    /// newest applied one are dropped.
    pub fn apply_canvas_state(&mut self, request_id: u32, result: Result<CanvasState, ApiError>) -> Vec<Action> {
        let state = match result {
            Ok(state) => state,
            Err(err) => {
                warn!(request_id, error = %err, "canvas snapshot failed");
                return vec![Action::Notify(Notice::SyncFailed { message: err.to_string() })];
            }
        };
        if request_id <= self.applied_snapshot {
            debug!(request_id, applied = self.applied_snapshot, "discarding stale canvas snapshot");
            return Vec::new();
        }
        self.applied_snapshot = request_id;
        let received = state.pixels.len();
        let kept = self.store.load_snapshot(state.into_cells());
        if kept < received {
            warn!(received, kept, "snapshot contained malformed or out-of-grid cells");
        }
        info!(request_id, cells = kept, "canvas snapshot applied");
        vec![Action::RenderNeeded]
    }

    pub fn apply_history(&mut self, result: Result<Vec<HistoryEntry>, ApiError>) -> Vec<Action> {
        match result {
            Ok(mut entries) => {
                entries.truncate(self.config.history_limit as usize);
                self.history = entries;
                vec![Action::Notify(Notice::HistoryUpdated { count: self.history.len() })]
            }
            Err(err) => {
                warn!(error = %err, "pixel history fetch failed");
                vec![Action::Notify(Notice::SyncFailed { message: err.to_string() })]
            }
        }
    }

    // --- Render ---

    /// Draw the current frame.
    ///
    /// # Errors
    ///
    /// Propagates the surface's error.
    pub fn render<S: Surface>(&self, surface: &mut S) -> Result<RenderStats, S::Error> {
        let size = self.viewport.size_px();
        let preview = self.hover_cell().map(|cell| Preview { cell, color: self.placement.color() });
        let scene = Scene {
            store: &self.store,
            transformer: &self.transformer,
            view: self.viewport.view(),
            width: size.x,
            height: size.y,
            show_grid: self.show_grid,
            grid_line_zoom_threshold: self.config.grid_line_zoom_threshold,
            preview,
        };
        render::draw(surface, &scene)
    }

    // --- Helpers ---

    fn fetch_actions(&mut self) -> Vec<Action> {
        self.snapshot_seq = self.snapshot_seq.wrapping_add(1);
        vec![
            Action::FetchCanvasState { request_id: self.snapshot_seq },
            Action::FetchHistory { limit: self.config.history_limit },
        ]
    }

    /// Render, and start the animation loop unless one is already running.
    fn wake(&mut self) -> Vec<Action> {
        if self.animating {
            return vec![Action::RenderNeeded];
        }
        self.animating = true;
        vec![Action::RenderNeeded, Action::RequestAnimationFrame]
    }

    /// Page coordinates to canvas-local CSS pixels.
    fn local(&self, screen: Point) -> Point {
        Point::new(screen.x - self.transformer.origin.x, screen.y - self.transformer.origin.y)
    }
}

/// Drop repeated render and frame requests, keeping first positions.
fn coalesce(actions: Vec<Action>) -> Vec<Action> {
    let mut out: Vec<Action> = Vec::with_capacity(actions.len());
    for action in actions {
        let repeat = matches!(action, Action::RenderNeeded | Action::RequestAnimationFrame) && out.contains(&action);
        if !repeat {
            out.push(action);
        }
    }
    out
}

// =============================================================================
// BROWSER WRAPPER
// =============================================================================

/// The canvas engine as seen from JavaScript.
///
/// Methods that can produce work return an array of plain action objects
/// (`{type: "renderNeeded"}`, `{type: "placePixel", requestId, x, y, ...}`).
#[wasm_bindgen]
pub struct Engine {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    core: EngineCore,
}

#[wasm_bindgen]
impl Engine {
    /// Bind to a canvas element with JSON options.
    ///
    /// # Errors
    ///
    /// Fails when the options are invalid or the 2D context is unavailable.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, options_json: &str) -> Result<Engine, JsValue> {
        let core = EngineCore::from_json(options_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { canvas, ctx, core })
    }

    /// Fetch initial state and start polling.
    ///
    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    pub fn start(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.core.start(now()))
    }

    /// Resize the backing store to the CSS size times `dpr` and re-read the
    /// canvas position.
    ///
    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    #[wasm_bindgen(js_name = setViewport)]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width: f64, height: f64, dpr: f64) -> Result<JsValue, JsValue> {
        let ratio = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        self.canvas.set_width((width.max(0.0) * ratio).round() as u32);
        self.canvas.set_height((height.max(0.0) * ratio).round() as u32);
        let rect = self.canvas.get_bounding_client_rect();
        self.core.set_origin(
            rect.left() + f64::from(self.canvas.client_left()),
            rect.top() + f64::from(self.canvas.client_top()),
        );
        to_js(&self.core.set_viewport(width, height, ratio))
    }

    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&mut self, id: i32, pointer_type: &str, x: f64, y: f64) -> Result<JsValue, JsValue> {
        let time_ms = now();
        let kind = PointerKind::from_dom(pointer_type);
        let event = InputEvent::PointerDown { id, kind, position: Point::new(x, y), time_ms };
        to_js(&self.core.handle_input(&event, time_ms))
    }

    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(
        &mut self,
        id: i32,
        pointer_type: &str,
        x: f64,
        y: f64,
        buttons: u16,
    ) -> Result<JsValue, JsValue> {
        let time_ms = now();
        let event = InputEvent::PointerMove {
            id,
            kind: PointerKind::from_dom(pointer_type),
            position: Point::new(x, y),
            buttons: buttons != 0,
            time_ms,
        };
        to_js(&self.core.handle_input(&event, time_ms))
    }

    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&mut self, id: i32, x: f64, y: f64) -> Result<JsValue, JsValue> {
        let time_ms = now();
        to_js(&self.core.handle_input(&InputEvent::PointerUp { id, position: Point::new(x, y), time_ms }, time_ms))
    }

    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    #[wasm_bindgen(js_name = pointerCancel)]
    pub fn pointer_cancel(&mut self, id: i32) -> Result<JsValue, JsValue> {
        to_js(&self.core.handle_input(&InputEvent::PointerCancel { id }, now()))
    }

    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.core.handle_input(&InputEvent::PointerLeave, now()))
    }

    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    #[allow(clippy::too_many_arguments)]
    pub fn wheel(
        &mut self,
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
        ctrl: bool,
        meta: bool,
        shift: bool,
    ) -> Result<JsValue, JsValue> {
        let event = InputEvent::Wheel {
            position: Point::new(x, y),
            delta: WheelDelta { dx, dy },
            modifiers: Modifiers { shift, ctrl, alt: false, meta },
        };
        to_js(&self.core.handle_input(&event, now()))
    }

    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    #[wasm_bindgen(js_name = keyDown)]
    #[allow(clippy::fn_params_excessive_bools)]
    pub fn key_down(&mut self, key: &str, ctrl: bool, meta: bool, shift: bool, alt: bool) -> Result<JsValue, JsValue> {
        let event = InputEvent::KeyDown { key: Key::new(key), modifiers: Modifiers { shift, ctrl, alt, meta } };
        to_js(&self.core.handle_input(&event, now()))
    }

    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    #[wasm_bindgen(js_name = keyUp)]
    pub fn key_up(&mut self, key: &str) -> Result<JsValue, JsValue> {
        let event = InputEvent::KeyUp { key: Key::new(key), modifiers: Modifiers::default() };
        to_js(&self.core.handle_input(&event, now()))
    }

    /// Animation frame callback.
    ///
    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    pub fn frame(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.core.on_frame(now()))
    }

    /// Timer callback for periodic sync.
    ///
    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    pub fn tick(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.core.tick(now()))
    }

    /// Feed back a `placePixel` result. `status` 0 means the request never
    /// reached the server; 2xx bodies are parsed as the success response.
    ///
    /// # Errors
    ///
    /// Fails on a malformed request id or if the actions cannot be converted.
    #[wasm_bindgen(js_name = resolvePlacement)]
    pub fn resolve_placement(&mut self, request_id: &str, status: u16, body: &str) -> Result<JsValue, JsValue> {
        let id = Uuid::parse_str(request_id).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let result = parse_response::<PlaceResponse>(status, body);
        to_js(&self.core.resolve_placement(id, result, now()))
    }

    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    #[wasm_bindgen(js_name = applyCanvasState)]
    pub fn apply_canvas_state(&mut self, request_id: u32, status: u16, body: &str) -> Result<JsValue, JsValue> {
        let result = parse_response::<CanvasState>(status, body);
        to_js(&self.core.apply_canvas_state(request_id, result))
    }

    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    #[wasm_bindgen(js_name = applyHistory)]
    pub fn apply_history(&mut self, status: u16, body: &str) -> Result<JsValue, JsValue> {
        let result = parse_response::<Vec<HistoryEntry>>(status, body);
        to_js(&self.core.apply_history(result))
    }

    /// # Errors
    ///
    /// Fails if the actions cannot be converted to JS.
    #[wasm_bindgen(js_name = setColor)]
    pub fn set_color(&mut self, color: &str) -> Result<JsValue, JsValue> {
        to_js(&self.core.set_color(color))
    }

    /// `role` is `"authenticated"` or `"anonymous"`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown role.
    #[wasm_bindgen(js_name = setRole)]
    pub fn set_role(&mut self, role: &str, placed_by: Option<String>) -> Result<(), JsValue> {
        let role: Role = serde_json::from_value(serde_json::Value::from(role))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.core.set_role(role, placed_by.as_deref());
        Ok(())
    }

    /// `profile` is `"desktop"` or `"touch"`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown profile.
    #[wasm_bindgen(js_name = setInputProfile)]
    pub fn set_input_profile(&mut self, profile: &str) -> Result<JsValue, JsValue> {
        let profile: InputProfile = serde_json::from_value(serde_json::Value::from(profile))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        to_js(&self.core.set_input_profile(profile))
    }

    /// Draw the current frame and return its stats.
    ///
    /// # Errors
    ///
    /// Propagates 2D context failures.
    pub fn render(&mut self) -> Result<JsValue, JsValue> {
        let stats = self.core.render(&mut self.ctx)?;
        to_js(&stats)
    }

    /// # Errors
    ///
    /// Fails if the snapshot cannot be converted to JS.
    #[wasm_bindgen(js_name = debugSnapshot)]
    pub fn debug_snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.core.debug_snapshot(now()))
    }
}

fn now() -> f64 {
    js_sys::Date::now()
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
    js_sys::JSON::parse(&json)
}

fn parse_response<T: serde::de::DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    if (200..300).contains(&status) {
        Ok(serde_json::from_str(body)?)
    } else {
        Err(ApiError::from_response(status, body))
    }
}
