//! Viewport, input, and render engine for a collaborative pixel canvas.
//!
//! The crate compiles to WebAssembly and drives a single `<canvas>`: it turns
//! pointer, wheel, and key events into pan/zoom/place gestures, keeps a local
//! copy of the painted cells, paints optimistically under a client-side rate
//! budget, and draws the visible part of the grid. It never talks to the
//! network itself; network work leaves the engine as [`engine::Action`]s and
//! results come back through [`engine::EngineCore`] methods (or
//! [`api::dispatch`] for hosts with a [`api::PixelApi`] implementation).
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Browser-facing [`engine::Engine`] and testable [`engine::EngineCore`] |
//! | [`transform`] | Screen ↔ world ↔ cell conversions |
//! | [`viewport`] | Zoom limits, boundaries, momentum, and spring-back |
//! | [`input`] | Raw input and semantic gesture types |
//! | [`gesture`] | Gesture state machine and subscriber bus |
//! | [`store`] | Painted cells with write stamps |
//! | [`placement`] | Optimistic placement and rollback |
//! | [`budget`] | Client-side placement rate budget |
//! | [`api`] | Wire types and the async service seam |
//! | [`render`] | Layered scene drawing onto a 2D surface |
//! | [`config`] | Engine options, parsed from host JSON |
//! | [`consts`] | Defaults and fixed tolerances |

pub mod api;
pub mod budget;
pub mod config;
pub mod consts;
pub mod engine;
pub mod gesture;
pub mod input;
pub mod placement;
pub mod render;
pub mod store;
pub mod transform;
pub mod viewport;
