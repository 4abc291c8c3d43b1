//! Collaborator contract: wire types for the pixel service and the async
//! [`PixelApi`] seam the engine's network actions are executed against.
//!
//! The engine never performs I/O. It emits [`Action`]s; a host either
//! performs them itself (the browser wrapper hands them to JavaScript) or
//! runs them through [`dispatch`] with any `PixelApi` implementation.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::STATUS_TOO_MANY_REQUESTS;
use crate::engine::{Action, EngineCore};
use crate::store::Pixel;
use crate::transform::CellCoord;

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Body of `placePixel`, plus the engine's request id for matching the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRequest {
    pub request_id: Uuid,
    pub x: u32,
    pub y: u32,
    pub color: String,
    pub canvas_id: String,
}

impl PlaceRequest {
    #[must_use]
    pub fn cell(&self) -> CellCoord {
        CellCoord::new(self.x, self.y)
    }
}

/// Budget state reported with a successful placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownInfo {
    pub remaining: u32,
    #[serde(default)]
    pub cooldown_seconds: f64,
}

/// Budget state reported with a rejected placement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LimitInfo {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub retry_after_seconds: Option<f64>,
}

impl LimitInfo {
    #[must_use]
    pub fn retry_after_ms(&self) -> Option<f64> {
        self.retry_after_seconds.filter(|s| s.is_finite() && *s >= 0.0).map(|s| s * 1000.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceResponse {
    pub success: bool,
    #[serde(default)]
    pub pixel: Option<Pixel>,
    #[serde(default)]
    pub cooldown_info: Option<CooldownInfo>,
}

/// Error body the service returns with a non-2xx status.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: Option<String>,
    pub limit_info: Option<LimitInfo>,
}

/// Result of `getCanvasState`: painted cells keyed by `"x,y"`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasState {
    pub pixels: HashMap<String, Pixel>,
}

impl CanvasState {
    /// Cells with well-formed keys. Malformed keys are skipped.
    pub fn into_cells(self) -> impl Iterator<Item = (CellCoord, Pixel)> {
        self.pixels.into_iter().filter_map(|(key, pixel)| parse_cell_key(&key).map(|cell| (cell, pixel)))
    }
}

/// Parse a `"x,y"` cell key.
#[must_use]
pub fn parse_cell_key(key: &str) -> Option<CellCoord> {
    let (x, y) = key.split_once(',')?;
    match (x.trim().parse::<u32>(), y.trim().parse::<u32>()) {
        (Ok(x), Ok(y)) => Some(CellCoord::new(x, y)),
        _ => None,
    }
}

/// One entry of `getPixelHistory`, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub x: u32,
    pub y: u32,
    pub color: String,
    #[serde(default)]
    pub placed_by: Option<String>,
    #[serde(default)]
    pub placed_at: Option<String>,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("server rejected request ({status}): {}", message.as_deref().unwrap_or("no message"))]
    Rejected { status: u16, message: Option<String>, limit_info: Option<LimitInfo> },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Build an error from a status code and raw response body. Status `0`
    /// means the request never reached the server.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        if status == 0 {
            return Self::Network(body.to_owned());
        }
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        Self::Rejected { status, message: parsed.message, limit_info: parsed.limit_info }
    }

    /// Whether the server refused because the caller's budget is spent.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Rejected { status, limit_info, .. } => {
                *status == STATUS_TOO_MANY_REQUESTS || limit_info.is_some()
            }
            Self::Network(_) | Self::Decode(_) => false,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// =============================================================================
// TRANSPORT SEAM
// =============================================================================

/// Async access to the pixel service. Not `Send`: browser futures live on one thread.
#[async_trait::async_trait(?Send)]
pub trait PixelApi {
    /// # Errors
    ///
    /// Returns [`ApiError`] when the request fails or is rejected.
    async fn place_pixel(&self, request: &PlaceRequest) -> Result<PlaceResponse, ApiError>;

    /// # Errors
    ///
    /// Returns [`ApiError`] when the request fails or is rejected.
    async fn get_canvas_state(&self, canvas_id: &str) -> Result<CanvasState, ApiError>;

    /// # Errors
    ///
    /// Returns [`ApiError`] when the request fails or is rejected.
    async fn get_pixel_history(&self, canvas_id: &str, limit: u32) -> Result<Vec<HistoryEntry>, ApiError>;
}

/// Execute one engine action against `api` and feed the result back into
/// `core`. Returns the follow-up actions; actions that need no network
/// (render, animation frame, notifications) come back unchanged for the host.
pub async fn dispatch<A>(core: &mut EngineCore, api: &A, action: Action, clock: impl Fn() -> f64) -> Vec<Action>
where
    A: PixelApi + ?Sized,
{
    match action {
        Action::PlacePixel(request) => {
            let result = api.place_pixel(&request).await;
            core.resolve_placement(request.request_id, result, clock())
        }
        Action::FetchCanvasState { request_id } => {
            let canvas_id = core.config().canvas_id.clone();
            let result = api.get_canvas_state(&canvas_id).await;
            core.apply_canvas_state(request_id, result)
        }
        Action::FetchHistory { limit } => {
            let canvas_id = core.config().canvas_id.clone();
            let result = api.get_pixel_history(&canvas_id, limit).await;
            core.apply_history(result)
        }
        other => vec![other],
    }
}
