//! Placement pipeline: snapped cell, budget check, optimistic write, then
//! reconcile or roll back when the server answers.
//!
//! Each accepted attempt leaves a [`PendingPlacement`] keyed by request id.
//! Results are matched back by that id; unknown ids (duplicates, results that
//! outlived a role change) are ignored. A rollback only touches a cell whose
//! stamp still belongs to the failed write, so a newer placement or snapshot
//! always survives a late failure.

#[cfg(test)]
#[path = "placement_test.rs"]
mod placement_test;

use std::collections::HashMap;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{ApiError, PlaceRequest, PlaceResponse};
use crate::budget::RateBudget;
use crate::store::{Pixel, PixelStore, Stamp};
use crate::transform::{CellCoord, CoordinateTransformer, Point, ViewState};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlacementError {
    #[error("point is outside the canvas")]
    OutOfBounds,
    #[error("placement budget exhausted, retry in {retry_after_ms}ms")]
    RateLimited { retry_after_ms: f64 },
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("server rejected placement ({status}): {message}")]
    ServerRejected { status: u16, message: String },
}

/// An optimistic write waiting for its server result.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPlacement {
    pub id: Uuid,
    pub cell: CellCoord,
    pub previous: Option<Pixel>,
    /// Stamp `previous` carried, so an older pending write on the same cell can
    /// be re-pointed at the restored value.
    pub previous_stamp: Option<Stamp>,
    pub optimistic: Pixel,
    pub stamp: Stamp,
}

/// What a server result did to the local state.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No pending placement carries this id.
    Unknown,
    Confirmed { cell: CellCoord, pixel: Pixel },
    RolledBack { cell: CellCoord, restored: bool, error: PlacementError },
}

#[derive(Debug, Clone)]
pub struct PlacementController {
    canvas_id: String,
    color: String,
    placed_by: Option<String>,
    pending: HashMap<Uuid, PendingPlacement>,
}

impl PlacementController {
    #[must_use]
    pub fn new(canvas_id: &str, color: &str) -> Self {
        Self {
            canvas_id: canvas_id.to_owned(),
            color: color.to_owned(),
            placed_by: None,
            pending: HashMap::new(),
        }
    }

    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Select the colour for future placements. Blank strings are ignored.
    pub fn set_color(&mut self, color: &str) -> bool {
        let color = color.trim();
        if color.is_empty() {
            return false;
        }
        color.clone_into(&mut self.color);
        true
    }

    /// Name stamped on optimistic pixels until the server reports the real one.
    pub fn set_placed_by(&mut self, placed_by: Option<&str>) {
        self.placed_by = placed_by.map(str::to_owned);
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn pending(&self, id: &Uuid) -> Option<&PendingPlacement> {
        self.pending.get(id)
    }

    /// Try to place the selected colour at a screen point.
    ///
    /// On success the cell is already painted locally and the returned request
    /// must be sent to the server.
    ///
    /// # Errors
    ///
    /// [`PlacementError::OutOfBounds`] when the point misses the grid and
    /// [`PlacementError::RateLimited`] when the budget forbids a placement. In
    /// both cases neither the store nor the budget changes.
    pub fn attempt(
        &mut self,
        screen: Point,
        transformer: &CoordinateTransformer,
        view: ViewState,
        store: &mut PixelStore,
        budget: &mut RateBudget,
        now_ms: f64,
    ) -> Result<PlaceRequest, PlacementError> {
        let cell = transformer.screen_to_cell(screen, view).ok_or(PlacementError::OutOfBounds)?;
        if !budget.record_placement(now_ms) {
            let retry_after_ms = budget.retry_after_ms(now_ms);
            debug!(x = cell.x, y = cell.y, retry_after_ms, "placement blocked by budget");
            return Err(PlacementError::RateLimited { retry_after_ms });
        }

        let previous = store.get(cell).cloned();
        let previous_stamp = store.stamp(cell);
        let optimistic = Pixel { color: self.color.clone(), placed_by: self.placed_by.clone() };
        let stamp = store.put(cell, optimistic.clone()).ok_or(PlacementError::OutOfBounds)?;

        let id = Uuid::new_v4();
        self.pending.insert(id, PendingPlacement { id, cell, previous, previous_stamp, optimistic, stamp });
        debug!(%id, x = cell.x, y = cell.y, color = %self.color, "placement attempted");

        Ok(PlaceRequest {
            request_id: id,
            x: cell.x,
            y: cell.y,
            color: self.color.clone(),
            canvas_id: self.canvas_id.clone(),
        })
    }

    /// Apply the server's answer for request `id`.
    pub fn resolve(
        &mut self,
        id: Uuid,
        result: Result<PlaceResponse, ApiError>,
        store: &mut PixelStore,
        budget: &mut RateBudget,
        now_ms: f64,
    ) -> Resolution {
        let Some(placement) = self.pending.remove(&id) else {
            debug!(%id, "ignoring result for unknown placement");
            return Resolution::Unknown;
        };

        let error = match result {
            Ok(response) if response.success => {
                if let Some(info) = response.cooldown_info {
                    budget.apply_server_info(info, now_ms);
                }
                return self.confirm(placement, response.pixel, store);
            }
            Ok(_) => PlacementError::ServerRejected { status: 200, message: "placement not accepted".to_owned() },
            Err(err) if err.is_rate_limited() => {
                let limit_info = match &err {
                    ApiError::Rejected { limit_info, .. } => *limit_info,
                    ApiError::Network(_) | ApiError::Decode(_) => None,
                };
                budget.mark_exhausted(limit_info, now_ms);
                PlacementError::RateLimited { retry_after_ms: budget.retry_after_ms(now_ms) }
            }
            Err(ApiError::Rejected { status, message, .. }) => PlacementError::ServerRejected {
                status,
                message: message.unwrap_or_else(|| "request rejected".to_owned()),
            },
            Err(err @ (ApiError::Network(_) | ApiError::Decode(_))) => PlacementError::NetworkFailure(err.to_string()),
        };
        self.roll_back(placement, error, store)
    }

    fn confirm(&mut self, placement: PendingPlacement, server: Option<Pixel>, store: &mut PixelStore) -> Resolution {
        let cell = placement.cell;
        let pixel = server.unwrap_or(placement.optimistic);
        if self.newer_pending(cell, placement.stamp) {
            debug!(x = cell.x, y = cell.y, "confirmed placement superseded by a newer local one");
        } else if store.get(cell) != Some(&pixel) {
            let stamp = store.put(cell, pixel.clone());
            self.repoint(cell, Some(placement.stamp), stamp);
        }
        info!(x = cell.x, y = cell.y, color = %pixel.color, "placement confirmed");
        Resolution::Confirmed { cell, pixel }
    }

    fn roll_back(&mut self, placement: PendingPlacement, error: PlacementError, store: &mut PixelStore) -> Resolution {
        let cell = placement.cell;
        let restored = store.restore_if(cell, placement.stamp, placement.previous);
        if restored {
            self.repoint(cell, placement.previous_stamp, store.stamp(cell));
        }
        warn!(x = cell.x, y = cell.y, restored, error = %error, "placement rolled back");
        Resolution::RolledBack { cell, restored, error }
    }

    fn newer_pending(&self, cell: CellCoord, stamp: Stamp) -> bool {
        self.pending.values().any(|p| p.cell == cell && p.stamp > stamp)
    }

    /// A write replaced the cell value that pending placements on `cell` knew as
    /// `old`; make them track the replacement instead.
    fn repoint(&mut self, cell: CellCoord, old: Option<Stamp>, new: Option<Stamp>) {
        let (Some(old), Some(new)) = (old, new) else {
            return;
        };
        for p in self.pending.values_mut().filter(|p| p.cell == cell) {
            if p.stamp == old {
                p.stamp = new;
            }
            if p.previous_stamp == Some(old) {
                p.previous_stamp = Some(new);
            }
        }
    }
}
