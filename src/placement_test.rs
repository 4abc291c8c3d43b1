use super::*;
use crate::api::{CooldownInfo, LimitInfo};
use crate::config::{BudgetLimits, SnapRule};
use crate::transform::GridSize;

struct Fixture {
    controller: PlacementController,
    transformer: CoordinateTransformer,
    store: PixelStore,
    budget: RateBudget,
}

impl Fixture {
    fn new(max_per_window: u32) -> Self {
        let grid = GridSize::new(100, 100);
        Self {
            controller: PlacementController::new("main", "#FF4500"),
            transformer: CoordinateTransformer::new(grid, 10.0, SnapRule::Floor),
            store: PixelStore::new(grid),
            budget: RateBudget::from_limits(BudgetLimits {
                max_pixels_per_window: max_per_window,
                window_seconds: 60,
                cooldown_seconds: 0.0,
            }),
        }
    }

    fn place(&mut self, x: f64, y: f64, now: f64) -> Result<PlaceRequest, PlacementError> {
        self.controller.attempt(
            Point::new(x, y),
            &self.transformer,
            ViewState::default(),
            &mut self.store,
            &mut self.budget,
            now,
        )
    }

    fn resolve(&mut self, id: Uuid, result: Result<PlaceResponse, ApiError>, now: f64) -> Resolution {
        self.controller.resolve(id, result, &mut self.store, &mut self.budget, now)
    }

    fn color_at(&self, x: u32, y: u32) -> Option<String> {
        self.store.get(CellCoord::new(x, y)).map(|p| p.color.clone())
    }
}

fn ok(color: &str, remaining: u32) -> Result<PlaceResponse, ApiError> {
    Ok(PlaceResponse {
        success: true,
        pixel: Some(Pixel::new(color, Some("alice"))),
        cooldown_info: Some(CooldownInfo { remaining, cooldown_seconds: 0.0 }),
    })
}

fn network_error() -> Result<PlaceResponse, ApiError> {
    Err(ApiError::Network("connection reset".to_owned()))
}

// --- attempt ---

#[test]
fn attempt_paints_optimistically() {
    let mut f = Fixture::new(5);
    let request = f.place(505.0, 505.0, 0.0).unwrap();
    assert_eq!(request.cell(), CellCoord::new(50, 50));
    assert_eq!(request.color, "#FF4500");
    assert_eq!(request.canvas_id, "main");
    assert_eq!(f.color_at(50, 50).as_deref(), Some("#FF4500"));
    assert_eq!(f.controller.pending_count(), 1);
    assert_eq!(f.budget.remaining(0.0), 4);
}

#[test]
fn out_of_grid_changes_nothing() {
    let mut f = Fixture::new(5);
    assert_eq!(f.place(-5.0, 10.0, 0.0), Err(PlacementError::OutOfBounds));
    assert_eq!(f.place(1000.0, 10.0, 0.0), Err(PlacementError::OutOfBounds));
    assert!(f.store.is_empty());
    assert_eq!(f.budget.remaining(0.0), 5);
    assert_eq!(f.controller.pending_count(), 0);
}

#[test]
fn exhausted_budget_changes_nothing() {
    let mut f = Fixture::new(1);
    f.place(5.0, 5.0, 0.0).unwrap();
    let err = f.place(15.0, 5.0, 1_000.0).unwrap_err();
    assert_eq!(err, PlacementError::RateLimited { retry_after_ms: 59_000.0 });
    assert_eq!(f.store.len(), 1);
    assert_eq!(f.color_at(1, 0), None);
    assert_eq!(f.controller.pending_count(), 1);
}

#[test]
fn blank_colour_is_ignored() {
    let mut f = Fixture::new(5);
    assert!(!f.controller.set_color("  "));
    assert!(f.controller.set_color("#123456"));
    assert_eq!(f.controller.color(), "#123456");
}

// --- resolve ---

#[test]
fn success_adopts_server_pixel_and_budget() {
    let mut f = Fixture::new(5);
    let request = f.place(5.0, 5.0, 0.0).unwrap();
    let resolution = f.resolve(request.request_id, ok("#FF4500", 2), 100.0);
    assert_eq!(
        resolution,
        Resolution::Confirmed { cell: CellCoord::new(0, 0), pixel: Pixel::new("#FF4500", Some("alice")) }
    );
    assert_eq!(f.store.get(CellCoord::new(0, 0)).and_then(|p| p.placed_by.as_deref()), Some("alice"));
    assert_eq!(f.budget.remaining(100.0), 2);
    assert_eq!(f.controller.pending_count(), 0);
}

#[test]
fn failure_on_empty_cell_removes_it() {
    let mut f = Fixture::new(5);
    let request = f.place(5.0, 5.0, 0.0).unwrap();
    let resolution = f.resolve(request.request_id, network_error(), 100.0);
    let Resolution::RolledBack { restored, error, .. } = resolution else {
        panic!("expected rollback, got {resolution:?}");
    };
    assert!(restored);
    assert!(matches!(error, PlacementError::NetworkFailure(_)));
    assert_eq!(f.color_at(0, 0), None);
}

#[test]
fn failure_restores_previous_pixel() {
    let mut f = Fixture::new(5);
    f.store.put(CellCoord::new(0, 0), Pixel::new("#000000", Some("bob")));
    let request = f.place(5.0, 5.0, 0.0).unwrap();
    let err = ApiError::Rejected { status: 400, message: Some("bad colour".to_owned()), limit_info: None };
    let resolution = f.resolve(request.request_id, Err(err), 100.0);
    assert!(matches!(
        resolution,
        Resolution::RolledBack { error: PlacementError::ServerRejected { status: 400, .. }, .. }
    ));
    assert_eq!(f.color_at(0, 0).as_deref(), Some("#000000"));
}

#[test]
fn unknown_and_duplicate_results_are_ignored() {
    let mut f = Fixture::new(5);
    assert_eq!(f.resolve(Uuid::new_v4(), ok("#FFFFFF", 4), 0.0), Resolution::Unknown);

    let request = f.place(5.0, 5.0, 0.0).unwrap();
    f.resolve(request.request_id, ok("#FF4500", 4), 10.0);
    assert_eq!(f.resolve(request.request_id, network_error(), 20.0), Resolution::Unknown);
    assert_eq!(f.color_at(0, 0).as_deref(), Some("#FF4500"));
}

#[test]
fn server_rate_limit_exhausts_budget() {
    let mut f = Fixture::new(5);
    let request = f.place(5.0, 5.0, 0.0).unwrap();
    let limit_info = LimitInfo { retry_after_seconds: Some(30.0), ..LimitInfo::default() };
    let err = ApiError::Rejected { status: 429, message: None, limit_info: Some(limit_info) };
    let resolution = f.resolve(request.request_id, Err(err), 1_000.0);
    assert!(matches!(
        resolution,
        Resolution::RolledBack { error: PlacementError::RateLimited { .. }, restored: true, .. }
    ));
    assert!(!f.budget.can_place(1_000.0));
    assert_eq!(f.budget.retry_after_ms(1_000.0), 59_000.0);
}

#[test]
fn unaccepted_success_body_rolls_back() {
    let mut f = Fixture::new(5);
    let request = f.place(5.0, 5.0, 0.0).unwrap();
    let body = PlaceResponse { success: false, pixel: None, cooldown_info: None };
    let resolution = f.resolve(request.request_id, Ok(body), 10.0);
    assert!(matches!(
        resolution,
        Resolution::RolledBack { error: PlacementError::ServerRejected { status: 200, .. }, .. }
    ));
    assert_eq!(f.color_at(0, 0), None);
}

// --- stale results ---

#[test]
fn late_failure_keeps_newer_placement() {
    let mut f = Fixture::new(5);
    let first = f.place(5.0, 5.0, 0.0).unwrap();
    f.controller.set_color("#00FF00");
    let second = f.place(5.0, 5.0, 10.0).unwrap();

    let resolution = f.resolve(first.request_id, network_error(), 20.0);
    assert!(matches!(resolution, Resolution::RolledBack { restored: false, .. }));
    assert_eq!(f.color_at(0, 0).as_deref(), Some("#00FF00"));

    f.resolve(second.request_id, ok("#00FF00", 3), 30.0);
    assert_eq!(f.color_at(0, 0).as_deref(), Some("#00FF00"));
}

#[test]
fn chained_failures_unwind_in_reverse() {
    let mut f = Fixture::new(5);
    let first = f.place(5.0, 5.0, 0.0).unwrap();
    f.controller.set_color("#00FF00");
    let second = f.place(5.0, 5.0, 10.0).unwrap();

    f.resolve(second.request_id, network_error(), 20.0);
    assert_eq!(f.color_at(0, 0).as_deref(), Some("#FF4500"));
    f.resolve(first.request_id, network_error(), 30.0);
    assert_eq!(f.color_at(0, 0), None);
}

#[test]
fn confirmation_does_not_clobber_newer_pending() {
    let mut f = Fixture::new(5);
    let first = f.place(5.0, 5.0, 0.0).unwrap();
    f.controller.set_color("#00FF00");
    f.place(5.0, 5.0, 10.0).unwrap();

    f.resolve(first.request_id, ok("#FF4500", 3), 20.0);
    assert_eq!(f.color_at(0, 0).as_deref(), Some("#00FF00"));
}

#[test]
fn snapshot_wins_over_late_failure() {
    let mut f = Fixture::new(5);
    let request = f.place(5.0, 5.0, 0.0).unwrap();
    f.store.load_snapshot(vec![(CellCoord::new(0, 0), Pixel::new("#ABCDEF", Some("carol")))]);
    let resolution = f.resolve(request.request_id, network_error(), 10.0);
    assert!(matches!(resolution, Resolution::RolledBack { restored: false, .. }));
    assert_eq!(f.color_at(0, 0).as_deref(), Some("#ABCDEF"));
}
