#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn viewport(cells: u32, width: f64, height: f64) -> Viewport {
    let mut vp = Viewport::new(GridSize::new(cells, cells), 10.0, ViewportPolicy::default());
    vp.resize(width, height);
    vp
}

fn world_at(vp: &Viewport, local: Point) -> Point {
    let scale = 10.0 * vp.zoom();
    Point::new(local.x / scale - vp.offset().x, local.y / scale - vp.offset().y)
}

fn settle(vp: &mut Viewport) -> usize {
    for tick in 1..=1000 {
        if !vp.step() {
            return tick;
        }
    }
    panic!("viewport never settled");
}

// =============================================================
// min_zoom
// =============================================================

#[test]
fn min_zoom_scenario_100_grid_500_viewport() {
    let vp = viewport(100, 500.0, 500.0);
    assert!(approx_eq(vp.min_zoom(), 0.5 * DESKTOP_MARGIN));
}

const DESKTOP_MARGIN: f64 = crate::consts::DESKTOP_SAFETY_MARGIN;

#[test]
fn adjust_zoom_far_negative_clamps_to_min() {
    let mut vp = viewport(100, 500.0, 500.0);
    vp.adjust_zoom(-10.0, None);
    assert!(approx_eq(vp.zoom(), vp.min_zoom()));
    assert!(approx_eq(vp.zoom(), 0.475));
}

#[test]
fn min_zoom_uses_touch_margin() {
    let policy = ViewportPolicy::from_config(&EngineConfig::default(), InputProfile::Touch);
    let zoom = min_zoom(Point::new(500.0, 500.0), GridSize::new(100, 100), 10.0, &policy);
    assert!(approx_eq(zoom, 0.45));
}

#[test]
fn min_zoom_takes_tighter_axis() {
    let policy = ViewportPolicy::default();
    let zoom = min_zoom(Point::new(1000.0, 250.0), GridSize::new(100, 100), 10.0, &policy);
    assert!(approx_eq(zoom, 0.25 * DESKTOP_MARGIN));
}

#[test]
fn min_zoom_never_below_floor() {
    let policy = ViewportPolicy::default();
    let zoom = min_zoom(Point::new(100.0, 100.0), GridSize::new(100_000, 100_000), 10.0, &policy);
    assert_eq!(zoom, policy.min_zoom_floor);
    assert!(zoom > 0.0);
}

#[test]
fn min_zoom_without_layout_is_floor() {
    let policy = ViewportPolicy::default();
    let zoom = min_zoom(Point::new(0.0, 0.0), GridSize::new(100, 100), 10.0, &policy);
    assert_eq!(zoom, policy.min_zoom_floor);
}

#[test]
fn min_zoom_capped_at_max() {
    let policy = ViewportPolicy::default();
    let zoom = min_zoom(Point::new(5000.0, 5000.0), GridSize::new(1, 1), 1.0, &policy);
    assert_eq!(zoom, policy.max_zoom);
}

// =============================================================
// adjust_zoom
// =============================================================

#[test]
fn zoom_stays_within_bounds_for_any_delta() {
    let mut vp = viewport(100, 500.0, 500.0);
    for delta in [-100.0, -1.0, -0.01, 0.0, 0.3, 2.0, 17.0, 1e6, -1e6, f64::NAN, f64::INFINITY] {
        vp.adjust_zoom(delta, Some(Point::new(120.0, 80.0)));
        assert!(vp.zoom() >= vp.min_zoom(), "zoom {} below min after {delta}", vp.zoom());
        assert!(vp.zoom() <= vp.max_zoom(), "zoom {} above max after {delta}", vp.zoom());
    }
}

#[test]
fn adjust_zoom_far_positive_clamps_to_max() {
    let mut vp = viewport(100, 500.0, 500.0);
    vp.adjust_zoom(1000.0, None);
    assert_eq!(vp.zoom(), vp.max_zoom());
}

#[test]
fn adjust_zoom_non_finite_is_noop() {
    let mut vp = viewport(100, 500.0, 500.0);
    let before = vp.view();
    assert!(!vp.adjust_zoom(f64::NAN, None));
    assert_eq!(vp.view(), before);
}

#[test]
fn zoom_toward_cursor_keeps_world_point_fixed() {
    let mut vp = viewport(1000, 800.0, 600.0);
    let focal = Point::new(123.0, 456.0);
    for delta in [0.5, -0.3, 2.25, 0.01] {
        let before = world_at(&vp, focal);
        assert!(vp.adjust_zoom(delta, Some(focal)));
        let after = world_at(&vp, focal);
        assert!(approx_eq(before.x, after.x), "x drifted {} -> {}", before.x, after.x);
        assert!(approx_eq(before.y, after.y), "y drifted {} -> {}", before.y, after.y);
    }
}

#[test]
fn zoom_without_focal_preserves_centre() {
    let mut vp = viewport(1000, 800.0, 600.0);
    let centre = Point::new(400.0, 300.0);
    let before = world_at(&vp, centre);
    vp.zoom_by(1.8, None);
    let after = world_at(&vp, centre);
    assert!(approx_eq(before.x, after.x));
    assert!(approx_eq(before.y, after.y));
}

#[test]
fn zoom_by_multiplies() {
    let mut vp = viewport(1000, 800.0, 600.0);
    vp.zoom_by(2.0, None);
    assert!(approx_eq(vp.zoom(), 2.0));
}

#[test]
fn zoom_cancels_momentum() {
    let mut vp = viewport(1000, 800.0, 600.0);
    assert!(vp.start_momentum(20.0, 0.0));
    vp.zoom_by(1.5, None);
    assert!(!vp.has_momentum());
}

// =============================================================
// Boundaries
// =============================================================

#[test]
fn axis_bounds_small_viewport_spans_grid() {
    let b = AxisBounds::compute(50.0, 100.0, 0.25, 0.1);
    assert_eq!(b.lo, -50.0);
    assert_eq!(b.hi, 0.0);
    assert!(approx_eq(b.overshoot, 5.0));
}

#[test]
fn axis_bounds_large_viewport_centres_with_slack() {
    let b = AxisBounds::compute(200.0, 100.0, 0.25, 0.1);
    assert_eq!(b.lo, 0.0);
    assert_eq!(b.hi, 100.0);
    assert!(approx_eq(b.overshoot, 20.0));
}

#[test]
fn constrain_is_idempotent() {
    let mut vp = viewport(100, 640.0, 480.0);
    let offsets = [-1e9, -500.0, -73.2, -50.0, -1.0, 0.0, 0.5, 3.0, 40.0, 1e9, f64::NAN];
    for zoom in [0.5, 1.0, 2.0, 7.5, 40.0] {
        vp.zoom_to(zoom, None);
        for &x in &offsets {
            for &y in &offsets {
                let once = vp.constrain_offset(Point::new(x, y));
                let twice = vp.constrain_offset(once);
                assert_eq!(once, twice, "not idempotent at zoom {zoom} for ({x}, {y})");
            }
        }
    }
}

#[test]
fn constrain_leaves_allowed_offsets_untouched() {
    let vp = viewport(1000, 800.0, 600.0);
    let inside = Point::new(-300.0, -100.0);
    assert_eq!(vp.constrain_offset(inside), inside);
}

#[test]
fn resist_moves_freely_inside_range() {
    let b = AxisBounds::compute(50.0, 100.0, 0.25, 0.1);
    assert_eq!(b.resist(-20.0, 5.0, 0.2), -15.0);
}

#[test]
fn resist_damps_motion_past_edge() {
    let b = AxisBounds::compute(50.0, 100.0, 0.25, 0.1);
    // Already 2 units past hi; overshoot band is 5.
    let next = b.resist(2.0, 1.0, 0.2);
    assert!(next > 2.0, "motion must not stop abruptly");
    assert!(next < 3.0, "motion past the edge must be damped");
}

#[test]
fn resist_returning_toward_range_is_free() {
    let b = AxisBounds::compute(50.0, 100.0, 0.25, 0.1);
    assert_eq!(b.resist(3.0, -1.0, 0.2), 2.0);
}

#[test]
fn resist_damps_first_move_past_edge() {
    let b = AxisBounds::compute(80.0, 1000.0, 0.25, 0.1);
    assert_eq!(b.hi, 0.0);
    assert!(approx_eq(b.overshoot, 8.0));
    let moved = b.resist(0.0, 6.0, 0.2);
    assert!(moved > 0.0 && moved < 6.0, "expected damped move, got {moved}");
}

#[test]
fn resist_approaches_envelope_without_reaching_it() {
    let b = AxisBounds::compute(80.0, 1000.0, 0.25, 0.1);
    let mut last = b.hi;
    for delta in [1.0, 10.0, 100.0, 1e4] {
        let next = b.resist(b.hi, delta, 0.2);
        assert!(next > last, "larger pulls must still move further");
        assert!(next < b.hi + b.overshoot, "reached the envelope at delta {delta}");
        last = next;
    }
    let low = b.resist(b.lo, -1e4, 0.2);
    assert!(low < b.lo && low > b.lo - b.overshoot);
}

#[test]
fn resist_splits_one_move_the_same_as_two() {
    let b = AxisBounds::compute(80.0, 1000.0, 0.25, 0.1);
    let once = b.resist(-1.0, 4.0, 0.2);
    let twice = b.resist(b.resist(-1.0, 2.0, 0.2), 2.0, 0.2);
    assert!((once - twice).abs() < 1e-9, "{once} vs {twice}");
}

#[test]
fn drag_past_edge_is_damped_then_springs_back() {
    let mut vp = viewport(1000, 800.0, 600.0);
    assert_eq!(vp.offset().x, -460.0);

    vp.pan_by_screen(4620.0, 0.0);
    let first = vp.offset().x;
    assert!(first > 0.0 && first < 2.0, "expected damped move, got {first}");

    vp.pan_by_screen(10.0, 0.0);
    let out = vp.offset().x;
    assert!(out > first && out < first + 1.0, "expected damped move, got {out}");

    vp.pan_by_screen(1e5, 0.0);
    let (bx, _) = vp.bounds();
    assert!(vp.offset().x < bx.hi + bx.overshoot);

    settle(&mut vp);
    assert_eq!(vp.offset().x, 0.0);
    let (bx, _) = vp.bounds();
    assert_eq!(bx.excess(vp.offset().x), 0.0);
}

#[test]
fn held_view_does_not_spring_back() {
    let mut vp = viewport(1000, 800.0, 600.0);
    vp.hold();
    vp.pan_by_screen(4620.0, 0.0);
    let out = vp.offset().x;
    assert!(out > 0.0);
    assert!(!vp.step());
    assert_eq!(vp.offset().x, out);
    vp.release();
    assert!(vp.step());
}

// =============================================================
// Interpolation
// =============================================================

#[test]
fn animated_pan_chases_target() {
    let mut vp = viewport(1000, 800.0, 600.0);
    let start = vp.offset().x;
    vp.pan_target_by_screen(-100.0, 0.0);
    assert_eq!(vp.target().x, start - 10.0);
    assert_eq!(vp.offset().x, start);

    assert!(vp.step());
    let first = vp.offset().x;
    assert!(approx_eq(first, start - 10.0 * DEFAULT_INTERPOLATION_FRACTION));

    settle(&mut vp);
    assert_eq!(vp.offset().x, start - 10.0);
}

const DEFAULT_INTERPOLATION_FRACTION: f64 = crate::consts::DEFAULT_INTERPOLATION;

#[test]
fn settled_viewport_reports_no_more_ticks() {
    let mut vp = viewport(1000, 800.0, 600.0);
    assert!(vp.is_settled());
    assert!(!vp.step());
}

// =============================================================
// Momentum
// =============================================================

fn momentum_viewport(friction: f64, threshold: f64) -> Viewport {
    let mut config = EngineConfig::default();
    config.animation.friction = friction;
    config.animation.momentum_threshold = threshold;
    let mut vp = Viewport::new(
        GridSize::new(1000, 1000),
        10.0,
        ViewportPolicy::from_config(&config, InputProfile::Desktop),
    );
    vp.resize(800.0, 600.0);
    vp
}

fn ticks_until_stopped(vp: &mut Viewport) -> usize {
    let mut ticks = 0;
    while vp.has_momentum() {
        vp.step();
        ticks += 1;
        assert!(ticks < 10_000, "momentum never stopped");
    }
    ticks
}

#[test]
fn momentum_tick_count_matches_log_formula() {
    for (v0, friction, threshold) in [(10.0, 0.9, 0.5), (37.0, 0.95, 0.3), (3.0, 0.8, 0.7)] {
        let mut vp = momentum_viewport(friction, threshold);
        assert!(vp.start_momentum(v0, 0.0));
        let expected = ((threshold / v0).ln() / friction.ln()).ceil();
        #[allow(clippy::cast_precision_loss)]
        let ticks = ticks_until_stopped(&mut vp) as f64;
        assert_eq!(ticks, expected, "v0={v0} f={friction} t={threshold}");
    }
}

#[test]
fn momentum_moves_in_drag_direction() {
    let mut vp = momentum_viewport(0.9, 0.5);
    let start = vp.offset();
    vp.start_momentum(10.0, -10.0);
    vp.step();
    assert!(vp.offset().x > start.x);
    assert!(vp.offset().y < start.y);
}

#[test]
fn momentum_below_threshold_does_not_start() {
    let mut vp = momentum_viewport(0.9, 0.5);
    assert!(!vp.start_momentum(0.3, 0.3));
    assert!(!vp.has_momentum());
}

#[test]
fn hold_cancels_momentum() {
    let mut vp = momentum_viewport(0.9, 0.5);
    vp.start_momentum(10.0, 0.0);
    vp.hold();
    assert!(!vp.has_momentum());
}

#[test]
fn momentum_dies_faster_past_edge() {
    let mut open = momentum_viewport(0.9, 0.5);
    open.start_momentum(40.0, 0.0);
    let open_ticks = ticks_until_stopped(&mut open);

    let mut edge = momentum_viewport(0.9, 0.5);
    edge.pan_by_screen(4600.0, 0.0);
    edge.start_momentum(40.0, 0.0);
    let edge_ticks = ticks_until_stopped(&mut edge);

    assert!(edge_ticks < open_ticks, "edge {edge_ticks} vs open {open_ticks}");
}

#[test]
fn momentum_into_edge_never_hits_a_wall() {
    let mut vp = momentum_viewport(0.99, 0.5);
    vp.pan_by_screen(4600.0, 0.0);
    vp.start_momentum(400.0, 0.0);
    let (bx, _) = vp.bounds();
    let mut last = vp.offset().x;
    while vp.has_momentum() {
        vp.step();
        let x = vp.offset().x;
        assert!(x >= last, "coast reversed at {x}");
        assert!(x < bx.hi + bx.overshoot, "coast hit the envelope");
        last = x;
    }
    settle(&mut vp);
    assert_eq!(vp.offset().x, bx.hi);
}

// =============================================================
// Layout
// =============================================================

#[test]
fn first_resize_centres_grid() {
    let vp = viewport(1000, 800.0, 600.0);
    assert_eq!(vp.offset(), Point::new(-460.0, -470.0));
    assert_eq!(vp.zoom(), 1.0);
}

#[test]
fn small_grid_is_centred_at_fit_zoom() {
    let vp = viewport(10, 500.0, 500.0);
    assert!(approx_eq(vp.zoom(), 5.0 * DESKTOP_MARGIN));
    let (bx, by) = vp.bounds();
    assert_eq!(bx.excess(vp.offset().x), 0.0);
    assert_eq!(by.excess(vp.offset().y), 0.0);
    let view_cells = 500.0 / (10.0 * vp.zoom());
    assert!(approx_eq(vp.offset().x, (view_cells - 10.0) * 0.5));
}

#[test]
fn resize_reclamps_zoom() {
    let mut vp = viewport(100, 500.0, 500.0);
    vp.adjust_zoom(-10.0, None);
    vp.resize(2000.0, 2000.0);
    assert!(approx_eq(vp.zoom(), vp.min_zoom()));
    assert!(approx_eq(vp.zoom(), 2.0 * DESKTOP_MARGIN));
}

#[test]
fn reset_restores_default_zoom_and_centre() {
    let mut vp = viewport(1000, 800.0, 600.0);
    vp.zoom_by(3.0, Some(Point::new(10.0, 10.0)));
    vp.pan_by_screen(50.0, 50.0);
    vp.reset();
    assert_eq!(vp.zoom(), 1.0);
    assert_eq!(vp.offset(), Point::new(-460.0, -470.0));
    assert_eq!(vp.target(), vp.offset());
}
