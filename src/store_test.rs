use super::*;

fn store() -> PixelStore {
    PixelStore::new(GridSize::new(10, 10))
}

fn red() -> Pixel {
    Pixel::new("#FF0000", Some("alice"))
}

fn blue() -> Pixel {
    Pixel::new("#0000FF", None)
}

#[test]
fn put_and_get() {
    let mut s = store();
    let cell = CellCoord::new(3, 4);
    assert!(s.put(cell, red()).is_some());
    assert_eq!(s.get(cell), Some(&red()));
    assert_eq!(s.len(), 1);
}

#[test]
fn put_outside_grid_is_rejected() {
    let mut s = store();
    assert_eq!(s.put(CellCoord::new(10, 0), red()), None);
    assert!(s.is_empty());
}

#[test]
fn stamps_increase_per_write() {
    let mut s = store();
    let cell = CellCoord::new(1, 1);
    let first = s.put(cell, red()).unwrap();
    let second = s.put(cell, blue()).unwrap();
    assert!(second > first);
    assert_eq!(s.stamp(cell), Some(second));
}

#[test]
fn restore_removes_cell_that_was_empty() {
    let mut s = store();
    let cell = CellCoord::new(2, 2);
    let stamp = s.put(cell, red()).unwrap();
    assert!(s.restore_if(cell, stamp, None));
    assert_eq!(s.get(cell), None);
}

#[test]
fn restore_puts_back_previous_pixel() {
    let mut s = store();
    let cell = CellCoord::new(2, 2);
    s.put(cell, blue());
    let stamp = s.put(cell, red()).unwrap();
    assert!(s.restore_if(cell, stamp, Some(blue())));
    assert_eq!(s.get(cell), Some(&blue()));
}

#[test]
fn restore_skips_when_cell_was_rewritten() {
    let mut s = store();
    let cell = CellCoord::new(2, 2);
    let stale = s.put(cell, red()).unwrap();
    s.put(cell, blue());
    assert!(!s.restore_if(cell, stale, None));
    assert_eq!(s.get(cell), Some(&blue()));
}

#[test]
fn snapshot_replaces_everything_and_drops_out_of_grid() {
    let mut s = store();
    s.put(CellCoord::new(0, 0), red());
    let kept = s.load_snapshot(vec![(CellCoord::new(5, 5), blue()), (CellCoord::new(50, 5), red())]);
    assert_eq!(kept, 1);
    assert_eq!(s.get(CellCoord::new(0, 0)), None);
    assert_eq!(s.get(CellCoord::new(5, 5)), Some(&blue()));
}

#[test]
fn snapshot_invalidates_old_stamps() {
    let mut s = store();
    let cell = CellCoord::new(1, 1);
    let stamp = s.put(cell, red()).unwrap();
    s.load_snapshot(vec![(cell, blue())]);
    assert!(!s.restore_if(cell, stamp, None));
    assert_eq!(s.get(cell), Some(&blue()));
}

#[test]
fn range_iteration_is_inclusive() {
    let mut s = store();
    for x in 0..10 {
        s.put(CellCoord::new(x, x), red());
    }
    let mut hits: Vec<_> = s.iter_range(CellCoord::new(2, 2), CellCoord::new(4, 4)).map(|(c, _)| c).collect();
    hits.sort();
    assert_eq!(hits, vec![CellCoord::new(2, 2), CellCoord::new(3, 3), CellCoord::new(4, 4)]);
    assert_eq!(s.iter().count(), 10);
}

#[test]
fn pixel_wire_format_is_camel_case() {
    let json = serde_json::to_value(red()).unwrap();
    assert_eq!(json["placedBy"], "alice");
    let parsed: Pixel = serde_json::from_str(r##"{"color":"#00FF00"}"##).unwrap();
    assert_eq!(parsed, Pixel::new("#00FF00", None));
}
