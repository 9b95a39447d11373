//! Property tests for the tracking-rectangle geometry and zoom offset.
//!
//! 1. **Closed ring** — every ring has five points and first == last.
//! 2. **Bounding box** — for bounds that do not cross the antimeridian the
//!    ring's bounding box equals the input bounds exactly.
//! 3. **Zero displacement** — shifting by `(0, 0)` returns the input.
//! 4. **Offset clamp** — any requested offset lands in `[5, 8]`, and values
//!    already in range are kept.
//! 5. **Derived zoom** — inside the engine domain the secondary zoom is
//!    exactly `parent - offset`.

use minimap_core::{
    LngLat, LngLatBounds, ScreenPoint, WebMercator, ZoomOffset, ZoomRange,
    bounds_after_displacement, ring_from_bounds,
};
use proptest::prelude::*;

fn non_crossing_bounds() -> impl Strategy<Value = LngLatBounds> {
    (-180.0f64..180.0, -85.0f64..85.0, 0.0f64..90.0, 0.0f64..40.0).prop_map(
        |(west, south, width, height)| {
            let east = (west + width).min(180.0);
            let north = (south + height).min(85.0);
            LngLatBounds::from_edges(west, south, east, north)
        },
    )
}

proptest! {
    #[test]
    fn ring_is_always_closed(bounds in non_crossing_bounds()) {
        let ring = ring_from_bounds(&bounds);
        prop_assert_eq!(ring.points().len(), 5);
        prop_assert!(ring.is_closed());
    }

    #[test]
    fn ring_bbox_matches_bounds(bounds in non_crossing_bounds()) {
        prop_assert_eq!(ring_from_bounds(&bounds).bbox(), bounds);
    }

    #[test]
    fn crossing_ring_is_continuous(west in 100.0f64..180.0, east in -180.0f64..-100.0) {
        let bounds = LngLatBounds::from_edges(west, -10.0, east, 10.0);
        prop_assume!(bounds.crosses_antimeridian());
        let bbox = ring_from_bounds(&bounds).bbox();
        prop_assert!(bbox.east() > bbox.west());
        prop_assert!((bbox.east() - (east + 360.0)).abs() < 1e-9);
    }

    #[test]
    fn zero_displacement_is_identity(
        bounds in non_crossing_bounds(),
        zoom in 0.0f64..18.0,
    ) {
        let proj = WebMercator::new(bounds.center(), zoom, 300.0, 200.0);
        prop_assert_eq!(bounds_after_displacement(&bounds, ScreenPoint::ZERO, &proj), bounds);
    }

    #[test]
    fn horizontal_displacement_preserves_span(
        lng in -120.0f64..120.0,
        lat in -60.0f64..60.0,
        dx in -100.0f64..100.0,
    ) {
        let proj = WebMercator::new(LngLat::new(lng, lat), 8.0, 400.0, 400.0);
        let base = proj.visible_bounds();
        let moved = bounds_after_displacement(&base, ScreenPoint::new(dx, 0.0), &proj);
        prop_assert!((moved.lng_span() - base.lng_span()).abs() < 1e-6);
        prop_assert!((moved.south() - base.south()).abs() < 1e-6);
    }

    #[test]
    fn offset_always_in_range(requested in any::<i64>()) {
        let offset = ZoomOffset::new(requested).get();
        prop_assert!((ZoomOffset::MIN..=ZoomOffset::MAX).contains(&offset));
        if (5..=8).contains(&requested) {
            prop_assert_eq!(i64::from(offset), requested);
        }
    }

    #[test]
    fn secondary_zoom_is_parent_minus_offset(
        requested in 5i64..=8,
        parent in 6.0f64..22.0,
    ) {
        let offset = ZoomOffset::new(requested);
        let zoom = offset.secondary_zoom(parent, ZoomRange::DEFAULT);
        prop_assert_eq!(zoom, parent - requested as f64);
    }
}
