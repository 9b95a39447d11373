#![forbid(unsafe_code)]

//! Geographic and screen-space primitives.
//!
//! # Design
//!
//! Everything here is a plain `Copy` value and every function is pure. The
//! map engine owns the real projection; this module only needs a
//! [`Projector`] that can move a coordinate between geographic and pixel
//! space at one fixed view.
//!
//! # Antimeridian
//!
//! Bounds whose west edge is numerically greater than their east edge cross
//! the antimeridian. [`LngLatBounds::normalized`] unwraps the east edge by
//! `+360°`, so normalized bounds always satisfy `west <= east` and the east
//! longitude may exceed `180°`. Rings and displacements are computed on
//! normalized bounds; nothing wraps back into `[-180, 180]` behind the
//! caller's back.

use std::ops::{Add, AddAssign, Sub};

/// Web Mercator latitude limit.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Tile size used by [`WebMercator`], in pixels.
pub const TILE_SIZE: f64 = 512.0;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LngLat {
    /// Longitude.
    pub lng: f64,
    /// Latitude.
    pub lat: f64,
}

impl LngLat {
    /// Create a new coordinate.
    #[inline]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Same coordinate with longitude wrapped into `[-180, 180)`.
    #[must_use]
    pub fn wrapped(self) -> Self {
        let lng = (self.lng + 180.0).rem_euclid(360.0) - 180.0;
        Self::new(lng, self.lat)
    }
}

/// A point or offset in screen pixels (origin top-left, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    /// The zero displacement.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Check whether both components are exactly zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for ScreenPoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for ScreenPoint {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for ScreenPoint {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned geographic bounds given by their south-west and north-east
/// corners.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LngLatBounds {
    /// South-west corner.
    pub sw: LngLat,
    /// North-east corner.
    pub ne: LngLat,
}

impl LngLatBounds {
    /// Create bounds from corners.
    #[inline]
    pub const fn new(sw: LngLat, ne: LngLat) -> Self {
        Self { sw, ne }
    }

    /// Create bounds from edge values.
    #[inline]
    pub const fn from_edges(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self::new(LngLat::new(west, south), LngLat::new(east, north))
    }

    #[inline]
    pub const fn west(&self) -> f64 {
        self.sw.lng
    }

    #[inline]
    pub const fn south(&self) -> f64 {
        self.sw.lat
    }

    #[inline]
    pub const fn east(&self) -> f64 {
        self.ne.lng
    }

    #[inline]
    pub const fn north(&self) -> f64 {
        self.ne.lat
    }

    /// Whether the bounds cross the antimeridian (west edge east of the
    /// east edge).
    #[inline]
    pub fn crosses_antimeridian(&self) -> bool {
        self.sw.lng > self.ne.lng
    }

    /// Bounds with the east edge unwrapped past `180°` when crossing the
    /// antimeridian. Non-crossing bounds are returned unchanged.
    #[must_use]
    pub fn normalized(&self) -> Self {
        if self.crosses_antimeridian() {
            Self::new(self.sw, LngLat::new(self.ne.lng + 360.0, self.ne.lat))
        } else {
            *self
        }
    }

    /// Longitude span in degrees, measured on the normalized bounds.
    #[must_use]
    pub fn lng_span(&self) -> f64 {
        let n = self.normalized();
        n.east() - n.west()
    }

    /// Latitude span in degrees.
    #[must_use]
    pub fn lat_span(&self) -> f64 {
        self.north() - self.south()
    }

    /// Geographic midpoint, longitude wrapped into `[-180, 180)`.
    #[must_use]
    pub fn center(&self) -> LngLat {
        let n = self.normalized();
        LngLat::new((n.west() + n.east()) / 2.0, (n.south() + n.north()) / 2.0).wrapped()
    }
}

/// Closed polygon ring of five points (first == last).
///
/// Winding is counter-clockwise starting at the south-west corner:
/// `[sw, se, ne, nw, sw]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ring([LngLat; 5]);

impl Ring {
    /// The ring's points, closing point included.
    #[inline]
    pub const fn points(&self) -> &[LngLat; 5] {
        &self.0
    }

    /// Whether the first and last points coincide.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.0[0] == self.0[4]
    }

    /// Smallest bounds containing every point of the ring.
    #[must_use]
    pub fn bbox(&self) -> LngLatBounds {
        let mut west = f64::INFINITY;
        let mut south = f64::INFINITY;
        let mut east = f64::NEG_INFINITY;
        let mut north = f64::NEG_INFINITY;
        for p in &self.0 {
            west = west.min(p.lng);
            east = east.max(p.lng);
            south = south.min(p.lat);
            north = north.max(p.lat);
        }
        LngLatBounds::from_edges(west, south, east, north)
    }

    /// Ring as `[lng, lat]` pairs, the layout GeoJSON polygons expect.
    #[must_use]
    pub fn to_coordinates(&self) -> Vec<[f64; 2]> {
        self.0.iter().map(|p| [p.lng, p.lat]).collect()
    }
}

/// Converts between geographic and pixel coordinates at one fixed view.
pub trait Projector {
    /// Geographic coordinate to screen pixel.
    fn project(&self, point: LngLat) -> ScreenPoint;

    /// Screen pixel to geographic coordinate.
    fn unproject(&self, point: ScreenPoint) -> LngLat;
}

/// Shift `base` by a pixel displacement.
///
/// Both corners are projected, moved by `displacement`, and unprojected.
/// Crossing bounds are normalized first (see the module docs), so the result
/// is always normalized. A zero displacement returns the normalized `base`.
#[must_use]
pub fn bounds_after_displacement<P: Projector + ?Sized>(
    base: &LngLatBounds,
    displacement: ScreenPoint,
    projector: &P,
) -> LngLatBounds {
    let base = base.normalized();
    if displacement.is_zero() {
        return base;
    }
    let sw = projector.unproject(projector.project(base.sw) + displacement);
    let ne = projector.unproject(projector.project(base.ne) + displacement);
    LngLatBounds::new(sw, ne)
}

/// The closed ring tracing the four corners of `bounds`.
#[must_use]
pub fn ring_from_bounds(bounds: &LngLatBounds) -> Ring {
    let b = bounds.normalized();
    Ring([
        LngLat::new(b.west(), b.south()),
        LngLat::new(b.east(), b.south()),
        LngLat::new(b.east(), b.north()),
        LngLat::new(b.west(), b.north()),
        LngLat::new(b.west(), b.south()),
    ])
}

/// Spherical Web Mercator projection of a `width` x `height` pixel viewport
/// centered on `center` at `zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercator {
    center: LngLat,
    zoom: f64,
    width: f64,
    height: f64,
}

impl WebMercator {
    #[must_use]
    pub const fn new(center: LngLat, zoom: f64, width: f64, height: f64) -> Self {
        Self {
            center,
            zoom,
            width,
            height,
        }
    }

    /// World width in pixels at this zoom.
    #[inline]
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * self.zoom.exp2()
    }

    fn lng_to_x(&self, lng: f64) -> f64 {
        (180.0 + lng) * self.world_size() / 360.0
    }

    fn lat_to_y(&self, lat: f64) -> f64 {
        let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
        let merc = (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0)
            .tan()
            .ln()
            .to_degrees();
        (180.0 - merc) * self.world_size() / 360.0
    }

    fn x_to_lng(&self, x: f64) -> f64 {
        x * 360.0 / self.world_size() - 180.0
    }

    fn y_to_lat(&self, y: f64) -> f64 {
        let merc = 180.0 - y * 360.0 / self.world_size();
        merc.to_radians().exp().atan().to_degrees() * 2.0 - 90.0
    }

    /// Geographic bounds of the whole viewport.
    #[must_use]
    pub fn visible_bounds(&self) -> LngLatBounds {
        LngLatBounds::new(
            self.unproject(ScreenPoint::new(0.0, self.height)),
            self.unproject(ScreenPoint::new(self.width, 0.0)),
        )
    }
}

impl Projector for WebMercator {
    fn project(&self, point: LngLat) -> ScreenPoint {
        ScreenPoint::new(
            self.lng_to_x(point.lng) - self.lng_to_x(self.center.lng) + self.width / 2.0,
            self.lat_to_y(point.lat) - self.lat_to_y(self.center.lat) + self.height / 2.0,
        )
    }

    fn unproject(&self, point: ScreenPoint) -> LngLat {
        LngLat::new(
            self.x_to_lng(point.x - self.width / 2.0 + self.lng_to_x(self.center.lng)),
            self.y_to_lat(point.y - self.height / 2.0 + self.lat_to_y(self.center.lat)),
        )
    }
}
