#![forbid(unsafe_code)]

//! Zoom offset between the parent and secondary views.
//!
//! # Invariants
//!
//! 1. A [`ZoomOffset`] always holds a value in `[ZoomOffset::MIN, ZoomOffset::MAX]`,
//!    whether it came from construction or a later [`ZoomOffset::set`].
//! 2. [`ZoomOffset::secondary_zoom`] never returns a zoom outside the
//!    engine's [`ZoomRange`]. Outside `[5, 8]` the tracking rectangle is either
//!    too large to fit the minimap or too small to see.

/// Inclusive zoom domain accepted by a map engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoomRange {
    min: f64,
    max: f64,
}

impl ZoomRange {
    /// Default domain of MapLibre-style engines.
    pub const DEFAULT: Self = Self {
        min: -2.0,
        max: 22.0,
    };

    /// Create a range; reversed bounds are swapped.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    #[inline]
    pub const fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub const fn max(&self) -> f64 {
        self.max
    }

    #[inline]
    pub fn contains(&self, zoom: f64) -> bool {
        zoom >= self.min && zoom <= self.max
    }

    /// Clamp `zoom` into the range.
    #[inline]
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Integer difference `parent.zoom - secondary.zoom`, clamped to `[5, 8]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoomOffset(u8);

impl ZoomOffset {
    pub const MIN: u8 = 5;
    pub const MAX: u8 = 8;
    pub const DEFAULT: Self = Self(6);

    /// Clamp `requested` into `[MIN, MAX]`.
    #[must_use]
    pub fn new(requested: i64) -> Self {
        Self(requested.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u8)
    }

    /// Replace the stored value, clamping again.
    pub fn set(&mut self, requested: i64) {
        *self = Self::new(requested);
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zoom for the secondary view given the parent's zoom.
    #[must_use]
    pub fn secondary_zoom(self, parent_zoom: f64, range: ZoomRange) -> f64 {
        range.clamp(parent_zoom - f64::from(self.0))
    }
}

impl Default for ZoomOffset {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_clamped_on_construction() {
        assert_eq!(ZoomOffset::new(12).get(), 8);
        assert_eq!(ZoomOffset::new(-3).get(), 5);
        assert_eq!(ZoomOffset::new(7).get(), 7);
    }

    #[test]
    fn offset_is_clamped_on_mutation() {
        let mut offset = ZoomOffset::default();
        assert_eq!(offset.get(), 6);
        offset.set(100);
        assert_eq!(offset.get(), 8);
        offset.set(i64::MIN);
        assert_eq!(offset.get(), 5);
    }

    #[test]
    fn secondary_zoom_subtracts_offset() {
        let offset = ZoomOffset::new(12);
        assert_eq!(offset.secondary_zoom(10.0, ZoomRange::DEFAULT), 2.0);
    }

    #[test]
    fn secondary_zoom_stays_inside_engine_domain() {
        let offset = ZoomOffset::new(8);
        let range = ZoomRange::new(0.0, 22.0);
        assert_eq!(offset.secondary_zoom(3.0, range), 0.0);
        assert_eq!(offset.secondary_zoom(40.0, range), 22.0);
    }

    #[test]
    fn reversed_range_is_swapped() {
        let range = ZoomRange::new(20.0, 1.0);
        assert_eq!(range.min(), 1.0);
        assert_eq!(range.max(), 20.0);
        assert!(range.contains(1.0));
        assert!(!range.contains(20.5));
    }
}
