#![forbid(unsafe_code)]

//! View and display state.

use crate::geometry::LngLat;
use crate::zoom::{ZoomOffset, ZoomRange};

/// Center and zoom of one map view.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewState {
    pub center: LngLat,
    pub zoom: f64,
}

impl ViewState {
    #[inline]
    pub const fn new(center: LngLat, zoom: f64) -> Self {
        Self { center, zoom }
    }

    /// The secondary view state derived from this parent state.
    ///
    /// Pure: the same parent state always yields the same secondary state.
    #[must_use]
    pub fn derive_secondary(&self, offset: ZoomOffset, range: ZoomRange) -> Self {
        Self::new(self.center, offset.secondary_zoom(self.zoom, range))
    }
}

/// Whether the minimap is shown at full size or collapsed to its button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DisplayState {
    #[default]
    Expanded,
    Collapsed,
}

impl DisplayState {
    /// The opposite state.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Expanded => Self::Collapsed,
            Self::Collapsed => Self::Expanded,
        }
    }

    #[inline]
    pub const fn is_collapsed(self) -> bool {
        matches!(self, Self::Collapsed)
    }
}
