#![forbid(unsafe_code)]

//! Core value types for the minimap control.
//!
//! # Role
//! `minimap-core` holds everything about the minimap that is pure math:
//! geographic coordinates and bounds, the tracking-rectangle ring, the
//! pixel-displacement translation, and the clamped zoom offset. It has no
//! knowledge of map engines, listeners, or lifecycles; `minimap-control`
//! builds those on top.

pub mod geometry;
pub mod view;
pub mod zoom;

pub use geometry::{
    LngLat, LngLatBounds, Projector, Ring, ScreenPoint, WebMercator, bounds_after_displacement,
    ring_from_bounds,
};
pub use view::{DisplayState, ViewState};
pub use zoom::{ZoomOffset, ZoomRange};
