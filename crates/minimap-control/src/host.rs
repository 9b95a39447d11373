#![forbid(unsafe_code)]

//! Interface the minimap expects from the host map engine.
//!
//! # Design
//!
//! Map views are shared handles: the host application and the control both
//! hold an `Rc` to the same view and every method takes `&self`. The control
//! never assumes exclusive ownership; it only calls the methods below during
//! attach, update, and detach.
//!
//! Subscriptions are explicit. [`MapView::on`] returns a [`HandlerId`] and
//! [`MapView::off`] reverses it. The control pairs every `on` with a
//! recorded `off` at the call site (see [`crate::registry`]); nothing wraps or
//! intercepts the engine's methods.
//!
//! Engines may fire events synchronously from inside a setter. Handlers
//! installed by the control never hold a borrow of control state across a
//! call into a view, so such re-entry is safe.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use minimap_core::{LngLat, LngLatBounds, Projector, Ring, ZoomRange};

use crate::error::{HostError, MinimapError};

/// Event type names used by the control.
pub mod events {
    pub const LOAD: &str = "load";
    pub const MOVE: &str = "move";
    pub const MOVE_END: &str = "moveend";
    pub const MOUSE_DOWN: &str = "mousedown";
    pub const MOUSE_MOVE: &str = "mousemove";
    pub const MOUSE_UP: &str = "mouseup";
}

/// Engine-assigned identifier of an installed handler.
pub type HandlerId = u64;

/// Callback invoked by the engine for a matching event.
pub type Handler = Rc<dyn Fn(&MapEvent)>;

/// An event type, optionally scoped to one layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventDescriptor {
    event_type: String,
    layer: Option<String>,
}

impl EventDescriptor {
    /// Descriptor for a map-wide event.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            layer: None,
        }
    }

    /// Descriptor for an event delivered only for features of `layer`.
    pub fn on_layer(event_type: impl Into<String>, layer: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            layer: Some(layer.into()),
        }
    }

    #[inline]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    #[inline]
    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    /// Reject empty event types and empty layer ids.
    pub fn validate(&self) -> Result<(), MinimapError> {
        if self.event_type.trim().is_empty() {
            return Err(MinimapError::InvalidArgument("event type is empty"));
        }
        if self.layer.as_deref().is_some_and(|l| l.trim().is_empty()) {
            return Err(MinimapError::InvalidArgument("layer id is empty"));
        }
        Ok(())
    }

    /// Whether an event of `event_type` on `layer` should reach this descriptor.
    pub fn matches(&self, event_type: &str, layer: Option<&str>) -> bool {
        self.event_type == event_type && (self.layer.is_none() || self.layer.as_deref() == layer)
    }
}

impl fmt::Display for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.layer {
            Some(layer) => write!(f, "{}@{}", self.event_type, layer),
            None => f.write_str(&self.event_type),
        }
    }
}

/// An event delivered by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEvent {
    pub event_type: String,
    /// Layer whose feature was hit, for pointer events.
    pub layer: Option<String>,
    /// Pointer position in the view's pixel space, for pointer events.
    pub point: Option<minimap_core::ScreenPoint>,
}

impl MapEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            layer: None,
            point: None,
        }
    }

    #[must_use]
    pub fn at(mut self, point: minimap_core::ScreenPoint) -> Self {
        self.point = Some(point);
        self
    }

    #[must_use]
    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }
}

bitflags! {
    /// User interactions a view can enable or disable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Interactions: u8 {
        const DRAG_PAN          = 0b0000_0001;
        const SCROLL_ZOOM       = 0b0000_0010;
        const BOX_ZOOM          = 0b0000_0100;
        const DRAG_ROTATE       = 0b0000_1000;
        const KEYBOARD          = 0b0001_0000;
        const DOUBLE_CLICK_ZOOM = 0b0010_0000;
        const TOUCH_ZOOM_ROTATE = 0b0100_0000;
    }
}

/// Corner of the parent map a control is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config-file", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(rename_all = "kebab-case"))]
pub enum ControlPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl ControlPosition {
    pub const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for ControlPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A map view exposed by the host engine.
pub trait MapView {
    fn center(&self) -> LngLat;
    fn set_center(&self, center: LngLat);

    fn zoom(&self) -> f64;
    fn set_zoom(&self, zoom: f64);

    /// Zoom domain the engine accepts for this view.
    fn zoom_range(&self) -> ZoomRange;

    /// Currently visible geographic bounds.
    fn bounds(&self) -> LngLatBounds;

    /// Move the view so it shows `bounds`, keeping the zoom where possible.
    fn pan_to_bounds(&self, bounds: LngLatBounds);

    /// Projector for the view as it is right now.
    fn projector(&self) -> Box<dyn Projector>;

    /// Install `handler` for events matching `descriptor`.
    fn on(&self, descriptor: &EventDescriptor, handler: Handler) -> HandlerId;

    /// Remove a handler previously returned by [`MapView::on`].
    fn off(&self, descriptor: &EventDescriptor, id: HandlerId) -> Result<(), HostError>;

    /// Whether the view's one-shot `load` signal has fired.
    fn is_loaded(&self) -> bool;

    fn set_interaction(&self, interaction: Interactions, enabled: bool);

    /// Create or replace a polygon overlay layer.
    fn set_polygon(&self, layer_id: &str, ring: &Ring);

    /// Corner the host placed the element with `element_id` in, if any.
    fn control_position(&self, element_id: &str) -> Option<ControlPosition>;

    /// Destroy the view. Later calls to [`MapView::off`] fail with [`HostError::Removed`].
    fn remove(&self);
}

/// Construction parameters for the secondary view.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryViewOptions {
    /// Id of the element the view renders into.
    pub container_id: String,
    /// Style URL or inline style document.
    pub style: String,
    pub center: LngLat,
    /// Interactions left enabled; everything else starts disabled.
    pub interactions: Interactions,
    pub attribution: bool,
}

/// Factory for secondary views.
pub trait MapEngine {
    fn create_view(&self, options: &SecondaryViewOptions) -> Rc<dyn MapView>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_rejects_empty_parts() {
        assert!(EventDescriptor::new("move").validate().is_ok());
        assert_eq!(
            EventDescriptor::new("  ").validate(),
            Err(MinimapError::InvalidArgument("event type is empty"))
        );
        assert_eq!(
            EventDescriptor::on_layer("mousedown", "").validate(),
            Err(MinimapError::InvalidArgument("layer id is empty"))
        );
    }

    #[test]
    fn layer_scoped_descriptor_only_matches_its_layer() {
        let d = EventDescriptor::on_layer("mousedown", "rect");
        assert!(d.matches("mousedown", Some("rect")));
        assert!(!d.matches("mousedown", None));
        assert!(!d.matches("mousedown", Some("other")));

        let any = EventDescriptor::new("mousedown");
        assert!(any.matches("mousedown", Some("rect")));
        assert!(any.matches("mousedown", None));
    }

    #[test]
    fn descriptor_display() {
        assert_eq!(EventDescriptor::new("move").to_string(), "move");
        assert_eq!(
            EventDescriptor::on_layer("mousedown", "rect").to_string(),
            "mousedown@rect"
        );
    }

    #[test]
    fn positions_render_kebab_case() {
        let names: Vec<_> = ControlPosition::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(
            names,
            ["top-left", "top-right", "bottom-left", "bottom-right"]
        );
        assert_eq!(ControlPosition::default(), ControlPosition::BottomRight);
    }
}
