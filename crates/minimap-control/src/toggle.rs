#![forbid(unsafe_code)]

//! The collapse/expand button.
//!
//! The button sits in the corner of the minimap that faces the map's
//! interior, and its arrow is rotated to point away from the anchored
//! corner. Clicks are routed by the host to [`crate::MinimapControl::toggle`].

use crate::host::ControlPosition;
use crate::style::MINIMIZED_CLASS;

/// Arrow icon shared by every button.
pub const ICON_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path d="M17.6 18L8 8.4V17H6V5h12v2H9.4l9.6 9.6l-1.4 1.4Z" /></svg>"#;

/// A toggle button anchored to one control corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleButton {
    id: String,
    position: ControlPosition,
}

impl ToggleButton {
    /// Button for the container with `container_id`, anchored at `position`.
    pub fn new(container_id: &str, position: ControlPosition) -> Self {
        Self {
            id: format!("{container_id}-toggle"),
            position,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn position(&self) -> ControlPosition {
        self.position
    }

    /// Class selecting the per-corner placement rule.
    pub fn class_name(&self) -> String {
        format!("minimap-toggle-display-{}", self.position.as_str())
    }

    /// `(rotation in degrees, horizontal edge, vertical edge)` for the corner.
    fn placement(&self) -> (i32, &'static str, &'static str) {
        match self.position {
            ControlPosition::BottomRight => (-180, "left", "top"),
            ControlPosition::BottomLeft => (-90, "right", "top"),
            ControlPosition::TopLeft => (0, "right", "bottom"),
            ControlPosition::TopRight => (90, "left", "bottom"),
        }
    }

    /// Stylesheet scoped to this button's id.
    pub fn stylesheet(&self) -> String {
        let (rotate, x_edge, y_edge) = self.placement();
        format!(
            r#"button#{id} {{
    border-radius: 0 !important;
    color: black;
    background-color: white;
    border: none;
    display: flex;
    cursor: pointer;
    transition: all 0.2s ease-in;
    position: absolute;
    width: 24px;
    height: 24px;
    border-start-end-radius: 0.2rem !important;
    z-index: 2;
}}

button#{id}:hover {{
    background-color: #e5e7e3 !important;
}}

button#{id}.{class} {{
    rotate: {rotate}deg;
    {x_edge}: 0;
    {y_edge}: 0;
}}

.{minimized} > button#{id} {{
    height: 21px;
    width: 21px;
}}

button#{id} svg {{
    transition: transform 0.5s ease-in;
    fill: black;
}}

.{minimized} > button#{id} > svg {{
    transform: rotate(-180deg);
}}

@media (prefers-color-scheme: dark) {{
    button#{id} {{
        background-color: hsl(0, 0%, 15.2%);
        color: white;
    }}
    button#{id}:hover {{
        background-color: #2c2c2be7 !important;
    }}
    button#{id} > svg {{
        fill: white;
    }}
}}
"#,
            id = self.id,
            class = self.class_name(),
            minimized = MINIMIZED_CLASS,
        )
    }
}
