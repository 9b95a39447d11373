#![forbid(unsafe_code)]

//! Minimap configuration.
//!
//! [`MinimapOptions`] is what callers write: every field optional. It can be
//! built in code or, with the `config-file` feature, loaded from TOML or
//! JSON. [`MinimapConfig::from_options`] resolves it into a fully populated
//! [`MinimapConfig`], validating each field on its own:
//!
//! | field | rule | fallback |
//! |-------|------|----------|
//! | `width`, `height` | CSS length | `150px` |
//! | `collapsed_width`, `collapsed_height` | CSS length | `29px` |
//! | `border_radius` | CSS length | `3px` |
//! | `zoom_level_offset` | clamped to `[5, 8]` | `6` |
//! | `interactions.*` | per flag | disabled |
//!
//! ```toml
//! width = "200px"
//! zoom_level_offset = 7
//! initial_minimized = true
//!
//! [interactions]
//! scroll_zoom = true
//! ```

#[cfg(feature = "config-file")]
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "config-file")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use minimap_core::ZoomOffset;

use crate::host::Interactions;
use crate::style::CssLength;

/// Raster OpenStreetMap style used when no style is configured.
pub const DEFAULT_STYLE: &str = r#"{
  "version": 8,
  "sources": {
    "openstreetmap": {
      "type": "raster",
      "tiles": ["https://tile.openstreetmap.org/{z}/{x}/{y}.png"],
      "tileSize": 256,
      "attribution": "&copy; <a href=\"http://www.openstreetmap.org/copyright\">OpenStreetMap</a>"
    }
  },
  "layers": [
    { "id": "openstreetmap", "type": "raster", "source": "openstreetmap", "minzoom": 0, "maxzoom": 22 }
  ]
}"#;

pub const DEFAULT_WIDTH: CssLength = CssLength::px(150.0);
pub const DEFAULT_HEIGHT: CssLength = CssLength::px(150.0);
pub const DEFAULT_COLLAPSED_WIDTH: CssLength = CssLength::px(29.0);
pub const DEFAULT_COLLAPSED_HEIGHT: CssLength = CssLength::px(29.0);
pub const DEFAULT_BORDER_RADIUS: CssLength = CssLength::px(3.0);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn generated_id() -> String {
    format!("minimap-{}", NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(char::is_whitespace)
}

/// Per-interaction overrides. `None` keeps the interaction disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct InteractionOptions {
    pub drag_pan: Option<bool>,
    pub scroll_zoom: Option<bool>,
    pub box_zoom: Option<bool>,
    pub drag_rotate: Option<bool>,
    pub keyboard: Option<bool>,
    pub double_click_zoom: Option<bool>,
    pub touch_zoom_rotate: Option<bool>,
}

impl InteractionOptions {
    /// Flags left enabled after applying the overrides.
    pub fn resolve(&self) -> Interactions {
        let mut flags = Interactions::empty();
        for (option, flag) in [
            (self.drag_pan, Interactions::DRAG_PAN),
            (self.scroll_zoom, Interactions::SCROLL_ZOOM),
            (self.box_zoom, Interactions::BOX_ZOOM),
            (self.drag_rotate, Interactions::DRAG_ROTATE),
            (self.keyboard, Interactions::KEYBOARD),
            (self.double_click_zoom, Interactions::DOUBLE_CLICK_ZOOM),
            (self.touch_zoom_rotate, Interactions::TOUCH_ZOOM_ROTATE),
        ] {
            flags.set(flag, option.unwrap_or(false));
        }
        flags
    }
}

/// Caller-facing options; every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct MinimapOptions {
    /// Element id of the container. Generated when absent.
    pub id: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub collapsed_width: Option<String>,
    pub collapsed_height: Option<String>,
    pub border_radius: Option<String>,
    pub zoom_level_offset: Option<i64>,
    pub interactions: InteractionOptions,
    pub initial_minimized: Option<bool>,
    /// Whether the toggle button is offered at all.
    pub minimizable: Option<bool>,
    /// Style URL or inline style JSON.
    pub style: Option<String>,
}

impl MinimapOptions {
    /// Load from a TOML string.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a file, choosing the format by extension (`.json` or TOML).
    #[cfg(feature = "config-file")]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Problems [`MinimapConfig::from_options`] would silently repair.
    ///
    /// An empty list means every provided field is used as given.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (name, value) in self.lengths() {
            if let Some(raw) = value {
                if raw.parse::<CssLength>().is_err() {
                    errors.push(format!("{name} must be a CSS length, got {raw:?}"));
                }
            }
        }

        if let Some(offset) = self.zoom_level_offset {
            let clamped = i64::from(ZoomOffset::new(offset).get());
            if clamped != offset {
                errors.push(format!(
                    "zoom_level_offset must be in [{}, {}], got {offset}",
                    ZoomOffset::MIN,
                    ZoomOffset::MAX
                ));
            }
        }

        if let Some(id) = &self.id {
            if !is_valid_id(id) {
                errors.push(format!("id must be a non-empty token, got {id:?}"));
            }
        }

        if self.initial_minimized == Some(true) && self.minimizable == Some(false) {
            errors.push("initial_minimized has no effect when minimizable is false".into());
        }

        errors
    }

    /// Strict variant of [`MinimapConfig::from_options`].
    pub fn into_config(self) -> Result<MinimapConfig, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(MinimapConfig::from_options(&self))
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn lengths(&self) -> [(&'static str, Option<&str>); 5] {
        [
            ("width", self.width.as_deref()),
            ("height", self.height.as_deref()),
            ("collapsed_width", self.collapsed_width.as_deref()),
            ("collapsed_height", self.collapsed_height.as_deref()),
            ("border_radius", self.border_radius.as_deref()),
        ]
    }
}

/// Fully resolved configuration consumed by the control.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimapConfig {
    pub id: String,
    pub width: CssLength,
    pub height: CssLength,
    pub collapsed_width: CssLength,
    pub collapsed_height: CssLength,
    pub border_radius: CssLength,
    pub zoom_offset: ZoomOffset,
    /// Interactions enabled on the secondary view.
    pub interactions: Interactions,
    pub initial_minimized: bool,
    pub minimizable: bool,
    pub style: String,
}

impl Default for MinimapConfig {
    fn default() -> Self {
        Self::from_options(&MinimapOptions::default())
    }
}

impl MinimapConfig {
    /// Resolve options, replacing each invalid field by its default.
    pub fn from_options(options: &MinimapOptions) -> Self {
        let length = |name: &'static str, raw: Option<&str>, default: CssLength| match raw {
            None => default,
            Some(raw) => raw.parse::<CssLength>().unwrap_or_else(|_| {
                warn!(field = name, value = raw, fallback = %default, "invalid CSS length");
                default
            }),
        };

        let zoom_offset = options
            .zoom_level_offset
            .map_or(ZoomOffset::DEFAULT, ZoomOffset::new);
        if let Some(requested) = options.zoom_level_offset {
            if i64::from(zoom_offset.get()) != requested {
                warn!(
                    requested,
                    clamped = zoom_offset.get(),
                    "zoom_level_offset clamped"
                );
            }
        }

        let id = match &options.id {
            Some(id) if is_valid_id(id) => id.clone(),
            Some(id) => {
                warn!(value = %id, "invalid element id; generating one");
                generated_id()
            }
            None => generated_id(),
        };

        Self {
            id,
            width: length("width", options.width.as_deref(), DEFAULT_WIDTH),
            height: length("height", options.height.as_deref(), DEFAULT_HEIGHT),
            collapsed_width: length(
                "collapsed_width",
                options.collapsed_width.as_deref(),
                DEFAULT_COLLAPSED_WIDTH,
            ),
            collapsed_height: length(
                "collapsed_height",
                options.collapsed_height.as_deref(),
                DEFAULT_COLLAPSED_HEIGHT,
            ),
            border_radius: length(
                "border_radius",
                options.border_radius.as_deref(),
                DEFAULT_BORDER_RADIUS,
            ),
            zoom_offset,
            interactions: options.interactions.resolve(),
            initial_minimized: options.initial_minimized.unwrap_or(false),
            minimizable: options.minimizable.unwrap_or(true),
            style: options
                .style
                .clone()
                .unwrap_or_else(|| DEFAULT_STYLE.to_owned()),
        }
    }

    /// Whether the control starts collapsed. Only minimizable controls can.
    #[inline]
    pub fn starts_collapsed(&self) -> bool {
        self.minimizable && self.initial_minimized
    }
}

/// Errors from loading or strictly validating options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(std::io::Error),
    #[cfg(feature = "config-file")]
    #[error("TOML parse error: {0}")]
    Toml(toml::de::Error),
    #[cfg(feature = "config-file")]
    #[error("JSON parse error: {0}")]
    Json(serde_json::Error),
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
