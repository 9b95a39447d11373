#![forbid(unsafe_code)]

//! CSS lengths and the control container stylesheet.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::config::MinimapConfig;

/// Class toggled on the container while collapsed.
pub const MINIMIZED_CLASS: &str = "minimized";

/// Classes every container starts with.
pub const CONTAINER_CLASSES: [&str; 5] = [
    "maplibregl-ctrl",
    "maplibregl-ctrl-group",
    "mapboxgl-ctrl",
    "mapboxgl-ctrl-group",
    "custom-ctrl-minimap",
];

/// Unit of a [`CssLength`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CssUnit {
    Px,
    Percent,
    Em,
    Rem,
    Vw,
    Vh,
    Pt,
}

impl CssUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Px => "px",
            Self::Percent => "%",
            Self::Em => "em",
            Self::Rem => "rem",
            Self::Vw => "vw",
            Self::Vh => "vh",
            Self::Pt => "pt",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_lowercase().as_str() {
            "px" => Self::Px,
            "%" => Self::Percent,
            "em" => Self::Em,
            "rem" => Self::Rem,
            "vw" => Self::Vw,
            "vh" => Self::Vh,
            "pt" => Self::Pt,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported CSS length `{0}`")]
pub struct ParseCssLengthError(pub String);

/// A non-negative CSS length such as `150px` or `10%`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CssLength {
    value: f64,
    unit: CssUnit,
}

impl CssLength {
    #[inline]
    pub const fn px(value: f64) -> Self {
        Self {
            value,
            unit: CssUnit::Px,
        }
    }

    #[inline]
    pub const fn value(&self) -> f64 {
        self.value
    }

    #[inline]
    pub const fn unit(&self) -> CssUnit {
        self.unit
    }
}

impl FromStr for CssLength {
    type Err = ParseCssLengthError;

    /// Accepts `<number><unit>` with no sign; a bare `0` is `0px`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCssLengthError(s.to_owned());
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);
        if number.is_empty() {
            return Err(err());
        }
        let value: f64 = number.parse().map_err(|_| err())?;
        if !value.is_finite() {
            return Err(err());
        }
        let unit = match unit {
            "" if value == 0.0 => CssUnit::Px,
            other => CssUnit::parse(other).ok_or_else(err)?,
        };
        Ok(Self { value, unit })
    }
}

impl fmt::Display for CssLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.as_str())
    }
}

/// Stylesheet for the container element of `config`.
pub fn container_stylesheet(config: &MinimapConfig) -> String {
    format!(
        r#".custom-ctrl-minimap {{
    cursor: default !important;
    box-shadow: 0 1px 5px rgba(0, 0, 0, 0.65);
    transition: all 0.6s ease-in, border-color 0s ease-in;
    border-style: solid;
    border-radius: {radius};
    border-width: 4px;
    border-color: white;
    width: {width};
    height: {height};
}}

#{id}.{minimized} {{
    border-radius: 3px !important;
    width: {collapsed_width};
    height: {collapsed_height};
}}

@media (prefers-color-scheme: dark) {{
    div.custom-ctrl-minimap {{
        border-color: hsl(0, 0%, 15.2%);
    }}
}}
"#,
        id = config.id,
        minimized = MINIMIZED_CLASS,
        radius = config.border_radius,
        width = config.width,
        height = config.height,
        collapsed_width = config.collapsed_width,
        collapsed_height = config.collapsed_height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MinimapOptions;

    #[test]
    fn parses_supported_units() {
        let l: CssLength = "150px".parse().unwrap();
        assert_eq!(l, CssLength::px(150.0));
        let l: CssLength = " 12.5% ".parse().unwrap();
        assert_eq!(l.unit(), CssUnit::Percent);
        assert_eq!(l.value(), 12.5);
        let l: CssLength = "2REM".parse().unwrap();
        assert_eq!(l.unit(), CssUnit::Rem);
        assert_eq!("0".parse::<CssLength>().unwrap(), CssLength::px(0.0));
    }

    #[test]
    fn rejects_unsupported_lengths() {
        for bad in ["", "px", "-3px", "10", "10parsecs", "1.2.3px", "calc(1px)"] {
            assert!(bad.parse::<CssLength>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn display_drops_trailing_zero() {
        assert_eq!(CssLength::px(150.0).to_string(), "150px");
        assert_eq!("1.5em".parse::<CssLength>().unwrap().to_string(), "1.5em");
    }

    #[test]
    fn stylesheet_uses_resolved_dimensions() {
        let config = MinimapConfig::from_options(&MinimapOptions {
            id: Some("mini".into()),
            width: Some("200px".into()),
            collapsed_height: Some("bogus".into()),
            ..MinimapOptions::default()
        });
        let css = container_stylesheet(&config);
        assert!(css.contains("width: 200px;"));
        assert!(css.contains("height: 150px;"));
        assert!(css.contains("#mini.minimized"));
        assert!(css.contains("height: 29px;"));
    }
}
