//! Route record types.
//!
//! A route is a named polyline in WGS84 lon/lat with optional stroke
//! styling. The serialized form uses camelCase keys so it matches the
//! JSON served by route endpoints (`lineWidth`).

use eframe::egui::Color32;
use serde::{Deserialize, Serialize};

/// Stroke color used when a route has no color of its own.
pub const DEFAULT_ROUTE_COLOR: &str = "#FF0000";

/// Stroke width (pixels) used when a route has no width of its own.
pub const DEFAULT_ROUTE_WIDTH: f64 = 4.0;

/// A single transit route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Unique identifier within the registry
    pub id: String,
    /// Display name
    pub name: String,
    /// Ordered `[lon, lat]` pairs
    pub coordinates: Vec<[f64; 2]>,
    /// Stroke color as a CSS hex string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Stroke width in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_width: Option<f64>,
    /// Free-form attributes carried through to the map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Route {
    /// Creates an unstyled route.
    pub fn new(id: impl Into<String>, name: impl Into<String>, coordinates: Vec<[f64; 2]>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinates,
            color: None,
            line_width: None,
            metadata: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = Some(width);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Color string with the default applied.
    pub fn effective_color(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_ROUTE_COLOR)
    }

    /// Stroke width with the default applied.
    pub fn effective_line_width(&self) -> f64 {
        self.line_width.unwrap_or(DEFAULT_ROUTE_WIDTH)
    }

    /// Color for painting. Falls back to the default red when the stored
    /// string cannot be parsed.
    pub fn stroke_color(&self) -> Color32 {
        parse_hex_color(self.effective_color()).unwrap_or(Color32::from_rgb(255, 0, 0))
    }

    /// Returns the bounding box as (min_lon, min_lat, max_lon, max_lat).
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        bounds_of(self.coordinates.iter())
    }
}

/// Partial update applied by [`RouteRegistry::update_route`].
///
/// Fields left as `None` keep their current value. The route id is never
/// part of a patch.
///
/// [`RouteRegistry::update_route`]: super::RouteRegistry::update_route
#[derive(Debug, Clone, Default)]
pub struct RoutePatch {
    pub name: Option<String>,
    pub coordinates: Option<Vec<[f64; 2]>>,
    pub color: Option<String>,
    pub line_width: Option<f64>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl RoutePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.coordinates.is_none()
            && self.color.is_none()
            && self.line_width.is_none()
            && self.metadata.is_none()
    }

    /// Produces the patched copy of `route`, keeping its id.
    pub(crate) fn apply_to(&self, route: &Route) -> Route {
        Route {
            id: route.id.clone(),
            name: self.name.clone().unwrap_or_else(|| route.name.clone()),
            coordinates: self
                .coordinates
                .clone()
                .unwrap_or_else(|| route.coordinates.clone()),
            color: self.color.clone().or_else(|| route.color.clone()),
            line_width: self.line_width.or(route.line_width),
            metadata: self.metadata.clone().or_else(|| route.metadata.clone()),
        }
    }
}

/// Computes (min_lon, min_lat, max_lon, max_lat) over a set of points.
pub fn bounds_of<'a>(points: impl Iterator<Item = &'a [f64; 2]>) -> Option<(f64, f64, f64, f64)> {
    points.fold(None, |acc, [lon, lat]| match acc {
        None => Some((*lon, *lat, *lon, *lat)),
        Some((min_lon, min_lat, max_lon, max_lat)) => Some((
            min_lon.min(*lon),
            min_lat.min(*lat),
            max_lon.max(*lon),
            max_lat.max(*lat),
        )),
    })
}

/// Parses `#RGB`, `#RRGGBB` or `#RRGGBBAA`.
pub fn parse_hex_color(s: &str) -> Option<Color32> {
    let hex = s.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 16 + v;
            }
            Some(Color32::from_rgb(rgb[0], rgb[1], rgb[2]))
        }
        6 => Some(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?)),
        8 => Some(Color32::from_rgba_unmultiplied(
            channel(0)?,
            channel(2)?,
            channel(4)?,
            channel(6)?,
        )),
        _ => None,
    }
}

/// Formats a color as `#RRGGBB`, dropping alpha.
pub fn format_hex_color(color: Color32) -> String {
    format!("#{:02X}{:02X}{:02X}", color.r(), color.g(), color.b())
}
