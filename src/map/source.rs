//! The map's route data source.
//!
//! The canvas never reads the registry directly: it draws whatever
//! FeatureCollection was last pushed into this source, the same way a
//! vector map source is fed. The source only accepts data once the map
//! canvas is attached (has a laid-out viewport).

use crate::routes::{parse_hex_color, DEFAULT_ROUTE_WIDTH};
use eframe::egui::Color32;
use geo_types::Coord;
use geojson::{FeatureCollection, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("route source is not attached to the map yet")]
    NotAttached,
}

/// A route as the map draws it, decoded from a pushed feature.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRoute {
    pub id: String,
    pub name: String,
    pub points: Vec<Coord<f64>>,
    pub color: Color32,
    pub width: f32,
}

impl RenderRoute {
    /// Returns the bounding box as (min_lon, min_lat, max_lon, max_lat).
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        self.points.iter().fold(None, |acc, c| match acc {
            None => Some((c.x, c.y, c.x, c.y)),
            Some((a, b, x, y)) => Some((a.min(c.x), b.min(c.y), x.max(c.x), y.max(c.y))),
        })
    }
}

/// GeoJSON-backed source for the route layer.
#[derive(Debug, Default)]
pub struct RouteSource {
    attached: bool,
    data: Option<FeatureCollection>,
    routes: Vec<RenderRoute>,
    /// Registry revision of the pushed data
    revision: Option<u64>,
}

impl RouteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the source as attached to a laid-out map.
    pub fn attach(&mut self) {
        if !self.attached {
            log::debug!("Route source attached");
            self.attached = true;
        }
    }

    /// Replaces the source data.
    pub fn set_data(&mut self, data: FeatureCollection, revision: u64) -> Result<(), SourceError> {
        if !self.attached {
            return Err(SourceError::NotAttached);
        }

        self.routes = data.features.iter().filter_map(decode_feature).collect();
        self.data = Some(data);
        self.revision = Some(revision);
        Ok(())
    }

    /// Last pushed FeatureCollection.
    #[allow(dead_code)] // Checked by the sync tests
    pub fn data(&self) -> Option<&FeatureCollection> {
        self.data.as_ref()
    }

    /// Routes in draw order.
    pub fn routes(&self) -> &[RenderRoute] {
        &self.routes
    }

    #[allow(dead_code)] // Used by tests
    pub fn route(&self, id: &str) -> Option<&RenderRoute> {
        self.routes.iter().find(|r| r.id == id)
    }

    /// Revision of the registry the current data was built from.
    #[allow(dead_code)] // Checked by the sync tests
    pub fn revision(&self) -> Option<u64> {
        self.revision
    }
}

/// Decodes one LineString feature using the properties written by
/// `route_to_feature`.
fn decode_feature(feature: &geojson::Feature) -> Option<RenderRoute> {
    let Some(Value::LineString(line)) = feature.geometry.as_ref().map(|g| &g.value) else {
        return None;
    };

    let props = feature.properties.as_ref()?;
    let id = props.get("id")?.as_str()?.to_string();
    let name = props
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or(&id)
        .to_string();
    let color = props
        .get("color")
        .and_then(|v| v.as_str())
        .and_then(parse_hex_color)
        .unwrap_or(Color32::from_rgb(255, 0, 0));
    let width = props
        .get("lineWidth")
        .and_then(|v| v.as_f64())
        .unwrap_or(DEFAULT_ROUTE_WIDTH) as f32;

    let points = line
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| Coord { x: p[0], y: p[1] })
        .collect();

    Some(RenderRoute {
        id,
        name,
        points,
        color,
        width,
    })
}
