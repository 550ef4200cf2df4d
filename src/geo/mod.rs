//! Geographic layers for the map.
//!
//! This module loads administrative boundaries (GeoJSON or shapefile),
//! reprojects Statistics Canada Lambert data to WGS84, and draws boundaries
//! and routes onto the canvas.

mod layer;
mod projection;
mod renderer;
mod reproject;

pub use layer::{BoundaryLayer, BoundaryLayerSet, GeoFeature};
pub use projection::{distance_to_segment, MapProjection, MAX_ZOOM, MIN_ZOOM};
pub use renderer::{hit_test_route, render_boundaries, render_routes};
pub use reproject::{wgs84_to_epsg3347, Crs};
