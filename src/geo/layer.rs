//! Boundary layer data structures.
//!
//! Boundary layers hold administrative polygons (and any lines or points
//! that come with them) in WGS84 lon/lat, ready to be drawn under the
//! transit routes.

use super::reproject::{detect_crs, reproject_geojson, Crs, LambertConformalConic};
use eframe::egui::Color32;
use geo_types::Coord;
use geojson::{Feature, GeoJson, Geometry, Value};
use shapefile::dbase::FieldValue;
use std::io::Cursor;
use thiserror::Error;

/// Errors raised while loading a boundary layer.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("failed to parse GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("failed to read shapefile: {0}")]
    Shapefile(#[from] shapefile::Error),
    #[error("failed to reproject: {0}")]
    Reproject(#[from] super::reproject::ReprojectError),
}

/// Property names tried, in order, when looking for a feature label.
const LABEL_FIELDS: &[&str] = &["name", "NAME", "Name", "PRNAME", "CDNAME", "CSDNAME"];

/// A geographic feature that can be rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoFeature {
    /// A series of connected line segments
    LineString(Vec<Coord<f64>>),
    /// Multiple line strings
    MultiLineString(Vec<Vec<Coord<f64>>>),
    /// A closed polygon with optional label
    Polygon {
        exterior: Vec<Coord<f64>>,
        holes: Vec<Vec<Coord<f64>>>,
        label: Option<String>,
    },
    /// Multiple polygons with optional label
    MultiPolygon {
        polygons: Vec<(Vec<Coord<f64>>, Vec<Vec<Coord<f64>>>)>,
        label: Option<String>,
    },
    /// A single point
    Point(Coord<f64>, Option<String>),
}

impl GeoFeature {
    pub fn label(&self) -> Option<&str> {
        match self {
            GeoFeature::Polygon { label, .. } | GeoFeature::MultiPolygon { label, .. } => {
                label.as_deref()
            }
            GeoFeature::Point(_, label) => label.as_deref(),
            GeoFeature::LineString(_) | GeoFeature::MultiLineString(_) => None,
        }
    }

    /// Iterates every coordinate of the feature, holes included.
    pub fn coords(&self) -> Box<dyn Iterator<Item = &Coord<f64>> + '_> {
        match self {
            GeoFeature::Point(c, _) => Box::new(std::iter::once(c)),
            GeoFeature::LineString(coords) => Box::new(coords.iter()),
            GeoFeature::MultiLineString(lines) => Box::new(lines.iter().flatten()),
            GeoFeature::Polygon {
                exterior, holes, ..
            } => Box::new(exterior.iter().chain(holes.iter().flatten())),
            GeoFeature::MultiPolygon { polygons, .. } => Box::new(
                polygons
                    .iter()
                    .flat_map(|(exterior, holes)| exterior.iter().chain(holes.iter().flatten())),
            ),
        }
    }

    fn for_each_coord_mut(&mut self, f: &mut impl FnMut(&mut Coord<f64>)) {
        match self {
            GeoFeature::Point(c, _) => f(c),
            GeoFeature::LineString(coords) => coords.iter_mut().for_each(&mut *f),
            GeoFeature::MultiLineString(lines) => lines.iter_mut().flatten().for_each(&mut *f),
            GeoFeature::Polygon {
                exterior, holes, ..
            } => exterior
                .iter_mut()
                .chain(holes.iter_mut().flatten())
                .for_each(&mut *f),
            GeoFeature::MultiPolygon { polygons, .. } => {
                for (exterior, holes) in polygons.iter_mut() {
                    exterior
                        .iter_mut()
                        .chain(holes.iter_mut().flatten())
                        .for_each(&mut *f);
                }
            }
        }
    }
}

/// A named layer of boundary features.
#[derive(Debug, Clone)]
pub struct BoundaryLayer {
    /// Display name, also the key within a [`BoundaryLayerSet`]
    pub name: String,
    /// Features in this layer
    pub features: Vec<GeoFeature>,
    /// Outline color
    pub color: Color32,
    /// Outline width in pixels
    pub line_width: f32,
    /// Whether this layer is visible
    pub visible: bool,
}

impl BoundaryLayer {
    /// Creates a new empty layer with the default boundary styling.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            features: Vec::new(),
            color: Color32::from_rgb(110, 110, 140),
            line_width: 1.2,
            visible: true,
        }
    }

    /// Loads features from GeoJSON text.
    ///
    /// The source CRS is `crs_override` when given, else the document's
    /// legacy `crs` member, else WGS84. Non-WGS84 input is reprojected.
    pub fn load_from_geojson(
        &mut self,
        geojson_str: &str,
        crs_override: Option<Crs>,
    ) -> Result<(), LayerError> {
        let geojson: GeoJson = geojson_str.parse()?;

        let source_crs = crs_override
            .or_else(|| detect_crs(&geojson))
            .unwrap_or(Crs::Wgs84);
        if source_crs != Crs::Wgs84 {
            log::info!(
                "Boundary layer '{}' is in {}, reprojecting",
                self.name,
                source_crs.label()
            );
        }
        let geojson = reproject_geojson(geojson, source_crs)?;

        match geojson {
            GeoJson::FeatureCollection(fc) => {
                self.features
                    .extend(fc.features.iter().flat_map(convert_feature));
            }
            GeoJson::Feature(f) => {
                self.features.extend(convert_feature(&f));
            }
            GeoJson::Geometry(g) => {
                self.features.extend(convert_geometry(&g, None));
            }
        }

        Ok(())
    }

    /// Loads features from a shapefile (.shp and optional .dbf bytes).
    ///
    /// Shapefiles carry no CRS inside the .shp, so the caller states it.
    pub fn load_from_shapefile(
        &mut self,
        shp_bytes: &[u8],
        dbf_bytes: Option<&[u8]>,
        crs: Crs,
    ) -> Result<(), LayerError> {
        let mut shape_reader = shapefile::ShapeReader::new(Cursor::new(shp_bytes))?;

        let dbf_records: Option<Vec<shapefile::dbase::Record>> = dbf_bytes.and_then(|bytes| {
            shapefile::dbase::Reader::new(Cursor::new(bytes))
                .ok()
                .and_then(|mut r: shapefile::dbase::Reader<Cursor<&[u8]>>| r.read().ok())
        });

        let mut loaded = Vec::new();
        for (idx, result) in shape_reader.iter_shapes().enumerate() {
            let shape: shapefile::Shape = result?;

            let label = dbf_records
                .as_ref()
                .and_then(|records| records.get(idx))
                .and_then(record_label);

            loaded.extend(convert_shape(&shape, label));
        }

        if crs == Crs::StatCanLambert {
            let projection = LambertConformalConic::epsg_3347();
            reproject_features(&mut loaded, &projection)?;
            log::info!(
                "Reprojected {} shapefile feature(s) for '{}'",
                loaded.len(),
                self.name
            );
        }

        self.features.extend(loaded);
        Ok(())
    }

    /// Bounding box over all features as (min_lon, min_lat, max_lon, max_lat).
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        self.features
            .iter()
            .flat_map(|f| f.coords())
            .fold(None, |acc, c| match acc {
                None => Some((c.x, c.y, c.x, c.y)),
                Some((min_x, min_y, max_x, max_y)) => Some((
                    min_x.min(c.x),
                    min_y.min(c.y),
                    max_x.max(c.x),
                    max_y.max(c.y),
                )),
            })
    }
}

/// Reprojects features in place from EPSG:3347 to WGS84.
pub fn reproject_features(
    features: &mut [GeoFeature],
    projection: &LambertConformalConic,
) -> Result<(), LayerError> {
    let mut failure = None;
    for feature in features.iter_mut() {
        feature.for_each_coord_mut(&mut |c| {
            if failure.is_some() {
                return;
            }
            match projection.inverse(c.x, c.y) {
                Ok((lon, lat)) => {
                    c.x = lon;
                    c.y = lat;
                }
                Err(e) => failure = Some(e),
            }
        });
    }

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn record_label(record: &shapefile::dbase::Record) -> Option<String> {
    LABEL_FIELDS.iter().find_map(|field| match record.get(*field) {
        Some(FieldValue::Character(Some(s))) => Some(s.trim().to_string()),
        _ => None,
    })
}

fn convert_shape(shape: &shapefile::Shape, label: Option<String>) -> Option<GeoFeature> {
    let to_coords = |points: &[shapefile::Point]| -> Vec<Coord<f64>> {
        points.iter().map(|p| Coord { x: p.x, y: p.y }).collect()
    };

    match shape {
        shapefile::Shape::Point(p) => Some(GeoFeature::Point(Coord { x: p.x, y: p.y }, label)),
        shapefile::Shape::Polyline(pl) => {
            let parts = pl.parts();
            if parts.len() == 1 {
                Some(GeoFeature::LineString(to_coords(&parts[0])))
            } else {
                Some(GeoFeature::MultiLineString(
                    parts.iter().map(|part| to_coords(part)).collect(),
                ))
            }
        }
        shapefile::Shape::Polygon(poly) => {
            use shapefile::PolygonRing;

            // Holes attach to the most recent outer ring; shapefiles list
            // each outer ring followed by its inner rings.
            let mut polygons: Vec<(Vec<Coord<f64>>, Vec<Vec<Coord<f64>>>)> = Vec::new();
            for ring in poly.rings() {
                let coords = to_coords(ring.points());
                match ring {
                    PolygonRing::Outer(_) => polygons.push((coords, Vec::new())),
                    PolygonRing::Inner(_) => {
                        if let Some((_, holes)) = polygons.last_mut() {
                            holes.push(coords);
                        }
                    }
                }
            }

            match polygons.len() {
                0 => None,
                1 => {
                    let (exterior, holes) = polygons.remove(0);
                    Some(GeoFeature::Polygon {
                        exterior,
                        holes,
                        label,
                    })
                }
                _ => Some(GeoFeature::MultiPolygon { polygons, label }),
            }
        }
        _ => None,
    }
}

fn convert_feature(feature: &Feature) -> Vec<GeoFeature> {
    let label = feature.properties.as_ref().and_then(|p| {
        LABEL_FIELDS
            .iter()
            .find_map(|key| p.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
    });

    match &feature.geometry {
        Some(g) => convert_geometry(g, label),
        None => Vec::new(),
    }
}

fn position_to_coord(p: &[f64]) -> Coord<f64> {
    Coord { x: p[0], y: p[1] }
}

fn ring_to_coords(ring: &[Vec<f64>]) -> Vec<Coord<f64>> {
    ring.iter()
        .filter(|p| p.len() >= 2)
        .map(|p| position_to_coord(p))
        .collect()
}

fn rings_to_polygon(rings: &[Vec<Vec<f64>>]) -> Option<(Vec<Coord<f64>>, Vec<Vec<Coord<f64>>>)> {
    let (exterior, holes) = rings.split_first()?;
    Some((
        ring_to_coords(exterior),
        holes.iter().map(|r| ring_to_coords(r)).collect(),
    ))
}

/// Converts a geometry into renderable features. Multi-point geometries and
/// collections expand into one feature per member, each carrying `label`.
fn convert_geometry(geometry: &Geometry, label: Option<String>) -> Vec<GeoFeature> {
    match &geometry.value {
        Value::Point(p) if p.len() >= 2 => vec![GeoFeature::Point(position_to_coord(p), label)],
        Value::Point(_) => Vec::new(),
        Value::MultiPoint(points) => points
            .iter()
            .filter(|p| p.len() >= 2)
            .map(|p| GeoFeature::Point(position_to_coord(p), label.clone()))
            .collect(),
        Value::LineString(coords) => vec![GeoFeature::LineString(ring_to_coords(coords))],
        Value::MultiLineString(lines) => vec![GeoFeature::MultiLineString(
            lines.iter().map(|l| ring_to_coords(l)).collect(),
        )],
        Value::Polygon(rings) => rings_to_polygon(rings)
            .map(|(exterior, holes)| GeoFeature::Polygon {
                exterior,
                holes,
                label,
            })
            .into_iter()
            .collect(),
        Value::MultiPolygon(polygons) => vec![GeoFeature::MultiPolygon {
            polygons: polygons
                .iter()
                .filter_map(|rings| rings_to_polygon(rings))
                .collect(),
            label,
        }],
        Value::GeometryCollection(geometries) => geometries
            .iter()
            .flat_map(|g| convert_geometry(g, label.clone()))
            .collect(),
    }
}

/// Collection of boundary layers, drawn in insertion order.
#[derive(Debug, Clone, Default)]
pub struct BoundaryLayerSet {
    layers: Vec<BoundaryLayer>,
}

impl BoundaryLayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundaryLayer> {
        self.layers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BoundaryLayer> {
        self.layers.iter_mut()
    }

    pub fn get(&self, name: &str) -> Option<&BoundaryLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.layers.iter().map(|l| l.features.len()).sum()
    }

    /// Adds a layer, replacing any existing layer with the same name.
    pub fn set_layer(&mut self, layer: BoundaryLayer) {
        match self.layers.iter_mut().find(|l| l.name == layer.name) {
            Some(existing) => {
                // Keep the user's visibility choice across reloads
                let visible = existing.visible;
                *existing = layer;
                existing.visible = visible;
            }
            None => self.layers.push(layer),
        }
    }

    /// Parses GeoJSON into a named layer and stores it.
    pub fn load_geojson_layer(
        &mut self,
        name: &str,
        geojson_str: &str,
        crs_override: Option<Crs>,
    ) -> Result<usize, LayerError> {
        let mut layer = BoundaryLayer::new(name);
        layer.load_from_geojson(geojson_str, crs_override)?;
        let count = layer.features.len();
        self.set_layer(layer);
        Ok(count)
    }

    /// Parses shapefile bytes into a named layer and stores it.
    pub fn load_shapefile_layer(
        &mut self,
        name: &str,
        shp_bytes: &[u8],
        dbf_bytes: Option<&[u8]>,
        crs: Crs,
    ) -> Result<usize, LayerError> {
        let mut layer = BoundaryLayer::new(name);
        layer.load_from_shapefile(shp_bytes, dbf_bytes, crs)?;
        let count = layer.features.len();
        self.set_layer(layer);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WGS84_BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"PRNAME": "Ontario"},
             "geometry": {"type": "Polygon", "coordinates": [
                [[-80.0, 43.0], [-74.0, 43.0], [-74.0, 46.0], [-80.0, 46.0], [-80.0, 43.0]],
                [[-78.0, 44.0], [-77.0, 44.0], [-77.0, 45.0], [-78.0, 44.0]]
             ]}},
            {"type": "Feature", "properties": {"name": "Islands"},
             "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[-64.0, 46.0], [-63.0, 46.0], [-63.0, 47.0], [-64.0, 46.0]]],
                [[[-62.0, 46.0], [-61.0, 46.0], [-61.0, 47.0], [-62.0, 46.0]]]
             ]}},
            {"type": "Feature", "properties": {}, "geometry": null}
        ]
    }"#;

    #[test]
    fn test_load_geojson_polygons() {
        let mut layer = BoundaryLayer::new("provinces");
        layer.load_from_geojson(WGS84_BOUNDARIES, None).unwrap();

        assert_eq!(layer.features.len(), 2);
        match &layer.features[0] {
            GeoFeature::Polygon {
                exterior,
                holes,
                label,
            } => {
                assert_eq!(exterior.len(), 5);
                assert_eq!(holes.len(), 1);
                assert_eq!(label.as_deref(), Some("Ontario"));
            }
            other => panic!("unexpected feature {:?}", other),
        }
        assert!(matches!(
            &layer.features[1],
            GeoFeature::MultiPolygon { polygons, .. } if polygons.len() == 2
        ));
        assert_eq!(layer.bounds(), Some((-80.0, 43.0, -61.0, 47.0)));
    }

    #[test]
    fn test_multi_geometries_keep_every_member() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"name": "Stops"},
                 "geometry": {"type": "MultiPoint", "coordinates": [
                    [-75.70, 45.42], [-75.69, 45.43], [-75.68, 45.44]
                 ]}},
                {"type": "Feature", "properties": {"name": "Mixed"},
                 "geometry": {"type": "GeometryCollection", "geometries": [
                    {"type": "Point", "coordinates": [-75.60, 45.40]},
                    {"type": "LineString", "coordinates": [[-75.6, 45.4], [-75.5, 45.5]]}
                 ]}}
            ]
        }"#;
        let mut layer = BoundaryLayer::new("mixed");
        layer.load_from_geojson(text, None).unwrap();

        assert_eq!(layer.features.len(), 5);
        let stops: Vec<_> = layer.features[..3]
            .iter()
            .map(|f| match f {
                GeoFeature::Point(coord, label) => (coord.x, label.as_deref()),
                other => panic!("unexpected feature {:?}", other),
            })
            .collect();
        assert_eq!(
            stops,
            vec![
                (-75.70, Some("Stops")),
                (-75.69, Some("Stops")),
                (-75.68, Some("Stops"))
            ]
        );
        assert!(matches!(
            &layer.features[3],
            GeoFeature::Point(_, Some(label)) if label == "Mixed"
        ));
        assert!(matches!(&layer.features[4], GeoFeature::LineString(c) if c.len() == 2));
    }

    #[test]
    fn test_load_geojson_reprojects_declared_crs() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:3347"}},
            "features": [{"type": "Feature", "properties": {"CSDNAME": "Ottawa"},
                "geometry": {"type": "Point", "coordinates": [7471241.7885, 1190644.0096]}}]
        }"#;
        let mut layer = BoundaryLayer::new("csd");
        layer.load_from_geojson(text, None).unwrap();

        let GeoFeature::Point(coord, label) = &layer.features[0] else {
            panic!("expected a point");
        };
        assert!((coord.x + 75.6972).abs() < 1e-6);
        assert!((coord.y - 45.4215).abs() < 1e-6);
        assert_eq!(label.as_deref(), Some("Ottawa"));
    }

    #[test]
    fn test_crs_override_wins() {
        let text = r#"{"type": "Point", "coordinates": [6200000.0, 3000000.0]}"#;
        let mut layer = BoundaryLayer::new("origin");
        layer
            .load_from_geojson(text, Some(Crs::StatCanLambert))
            .unwrap();
        let GeoFeature::Point(coord, _) = &layer.features[0] else {
            panic!("expected a point");
        };
        assert!((coord.x + 91.866_666_666_666_67).abs() < 1e-9);
        assert!((coord.y - 63.390_675).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_geojson() {
        let mut layer = BoundaryLayer::new("bad");
        assert!(matches!(
            layer.load_from_geojson("{\"type\": \"Nope\"}", None),
            Err(LayerError::GeoJson(_))
        ));
    }

    #[test]
    fn test_reproject_features() {
        let mut features = vec![GeoFeature::LineString(vec![
            Coord {
                x: 6_200_000.0,
                y: 3_000_000.0,
            },
            Coord {
                x: 7_471_241.7885,
                y: 1_190_644.0096,
            },
        ])];
        reproject_features(&mut features, &LambertConformalConic::epsg_3347()).unwrap();
        let GeoFeature::LineString(coords) = &features[0] else {
            panic!("expected a line");
        };
        assert!((coords[1].x + 75.6972).abs() < 1e-6);

        let mut bad = vec![GeoFeature::Point(Coord { x: f64::NAN, y: 0.0 }, None)];
        assert!(reproject_features(&mut bad, &LambertConformalConic::epsg_3347()).is_err());
    }

    #[test]
    fn test_layer_set_replaces_by_name_and_keeps_visibility() {
        let mut set = BoundaryLayerSet::new();
        set.load_geojson_layer("provinces", WGS84_BOUNDARIES, None)
            .unwrap();
        set.iter_mut().for_each(|l| l.visible = false);

        let count = set
            .load_geojson_layer("provinces", WGS84_BOUNDARIES, None)
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(set.len(), 1);
        assert!(!set.get("provinces").unwrap().visible);
        assert_eq!(set.feature_count(), 2);
    }

    #[test]
    fn test_bundled_boundaries_land_in_ottawa() {
        let mut layer = BoundaryLayer::new("boundaries");
        layer
            .load_from_geojson(include_str!("../../data/boundaries.geojson"), None)
            .unwrap();

        assert_eq!(layer.features.len(), 3);
        assert_eq!(layer.features[0].label(), Some("Centre-ville / Downtown"));

        let (min_lon, min_lat, max_lon, max_lat) = layer.bounds().unwrap();
        assert!((min_lon - -75.715).abs() < 1e-4, "{}", min_lon);
        assert!((max_lon - -75.645).abs() < 1e-4, "{}", max_lon);
        assert!((min_lat - 45.390).abs() < 1e-4, "{}", min_lat);
        assert!((max_lat - 45.445).abs() < 1e-4, "{}", max_lat);
    }
}
