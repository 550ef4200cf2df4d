//! Coordinate reprojection between Statistics Canada Lambert (EPSG:3347)
//! and WGS84 (EPSG:4326).
//!
//! Boundary files published by Statistics Canada use the NAD83 / Canada
//! Lambert projection. The map works in lon/lat, so those files are
//! converted on ingest.
//!
//! The projection is Lambert Conformal Conic with two standard parallels on
//! the GRS80 ellipsoid (EPSG method 9802). NAD83 and WGS84 are treated as
//! coincident, which is well inside display precision.

use geojson::{GeoJson, Geometry, Value};
use thiserror::Error;

/// Errors raised while reprojecting coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReprojectError {
    #[error("coordinate is not finite: ({0}, {1})")]
    NonFinite(f64, f64),
    #[error("coordinate ({x}, {y}) falls outside the projection domain")]
    OutOfDomain { x: f64, y: f64 },
    #[error("position has fewer than two ordinates")]
    ShortPosition,
}

/// Coordinate reference systems the viewer knows how to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// EPSG:4326 / OGC CRS84 lon/lat
    Wgs84,
    /// EPSG:3347, NAD83 / Statistics Canada Lambert
    StatCanLambert,
}

impl Crs {
    /// Parses `EPSG:<code>`, an OGC URN or an OGC CRS URL.
    pub fn from_name(name: &str) -> Option<Self> {
        const EPSG_PREFIXES: &[&str] = &[
            "EPSG:",
            "URN:OGC:DEF:CRS:EPSG::",
            "HTTP://WWW.OPENGIS.NET/DEF/CRS/EPSG/0/",
        ];

        let upper = name.trim().to_ascii_uppercase();
        if matches!(
            upper.as_str(),
            "URN:OGC:DEF:CRS:OGC:1.3:CRS84"
                | "OGC:CRS84"
                | "HTTP://WWW.OPENGIS.NET/DEF/CRS/OGC/1.3/CRS84"
        ) {
            return Some(Crs::Wgs84);
        }

        let code = EPSG_PREFIXES
            .iter()
            .find_map(|prefix| upper.strip_prefix(prefix))?;
        match code {
            "4326" => Some(Crs::Wgs84),
            "3347" => Some(Crs::StatCanLambert),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Crs::Wgs84 => "EPSG:4326",
            Crs::StatCanLambert => "EPSG:3347",
        }
    }
}

/// Defining parameters of a Lambert Conformal Conic (2SP) projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LccParams {
    /// Semi-major axis, in the projection's linear unit
    pub semi_major: f64,
    pub inverse_flattening: f64,
    /// Latitude of false origin (degrees)
    pub lat_origin: f64,
    /// Longitude of false origin (degrees)
    pub lon_origin: f64,
    /// First standard parallel (degrees)
    pub lat_1: f64,
    /// Second standard parallel (degrees)
    pub lat_2: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

/// NAD83 / Statistics Canada Lambert.
pub const EPSG_3347: LccParams = LccParams {
    semi_major: 6_378_137.0,
    inverse_flattening: 298.257_222_101,
    lat_origin: 63.390_675,
    lon_origin: -91.866_666_666_666_67,
    lat_1: 49.0,
    lat_2: 77.0,
    false_easting: 6_200_000.0,
    false_northing: 3_000_000.0,
};

/// A Lambert Conformal Conic projection with its derived constants.
#[derive(Debug, Clone, Copy)]
pub struct LambertConformalConic {
    params: LccParams,
    e: f64,
    n: f64,
    f: f64,
    r0: f64,
    lon0: f64,
}

impl LambertConformalConic {
    const MAX_ITERATIONS: usize = 15;
    const TOLERANCE: f64 = 1e-12;

    pub fn new(params: LccParams) -> Self {
        let flattening = 1.0 / params.inverse_flattening;
        let e = (2.0 * flattening - flattening * flattening).sqrt();

        let phi0 = params.lat_origin.to_radians();
        let phi1 = params.lat_1.to_radians();
        let phi2 = params.lat_2.to_radians();

        let m1 = m(phi1, e);
        let m2 = m(phi2, e);
        let t0 = t(phi0, e);
        let t1 = t(phi1, e);
        let t2 = t(phi2, e);

        let n = if (phi1 - phi2).abs() < f64::EPSILON {
            phi1.sin()
        } else {
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        let f = m1 / (n * t1.powf(n));
        let r0 = params.semi_major * f * t0.powf(n);

        Self {
            params,
            e,
            n,
            f,
            r0,
            lon0: params.lon_origin.to_radians(),
        }
    }

    /// Statistics Canada Lambert (EPSG:3347).
    pub fn epsg_3347() -> Self {
        Self::new(EPSG_3347)
    }

    /// Projects lon/lat degrees to (easting, northing).
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ReprojectError> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(ReprojectError::NonFinite(lon, lat));
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ReprojectError::OutOfDomain { x: lon, y: lat });
        }

        let r = self.params.semi_major * self.f * t(lat.to_radians(), self.e).powf(self.n);
        let theta = self.n * (lon.to_radians() - self.lon0);

        Ok((
            self.params.false_easting + r * theta.sin(),
            self.params.false_northing + self.r0 - r * theta.cos(),
        ))
    }

    /// Converts (easting, northing) back to lon/lat degrees.
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ReprojectError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ReprojectError::NonFinite(x, y));
        }

        let dx = x - self.params.false_easting;
        let dy = self.r0 - (y - self.params.false_northing);
        let r = (dx * dx + dy * dy).sqrt().copysign(self.n);
        let t_prime = (r / (self.params.semi_major * self.f)).powf(1.0 / self.n);

        let theta = if self.n > 0.0 {
            dx.atan2(dy)
        } else {
            (-dx).atan2(-dy)
        };

        let half_e = self.e / 2.0;
        let mut phi = std::f64::consts::FRAC_PI_2 - 2.0 * t_prime.atan();
        for _ in 0..Self::MAX_ITERATIONS {
            let es = self.e * phi.sin();
            let next = std::f64::consts::FRAC_PI_2
                - 2.0 * (t_prime * ((1.0 - es) / (1.0 + es)).powf(half_e)).atan();
            let delta = (next - phi).abs();
            phi = next;
            if delta < Self::TOLERANCE {
                break;
            }
        }

        let lon = (theta / self.n + self.lon0).to_degrees();
        let lat = phi.to_degrees();

        if !lon.is_finite() || !lat.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(ReprojectError::OutOfDomain { x, y });
        }

        Ok((lon, lat))
    }
}

fn m(phi: f64, e: f64) -> f64 {
    phi.cos() / (1.0 - e * e * phi.sin().powi(2)).sqrt()
}

fn t(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (std::f64::consts::FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// Converts an EPSG:3347 (x, y) pair to WGS84 (lon, lat).
#[allow(dead_code)] // Point counterpart of reproject_geojson
pub fn epsg3347_to_wgs84(x: f64, y: f64) -> Result<(f64, f64), ReprojectError> {
    LambertConformalConic::epsg_3347().inverse(x, y)
}

/// Converts a WGS84 (lon, lat) pair to EPSG:3347 (x, y).
pub fn wgs84_to_epsg3347(lon: f64, lat: f64) -> Result<(f64, f64), ReprojectError> {
    LambertConformalConic::epsg_3347().forward(lon, lat)
}

/// Reads the legacy `crs` member of a GeoJSON document, if any.
///
/// ```json
/// "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::3347" } }
/// ```
pub fn detect_crs(geojson: &GeoJson) -> Option<Crs> {
    let foreign = match geojson {
        GeoJson::FeatureCollection(fc) => fc.foreign_members.as_ref(),
        GeoJson::Feature(f) => f.foreign_members.as_ref(),
        GeoJson::Geometry(g) => g.foreign_members.as_ref(),
    }?;

    foreign
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .and_then(Crs::from_name)
}

/// Rewrites every geometry of `geojson` from `from` into WGS84.
///
/// The legacy `crs` member is removed from the result since the output is
/// plain RFC 7946 GeoJSON.
pub fn reproject_geojson(geojson: GeoJson, from: Crs) -> Result<GeoJson, ReprojectError> {
    if from == Crs::Wgs84 {
        return Ok(geojson);
    }

    let projection = LambertConformalConic::epsg_3347();

    match geojson {
        GeoJson::FeatureCollection(mut fc) => {
            let mut count = 0usize;
            for feature in fc.features.iter_mut() {
                if let Some(geometry) = feature.geometry.as_mut() {
                    reproject_geometry(geometry, &projection)?;
                    count += 1;
                }
                feature.bbox = None;
            }
            fc.bbox = None;
            strip_crs(&mut fc.foreign_members);
            log::info!(
                "Reprojected {} feature(s) from {} to EPSG:4326",
                count,
                from.label()
            );
            Ok(GeoJson::FeatureCollection(fc))
        }
        GeoJson::Feature(mut feature) => {
            if let Some(geometry) = feature.geometry.as_mut() {
                reproject_geometry(geometry, &projection)?;
            }
            feature.bbox = None;
            strip_crs(&mut feature.foreign_members);
            Ok(GeoJson::Feature(feature))
        }
        GeoJson::Geometry(mut geometry) => {
            reproject_geometry(&mut geometry, &projection)?;
            strip_crs(&mut geometry.foreign_members);
            Ok(GeoJson::Geometry(geometry))
        }
    }
}

fn strip_crs(foreign: &mut Option<geojson::JsonObject>) {
    if let Some(members) = foreign.as_mut() {
        members.remove("crs");
        if members.is_empty() {
            *foreign = None;
        }
    }
}

/// Reprojects a geometry in place using `projection`'s inverse.
pub fn reproject_geometry(
    geometry: &mut Geometry,
    projection: &LambertConformalConic,
) -> Result<(), ReprojectError> {
    geometry.bbox = None;
    reproject_value(&mut geometry.value, projection)
}

fn reproject_value(
    value: &mut Value,
    projection: &LambertConformalConic,
) -> Result<(), ReprojectError> {
    match value {
        Value::Point(position) => reproject_position(position, projection),
        Value::MultiPoint(positions) | Value::LineString(positions) => {
            reproject_positions(positions, projection)
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => lines
            .iter_mut()
            .try_for_each(|line| reproject_positions(line, projection)),
        Value::MultiPolygon(polygons) => polygons.iter_mut().try_for_each(|rings| {
            rings
                .iter_mut()
                .try_for_each(|ring| reproject_positions(ring, projection))
        }),
        Value::GeometryCollection(geometries) => geometries
            .iter_mut()
            .try_for_each(|g| reproject_geometry(g, projection)),
    }
}

fn reproject_positions(
    positions: &mut [Vec<f64>],
    projection: &LambertConformalConic,
) -> Result<(), ReprojectError> {
    positions
        .iter_mut()
        .try_for_each(|p| reproject_position(p, projection))
}

fn reproject_position(
    position: &mut Vec<f64>,
    projection: &LambertConformalConic,
) -> Result<(), ReprojectError> {
    if position.len() < 2 {
        return Err(ReprojectError::ShortPosition);
    }
    let (lon, lat) = projection.inverse(position[0], position[1])?;
    position[0] = lon;
    position[1] = lat;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    /// Worked example from EPSG Guidance Note 7-2 (NAD27 / Texas South
    /// Central, US survey feet).
    #[test]
    fn test_epsg_guidance_note_example() {
        let projection = LambertConformalConic::new(LccParams {
            semi_major: 20_925_832.16,
            inverse_flattening: 294.978_70,
            lat_origin: 27.0 + 50.0 / 60.0,
            lon_origin: -99.0,
            lat_1: 28.0 + 23.0 / 60.0,
            lat_2: 30.0 + 17.0 / 60.0,
            false_easting: 2_000_000.0,
            false_northing: 0.0,
        });

        let (x, y) = projection.forward(-96.0, 28.5).unwrap();
        assert_close(x, 2_963_503.91, 0.01);
        assert_close(y, 254_759.80, 0.01);

        let (lon, lat) = projection.inverse(2_963_503.91, 254_759.80).unwrap();
        assert_close(lon, -96.0, 1e-7);
        assert_close(lat, 28.5, 1e-7);
    }

    #[test]
    fn test_epsg_3347_origin() {
        let (lon, lat) = epsg3347_to_wgs84(6_200_000.0, 3_000_000.0).unwrap();
        assert_close(lon, -91.866_666_666_666_67, 1e-9);
        assert_close(lat, 63.390_675, 1e-9);
    }

    /// Expected grid values were computed outside this crate from the
    /// EPSG Guidance Note 7-2 formulae; the scale tests below check the
    /// same parameters against ellipsoid geometry directly.
    #[test]
    fn test_epsg_3347_known_point() {
        // Parliament Hill, Ottawa
        let (lon, lat) = epsg3347_to_wgs84(7_471_241.7885, 1_190_644.0096).unwrap();
        assert_close(lon, -75.6972, 1e-6);
        assert_close(lat, 45.4215, 1e-6);

        let (x, y) = wgs84_to_epsg3347(-123.1207, 49.2827).unwrap();
        assert_close(x, 4_018_834.4056, 0.01);
        assert_close(y, 2_007_337.1902, 0.01);
    }

    /// Arc lengths on GRS80, independent of the cone constants.
    fn grs80_radii(lat: f64) -> (f64, f64) {
        let a = EPSG_3347.semi_major;
        let f = 1.0 / EPSG_3347.inverse_flattening;
        let e2 = 2.0 * f - f * f;
        let w = 1.0 - e2 * lat.to_radians().sin().powi(2);
        let nu = a / w.sqrt();
        let rho = a * (1.0 - e2) / w.powf(1.5);
        (nu, rho)
    }

    #[test]
    fn test_epsg_3347_standard_parallels_are_true_to_scale() {
        let projection = LambertConformalConic::epsg_3347();
        let lon0 = EPSG_3347.lon_origin;
        let dlon = 0.001_f64;

        for lat in [EPSG_3347.lat_1, EPSG_3347.lat_2] {
            let (nu, rho) = grs80_radii(lat);

            let (x1, y1) = projection.forward(lon0 - dlon / 2.0, lat).unwrap();
            let (x2, y2) = projection.forward(lon0 + dlon / 2.0, lat).unwrap();
            let along_parallel = nu * lat.to_radians().cos() * dlon.to_radians();
            let k = (x2 - x1).hypot(y2 - y1) / along_parallel;
            assert_close(k, 1.0, 1e-7);

            // Conformal: the meridian scale matches the parallel scale
            let (mx1, my1) = projection.forward(lon0, lat - dlon / 2.0).unwrap();
            let (mx2, my2) = projection.forward(lon0, lat + dlon / 2.0).unwrap();
            let along_meridian = rho * dlon.to_radians();
            let h = (mx2 - mx1).hypot(my2 - my1) / along_meridian;
            assert_close(h, 1.0, 1e-7);
        }
    }

    #[test]
    fn test_epsg_3347_central_meridian_is_vertical() {
        let projection = LambertConformalConic::epsg_3347();
        for lat in [42.0, 55.0, 70.0] {
            let (x, _) = projection.forward(EPSG_3347.lon_origin, lat).unwrap();
            assert_close(x, EPSG_3347.false_easting, 1e-6);
        }
    }

    #[test]
    fn test_forward_inverse_agree() {
        let projection = LambertConformalConic::epsg_3347();
        for &(lon, lat) in &[(-63.5752, 44.6488), (-135.05, 60.72), (-52.71, 47.56)] {
            let (x, y) = projection.forward(lon, lat).unwrap();
            let (lon2, lat2) = projection.inverse(x, y).unwrap();
            assert_close(lon2, lon, 1e-9);
            assert_close(lat2, lat, 1e-9);
        }
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!(matches!(
            epsg3347_to_wgs84(f64::NAN, 1.0),
            Err(ReprojectError::NonFinite(..))
        ));
        assert!(matches!(
            epsg3347_to_wgs84(f64::INFINITY, 0.0),
            Err(ReprojectError::NonFinite(..))
        ));
        assert!(matches!(
            wgs84_to_epsg3347(0.0, 91.0),
            Err(ReprojectError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn test_crs_from_name() {
        assert_eq!(Crs::from_name("EPSG:3347"), Some(Crs::StatCanLambert));
        assert_eq!(
            Crs::from_name("urn:ogc:def:crs:EPSG::3347"),
            Some(Crs::StatCanLambert)
        );
        assert_eq!(Crs::from_name("urn:ogc:def:crs:OGC:1.3:CRS84"), Some(Crs::Wgs84));
        assert_eq!(Crs::from_name("epsg:4326"), Some(Crs::Wgs84));
        assert_eq!(Crs::from_name("EPSG:3857"), None);
        assert_eq!(
            Crs::from_name("http://www.opengis.net/def/crs/EPSG/0/3347"),
            Some(Crs::StatCanLambert)
        );
    }

    #[test]
    fn test_crs_from_name_needs_a_known_authority() {
        assert_eq!(Crs::from_name("3347"), None);
        assert_eq!(Crs::from_name("FOO:4326"), None);
        assert_eq!(Crs::from_name("CRS84"), None);
        assert_eq!(Crs::from_name("urn:ogc:def:crs:FOO::3347"), None);
    }

    #[test]
    fn test_reproject_feature_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3347"}},
            "features": [{
                "type": "Feature",
                "properties": {"name": "Ottawa"},
                "geometry": {"type": "Polygon", "coordinates": [[
                    [7471241.7885, 1190644.0096],
                    [7471241.7885, 1191644.0096],
                    [7472241.7885, 1191644.0096],
                    [7471241.7885, 1190644.0096]
                ]]}
            }]
        }"#;
        let geojson: GeoJson = text.parse().unwrap();
        assert_eq!(detect_crs(&geojson), Some(Crs::StatCanLambert));

        let reprojected = reproject_geojson(geojson, Crs::StatCanLambert).unwrap();
        assert_eq!(detect_crs(&reprojected), None);

        let GeoJson::FeatureCollection(fc) = reprojected else {
            panic!("expected a FeatureCollection");
        };
        let Some(Value::Polygon(rings)) = fc.features[0].geometry.as_ref().map(|g| &g.value)
        else {
            panic!("expected a Polygon");
        };
        assert_close(rings[0][0][0], -75.6972, 1e-6);
        assert_close(rings[0][0][1], 45.4215, 1e-6);
        assert_eq!(rings[0].first(), rings[0].last());
    }

    #[test]
    fn test_reproject_wgs84_is_identity() {
        let text = r#"{"type": "Point", "coordinates": [-75.0, 45.0]}"#;
        let geojson: GeoJson = text.parse().unwrap();
        let same = reproject_geojson(geojson.clone(), Crs::Wgs84).unwrap();
        assert_eq!(same, geojson);
    }
}
