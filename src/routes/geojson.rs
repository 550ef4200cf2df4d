//! Conversion between routes and GeoJSON.
//!
//! Routes are exported as a FeatureCollection of LineString features with
//! `id`, `name`, `color`, `lineWidth` (and `metadata` when present) in the
//! feature properties. The inverse direction is used when ingesting route
//! data from an endpoint or a file.

use super::types::Route;
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors raised while decoding route payloads.
#[derive(Debug, Error)]
pub enum RoutePayloadError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("feature {index} has no LineString geometry")]
    NotALineString { index: usize },
    #[error("feature {index} has no route id")]
    MissingId { index: usize },
    #[error("unrecognized route payload: expected an array, {{\"routes\": [...]}} or a FeatureCollection")]
    UnknownShape,
}

/// Converts a single route into a LineString feature.
pub fn route_to_feature(route: &Route) -> Feature {
    let coordinates = route
        .coordinates
        .iter()
        .map(|[lon, lat]| vec![*lon, *lat])
        .collect();

    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), json!(route.id));
    properties.insert("name".to_string(), json!(route.name));
    properties.insert("color".to_string(), json!(route.effective_color()));
    properties.insert("lineWidth".to_string(), json!(route.effective_line_width()));
    if let Some(metadata) = &route.metadata {
        properties.insert(
            "metadata".to_string(),
            serde_json::Value::Object(metadata.clone()),
        );
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(coordinates))),
        id: Some(Id::String(route.id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Converts routes into the FeatureCollection the map's route source consumes.
pub fn routes_to_feature_collection<'a>(
    routes: impl IntoIterator<Item = &'a Route>,
) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: routes.into_iter().map(route_to_feature).collect(),
        foreign_members: None,
    }
}

/// Decodes a LineString feature back into a route.
///
/// The id comes from the `id` property, falling back to the feature id.
/// Only the first two ordinates of each position are kept.
pub fn route_from_feature(feature: &Feature, index: usize) -> Result<Route, RoutePayloadError> {
    let coordinates = match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Value::LineString(line)) => line
            .iter()
            .filter(|position| position.len() >= 2)
            .map(|position| [position[0], position[1]])
            .collect(),
        _ => return Err(RoutePayloadError::NotALineString { index }),
    };

    let property = |key: &str| feature.properties.as_ref().and_then(|p| p.get(key));

    let id = property("id")
        .and_then(json_scalar_to_string)
        .or_else(|| match &feature.id {
            Some(Id::String(s)) => Some(s.clone()),
            Some(Id::Number(n)) => Some(n.to_string()),
            None => None,
        })
        .ok_or(RoutePayloadError::MissingId { index })?;

    let name = property("name")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| id.clone());

    Ok(Route {
        id,
        name,
        coordinates,
        color: property("color").and_then(|v| v.as_str()).map(str::to_string),
        line_width: property("lineWidth").and_then(|v| v.as_f64()),
        metadata: property("metadata").and_then(|v| v.as_object()).cloned(),
    })
}

fn json_scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Deserialize)]
struct RoutesEnvelope {
    routes: Vec<Route>,
}

/// Parses a route payload as served by a route endpoint or stored in a file.
///
/// Accepted shapes: a JSON array of route records, an object with a
/// `routes` array, or a GeoJSON FeatureCollection of LineStrings. Records
/// are not validated here; that happens when they enter the registry.
pub fn parse_routes_payload(text: &str) -> Result<Vec<Route>, RoutePayloadError> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    match &value {
        serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
        serde_json::Value::Object(obj) => {
            if obj.get("type").and_then(|t| t.as_str()) == Some("FeatureCollection") {
                let fc: FeatureCollection = serde_json::from_value(value)?;
                fc.features
                    .iter()
                    .enumerate()
                    .map(|(index, feature)| route_from_feature(feature, index))
                    .collect()
            } else if obj.contains_key("routes") {
                let envelope: RoutesEnvelope = serde_json::from_value(value)?;
                Ok(envelope.routes)
            } else {
                Err(RoutePayloadError::UnknownShape)
            }
        }
        _ => Err(RoutePayloadError::UnknownShape),
    }
}

/// Demo routes shown before any endpoint data arrives.
pub fn sample_routes() -> Vec<Route> {
    vec![
        Route::new(
            "route-1",
            "Downtown Express",
            vec![
                [-75.6972, 45.4215],
                [-75.6903, 45.4231],
                [-75.6835, 45.4262],
                [-75.6750, 45.4290],
            ],
        )
        .with_color("#1E88E5")
        .with_line_width(5.0),
        Route::new(
            "route-2",
            "Crosstown Local",
            vec![
                [-75.7200, 45.4000],
                [-75.7050, 45.4100],
                [-75.6950, 45.4180],
                [-75.6800, 45.4200],
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_properties_and_defaults() {
        let route = Route::new("r1", "Route One", vec![[-75.7, 45.4], [-75.6, 45.5]]);
        let feature = route_to_feature(&route);

        let props = feature.properties.as_ref().unwrap();
        assert_eq!(props["id"], "r1");
        assert_eq!(props["name"], "Route One");
        assert_eq!(props["color"], "#FF0000");
        assert_eq!(props["lineWidth"], 4.0);
        assert!(props.get("metadata").is_none());
        assert_eq!(feature.id, Some(Id::String("r1".to_string())));

        match feature.geometry.unwrap().value {
            Value::LineString(line) => {
                assert_eq!(line, vec![vec![-75.7, 45.4], vec![-75.6, 45.5]]);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_feature_keeps_route_style_and_metadata() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("operator".to_string(), json!("OC Transpo"));
        let route = Route::new("r2", "Route Two", vec![[0.0, 0.0], [1.0, 1.0]])
            .with_color("#00FF00")
            .with_line_width(2.5)
            .with_metadata(metadata);

        let feature = route_to_feature(&route);
        let props = feature.properties.as_ref().unwrap();
        assert_eq!(props["color"], "#00FF00");
        assert_eq!(props["lineWidth"], 2.5);
        assert_eq!(props["metadata"]["operator"], "OC Transpo");

        let back = route_from_feature(&feature, 0).unwrap();
        assert_eq!(back, route);
    }

    #[test]
    fn test_feature_collection_order() {
        let routes = sample_routes();
        let fc = routes_to_feature_collection(&routes);
        assert_eq!(fc.features.len(), 2);
        assert_eq!(fc.features[0].properties.as_ref().unwrap()["id"], "route-1");
        assert_eq!(fc.features[1].properties.as_ref().unwrap()["id"], "route-2");
    }

    #[test]
    fn test_parse_array_payload() {
        let text = r##"[
            {"id": "7", "name": "Seven", "coordinates": [[-75.7, 45.4], [-75.6, 45.5]], "lineWidth": 3},
            {"id": "8", "name": "Eight", "coordinates": [[-75.7, 45.4], [-75.6, 45.5]], "color": "#123456"}
        ]"##;
        let routes = parse_routes_payload(text).unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].line_width, Some(3.0));
        assert_eq!(routes[1].color.as_deref(), Some("#123456"));
    }

    #[test]
    fn test_parse_envelope_payload() {
        let text = r#"{"routes": [{"id": "7", "name": "Seven", "coordinates": [[0, 0], [1, 1]]}]}"#;
        let routes = parse_routes_payload(text).unwrap();
        assert_eq!(routes[0].id, "7");
    }

    #[test]
    fn test_parse_feature_collection_payload() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": 12,
                 "geometry": {"type": "LineString", "coordinates": [[-75.7, 45.4, 70.0], [-75.6, 45.5, 71.0]]},
                 "properties": {"name": "Twelve"}}
            ]
        }"#;
        let routes = parse_routes_payload(text).unwrap();
        assert_eq!(routes[0].id, "12");
        assert_eq!(routes[0].name, "Twelve");
        assert_eq!(routes[0].coordinates, vec![[-75.7, 45.4], [-75.6, 45.5]]);
    }

    #[test]
    fn test_parse_rejects_non_line_features() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0, 0]},
                 "properties": {"id": "p"}}
            ]
        }"#;
        assert!(matches!(
            parse_routes_payload(text),
            Err(RoutePayloadError::NotALineString { index: 0 })
        ));
        assert!(matches!(
            parse_routes_payload(r#"{"foo": 1}"#),
            Err(RoutePayloadError::UnknownShape)
        ));
        assert!(matches!(
            parse_routes_payload("not json"),
            Err(RoutePayloadError::Json(_))
        ));
    }
}
