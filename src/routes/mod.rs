//! Transit route registry and its GeoJSON representation.

mod geojson;
mod registry;
mod types;

pub use self::geojson::{
    parse_routes_payload, routes_to_feature_collection, sample_routes, RoutePayloadError,
};
pub use registry::{RouteRegistry, RouteResult};
pub use types::{
    format_hex_color, parse_hex_color, Route, RoutePatch, DEFAULT_ROUTE_COLOR,
    DEFAULT_ROUTE_WIDTH,
};
