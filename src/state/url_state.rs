//! URL state encoding/decoding for shareable URLs.
//!
//! Encodes the map center, zoom and selected route in the URL query string
//! so reloading restores the view and URLs can be shared.

/// Parsed URL parameters.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UrlParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub zoom: Option<f32>,
    pub route: Option<String>,
}

/// Parses a query string, with or without the leading `?`.
///
/// Unknown keys and unparsable values are ignored.
#[cfg(any(target_arch = "wasm32", test))]
pub fn parse_query(query: &str) -> UrlParams {
    let mut params = UrlParams::default();

    let query = query.trim_start_matches('?');
    if query.is_empty() {
        return params;
    }

    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "lat" => params.lat = value.parse().ok().filter(|v: &f64| v.is_finite()),
            "lon" => params.lon = value.parse().ok().filter(|v: &f64| v.is_finite()),
            "z" => params.zoom = value.parse().ok().filter(|v: &f32| *v > 0.0),
            "route" if !value.is_empty() => params.route = Some(decode_component(value)),
            _ => {}
        }
    }

    params
}

/// Formats the view as a query string.
pub fn format_query(lat: f64, lon: f64, zoom: f32, route: Option<&str>) -> String {
    let mut query = format!("?lat={:.5}&lon={:.5}&z={:.2}", lat, lon, zoom);
    if let Some(id) = route {
        query.push_str("&route=");
        query.push_str(&encode_component(id));
    }
    query
}

fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(any(target_arch = "wasm32", test))]
fn decode_component(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse URL query parameters from the current browser URL.
#[cfg(target_arch = "wasm32")]
pub fn parse_from_url() -> UrlParams {
    web_sys::window()
        .and_then(|w| w.location().search().ok())
        .map(|search| parse_query(&search))
        .unwrap_or_default()
}

/// No-op stub for native builds.
#[cfg(not(target_arch = "wasm32"))]
pub fn parse_from_url() -> UrlParams {
    UrlParams::default()
}

/// Push current state to the URL query string using `replaceState`.
#[cfg(target_arch = "wasm32")]
pub fn push_to_url(lat: f64, lon: f64, zoom: f32, route: Option<&str>) {
    let query = format_query(lat, lon, zoom, route);

    let Some(history) = web_sys::window().and_then(|w| w.history().ok()) else {
        return;
    };
    let _ = history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&query));
}

/// No-op stub for native builds.
#[cfg(not(target_arch = "wasm32"))]
pub fn push_to_url(_lat: f64, _lon: f64, _zoom: f32, _route: Option<&str>) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let params = parse_query("?lat=45.42150&lon=-75.69720&z=2.50&route=route-1");
        assert_eq!(params.lat, Some(45.4215));
        assert_eq!(params.lon, Some(-75.6972));
        assert_eq!(params.zoom, Some(2.5));
        assert_eq!(params.route.as_deref(), Some("route-1"));
    }

    #[test]
    fn test_parse_query_ignores_bad_values() {
        let params = parse_query("lat=abc&lon=NaN&z=-1&route=&other=1");
        assert_eq!(params, UrlParams::default());
        assert_eq!(parse_query(""), UrlParams::default());
    }

    #[test]
    fn test_route_ids_are_escaped() {
        let query = format_query(45.0, -75.0, 1.0, Some("line 7/east"));
        assert_eq!(
            query,
            "?lat=45.00000&lon=-75.00000&z=1.00&route=line%207%2Feast"
        );
        assert_eq!(parse_query(&query).route.as_deref(), Some("line 7/east"));
    }
}
