//! Map style metadata.
//!
//! The configured style URL points at a MapLibre/Mapbox style document.
//! Tiles are not rendered here; the style only supplies its name and the
//! background color of the map.

use eframe::egui::Color32;
use serde::Deserialize;

/// Canvas background used until a style is loaded, or when it has none.
pub const DEFAULT_BACKGROUND: Color32 = Color32::from_rgb(20, 24, 35);

#[derive(Debug, Deserialize)]
struct StyleDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    layers: Vec<StyleLayer>,
}

#[derive(Debug, Deserialize)]
struct StyleLayer {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    paint: Option<serde_json::Value>,
}

/// Metadata extracted from a style document.
#[derive(Debug, Clone, PartialEq)]
pub struct MapStyle {
    pub url: String,
    pub name: Option<String>,
    pub background: Color32,
}

impl MapStyle {
    /// Style used before the document has been fetched.
    pub fn placeholder(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            background: DEFAULT_BACKGROUND,
        }
    }

    /// Parses a style document fetched from `url`.
    pub fn from_json(url: impl Into<String>, text: &str) -> Result<Self, serde_json::Error> {
        let doc: StyleDocument = serde_json::from_str(text)?;

        let background = doc
            .layers
            .iter()
            .find(|layer| layer.kind == "background")
            .and_then(|layer| layer.paint.as_ref())
            .and_then(|paint| paint.get("background-color"))
            .and_then(|v| v.as_str())
            .and_then(parse_css_color)
            .unwrap_or(DEFAULT_BACKGROUND);

        Ok(Self {
            url: url.into(),
            name: doc.name,
            background,
        })
    }

    /// Name for display, falling back to the URL.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

/// Parses the color forms that show up in style backgrounds: hex and
/// `rgb()`/`rgba()`.
fn parse_css_color(s: &str) -> Option<Color32> {
    let s = s.trim();
    if s.starts_with('#') {
        return crate::routes::parse_hex_color(s);
    }

    let inner = s
        .strip_prefix("rgba(")
        .or_else(|| s.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }

    let channel = |p: &str| p.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0) as u8);
    let alpha = match parts.get(3) {
        Some(a) => (a.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
        None => 255,
    };

    Some(Color32::from_rgba_unmultiplied(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_from_style() {
        let text = r##"{
            "version": 8,
            "name": "Demo Tiles",
            "layers": [
                {"id": "background", "type": "background", "paint": {"background-color": "#D8F2FF"}},
                {"id": "water", "type": "fill", "paint": {"fill-color": "#0000FF"}}
            ]
        }"##;
        let style = MapStyle::from_json("https://example.com/style.json", text).unwrap();
        assert_eq!(style.name.as_deref(), Some("Demo Tiles"));
        assert_eq!(style.background, Color32::from_rgb(0xD8, 0xF2, 0xFF));
    }

    #[test]
    fn test_missing_background_uses_default() {
        let style = MapStyle::from_json("u", r#"{"version": 8, "layers": []}"#).unwrap();
        assert_eq!(style.background, DEFAULT_BACKGROUND);
        assert_eq!(style.display_name(), "u");
    }

    #[test]
    fn test_parse_css_color() {
        assert_eq!(
            parse_css_color("rgb(10, 20, 30)"),
            Some(Color32::from_rgb(10, 20, 30))
        );
        assert_eq!(
            parse_css_color("rgba(10,20,30,1)"),
            Some(Color32::from_rgb(10, 20, 30))
        );
        assert_eq!(parse_css_color("hsl(0, 0%, 0%)"), None);
    }
}
