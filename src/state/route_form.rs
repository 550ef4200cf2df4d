//! Edit buffers for the add-route form and the selected-route editor.

use crate::routes::{Route, RoutePatch, DEFAULT_ROUTE_COLOR, DEFAULT_ROUTE_WIDTH};

/// Text fields of the "add route" form.
#[derive(Debug, Clone)]
pub struct RouteForm {
    pub id: String,
    pub name: String,
    pub color: String,
    pub line_width: f64,
    /// Coordinates as `lon,lat; lon,lat; ...`
    pub coordinates: String,
}

impl Default for RouteForm {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            color: DEFAULT_ROUTE_COLOR.to_string(),
            line_width: DEFAULT_ROUTE_WIDTH,
            coordinates: String::new(),
        }
    }
}

impl RouteForm {
    /// Builds a route from the form. Registry validation still applies.
    pub fn build(&self) -> Result<Route, String> {
        let coordinates = parse_coordinate_list(&self.coordinates)?;
        let id = self.id.trim();
        let name = match self.name.trim() {
            "" => id,
            name => name,
        };

        let mut route = Route::new(id, name, coordinates).with_line_width(self.line_width);
        let color = self.color.trim();
        if !color.is_empty() {
            route = route.with_color(color);
        }
        Ok(route)
    }

    /// Clears the per-route fields, keeping the style choices.
    pub fn clear(&mut self) {
        self.id.clear();
        self.name.clear();
        self.coordinates.clear();
    }
}

/// Parses `lon,lat; lon,lat; ...` into coordinate pairs.
///
/// Newlines work as separators too.
pub fn parse_coordinate_list(text: &str) -> Result<Vec<[f64; 2]>, String> {
    text.split(|c: char| c == ';' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(i, pair)| {
            let (lon, lat) = pair
                .split_once(',')
                .ok_or_else(|| format!("Point {} ('{}') is not 'lon,lat'", i + 1, pair))?;
            let lon: f64 = lon
                .trim()
                .parse()
                .map_err(|_| format!("Point {} has a bad longitude '{}'", i + 1, lon.trim()))?;
            let lat: f64 = lat
                .trim()
                .parse()
                .map_err(|_| format!("Point {} has a bad latitude '{}'", i + 1, lat.trim()))?;
            Ok([lon, lat])
        })
        .collect()
}

/// Edit buffer for the selected route's display properties.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEditor {
    pub route_id: String,
    pub name: String,
    pub color: String,
    pub line_width: f64,
}

impl RouteEditor {
    pub fn for_route(route: &Route) -> Self {
        Self {
            route_id: route.id.clone(),
            name: route.name.clone(),
            color: route.effective_color().to_string(),
            line_width: route.effective_line_width(),
        }
    }

    /// Returns a patch with only the fields that differ from `route`.
    pub fn to_patch(&self, route: &Route) -> RoutePatch {
        let name = self.name.trim();
        let color = self.color.trim();
        RoutePatch {
            name: (name != route.name).then(|| name.to_string()),
            color: (color != route.effective_color()).then(|| color.to_string()),
            line_width: (self.line_width != route.effective_line_width())
                .then_some(self.line_width),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate_list() {
        let coords = parse_coordinate_list("-75.70,45.42; -75.69, 45.43\n-75.68,45.44;").unwrap();
        assert_eq!(
            coords,
            vec![[-75.70, 45.42], [-75.69, 45.43], [-75.68, 45.44]]
        );
        assert!(parse_coordinate_list("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_coordinate_list_reports_the_bad_point() {
        let err = parse_coordinate_list("-75.7,45.4; 12").unwrap_err();
        assert!(err.starts_with("Point 2"), "{}", err);
        let err = parse_coordinate_list("east,45.4").unwrap_err();
        assert!(err.contains("longitude"), "{}", err);
    }

    #[test]
    fn test_build_defaults_name_to_id() {
        let form = RouteForm {
            id: " r9 ".to_string(),
            coordinates: "-75.7,45.4; -75.6,45.5".to_string(),
            ..Default::default()
        };
        let route = form.build().unwrap();
        assert_eq!(route.id, "r9");
        assert_eq!(route.name, "r9");
        assert_eq!(route.color.as_deref(), Some(DEFAULT_ROUTE_COLOR));
        assert_eq!(route.line_width, Some(DEFAULT_ROUTE_WIDTH));
    }

    #[test]
    fn test_editor_patch_contains_only_changes() {
        let route = Route::new("r1", "Old", vec![[0.0, 0.0], [1.0, 1.0]]);
        let mut editor = RouteEditor::for_route(&route);
        assert!(editor.to_patch(&route).is_empty());

        editor.name = "New".to_string();
        editor.line_width = 6.0;
        let patch = editor.to_patch(&route);
        assert_eq!(patch.name.as_deref(), Some("New"));
        assert_eq!(patch.line_width, Some(6.0));
        assert!(patch.color.is_none());
        assert!(patch.coordinates.is_none());
    }
}
