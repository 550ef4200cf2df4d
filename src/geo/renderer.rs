//! Boundary and route rendering.
//!
//! Renders geographic features to the egui canvas.

use super::{distance_to_segment, BoundaryLayer, BoundaryLayerSet, GeoFeature, MapProjection};
use crate::map::RenderRoute;
use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Shape, Stroke};
use geo_types::Coord;

/// Extra width painted under the selected route.
const SELECTION_HALO: f32 = 4.0;

/// Renders all visible boundary layers to the canvas.
pub fn render_boundaries(
    painter: &Painter,
    layers: &BoundaryLayerSet,
    projection: &MapProjection,
    show_labels: bool,
) {
    for layer in layers.iter().filter(|l| l.visible) {
        render_layer(painter, layer, projection, show_labels);
    }
}

fn render_layer(
    painter: &Painter,
    layer: &BoundaryLayer,
    projection: &MapProjection,
    show_labels: bool,
) {
    let stroke = Stroke::new(layer.line_width, layer.color);

    for feature in &layer.features {
        match feature {
            GeoFeature::Point(coord, label) => {
                render_point(painter, coord, projection, layer.color, label.as_deref());
            }
            GeoFeature::LineString(coords) => {
                render_line_string(painter, coords, projection, stroke);
            }
            GeoFeature::MultiLineString(lines) => {
                for coords in lines {
                    render_line_string(painter, coords, projection, stroke);
                }
            }
            GeoFeature::Polygon {
                exterior,
                holes,
                label,
            } => {
                render_line_string(painter, exterior, projection, stroke);
                for hole in holes {
                    render_line_string(painter, hole, projection, stroke);
                }
                if show_labels {
                    render_polygon_label(painter, exterior, projection, label.as_deref());
                }
            }
            GeoFeature::MultiPolygon { polygons, label } => {
                for (exterior, holes) in polygons {
                    render_line_string(painter, exterior, projection, stroke);
                    for hole in holes {
                        render_line_string(painter, hole, projection, stroke);
                    }
                }
                // Label the largest part only
                if show_labels {
                    if let Some((exterior, _)) = polygons.iter().max_by_key(|(e, _)| e.len()) {
                        render_polygon_label(painter, exterior, projection, label.as_deref());
                    }
                }
            }
        }
    }
}

/// Renders the routes currently held by the map's route source.
pub fn render_routes(
    painter: &Painter,
    routes: &[RenderRoute],
    projection: &MapProjection,
    selected: Option<&str>,
    show_labels: bool,
) {
    for route in routes {
        let is_selected = selected == Some(route.id.as_str());
        if is_selected {
            let halo = Stroke::new(
                route.width + SELECTION_HALO,
                Color32::from_rgba_unmultiplied(255, 255, 255, 160),
            );
            render_line_string(painter, &route.points, projection, halo);
        }

        render_line_string(
            painter,
            &route.points,
            projection,
            Stroke::new(route.width, route.color),
        );

        if show_labels || is_selected {
            if let Some(first) = route.points.first() {
                let pos = projection.geo_to_screen(*first);
                painter.text(
                    pos + eframe::egui::vec2(6.0, -6.0),
                    Align2::LEFT_BOTTOM,
                    &route.name,
                    FontId::proportional(12.0),
                    Color32::WHITE,
                );
            }
        }
    }
}

/// Finds the topmost route within `tolerance` pixels of `pos`.
///
/// Each route's own half-width is added to the tolerance so thick lines
/// are as easy to hit as they look.
pub fn hit_test_route<'a>(
    routes: &'a [RenderRoute],
    projection: &MapProjection,
    pos: Pos2,
    tolerance: f32,
) -> Option<&'a RenderRoute> {
    routes.iter().rev().find(|route| {
        let reach = tolerance + route.width / 2.0;
        route.points.windows(2).any(|pair| {
            let a = projection.geo_to_screen(pair[0]);
            let b = projection.geo_to_screen(pair[1]);
            distance_to_segment(pos, a, b) <= reach
        })
    })
}

fn render_point(
    painter: &Painter,
    coord: &Coord<f64>,
    projection: &MapProjection,
    color: Color32,
    label: Option<&str>,
) {
    if !projection.is_visible(*coord, 0.05) {
        return;
    }

    let pos = projection.geo_to_screen(*coord);
    painter.circle_filled(pos, 3.0, color);

    if let Some(text) = label {
        painter.text(
            Pos2::new(pos.x + 5.0, pos.y - 5.0),
            Align2::LEFT_BOTTOM,
            text,
            FontId::proportional(10.0),
            color,
        );
    }
}

fn render_polygon_label(
    painter: &Painter,
    exterior: &[Coord<f64>],
    projection: &MapProjection,
    label: Option<&str>,
) {
    let Some(text) = label else {
        return;
    };
    if exterior.is_empty() {
        return;
    }

    // Vertex average is a cheap stand-in for a proper label point
    let n = exterior.len() as f64;
    let center = Coord {
        x: exterior.iter().map(|c| c.x).sum::<f64>() / n,
        y: exterior.iter().map(|c| c.y).sum::<f64>() / n,
    };
    if !projection.is_visible(center, 0.0) {
        return;
    }

    painter.text(
        projection.geo_to_screen(center),
        Align2::CENTER_CENTER,
        text,
        FontId::proportional(11.0),
        Color32::from_rgb(170, 170, 190),
    );
}

fn render_line_string(
    painter: &Painter,
    coords: &[Coord<f64>],
    projection: &MapProjection,
    stroke: Stroke,
) {
    if coords.len() < 2 {
        return;
    }

    let (min_lon, max_lon, min_lat, max_lat) = coords.iter().fold(
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN),
        |(min_x, max_x, min_y, max_y), c| {
            (
                min_x.min(c.x),
                max_x.max(c.x),
                min_y.min(c.y),
                max_y.max(c.y),
            )
        },
    );

    if !projection.bbox_visible(min_lon, min_lat, max_lon, max_lat) {
        return;
    }

    // Drop sub-pixel steps; detailed boundaries have many of them
    let mut points: Vec<Pos2> = Vec::with_capacity(coords.len());
    for coord in coords {
        let pos = projection.geo_to_screen(*coord);
        match points.last() {
            Some(last) if last.distance_sq(pos) < 0.5 => continue,
            _ => points.push(pos),
        }
    }
    if points.len() < 2 {
        return;
    }

    painter.add(Shape::line(points, stroke));
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{Rect, Vec2};

    fn projection() -> MapProjection {
        let mut p = MapProjection::new(45.0, -75.0);
        p.update(
            1.0,
            Vec2::ZERO,
            Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)),
        );
        p
    }

    fn route(id: &str, points: Vec<(f64, f64)>) -> RenderRoute {
        RenderRoute {
            id: id.to_string(),
            name: id.to_string(),
            points: points.into_iter().map(|(x, y)| Coord { x, y }).collect(),
            color: Color32::RED,
            width: 4.0,
        }
    }

    #[test]
    fn test_hit_test_picks_topmost() {
        let p = projection();
        let routes = vec![
            route("below", vec![(-75.2, 45.0), (-74.8, 45.0)]),
            route("above", vec![(-75.2, 45.0), (-74.8, 45.0)]),
        ];
        let pos = p.geo_to_screen(Coord { x: -75.0, y: 45.0 });
        let hit = hit_test_route(&routes, &p, pos, 3.0).unwrap();
        assert_eq!(hit.id, "above");
    }

    #[test]
    fn test_hit_test_respects_tolerance() {
        let p = projection();
        let routes = vec![route("r", vec![(-75.2, 45.0), (-74.8, 45.0)])];
        let on_line = p.geo_to_screen(Coord { x: -75.0, y: 45.0 });

        assert!(hit_test_route(&routes, &p, on_line + Vec2::new(0.0, 4.0), 3.0).is_some());
        assert!(hit_test_route(&routes, &p, on_line + Vec2::new(0.0, 20.0), 3.0).is_none());
    }
}
