//! Map projection and coordinate transformation.
//!
//! Converts between geographic coordinates (lon/lat) and screen coordinates
//! for drawing on the canvas.

use eframe::egui::{Pos2, Rect, Vec2};
use geo_types::Coord;

/// Smallest and largest zoom factor the canvas allows.
pub const MIN_ZOOM: f32 = 0.05;
pub const MAX_ZOOM: f32 = 400.0;

/// Map projection for converting geographic to screen coordinates.
#[derive(Debug, Clone)]
pub struct MapProjection {
    /// Center latitude of the view
    pub center_lat: f64,
    /// Center longitude of the view
    pub center_lon: f64,
    /// Half of the visible span in degrees at zoom 1.0
    pub range_deg: f64,
    /// Current zoom level
    pub zoom: f32,
    /// Pan offset in screen pixels
    pub pan_offset: Vec2,
    /// Screen rectangle for the canvas
    pub screen_rect: Rect,
}

impl Default for MapProjection {
    fn default() -> Self {
        Self {
            // Ottawa
            center_lat: 45.4215,
            center_lon: -75.6972,
            range_deg: 0.5,
            zoom: 1.0,
            pan_offset: Vec2::ZERO,
            screen_rect: Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)),
        }
    }
}

impl MapProjection {
    /// Creates a new projection centered on a location.
    pub fn new(center_lat: f64, center_lon: f64) -> Self {
        Self {
            center_lat,
            center_lon,
            ..Default::default()
        }
    }

    /// Updates the projection with current view state.
    pub fn update(&mut self, zoom: f32, pan_offset: Vec2, screen_rect: Rect) {
        self.zoom = zoom;
        self.pan_offset = pan_offset;
        self.screen_rect = screen_rect;
    }

    fn effective_range(&self) -> f64 {
        self.range_deg / self.zoom as f64
    }

    fn lat_correction(&self) -> f64 {
        self.center_lat.to_radians().cos().max(0.01)
    }

    /// Converts geographic coordinates (lon, lat) to screen position.
    ///
    /// Equirectangular with a cosine latitude correction, which is adequate
    /// at city and regional scale.
    pub fn geo_to_screen(&self, coord: Coord<f64>) -> Pos2 {
        let effective_range = self.effective_range();

        let rel_lon = (coord.x - self.center_lon) * self.lat_correction();
        let rel_lat = coord.y - self.center_lat;

        let norm_x = rel_lon / effective_range;
        let norm_y = -rel_lat / effective_range; // Screen Y increases downward

        let center = self.screen_rect.center() + self.pan_offset;
        let half_size = self.screen_rect.size().min_elem() / 2.0;

        Pos2::new(
            center.x + (norm_x as f32) * half_size,
            center.y + (norm_y as f32) * half_size,
        )
    }

    /// Converts screen position to geographic coordinates (lon, lat).
    pub fn screen_to_geo(&self, pos: Pos2) -> Coord<f64> {
        let effective_range = self.effective_range();

        let center = self.screen_rect.center() + self.pan_offset;
        let half_size = self.screen_rect.size().min_elem() / 2.0;

        let norm_x = (pos.x - center.x) / half_size;
        let norm_y = (pos.y - center.y) / half_size;

        let rel_lon = (norm_x as f64) * effective_range / self.lat_correction();
        let rel_lat = -(norm_y as f64) * effective_range;

        Coord {
            x: self.center_lon + rel_lon,
            y: self.center_lat + rel_lat,
        }
    }

    /// Returns the visible geographic bounds as (min_lon, min_lat, max_lon, max_lat).
    pub fn visible_bounds(&self) -> (f64, f64, f64, f64) {
        let top_left = self.screen_to_geo(self.screen_rect.left_top());
        let bottom_right = self.screen_to_geo(self.screen_rect.right_bottom());

        (
            top_left.x.min(bottom_right.x),
            top_left.y.min(bottom_right.y),
            top_left.x.max(bottom_right.x),
            top_left.y.max(bottom_right.y),
        )
    }

    /// Checks if a coordinate is within the visible bounds (with margin).
    pub fn is_visible(&self, coord: Coord<f64>, margin_deg: f64) -> bool {
        let (min_lon, min_lat, max_lon, max_lat) = self.visible_bounds();
        coord.x >= min_lon - margin_deg
            && coord.x <= max_lon + margin_deg
            && coord.y >= min_lat - margin_deg
            && coord.y <= max_lat + margin_deg
    }

    /// Checks if a bounding box intersects with the visible bounds.
    pub fn bbox_visible(&self, min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> bool {
        let (vis_min_lon, vis_min_lat, vis_max_lon, vis_max_lat) = self.visible_bounds();

        // Margin scales with the view so thick strokes at the edge still draw
        let margin = self.effective_range() * 0.1;
        !(max_lon < vis_min_lon - margin
            || min_lon > vis_max_lon + margin
            || max_lat < vis_min_lat - margin
            || min_lat > vis_max_lat + margin)
    }

    /// Computes a view that frames `bounds` (min_lon, min_lat, max_lon, max_lat)
    /// in the current screen rect, leaving `padding` of the half-size free.
    ///
    /// Returns (center_lon, center_lat, zoom) for a zero pan offset.
    pub fn fit_bounds(&self, bounds: (f64, f64, f64, f64), padding: f32) -> (f64, f64, f32) {
        let (min_lon, min_lat, max_lon, max_lat) = bounds;
        let center_lon = (min_lon + max_lon) / 2.0;
        let center_lat = (min_lat + max_lat) / 2.0;

        let lat_correction = center_lat.to_radians().cos().max(0.01);
        let size = self.screen_rect.size();
        let half_size = size.min_elem() as f64 / 2.0;
        let usable = (1.0 - padding.clamp(0.0, 0.9)) as f64;

        // Degrees needed to cover each half-extent, in units of half_size
        let half_w_deg = (max_lon - min_lon) / 2.0 * lat_correction;
        let half_h_deg = (max_lat - min_lat) / 2.0;
        let need_x = half_w_deg * half_size / (size.x as f64 / 2.0);
        let need_y = half_h_deg * half_size / (size.y as f64 / 2.0);
        let needed = need_x.max(need_y) / usable;

        // Degenerate canvas: keep the current zoom
        if !needed.is_finite() {
            return (center_lon, center_lat, self.zoom);
        }

        let zoom = if needed <= f64::EPSILON {
            MAX_ZOOM
        } else {
            (self.range_deg / needed) as f32
        };

        (center_lon, center_lat, zoom.clamp(MIN_ZOOM, MAX_ZOOM))
    }
}

/// Distance in pixels from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection() -> MapProjection {
        let mut p = MapProjection::new(45.0, -75.0);
        p.update(
            1.0,
            Vec2::ZERO,
            Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0)),
        );
        p
    }

    #[test]
    fn test_center_maps_to_screen_center() {
        let p = projection();
        let pos = p.geo_to_screen(Coord { x: -75.0, y: 45.0 });
        assert!((pos.x - 400.0).abs() < 1e-3);
        assert!((pos.y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_screen_geo_round_trip() {
        let mut p = projection();
        p.update(3.0, Vec2::new(25.0, -40.0), p.screen_rect);
        let coord = Coord {
            x: -75.12,
            y: 45.08,
        };
        let back = p.screen_to_geo(p.geo_to_screen(coord));
        assert!((back.x - coord.x).abs() < 1e-4);
        assert!((back.y - coord.y).abs() < 1e-4);
    }

    #[test]
    fn test_north_is_up() {
        let p = projection();
        let south = p.geo_to_screen(Coord { x: -75.0, y: 44.9 });
        let north = p.geo_to_screen(Coord { x: -75.0, y: 45.1 });
        assert!(north.y < south.y);
    }

    #[test]
    fn test_fit_bounds_contains_box() {
        let mut p = projection();
        let bounds = (-75.8, 45.3, -75.6, 45.5);
        let (lon, lat, zoom) = p.fit_bounds(bounds, 0.1);
        assert!((lon + 75.7).abs() < 1e-9);
        assert!((lat - 45.4).abs() < 1e-9);

        p.center_lon = lon;
        p.center_lat = lat;
        p.update(zoom, Vec2::ZERO, p.screen_rect);
        let rect = p.screen_rect;
        for corner in [(-75.8, 45.3), (-75.6, 45.5)] {
            let pos = p.geo_to_screen(Coord {
                x: corner.0,
                y: corner.1,
            });
            assert!(rect.expand(0.5).contains(pos), "{pos:?} outside {rect:?}");
        }
    }

    #[test]
    fn test_fit_bounds_single_point_clamps_zoom() {
        let p = projection();
        let (_, _, zoom) = p.fit_bounds((-75.0, 45.0, -75.0, 45.0), 0.1);
        assert_eq!(zoom, MAX_ZOOM);
    }

    #[test]
    fn test_fit_bounds_empty_rect_keeps_zoom() {
        let mut p = projection();
        p.update(2.5, Vec2::ZERO, Rect::from_min_size(Pos2::ZERO, Vec2::ZERO));
        let (lon, lat, zoom) = p.fit_bounds((-75.8, 45.3, -75.6, 45.5), 0.1);
        assert!((lon + 75.7).abs() < 1e-9);
        assert!((lat - 45.4).abs() < 1e-9);
        assert_eq!(zoom, 2.5);
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert!((distance_to_segment(Pos2::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-6);
        assert!((distance_to_segment(Pos2::new(13.0, 4.0), a, b) - 5.0).abs() < 1e-6);
        assert!((distance_to_segment(Pos2::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-6);
    }
}
