//! Map view state (center, zoom, pan).

use crate::geo::{MapProjection, MAX_ZOOM, MIN_ZOOM};
use eframe::egui::{Pos2, Rect, Vec2};

/// Ottawa, where the sample routes run.
const HOME_LAT: f64 = 45.4215;
const HOME_LON: f64 = -75.6972;

/// View state for the map canvas.
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Geographic center latitude
    pub center_lat: f64,

    /// Geographic center longitude
    pub center_lon: f64,

    /// Current zoom level (1.0 = 100%)
    pub zoom: f32,

    /// Current pan offset from center
    pub pan_offset: Vec2,

    /// Bounds to frame once the canvas size is known
    pub pending_fit: Option<(f64, f64, f64, f64)>,

    /// Geographic position under the pointer
    pub hover_geo: Option<(f64, f64)>,

    /// Canvas rect from the last frame
    pub screen_rect: Option<Rect>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            center_lat: HOME_LAT,
            center_lon: HOME_LON,
            zoom: 1.0,
            pan_offset: Vec2::ZERO,
            pending_fit: None,
            hover_geo: None,
            screen_rect: None,
        }
    }
}

impl ViewState {
    /// Builds the projection for a canvas rect.
    pub fn projection(&self, rect: Rect) -> MapProjection {
        let mut projection = MapProjection::new(self.center_lat, self.center_lon);
        projection.update(self.zoom, self.pan_offset, rect);
        projection
    }

    /// Asks the canvas to frame `bounds` on its next frame.
    pub fn request_fit(&mut self, bounds: (f64, f64, f64, f64)) {
        self.pending_fit = Some(bounds);
    }

    /// Applies a pending fit against the canvas rect.
    /// An empty rect leaves the fit pending.
    pub fn apply_pending_fit(&mut self, rect: Rect) {
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return;
        }
        let Some(bounds) = self.pending_fit.take() else {
            return;
        };
        let (lon, lat, zoom) = self.projection(rect).fit_bounds(bounds, 0.1);
        self.center_lon = lon;
        self.center_lat = lat;
        self.zoom = zoom;
        self.pan_offset = Vec2::ZERO;
    }

    /// Centers on a location at a zoom level.
    pub fn recenter(&mut self, lon: f64, lat: f64, zoom: f32) {
        self.center_lon = lon;
        self.center_lat = lat;
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan_offset = Vec2::ZERO;
    }

    /// Multiplies the zoom, keeping the point under `anchor` fixed.
    pub fn zoom_about(&mut self, factor: f32, anchor: Option<Pos2>, rect: Rect) {
        let old_zoom = self.zoom;
        let new_zoom = (old_zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        if let Some(cursor_pos) = anchor {
            let cursor_rel = cursor_pos - rect.center();
            let ratio = new_zoom / old_zoom;
            self.pan_offset = cursor_rel * (1.0 - ratio) + self.pan_offset * ratio;
        }

        self.zoom = new_zoom;
    }

    /// The geographic point at the middle of the canvas.
    pub fn visible_center(&self, rect: Rect) -> (f64, f64) {
        let c = self.projection(rect).screen_to_geo(rect.center());
        (c.x, c.y)
    }

    /// Returns to the home view.
    pub fn reset(&mut self) {
        self.recenter(HOME_LON, HOME_LAT, 1.0);
    }
}
