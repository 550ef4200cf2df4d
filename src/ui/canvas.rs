//! Central canvas UI: boundaries and transit routes.

use crate::geo::{self, BoundaryLayerSet};
use crate::map::{MapStyle, RouteSource};
use crate::state::AppState;
use eframe::egui::{self, Color32, Rect, RichText, Sense, Vec2};

/// Extra pick radius around a route's stroke, in pixels.
const HIT_TOLERANCE: f32 = 5.0;

pub fn render_canvas(
    ctx: &egui::Context,
    state: &mut AppState,
    style: &MapStyle,
    boundaries: &BoundaryLayerSet,
    source: &mut RouteSource,
) {
    egui::CentralPanel::default()
        .frame(egui::Frame::NONE)
        .show(ctx, |ui| {
            let available_size = ui.available_size();

            // Allocate the full available space for the canvas
            let (response, painter) =
                ui.allocate_painter(available_size, Sense::click_and_drag());

            let rect = response.rect;

            // The map exists once it has a real viewport
            if rect.width() > 0.0 && rect.height() > 0.0 {
                source.attach();
            }

            state.view.screen_rect = Some(rect);
            state.view.apply_pending_fit(rect);

            painter.rect_filled(rect, 0.0, style.background);

            let projection = state.view.projection(rect);

            if state.settings.show_boundaries {
                geo::render_boundaries(
                    &painter,
                    boundaries,
                    &projection,
                    state.settings.boundary_labels,
                );
            }

            if state.settings.show_routes {
                geo::render_routes(
                    &painter,
                    source.routes(),
                    &projection,
                    state.selected_route.as_deref(),
                    state.settings.route_labels,
                );
            }

            draw_overlay_info(ui, &rect, state, source);

            handle_canvas_interaction(&response, &rect, state, source);
        });
}

fn draw_overlay_info(ui: &mut egui::Ui, rect: &Rect, state: &AppState, source: &RouteSource) {
    let overlay_pos = rect.left_top() + Vec2::new(10.0, 10.0);
    let overlay_rect = Rect::from_min_size(overlay_pos, Vec2::new(180.0, 40.0));

    let text_color = Color32::from_rgb(200, 200, 220);
    ui.scope_builder(egui::UiBuilder::new().max_rect(overlay_rect), |ui| {
        ui.vertical(|ui| {
            ui.label(
                RichText::new(format!("Zoom: {:.2}x", state.view.zoom))
                    .monospace()
                    .size(12.0)
                    .color(text_color),
            );
            ui.label(
                RichText::new(format!("Routes on map: {}", source.routes().len()))
                    .monospace()
                    .size(12.0)
                    .color(text_color),
            );
        });
    });
}

fn handle_canvas_interaction(
    response: &egui::Response,
    rect: &Rect,
    state: &mut AppState,
    source: &RouteSource,
) {
    // Handle dragging for panning
    if response.dragged() {
        state.view.pan_offset += response.drag_delta();
    }

    // Handle scroll for zooming relative to cursor position
    if response.hovered() {
        let scroll_delta = response.ctx.input(|i| i.raw_scroll_delta);
        if scroll_delta.y != 0.0 {
            let zoom_factor = 1.0 + scroll_delta.y * 0.001;
            state
                .view
                .zoom_about(zoom_factor, response.hover_pos(), *rect);
        }
    }

    state.view.hover_geo = response.hover_pos().map(|pos| {
        let c = state.view.projection(*rect).screen_to_geo(pos);
        (c.x, c.y)
    });

    // Reset view on double-click
    if response.double_clicked() {
        state.view.reset();
        return;
    }

    if response.clicked() && state.settings.show_routes {
        if let Some(pos) = response.interact_pointer_pos() {
            let projection = state.view.projection(*rect);
            let hit = geo::hit_test_route(source.routes(), &projection, pos, HIT_TOLERANCE);
            state.select_route(hit.map(|route| route.id.clone()));
        }
    }
}
