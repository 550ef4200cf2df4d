//! Top bar UI: app title, map style and status.

use crate::geo;
use crate::map::MapStyle;
use crate::state::AppState;
use eframe::egui::{self, Color32, RichText};

pub fn render_top_bar(ctx: &egui::Context, state: &AppState, style: &MapStyle, busy: bool) {
    egui::TopBottomPanel::top("top_bar")
        .exact_height(36.0)
        .show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                ui.label(
                    RichText::new("Transit Map Viewer")
                        .strong()
                        .size(16.0)
                        .color(Color32::WHITE),
                );

                ui.separator();

                ui.label(RichText::new("Style:").size(12.0).color(Color32::GRAY));
                ui.label(
                    RichText::new(style.display_name())
                        .size(12.0)
                        .monospace(),
                )
                .on_hover_text(&style.url);

                ui.separator();

                if busy {
                    ui.spinner();
                }
                ui.label(
                    RichText::new(&state.status_message)
                        .size(13.0)
                        .color(Color32::GRAY),
                );

                if let Some((lon, lat)) = state.view.hover_geo {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        // Statistics Canada Lambert, for comparing with census data
                        if let Ok((x, y)) = geo::wgs84_to_epsg3347(lon, lat) {
                            ui.label(
                                RichText::new(format!("EPSG:3347 {:.0} {:.0}", x, y))
                                    .monospace()
                                    .size(12.0)
                                    .color(Color32::DARK_GRAY),
                            );
                            ui.separator();
                        }
                        ui.label(
                            RichText::new(format!("{:.5}, {:.5}", lon, lat))
                                .monospace()
                                .size(12.0)
                                .color(Color32::GRAY),
                        );
                    });
                }
            });
        });
}
