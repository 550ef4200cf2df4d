//! Right panel UI: layer toggles and the selected route.

use crate::geo::BoundaryLayerSet;
use crate::routes::{format_hex_color, parse_hex_color};
use crate::state::AppState;
use eframe::egui::{self, Color32, RichText, ScrollArea};

pub fn render_right_panel(
    ctx: &egui::Context,
    state: &mut AppState,
    boundaries: &mut BoundaryLayerSet,
) {
    egui::SidePanel::right("right_panel")
        .resizable(true)
        .default_width(230.0)
        .min_width(180.0)
        .max_width(350.0)
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Map");
                ui.separator();

                render_layers_section(ui, state, boundaries);
                ui.add_space(5.0);

                render_selected_route_section(ui, state);
            });
        });
}

fn render_layers_section(
    ui: &mut egui::Ui,
    state: &mut AppState,
    boundaries: &mut BoundaryLayerSet,
) {
    egui::CollapsingHeader::new(RichText::new("Layers").strong())
        .default_open(true)
        .show(ui, |ui| {
            let settings = &mut state.settings;
            let mut changed = false;

            changed |= ui.checkbox(&mut settings.show_routes, "Routes").changed();
            changed |= ui
                .checkbox(&mut settings.route_labels, "Route Names")
                .changed();
            changed |= ui
                .checkbox(&mut settings.show_boundaries, "Boundaries")
                .changed();
            changed |= ui
                .checkbox(&mut settings.boundary_labels, "Boundary Labels")
                .changed();

            if changed {
                settings.save();
            }

            if boundaries.is_empty() {
                return;
            }

            ui.separator();
            ui.label(
                RichText::new(format!(
                    "Boundary Layers: {} ({} features)",
                    boundaries.len(),
                    boundaries.feature_count()
                ))
                .small(),
            );

            ui.add_enabled_ui(state.settings.show_boundaries, |ui| {
                for layer in boundaries.iter_mut() {
                    ui.checkbox(
                        &mut layer.visible,
                        format!("{} ({})", layer.name, layer.features.len()),
                    );
                }
            });
        });
}

fn render_selected_route_section(ui: &mut egui::Ui, state: &mut AppState) {
    egui::CollapsingHeader::new(RichText::new("Selected Route").strong())
        .default_open(true)
        .show(ui, |ui| {
            let Some(editor) = state.route_editor.as_mut() else {
                ui.label(
                    RichText::new("Click a route to select it")
                        .italics()
                        .color(Color32::GRAY),
                );
                return;
            };
            let Some(route) = state.registry.get_route(&editor.route_id) else {
                return;
            };

            ui.label(RichText::new(&route.id).monospace().small());
            ui.label(format!("{} points", route.coordinates.len()));
            if let Some(metadata) = &route.metadata {
                for (key, value) in metadata {
                    ui.label(RichText::new(format!("{}: {}", key, value)).small());
                }
            }

            ui.add_space(4.0);

            egui::Grid::new("route_editor_grid")
                .num_columns(2)
                .spacing([8.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Name");
                    ui.text_edit_singleline(&mut editor.name);
                    ui.end_row();

                    ui.label("Colour");
                    ui.horizontal(|ui| {
                        ui.add(egui::TextEdit::singleline(&mut editor.color).desired_width(80.0));
                        if let Some(mut color) = parse_hex_color(&editor.color) {
                            if ui.color_edit_button_srgba(&mut color).changed() {
                                editor.color = format_hex_color(color);
                            }
                        }
                    });
                    ui.end_row();

                    ui.label("Width");
                    ui.add(
                        egui::DragValue::new(&mut editor.line_width)
                            .range(0.5..=20.0)
                            .speed(0.1),
                    );
                    ui.end_row();
                });

            let patch = editor.to_patch(route);
            let id = editor.route_id.clone();

            ui.add_enabled_ui(!patch.is_empty(), |ui| {
                if ui.button("Apply").clicked() {
                    match state.update_route(&id, patch) {
                        Ok(()) => state.status_message = format!("Updated {}", id),
                        Err(e) => state.status_message = e.to_string(),
                    }
                }
            });
        });
}
