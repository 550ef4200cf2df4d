//! Left panel UI: route list, add-route form, import and reload.

use crate::file_ops::FilePickerChannel;
use crate::state::AppState;
use eframe::egui::{self, Color32, RichText, ScrollArea, Sense, Vec2};

enum RouteAction {
    Select(String),
    ZoomTo(String),
    Remove(String),
}

pub fn render_left_panel(
    ctx: &egui::Context,
    state: &mut AppState,
    file_picker: &FilePickerChannel,
    can_reload: bool,
) {
    egui::SidePanel::left("left_panel")
        .resizable(true)
        .default_width(260.0)
        .min_width(200.0)
        .max_width(400.0)
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Routes");
                ui.separator();

                render_route_list(ui, state);
                ui.add_space(10.0);

                render_add_form(ui, state);
                ui.add_space(10.0);

                render_data_section(ui, ctx, state, file_picker, can_reload);
            });
        });
}

fn render_route_list(ui: &mut egui::Ui, state: &mut AppState) {
    if state.registry.is_empty() {
        ui.label(RichText::new("No routes loaded").italics().color(Color32::GRAY));
        return;
    }

    let mut action = None;

    for route in state.registry.routes() {
        let selected = state.selected_route.as_deref() == Some(route.id.as_str());

        ui.horizontal(|ui| {
            let (swatch, _) = ui.allocate_exact_size(Vec2::new(12.0, 12.0), Sense::hover());
            ui.painter().rect_filled(swatch, 2.0, route.stroke_color());

            if ui
                .selectable_label(selected, &route.name)
                .on_hover_text(format!("{} ({} points)", route.id, route.coordinates.len()))
                .clicked()
            {
                action = Some(RouteAction::Select(route.id.clone()));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("\u{2715}").on_hover_text("Remove").clicked() {
                    action = Some(RouteAction::Remove(route.id.clone()));
                }
                if ui.small_button("Zoom").clicked() {
                    action = Some(RouteAction::ZoomTo(route.id.clone()));
                }
            });
        });
    }

    match action {
        Some(RouteAction::Select(id)) => {
            if state.selected_route.as_deref() == Some(id.as_str()) {
                state.select_route(None);
            } else {
                state.select_route(Some(id));
            }
        }
        Some(RouteAction::ZoomTo(id)) => {
            if let Some(bounds) = state.registry.get_route(&id).and_then(|r| r.bounds()) {
                state.view.request_fit(bounds);
            }
            state.select_route(Some(id));
        }
        Some(RouteAction::Remove(id)) => match state.remove_route(&id) {
            Ok(route) => state.status_message = format!("Removed {}", route.name),
            Err(e) => state.status_message = e.to_string(),
        },
        None => {}
    }
}

fn render_add_form(ui: &mut egui::Ui, state: &mut AppState) {
    egui::CollapsingHeader::new(RichText::new("Add Route").strong())
        .default_open(false)
        .show(ui, |ui| {
            let form = &mut state.route_form;

            egui::Grid::new("add_route_grid")
                .num_columns(2)
                .spacing([8.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Id");
                    ui.text_edit_singleline(&mut form.id);
                    ui.end_row();

                    ui.label("Name");
                    ui.text_edit_singleline(&mut form.name);
                    ui.end_row();

                    ui.label("Colour");
                    ui.add(egui::TextEdit::singleline(&mut form.color).desired_width(80.0));
                    ui.end_row();

                    ui.label("Width");
                    ui.add(
                        egui::DragValue::new(&mut form.line_width)
                            .range(0.5..=20.0)
                            .speed(0.1),
                    );
                    ui.end_row();
                });

            ui.label(RichText::new("Coordinates (lon,lat; lon,lat)").small());
            ui.add(
                egui::TextEdit::multiline(&mut form.coordinates)
                    .desired_rows(3)
                    .font(egui::TextStyle::Monospace),
            );

            if ui.button("Add").clicked() {
                let result = state
                    .route_form
                    .build()
                    .and_then(|route| state.add_route(route).map_err(|e| e.to_string()));
                match result {
                    Ok(()) => {
                        state.status_message = "Route added".to_string();
                        state.route_form.clear();
                    }
                    Err(e) => state.status_message = e,
                }
            }
        });
}

fn render_data_section(
    ui: &mut egui::Ui,
    ctx: &egui::Context,
    state: &mut AppState,
    file_picker: &FilePickerChannel,
    can_reload: bool,
) {
    egui::CollapsingHeader::new(RichText::new("Data").strong())
        .default_open(true)
        .show(ui, |ui| {
            let is_picking = state.import_in_progress;

            ui.add_enabled_ui(!is_picking, |ui| {
                if ui
                    .button("Import file...")
                    .on_hover_text("Routes (.json, .geojson) or boundaries (.geojson, .shp)")
                    .clicked()
                {
                    state.import_in_progress = true;
                    state.status_message = "Opening file dialog...".to_string();
                    file_picker.pick_files(ctx.clone());
                }
            });

            if is_picking {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Selecting files...");
                });
            }

            ui.add_enabled_ui(can_reload, |ui| {
                if ui
                    .button("Reload routes")
                    .on_disabled_hover_text("No route endpoint configured")
                    .clicked()
                {
                    state.reload_requested = true;
                }
            });

            ui.label(
                RichText::new(format!("{} route(s)", state.registry.len()))
                    .small()
                    .color(Color32::GRAY),
            );
        });
}
