//! UI overlays using bevy_egui

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use chrono::NaiveDateTime;

use monudash_core::{LoadPhase, Monument, OSM_ATTRIBUTION};

use crate::app::{HoveredMonument, MonumentRegistry, SelectedMonument};
use crate::viewer::{ViewerInput, ViewerRegion, ViewerState};

const PANEL_WIDTH: f32 = 320.0;
const VIEWER_REGION_HEIGHT: f32 = 260.0;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        // Main UI system runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
        app.add_systems(EguiPrimaryContextPass, ui_system);
    }
}

fn ui_system(
    mut contexts: EguiContexts,
    registry: Res<MonumentRegistry>,
    mut selected: ResMut<SelectedMonument>,
    hovered: Res<HoveredMonument>,
    viewer_state: Res<ViewerState>,
    mut viewer_region: ResMut<ViewerRegion>,
    mut viewer_input: ResMut<ViewerInput>,
) {
    // Get the egui context - early return if not available
    let Ok(ctx) = contexts.ctx_mut() else { return };

    // The viewer viewport is re-established below only while the panel
    // actually shows a live model region
    viewer_region.rect = None;

    match &registry.phase {
        LoadPhase::Loading => {
            show_full_page_message(ctx, "Loading monuments...", egui::Color32::LIGHT_GRAY);
            return;
        }
        LoadPhase::Failed(message) => {
            // Data load failure replaces the whole UI - no partial render, no retry
            show_full_page_message(
                ctx,
                &format!("Error: {}", message),
                egui::Color32::from_rgb(220, 90, 90),
            );
            return;
        }
        LoadPhase::Ready => {}
    }

    // Status bar with the required tile attribution
    egui::TopBottomPanel::bottom("info_panel")
        .max_height(40.0)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("MonuDash - Aachen Monument Registry");
                ui.separator();
                ui.label(format!(
                    "{} monuments ({} on map)",
                    registry.monuments.len(),
                    registry.mapped_count()
                ));
                ui.separator();
                ui.label(OSM_ATTRIBUTION);
                ui.separator();
                ui.label("Drag to orbit | Scroll to zoom | Right-drag to pan");
            });
        });

    // Selected monument details (right side, only if selected)
    if let Some(id) = selected.0.clone() {
        if let Some(monument) = registry.get(&id) {
            egui::SidePanel::right("details_panel")
                .default_width(PANEL_WIDTH)
                .resizable(true)
                .show(ctx, |ui| {
                    ui.heading(monument.display_name());
                    ui.separator();

                    egui::ScrollArea::vertical().show(ui, |ui| {
                        monument_field_grid(ui, monument);

                        if let Some(ref url) = monument.url {
                            ui.add_space(4.0);
                            ui.hyperlink_to("More details", url);
                        }

                        // Model viewer region, only for records that have a model
                        if monument.model_path.is_some() {
                            ui.separator();
                            ui.label("3D Model");
                            model_viewer_region(
                                ui,
                                &viewer_state,
                                &mut viewer_region,
                                &mut viewer_input,
                            );
                        }

                        ui.separator();

                        if ui
                            .add(egui::Button::new("Close").min_size(egui::vec2(
                                ui.available_width(),
                                28.0,
                            )))
                            .clicked()
                        {
                            selected.0 = None;
                        }
                    });
                });
        }
    }

    // Hover popup next to the pointer
    if let Some(id) = hovered.0.as_deref() {
        if let Some(monument) = registry.get(id) {
            if let Some(pos) = ctx.input(|i| i.pointer.hover_pos()) {
                egui::Area::new(egui::Id::new("marker_popup"))
                    .fixed_pos(pos + egui::vec2(14.0, -10.0))
                    .order(egui::Order::Tooltip)
                    .show(ctx, |ui| {
                        egui::Frame::popup(ui.style()).show(ui, |ui| {
                            ui.strong(monument.display_name());
                            ui.label(&monument.kind);
                            if let Some(ref address) = monument.address {
                                ui.label(
                                    egui::RichText::new(address)
                                        .size(11.0)
                                        .color(egui::Color32::GRAY),
                                );
                            }
                        });
                    });
            }
        }
    }
}

/// Full-page overlay used for the loading and error views
fn show_full_page_message(ctx: &egui::Context, message: &str, color: egui::Color32) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.centered_and_justified(|ui| {
            ui.label(egui::RichText::new(message).size(18.0).color(color));
        });
    });
}

/// Two-column grid of the monument's textual fields
fn monument_field_grid(ui: &mut egui::Ui, monument: &Monument) {
    egui::Grid::new("monument_grid")
        .num_columns(2)
        .spacing([10.0, 4.0])
        .show(ui, |ui| {
            ui.label("ID:");
            ui.label(monument.id.as_str());
            ui.end_row();

            if let Some(ref official_id) = monument.official_id {
                ui.label("Registry no:");
                ui.label(official_id);
                ui.end_row();
            }

            ui.label("Category:");
            ui.label(&monument.kind);
            ui.end_row();

            if let Some(ref address) = monument.address {
                ui.label("Address:");
                ui.label(address);
                ui.end_row();
            }

            if let (Some(lat), Some(lng)) = (monument.lat, monument.lng) {
                ui.label("Coordinates:");
                ui.label(format_coordinates(lat, lng));
                ui.end_row();
            }

            if let Some(entry_date) = monument.entry_date {
                ui.label("Entry date:");
                ui.label(format_date(entry_date));
                ui.end_row();
            }

            if let Some(deletion_date) = monument.deletion_date {
                ui.label("Removed:");
                ui.label(format_date(deletion_date));
                ui.end_row();
            }
        });
}

/// Reserve the embedded viewer rectangle and feed orbit input to it.
/// A failed load swaps the region for a static error box; the rest of the
/// panel stays untouched.
fn model_viewer_region(
    ui: &mut egui::Ui,
    viewer_state: &ViewerState,
    viewer_region: &mut ViewerRegion,
    viewer_input: &mut ViewerInput,
) {
    let size = egui::vec2(ui.available_width(), VIEWER_REGION_HEIGHT);

    if let Some(message) = viewer_state.failure_message() {
        let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
        ui.painter()
            .rect_filled(rect, 4.0, egui::Color32::from_rgb(60, 20, 20));
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            format!("Error loading model: {}", message),
            egui::FontId::proportional(13.0),
            egui::Color32::from_rgb(230, 140, 140),
        );
        return;
    }

    let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());

    if response.dragged() {
        let delta = response.drag_delta();
        viewer_input.orbit_delta += Vec2::new(delta.x, delta.y);
    }
    if response.hovered() {
        viewer_input.zoom_delta += ui.input(|i| i.raw_scroll_delta.y);
    }

    // Hand the rectangle to the viewer camera, in physical pixels
    let ppp = ui.ctx().pixels_per_point();
    viewer_region.rect = Some(URect::new(
        (rect.min.x * ppp).round() as u32,
        (rect.min.y * ppp).round() as u32,
        (rect.max.x * ppp).round() as u32,
        (rect.max.y * ppp).round() as u32,
    ));

    ui.label(
        egui::RichText::new("Drag to orbit, scroll to zoom")
            .size(11.0)
            .color(egui::Color32::GRAY),
    );
}

/// Format a record date for the details grid
fn format_date(date: NaiveDateTime) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Format a coordinate pair for the details grid
fn format_coordinates(lat: f64, lng: f64) -> String {
    format!("{:.5}, {:.5}", lat, lng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(1985, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format_date(date), "1985-03-01");
    }

    #[test]
    fn test_format_coordinates() {
        assert_eq!(format_coordinates(50.7753, 6.0839), "50.77530, 6.08390");
    }
}
