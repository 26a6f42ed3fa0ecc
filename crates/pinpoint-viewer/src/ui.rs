//! egui chrome: import toolbar, hotspot list, billboard labels and the label prompt

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use pinpoint_core::{GlbSummary, HotspotId, MODEL_EXTENSION};

use crate::app::ViewerSettings;
use crate::file_loader::UrlImport;
use crate::file_picker::{trigger_file_open, FileFilter, PendingFileResults};
use crate::hotspots::HotspotPrompt;
use crate::models::ViewerSession;
use crate::scene::{CameraSettings, MainCamera};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        // Main UI system runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
        app.add_systems(EguiPrimaryContextPass, ui_system);
    }
}

/// Grouped system parameters for the main UI system
#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub session: ResMut<'w, ViewerSession>,
    pub prompt: ResMut<'w, HotspotPrompt>,
    pub camera_settings: ResMut<'w, CameraSettings>,
    pub camera_query: Query<'w, 's, (&'static Camera, &'static GlobalTransform), With<MainCamera>>,
    pub pending_file_results: Res<'w, PendingFileResults>,
    pub url_import: Res<'w, UrlImport>,
    pub settings: Res<'w, ViewerSettings>,
}

/// Things the user asked for this frame, applied once drawing is done
enum UiAction {
    Import,
    Delete(HotspotId),
    ClearHotspots,
    Focus(Vec3),
    DismissError,
}

/// Human-readable byte count
fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KIB {
        format!("{} B", bytes)
    } else if bytes_f < KIB * KIB {
        format!("{:.1} KB", bytes_f / KIB)
    } else {
        format!("{:.1} MB", bytes_f / (KIB * KIB))
    }
}

fn format_point(point: [f32; 3]) -> String {
    format!("({:.2}, {:.2}, {:.2})", point[0], point[1], point[2])
}

fn describe_summary(summary: &GlbSummary) -> String {
    let mut text = format!(
        "{} mesh{}, {} node{}",
        summary.mesh_count,
        if summary.mesh_count == 1 { "" } else { "es" },
        summary.node_count,
        if summary.node_count == 1 { "" } else { "s" },
    );
    if let Some(generator) = &summary.generator {
        text.push_str(&format!(" · {}", generator));
    }
    text
}

fn error_banner(ui: &mut egui::Ui, message: &str, actions: &mut Vec<UiAction>) {
    ui.horizontal(|ui| {
        ui.colored_label(egui::Color32::from_rgb(255, 110, 110), format!("⚠ {}", message));
        if ui.small_button("✕").on_hover_text("Dismiss").clicked() {
            actions.push(UiAction::DismissError);
        }
    });
}

fn ui_system(mut params: UiParams) {
    // Get the egui context - early return if not available
    let Ok(ctx) = params.contexts.ctx_mut() else { return };

    let mut actions: Vec<UiAction> = Vec::new();
    let loading = params.session.is_loading() || params.url_import.loading;
    let loading_name = params
        .session
        .pending()
        .map(|p| p.name.clone())
        .or_else(|| params.url_import.url.clone());
    let error = params.session.error().map(|e| e.to_string());
    let modifier = params.settings.interaction.modifier;

    let Some(model) = params.session.model() else {
        // Nothing loaded yet: a placeholder instead of the viewport chrome
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.3);
                ui.heading("Pinpoint");
                ui.add_space(8.0);
                ui.label(format!("Import a .{} file to start placing hotspots.", MODEL_EXTENSION));
                ui.add_space(12.0);

                if loading {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(format!("Loading {}…", loading_name.as_deref().unwrap_or("model")));
                    });
                } else if ui.button(format!("Import .{}", MODEL_EXTENSION)).clicked() {
                    actions.push(UiAction::Import);
                }

                if let Some(message) = &error {
                    ui.add_space(12.0);
                    error_banner(ui, message, &mut actions);
                }
            });
        });
        apply_actions(&mut params, actions);
        return;
    };

    let hotspot_count = params.session.hotspots().len();

    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui.add_enabled(!loading, egui::Button::new(format!("Import .{}", MODEL_EXTENSION))).clicked() {
                actions.push(UiAction::Import);
            }
            ui.separator();

            ui.strong(&model.name);
            ui.label(format_size(model.size_bytes));
            ui.weak(describe_summary(&model.summary));

            if loading {
                ui.separator();
                ui.spinner();
                ui.label(format!("Loading {}…", loading_name.as_deref().unwrap_or("model")));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(hotspot_count > 0, egui::Button::new(format!("Clear hotspots ({})", hotspot_count)))
                    .clicked()
                {
                    actions.push(UiAction::ClearHotspots);
                }
                ui.weak(format!("{}+click the model to add a hotspot", modifier.label()));
            });
        });

        if let Some(message) = &error {
            error_banner(ui, message, &mut actions);
        }
    });

    egui::SidePanel::right("hotspots_panel")
        .default_width(240.0)
        .resizable(true)
        .show(ctx, |ui| {
            ui.heading("Hotspots");
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                if hotspot_count == 0 {
                    ui.weak("None yet.");
                }

                for hotspot in params.session.hotspots() {
                    ui.horizontal(|ui| {
                        let label = ui
                            .selectable_label(false, egui::RichText::new(&hotspot.label).strong())
                            .on_hover_text("Centre the camera here");
                        if label.clicked() {
                            actions.push(UiAction::Focus(Vec3::from_array(hotspot.position)));
                        }
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("✕").on_hover_text("Delete hotspot").clicked() {
                                actions.push(UiAction::Delete(hotspot.id.clone()));
                            }
                        });
                    });
                    ui.weak(format!(
                        "{}  ·  {}",
                        format_point(hotspot.position),
                        hotspot.created_at.with_timezone(&chrono::Local).format("%H:%M:%S"),
                    ));
                    ui.add_space(4.0);
                }
            });

            ui.add_space(8.0);
            egui::CollapsingHeader::new("Controls").default_open(true).show(ui, |ui| {
                ui.label("Left drag: rotate");
                ui.label("Right drag: pan");
                ui.label("Scroll: zoom");
                ui.label(format!("{}+click: add hotspot", modifier.label()));
            });
        });

    // Billboard labels anchored to each hotspot's screen position
    if let Ok((camera, camera_transform)) = params.camera_query.single() {
        let forward = *camera_transform.forward();
        for hotspot in params.session.hotspots() {
            let world = Vec3::from_array(hotspot.position);
            if (world - camera_transform.translation()).dot(forward) <= 0.0 {
                continue;
            }
            let Ok(screen) = camera.world_to_viewport(camera_transform, world) else {
                continue;
            };

            egui::Area::new(egui::Id::new(("hotspot_label", hotspot.id.as_str())))
                .fixed_pos(egui::pos2(screen.x + 8.0, screen.y - 12.0))
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.label(&hotspot.label);
                            if ui.small_button("✕").on_hover_text("Delete hotspot").clicked() {
                                actions.push(UiAction::Delete(hotspot.id.clone()));
                            }
                        });
                    });
                });
        }
    }

    // Label prompt for a freshly clicked point
    if let Some(point) = params.prompt.prompt.point() {
        let mut commit = false;
        let mut cancel = ctx.input(|i| i.key_pressed(egui::Key::Escape));

        egui::Window::new("New hotspot")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.set_min_width(280.0);
                ui.label(format!("Label for the point at {}:", format_point(point)));
                ui.add_space(8.0);

                let focus_requested = params.prompt.focus_requested;
                if let Some(text) = params.prompt.prompt.text_mut() {
                    let response = ui.add(
                        egui::TextEdit::singleline(text)
                            .hint_text("e.g. Power button")
                            .desired_width(260.0),
                    );
                    if focus_requested {
                        response.request_focus();
                    }
                    if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        commit = true;
                    }
                }
                params.prompt.focus_requested = false;

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Add").clicked() {
                        commit = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });

        if cancel {
            params.prompt.prompt.cancel();
        } else if commit {
            // A blank label closes the prompt without adding anything
            if let Some(id) = params.prompt.prompt.commit(&mut params.session.0) {
                tracing::debug!("Committed hotspot {}", id);
            }
        }
    }

    apply_actions(&mut params, actions);
}

fn apply_actions(params: &mut UiParams, actions: Vec<UiAction>) {
    for action in actions {
        match action {
            UiAction::Import => {
                trigger_file_open(&params.pending_file_results, FileFilter::for_extension(MODEL_EXTENSION));
            }
            UiAction::Delete(id) => {
                if params.session.remove_hotspot(&id) {
                    tracing::info!("Removed hotspot {}", id);
                }
            }
            UiAction::ClearHotspots => {
                tracing::info!("Clearing {} hotspots", params.session.hotspots().len());
                params.session.clear_hotspots();
            }
            UiAction::Focus(point) => {
                params.camera_settings.focus_on(point);
            }
            UiAction::DismissError => {
                params.session.dismiss_error();
            }
        }
    }
}
