use egui::{Color32, RichText};
use model_viewer::scene::config::UiColors;
use model_viewer::scene::{HexColor, LoadPhase};
use model_viewer::Viewer;

/// Actions the panel cannot perform on the viewer alone.
#[derive(Default)]
pub struct UiActions {
    pub open_file: bool,
    pub screenshot: bool,
    pub dismiss_message: bool,
}

pub struct LoadingStatus {
    pub file_name: String,
    pub phase: LoadPhase,
    pub percent: u8,
}

/// What the app wants shown besides the viewer state.
#[derive(Default)]
pub struct PanelState {
    pub loading: Option<LoadingStatus>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

fn color(hex: HexColor) -> Color32 {
    let [r, g, b] = hex.to_srgb_bytes();
    Color32::from_rgb(r, g, b)
}

/// Light theme with the configured accent colors. Call once after the
/// egui context exists.
pub fn apply_theme(ctx: &egui::Context, colors: &UiColors) {
    let mut visuals = egui::Visuals::light();
    visuals.panel_fill = color(colors.gray);
    visuals.window_fill = color(colors.light);
    visuals.override_text_color = Some(color(colors.dark));
    visuals.selection.bg_fill = color(colors.primary);
    visuals.selection.stroke.color = color(colors.light);
    visuals.widgets.inactive.weak_bg_fill = color(colors.light);
    visuals.widgets.hovered.weak_bg_fill = color(colors.primary_hover);
    visuals.widgets.active.weak_bg_fill = color(colors.primary);
    ctx.set_visuals(visuals);
}

pub fn phase_label(phase: LoadPhase) -> &'static str {
    match phase {
        LoadPhase::Pending => "Waiting",
        LoadPhase::Parsing => "Parsing",
        LoadPhase::Buffers => "Reading buffers",
        LoadPhase::Images => "Decoding images",
        LoadPhase::Building => "Building scene",
        LoadPhase::Complete => "Done",
        LoadPhase::Failed => "Failed",
    }
}

pub fn build(ctx: &egui::Context, viewer: &mut Viewer, state: &PanelState) -> UiActions {
    let mut actions = UiActions::default();
    let colors = viewer.config().ui.clone();

    egui::SidePanel::left("controls")
        .default_width(240.0)
        .resizable(false)
        .show(ctx, |ui| {
            ui.heading("Model Viewer");
            ui.separator();

            let open = egui::Button::new(RichText::new("Open model...").color(color(colors.light)))
                .fill(color(colors.primary));
            let busy = state.loading.is_some();
            if ui.add_enabled(!busy, open).clicked() {
                actions.open_file = true;
            }
            ui.small(".glb or .gltf");

            status_section(ui, state, &colors, &mut actions);

            ui.separator();
            view_section(ui, viewer, &mut actions);

            if !viewer.stage().animation_names().is_empty() {
                ui.separator();
                animation_section(ui, viewer);
            }

            if let Some(info) = viewer.model_info() {
                ui.separator();
                ui.heading("Model Info");
                egui::Grid::new("model_info")
                    .num_columns(2)
                    .striped(true)
                    .show(ui, |ui| {
                        let rows = [
                            ("File", info.file_name.clone()),
                            ("Size", info.file_size.clone()),
                            ("Vertices", info.vertices.clone()),
                            ("Faces", info.faces.clone()),
                            ("Materials", info.materials.to_string()),
                            ("Dimensions", info.dimensions.clone()),
                            ("Scale", info.scale.clone()),
                        ];
                        for (label, value) in rows {
                            ui.label(RichText::new(label).color(color(colors.primary)));
                            ui.label(value);
                            ui.end_row();
                        }
                    });
            }
        });

    actions
}

fn status_section(ui: &mut egui::Ui, state: &PanelState, colors: &UiColors, actions: &mut UiActions) {
    if let Some(loading) = &state.loading {
        ui.add_space(4.0);
        ui.label(format!("Loading {}", loading.file_name));
        ui.add(
            egui::ProgressBar::new(loading.percent as f32 / 100.0)
                .fill(color(colors.primary))
                .text(format!("{} {}%", phase_label(loading.phase), loading.percent)),
        );
    }

    if let Some(error) = &state.error {
        ui.add_space(4.0);
        ui.colored_label(Color32::from_rgb(0xc0, 0x20, 0x20), error);
        if ui.small_button("Dismiss").clicked() {
            actions.dismiss_message = true;
        }
    } else if let Some(notice) = &state.notice {
        ui.add_space(4.0);
        ui.label(notice);
    }
}

fn view_section(ui: &mut egui::Ui, viewer: &mut Viewer, actions: &mut UiActions) {
    ui.heading("View");

    let mut wireframe = viewer.wireframe();
    if ui.checkbox(&mut wireframe, "Wireframe").changed() {
        viewer.set_wireframe(wireframe);
    }

    let mut grid = viewer.grid_visible();
    if ui.checkbox(&mut grid, "Grid").changed() {
        viewer.toggle_grid();
    }

    let mut auto_rotate = viewer.auto_rotate();
    if ui.checkbox(&mut auto_rotate, "Auto-rotate").changed() {
        viewer.set_auto_rotate(auto_rotate);
    }

    ui.horizontal(|ui| {
        if ui.button("Reset camera").clicked() {
            viewer.reset_camera();
        }
        if ui.button("Screenshot").clicked() {
            actions.screenshot = true;
        }
    });
}

fn animation_section(ui: &mut egui::Ui, viewer: &mut Viewer) {
    ui.heading("Animations");

    let current = viewer.stage().current_animation();
    let mut clicked = None;
    for (index, name) in viewer.stage().animation_names().iter().enumerate() {
        if ui.selectable_label(current == Some(index), name).clicked() {
            clicked = Some(index);
        }
    }
    if let Some(index) = clicked {
        viewer.play_animation(index);
    }

    ui.horizontal(|ui| {
        let label = if viewer.stage().is_playing() { "Pause" } else { "Play" };
        if ui.add_enabled(current.is_some(), egui::Button::new(label)).clicked() {
            viewer.toggle_animation();
        }
        if ui.add_enabled(current.is_some(), egui::Button::new("Stop")).clicked() {
            viewer.stop_animation();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_color32() {
        assert_eq!(color(HexColor(0xff6b00)), Color32::from_rgb(0xff, 0x6b, 0x00));
    }

    #[test]
    fn test_phase_labels_distinct() {
        let phases = [
            LoadPhase::Pending,
            LoadPhase::Parsing,
            LoadPhase::Buffers,
            LoadPhase::Images,
            LoadPhase::Building,
            LoadPhase::Complete,
            LoadPhase::Failed,
        ];
        let mut labels: Vec<_> = phases.iter().map(|p| phase_label(*p)).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), phases.len());
    }
}
