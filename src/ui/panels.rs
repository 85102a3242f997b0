use egui::{Color32, Context, RichText, ScrollArea, TextEdit, Ui};

use crate::math::{FORMULA_PRESETS, evaluate};
use crate::renderer::{OrbitCamera, ProjectionMode};
use crate::scene::{Surface, SurfaceId, SurfaceRegistry};
use crate::ui::state::UiState;
use crate::ui::theme::*;

/// One change to a single surface, requested by its row.
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceEdit {
    Formula(SurfaceId, String),
    Color(SurfaceId, [f32; 3]),
    Visible(SurfaceId, bool),
    Remove(SurfaceId),
}

/// Registry mutations collected while drawing the panel, applied once the
/// frame's UI pass is done.
#[derive(Debug, Default, PartialEq)]
pub struct UiActions {
    pub add_surface: bool,
    pub grid: Option<(f32, u32)>,
    pub edits: Vec<SurfaceEdit>,
}

impl UiActions {
    pub fn is_empty(&self) -> bool {
        !self.add_surface && self.grid.is_none() && self.edits.is_empty()
    }

    /// Applies every action to the registry in the order it was collected.
    /// Grid changes go first so edits land on the new grid.
    pub fn apply(self, registry: &mut SurfaceRegistry, state: &mut UiState) {
        if let Some((extent, subdivisions)) = self.grid {
            registry.set_grid(extent, subdivisions);
        }

        for edit in self.edits {
            match edit {
                SurfaceEdit::Formula(id, formula) => {
                    registry.set_formula(id, &formula);
                }
                SurfaceEdit::Color(id, color) => {
                    registry.set_color(id, color);
                }
                SurfaceEdit::Visible(id, visible) => {
                    registry.set_visible(id, visible);
                }
                SurfaceEdit::Remove(id) => {
                    registry.remove_surface(id);
                }
            }
        }

        if self.add_surface {
            registry.add_surface();
        }

        state.retain_rows(registry);
    }
}

pub fn draw_side_panel(ctx: &Context, state: &mut UiState, registry: &SurfaceRegistry) -> UiActions {
    let mut actions = UiActions::default();

    egui::SidePanel::right("control_panel")
        .min_width(340.0)
        .max_width(460.0)
        .default_width(380.0)
        .frame(egui::Frame::default().fill(BG_PANEL).inner_margin(16.0))
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                ui.heading(RichText::new("Function Plotter").strong());
                ui.add_space(4.0);
                ui.label(RichText::new("z = f(x, y)").color(TEXT_MUTED).size(11.0));
                ui.add_space(16.0);

                properties(ui, state, &mut actions);
                let per_axis = registry.grid().vertices_per_axis();
                ui.label(
                    RichText::new(format!("{per_axis} x {per_axis} vertices per surface"))
                        .color(TEXT_MUTED)
                        .size(11.0),
                );
                ui.add_space(16.0);
                ui.separator();
                ui.add_space(12.0);

                section_header(ui, &format!("SURFACES ({})", registry.len()));
                if registry.is_empty() {
                    ui.label(RichText::new("No surfaces").color(TEXT_MUTED));
                    ui.add_space(8.0);
                }
                for (id, surface) in registry.iter() {
                    ui.push_id(id, |ui| surface_row(ui, state, id, surface, &mut actions));
                    ui.add_space(8.0);
                }

                if ui
                    .add(
                        egui::Button::new(RichText::new("Add Surface").color(BG_PURE_BLACK))
                            .fill(ACCENT_GREEN)
                            .min_size(egui::vec2(ui.available_width(), 32.0)),
                    )
                    .clicked()
                {
                    actions.add_surface = true;
                }
            });
        });

    actions
}

fn section_header(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).color(TEXT_MUTED).size(11.0).strong());
    ui.add_space(4.0);
}

fn properties(ui: &mut Ui, state: &mut UiState, actions: &mut UiActions) {
    section_header(ui, "PROPERTIES");

    let mut grid_changed = false;
    egui::Grid::new("properties")
        .num_columns(2)
        .spacing([12.0, 6.0])
        .show(ui, |ui| {
            ui.label("Grid size:");
            grid_changed |= ui
                .add(TextEdit::singleline(&mut state.grid_text).desired_width(80.0))
                .changed();
            ui.end_row();

            ui.label("Divisions:");
            grid_changed |= ui
                .add(TextEdit::singleline(&mut state.divisions_text).desired_width(80.0))
                .changed();
            ui.end_row();

            ui.label("Projection:");
            egui::ComboBox::from_id_salt("projection")
                .selected_text(state.projection.label())
                .show_ui(ui, |ui| {
                    for mode in [ProjectionMode::Perspective, ProjectionMode::Orthographic] {
                        ui.selectable_value(&mut state.projection, mode, mode.label());
                    }
                });
            ui.end_row();
        });

    // Bad input is ignored until it becomes valid
    if grid_changed {
        actions.grid = state.parsed_grid();
    }

    ui.add_space(4.0);
    ui.horizontal(|ui| {
        ui.checkbox(&mut state.show_axes, "Axes");
        ui.checkbox(&mut state.show_mesh, "Mesh");
        ui.checkbox(&mut state.show_help, "Help");
    });
}

fn surface_row(
    ui: &mut Ui,
    state: &mut UiState,
    id: SurfaceId,
    surface: &Surface,
    actions: &mut UiActions,
) {
    let row = state.row_mut(id, &surface.formula);

    egui::Frame::default()
        .fill(BG_WIDGET)
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .rounding(6.0)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                let mut visible = surface.visible;
                if ui.checkbox(&mut visible, "").changed() {
                    actions.edits.push(SurfaceEdit::Visible(id, visible));
                }

                ui.label(RichText::new("f(x,y) =").family(egui::FontFamily::Monospace));

                let mut color = surface.color;
                let picker = egui::color_picker::color_edit_button_rgb(ui, &mut color);
                if picker.changed() {
                    actions.edits.push(SurfaceEdit::Color(id, color));
                }

                if ui
                    .add(egui::Button::new(RichText::new("Remove").color(ACCENT_RED)))
                    .clicked()
                {
                    actions.edits.push(SurfaceEdit::Remove(id));
                }
            });

            let edit = ui.add(
                TextEdit::singleline(&mut row.formula)
                    .font(egui::FontId::new(13.0, egui::FontFamily::Monospace))
                    .hint_text("e.g. sin(x) * cos(y)")
                    .desired_width(f32::INFINITY),
            );
            if edit.changed() {
                row.preset = None;
                actions
                    .edits
                    .push(SurfaceEdit::Formula(id, row.formula.clone()));
            }

            let selected = row.preset.map_or("Presets...", |i| FORMULA_PRESETS[i].name);
            egui::ComboBox::from_id_salt(("preset", id))
                .selected_text(selected)
                .width(ui.available_width())
                .show_ui(ui, |ui| {
                    for (i, preset) in FORMULA_PRESETS.iter().enumerate() {
                        let label = ui
                            .selectable_label(row.preset == Some(i), preset.name)
                            .on_hover_text(preset.description);
                        if label.clicked() {
                            row.preset = Some(i);
                            row.formula = preset.formula.to_owned();
                            actions
                                .edits
                                .push(SurfaceEdit::Formula(id, row.formula.clone()));
                        }
                    }
                });

            if let Some(err) = &surface.error {
                ui.add_space(4.0);
                ui.label(RichText::new(err.to_string()).color(ACCENT_RED).size(11.0));
            } else if let Some(text) = origin_readout(surface) {
                ui.add_space(4.0);
                ui.label(RichText::new(text).color(TEXT_MUTED).size(11.0));
            }
        });
}

/// Height at the grid center, shown under a formula that compiled.
fn origin_readout(surface: &Surface) -> Option<String> {
    if surface.error.is_some() || surface.formula.trim().is_empty() {
        return None;
    }
    let z = evaluate(&surface.formula, 0.0, 0.0);
    Some(format!("f(0, 0) = {z:.4}"))
}

pub fn draw_help_overlay(ctx: &Context, camera: &OrbitCamera) {
    egui::Area::new(egui::Id::new("help_overlay"))
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::default()
                .fill(Color32::from_black_alpha(180))
                .rounding(6.0)
                .inner_margin(10.0)
                .show(ui, |ui| {
                    ui.style_mut().override_font_id =
                        Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));
                    let zoom = match camera.projection {
                        ProjectionMode::Perspective => "Dolly",
                        ProjectionMode::Orthographic => "Zoom",
                    };
                    ui.label(
                        RichText::new(format!(
                            "LMB+Drag - Orbit | RMB+Drag - {zoom} | Esc - Release | Ctrl+Q - Quit"
                        ))
                        .color(TEXT_MUTED),
                    );
                    ui.label(
                        RichText::new(format!(
                            "r: {:.1} | theta: {:.0}\u{b0} | phi: {:.0}\u{b0}",
                            camera.radius,
                            camera.theta.to_degrees(),
                            camera.phi.to_degrees()
                        ))
                        .color(TEXT_MUTED),
                    );
                });
        });
}
