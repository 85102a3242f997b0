use egui::{Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Visuals};

pub const BG_PURE_BLACK: Color32 = Color32::from_rgb(0, 0, 0);
pub const BG_PANEL: Color32 = Color32::from_rgb(12, 12, 16);
pub const BG_WIDGET: Color32 = Color32::from_rgb(22, 22, 30);
pub const BG_WIDGET_HOVER: Color32 = Color32::from_rgb(32, 32, 44);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(190, 190, 195);
pub const TEXT_MUTED: Color32 = Color32::from_rgb(110, 110, 118);

pub const ACCENT_GREEN: Color32 = Color32::from_rgb(70, 170, 60);
pub const ACCENT_RED: Color32 = Color32::from_rgb(200, 60, 60);
pub const ACCENT_BLUE: Color32 = Color32::from_rgb(84, 110, 210);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(40, 42, 70);

pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = Visuals::dark();
    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.panel_fill = BG_PANEL;
    visuals.window_fill = BG_PANEL;
    visuals.extreme_bg_color = BG_PURE_BLACK;
    visuals.error_fg_color = ACCENT_RED;
    visuals.selection.bg_fill = ACCENT_BLUE.gamma_multiply(0.5);
    visuals.selection.stroke = Stroke::new(1.0, ACCENT_BLUE);

    let widgets = &mut visuals.widgets;
    for w in [&mut widgets.inactive, &mut widgets.noninteractive] {
        w.bg_fill = BG_WIDGET;
        w.weak_bg_fill = BG_WIDGET;
        w.bg_stroke = Stroke::new(1.0, BORDER_SUBTLE);
        w.rounding = Rounding::same(4.0);
    }
    for w in [&mut widgets.hovered, &mut widgets.active, &mut widgets.open] {
        w.bg_fill = BG_WIDGET_HOVER;
        w.weak_bg_fill = BG_WIDGET_HOVER;
        w.bg_stroke = Stroke::new(1.0, ACCENT_BLUE);
        w.rounding = Rounding::same(4.0);
    }

    let mut style = (*ctx.style()).clone();
    style.visuals = visuals;
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);
    style.text_styles = [
        (TextStyle::Small, FontId::new(11.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Button, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Heading, FontId::new(18.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
    ]
    .into();

    ctx.set_style(style);
}
