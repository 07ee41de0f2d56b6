use eframe::egui::{self, Color32, Rounding, Stroke};

pub const BG_DARK: Color32 = Color32::from_rgb(0x0a, 0x0a, 0x0a);
pub const BG_MEDIUM: Color32 = Color32::from_rgb(0x14, 0x14, 0x14);
pub const BG_LIGHT: Color32 = Color32::from_rgb(0x1a, 0x1a, 0x1a);
pub const ACCENT_PRIMARY: Color32 = Color32::from_rgb(0x00, 0xd4, 0xff);
pub const ACCENT_SECONDARY: Color32 = Color32::from_rgb(0x00, 0xff, 0x88);
pub const TEXT_PRIMARY: Color32 = Color32::WHITE;
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(0xb0, 0xb0, 0xb0);
pub const BORDER: Color32 = Color32::from_rgb(0x2a, 0x2a, 0x2a);
pub const DANGER: Color32 = Color32::from_rgb(0xff, 0x47, 0x57);
pub const SUCCESS: Color32 = Color32::from_rgb(0x2e, 0xd5, 0x73);

pub fn apply(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.panel_fill = BG_MEDIUM;
    visuals.window_fill = BG_LIGHT;
    visuals.window_stroke = Stroke::new(1.0, BORDER);
    visuals.window_rounding = Rounding::same(8.0);
    visuals.extreme_bg_color = BG_DARK;
    visuals.faint_bg_color = BG_LIGHT;
    visuals.hyperlink_color = ACCENT_PRIMARY;
    visuals.selection.bg_fill = ACCENT_PRIMARY.linear_multiply(0.6);
    visuals.selection.stroke = Stroke::new(1.0, BG_DARK);

    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, BORDER);
    visuals.widgets.inactive.bg_fill = BG_LIGHT;
    visuals.widgets.inactive.weak_bg_fill = BG_LIGHT;
    visuals.widgets.inactive.rounding = Rounding::same(6.0);
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, ACCENT_PRIMARY);
    visuals.widgets.hovered.rounding = Rounding::same(6.0);
    visuals.widgets.active.bg_fill = ACCENT_SECONDARY.linear_multiply(0.5);
    visuals.widgets.active.rounding = Rounding::same(6.0);

    ctx.set_visuals(visuals);
}

/// Filled button colour for destructive actions.
pub fn danger_button(text: &str) -> egui::Button {
    egui::Button::new(egui::RichText::new(text).color(TEXT_PRIMARY).strong()).fill(DANGER)
}

pub fn primary_button(text: &str) -> egui::Button {
    egui::Button::new(egui::RichText::new(text).color(BG_DARK).strong()).fill(ACCENT_PRIMARY)
}
