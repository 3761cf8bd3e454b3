use eframe::egui::{self, RichText};

use super::style;
use crate::log_sink::ConsoleLog;

/// Scrolling log view pinned to the newest entry.
///
/// Returns `true` when the user asked to clear the backlog.
pub(super) fn render(ui: &mut egui::Ui, console: &ConsoleLog) -> bool {
    let palette = style::palette();
    let mut clear = false;
    ui.horizontal(|ui| {
        ui.label(RichText::new("Console").strong());
        ui.label(RichText::new(format!("{} lines", console.len())).color(palette.text_muted));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui
                .add_enabled(!console.is_empty(), egui::Button::new("Clear"))
                .clicked()
            {
                clear = true;
            }
        });
    });
    ui.separator();
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for entry in console.lines() {
                ui.horizontal_wrapped(|ui| {
                    ui.label(
                        RichText::new(entry.clock())
                            .monospace()
                            .color(palette.text_muted),
                    );
                    ui.label(
                        RichText::new(&entry.message)
                            .monospace()
                            .color(style::log_level_color(entry.level)),
                    );
                });
            }
        });
    clear
}
