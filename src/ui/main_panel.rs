use std::time::Duration;

use eframe::egui::{self, RichText};

use super::style;
use crate::config::{PluginSpec, ProgramSpec};

/// Something the user clicked in the unlocked view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum PanelAction {
    CheckUpdates,
    InstallProgram(String),
    InstallPlugin(PluginSpec),
    Lock,
    Exit,
}

pub(super) struct PanelView<'a> {
    pub version: &'a str,
    pub programs: &'a [ProgramSpec],
    pub plugins: &'a [PluginSpec],
    pub update_busy: bool,
    pub idle_remaining: Option<Duration>,
}

pub(super) fn render(ui: &mut egui::Ui, view: &PanelView<'_>) -> Vec<PanelAction> {
    let mut actions = Vec::new();
    render_header(ui, view, &mut actions);
    ui.separator();
    egui::ScrollArea::vertical()
        .id_salt("catalog")
        .auto_shrink([false, true])
        .show(ui, |ui| {
            render_programs(ui, view.programs, &mut actions);
            if !view.plugins.is_empty() {
                ui.add_space(8.0);
                render_plugins(ui, view.plugins, &mut actions);
            }
        });
    actions
}

fn render_header(ui: &mut egui::Ui, view: &PanelView<'_>, actions: &mut Vec<PanelAction>) {
    let palette = style::palette();
    ui.horizontal(|ui| {
        ui.heading("bobrik");
        ui.label(RichText::new(format!("v{}", view.version)).color(palette.text_muted));
        if let Some(remaining) = view.idle_remaining {
            ui.label(
                RichText::new(format!("locks in {}", format_remaining(remaining)))
                    .color(palette.text_muted),
            );
        }
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Exit").clicked() {
                actions.push(PanelAction::Exit);
            }
            if ui.button("Lock").clicked() {
                actions.push(PanelAction::Lock);
            }
            let label = if view.update_busy {
                "Checking..."
            } else {
                "Check for updates"
            };
            if ui
                .add_enabled(!view.update_busy, egui::Button::new(label))
                .clicked()
            {
                actions.push(PanelAction::CheckUpdates);
            }
        });
    });
}

fn render_programs(ui: &mut egui::Ui, programs: &[ProgramSpec], actions: &mut Vec<PanelAction>) {
    ui.label(RichText::new("Programs").strong());
    ui.horizontal_wrapped(|ui| {
        for program in programs {
            let button = ui.button(&program.name).on_hover_text(&program.url);
            if button.clicked() {
                actions.push(PanelAction::InstallProgram(program.key.clone()));
            }
        }
    });
}

fn render_plugins(ui: &mut egui::Ui, plugins: &[PluginSpec], actions: &mut Vec<PanelAction>) {
    ui.label(RichText::new("Plugins").strong());
    ui.horizontal_wrapped(|ui| {
        for plugin in plugins {
            let label = format!("{} {}", plugin.name, plugin.version);
            if ui.button(label).on_hover_text(&plugin.url).clicked() {
                actions.push(PanelAction::InstallPlugin(plugin.clone()));
            }
        }
    });
}

fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
