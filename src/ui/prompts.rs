use eframe::egui::{self, Align2, RichText};

use super::style;
use crate::updater::{PreparedUpdate, UpdateOffer};

/// Modal question about an update, oldest step first.
#[derive(Debug, Clone)]
pub(super) enum UpdatePrompt {
    /// "Install" downloads, "Later" drops the offer.
    Offer(UpdateOffer),
    /// Download is staged; "Restart now" hands over to the relaunch script.
    Confirm(PreparedUpdate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PromptAnswer {
    Accept,
    Decline,
}

pub(super) fn render(ctx: &egui::Context, prompt: &UpdatePrompt) -> Option<PromptAnswer> {
    let mut open = true;
    let mut answer = None;
    let title = match prompt {
        UpdatePrompt::Offer(_) => "Update available",
        UpdatePrompt::Confirm(_) => "Install update",
    };
    egui::Window::new(title)
        .anchor(Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .collapsible(false)
        .resizable(false)
        .auto_sized()
        .open(&mut open)
        .show(ctx, |ui| {
            ui.set_min_width(320.0);
            match prompt {
                UpdatePrompt::Offer(offer) => render_offer(ui, offer, &mut answer),
                UpdatePrompt::Confirm(prepared) => render_confirm(ui, prepared, &mut answer),
            }
        });
    if !open {
        answer = Some(PromptAnswer::Decline);
    }
    answer
}

fn render_offer(ui: &mut egui::Ui, offer: &UpdateOffer, answer: &mut Option<PromptAnswer>) {
    let palette = style::palette();
    ui.label(RichText::new(format!("Version {} is available.", offer.version)).strong());
    let notes = offer.notes_preview();
    if !notes.is_empty() {
        ui.add_space(6.0);
        ui.label(RichText::new(notes).color(palette.text_muted));
    }
    ui.add_space(8.0);
    ui.horizontal(|ui| {
        if ui.button("Install").clicked() {
            *answer = Some(PromptAnswer::Accept);
        }
        if ui.button("Later").clicked() {
            *answer = Some(PromptAnswer::Decline);
        }
    });
}

fn render_confirm(ui: &mut egui::Ui, prepared: &PreparedUpdate, answer: &mut Option<PromptAnswer>) {
    ui.label(format!(
        "Version {} is downloaded. bobrik will close and restart to finish the update.",
        prepared.version
    ));
    ui.add_space(8.0);
    ui.horizontal(|ui| {
        if ui.button("Restart now").clicked() {
            *answer = Some(PromptAnswer::Accept);
        }
        if ui.button("Cancel").clicked() {
            *answer = Some(PromptAnswer::Decline);
        }
    });
}
