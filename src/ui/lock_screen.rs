//! PIN pad shown while the session is authenticating.

use eframe::egui::{self, RichText};

use super::style;
use crate::session::{PIN_LENGTH, PinKey, PinPad};

const KEYPAD: [[KeypadButton; 3]; 4] = [
    [KeypadButton::Digit(1), KeypadButton::Digit(2), KeypadButton::Digit(3)],
    [KeypadButton::Digit(4), KeypadButton::Digit(5), KeypadButton::Digit(6)],
    [KeypadButton::Digit(7), KeypadButton::Digit(8), KeypadButton::Digit(9)],
    [KeypadButton::Clear, KeypadButton::Digit(0), KeypadButton::Enter],
];
const BUTTON_SIZE: egui::Vec2 = egui::vec2(64.0, 48.0);
const DOT_RADIUS: f32 = 9.0;

#[derive(Clone, Copy)]
enum KeypadButton {
    Digit(u8),
    Clear,
    Enter,
}

impl KeypadButton {
    fn label(self) -> String {
        match self {
            KeypadButton::Digit(d) => d.to_string(),
            KeypadButton::Clear => "C".to_string(),
            KeypadButton::Enter => "OK".to_string(),
        }
    }

    fn key(self) -> PinKey {
        match self {
            KeypadButton::Digit(d) => PinKey::Digit(d),
            KeypadButton::Clear => PinKey::Clear,
            KeypadButton::Enter => PinKey::Enter,
        }
    }
}

/// Draw the PIN pad and return the keys pressed on it this frame,
/// keyboard input included.
pub(super) fn render(ui: &mut egui::Ui, pad: &PinPad) -> Vec<PinKey> {
    let mut keys = ui.input(|i| pin_keys_from_events(&i.events));
    ui.vertical_centered(|ui| {
        ui.add_space(24.0);
        ui.heading("Enter PIN");
        ui.add_space(12.0);
        render_dots(ui, pad);
        ui.add_space(16.0);
        for row in KEYPAD {
            ui.horizontal(|ui| {
                let row_width = BUTTON_SIZE.x * 3.0 + ui.spacing().item_spacing.x * 2.0;
                ui.add_space(((ui.available_width() - row_width) / 2.0).max(0.0));
                for button in row {
                    let text = RichText::new(button.label()).size(20.0);
                    if ui.add_sized(BUTTON_SIZE, egui::Button::new(text)).clicked() {
                        keys.push(button.key());
                    }
                }
            });
        }
        ui.add_space(12.0);
        if ui.button("Cancel").clicked() {
            keys.push(PinKey::Escape);
        }
    });
    keys
}

fn render_dots(ui: &mut egui::Ui, pad: &PinPad) {
    let color = style::pin_feedback_color(pad.feedback());
    let spacing = DOT_RADIUS * 3.0;
    let width = spacing * PIN_LENGTH as f32;
    let (rect, _) = ui.allocate_exact_size(egui::vec2(width, DOT_RADIUS * 2.5), egui::Sense::hover());
    let painter = ui.painter_at(rect);
    for index in 0..PIN_LENGTH {
        let center = egui::pos2(
            rect.left() + spacing * (index as f32 + 0.5),
            rect.center().y,
        );
        if index < pad.entered() {
            painter.circle_filled(center, DOT_RADIUS, color);
        } else {
            painter.circle_stroke(center, DOT_RADIUS, egui::Stroke::new(1.5, color));
        }
    }
}

/// Map keyboard events to PIN keys. Digits from the top row and the numpad
/// both count; Backspace and Delete clear.
pub(super) fn pin_keys_from_events(events: &[egui::Event]) -> Vec<PinKey> {
    events
        .iter()
        .filter_map(|event| match event {
            egui::Event::Key {
                key, pressed: true, ..
            } => key_to_pin(*key),
            _ => None,
        })
        .collect()
}

fn key_to_pin(key: egui::Key) -> Option<PinKey> {
    use egui::Key;
    let digit = match key {
        Key::Num0 => 0,
        Key::Num1 => 1,
        Key::Num2 => 2,
        Key::Num3 => 3,
        Key::Num4 => 4,
        Key::Num5 => 5,
        Key::Num6 => 6,
        Key::Num7 => 7,
        Key::Num8 => 8,
        Key::Num9 => 9,
        Key::Backspace | Key::Delete => return Some(PinKey::Clear),
        Key::Enter => return Some(PinKey::Enter),
        Key::Escape => return Some(PinKey::Escape),
        _ => return None,
    };
    Some(PinKey::Digit(digit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: egui::Key, pressed: bool) -> egui::Event {
        egui::Event::Key {
            key,
            physical_key: None,
            pressed,
            repeat: false,
            modifiers: egui::Modifiers::NONE,
        }
    }

    #[test]
    fn maps_digits_and_control_keys() {
        let events = [
            key(egui::Key::Num2, true),
            key(egui::Key::Num2, false),
            key(egui::Key::Num8, true),
            key(egui::Key::Backspace, true),
            key(egui::Key::Enter, true),
            key(egui::Key::Escape, true),
            key(egui::Key::A, true),
            egui::Event::Text("9".into()),
        ];
        assert_eq!(
            pin_keys_from_events(&events),
            [
                PinKey::Digit(2),
                PinKey::Digit(8),
                PinKey::Clear,
                PinKey::Enter,
                PinKey::Escape,
            ]
        );
    }

    #[test]
    fn delete_clears_like_backspace() {
        assert_eq!(
            pin_keys_from_events(&[key(egui::Key::Delete, true)]),
            [PinKey::Clear]
        );
    }
}
