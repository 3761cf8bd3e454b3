//! Notification-area icon (Windows and macOS).
//!
//! Tray callbacks run on a thread owned by `tray-icon`. They forward a
//! [`TrayCommand`] and wake the UI, which may be hidden and not repainting.

use std::sync::mpsc::Receiver;

use eframe::egui;

pub const ICON_SIZE: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    Show,
}

pub struct Tray {
    #[cfg(any(target_os = "windows", target_os = "macos"))]
    _icon: tray_icon::TrayIcon,
    rx: Receiver<TrayCommand>,
}

impl Tray {
    pub fn try_recv(&self) -> Option<TrayCommand> {
        self.rx.try_recv().ok()
    }
}

/// Create the tray icon. Returns `None` where the platform has no tray
/// support or creation failed; the caller falls back to minimizing.
#[cfg(any(target_os = "windows", target_os = "macos"))]
pub fn create(ctx: &egui::Context) -> Option<Tray> {
    use std::sync::mpsc;
    use tray_icon::menu::{Menu, MenuEvent, MenuItem};
    use tray_icon::{Icon, MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent};

    let open_item = MenuItem::new("Open bobrik", true, None);
    let menu = Menu::new();
    if let Err(err) = menu.append(&open_item) {
        tracing::warn!("Failed to build tray menu: {err}");
        return None;
    }
    let icon = match Icon::from_rgba(icon_rgba(ICON_SIZE), ICON_SIZE, ICON_SIZE) {
        Ok(icon) => icon,
        Err(err) => {
            tracing::warn!("Failed to create tray icon image: {err}");
            return None;
        }
    };
    let tray_icon = match TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_icon(icon)
        .with_tooltip("bobrik")
        .build()
    {
        Ok(tray_icon) => tray_icon,
        Err(err) => {
            tracing::warn!("Failed to create tray icon: {err}");
            return None;
        }
    };

    let (tx, rx) = mpsc::channel();
    let icon_tx = tx.clone();
    let icon_ctx = ctx.clone();
    TrayIconEvent::set_event_handler(Some(move |event: TrayIconEvent| {
        let activated = matches!(
            event,
            TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            }
        );
        if activated {
            let _ = icon_tx.send(TrayCommand::Show);
            wake(&icon_ctx);
        }
    }));
    let open_id = open_item.id().clone();
    let menu_ctx = ctx.clone();
    MenuEvent::set_event_handler(Some(move |event: MenuEvent| {
        if event.id == open_id {
            let _ = tx.send(TrayCommand::Show);
            wake(&menu_ctx);
        }
    }));

    Some(Tray {
        _icon: tray_icon,
        rx,
    })
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub fn create(_ctx: &egui::Context) -> Option<Tray> {
    None
}

/// A hidden viewport gets no frames, so make it visible here and let the
/// next frame decide what to draw.
#[cfg(any(target_os = "windows", target_os = "macos"))]
fn wake(ctx: &egui::Context) {
    ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(false));
    ctx.send_viewport_cmd(egui::ViewportCommand::Visible(true));
    ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
    ctx.request_repaint();
}

/// Square RGBA icon: a filled disc with a lighter ring, drawn in code so no
/// image decoder is needed.
pub fn icon_rgba(size: u32) -> Vec<u8> {
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    let center = (size as f32 - 1.0) / 2.0;
    let outer = size as f32 / 2.0;
    let ring = outer * 0.78;
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let distance = (dx * dx + dy * dy).sqrt();
            let pixel = if distance > outer {
                [0, 0, 0, 0]
            } else if distance > ring {
                [167, 217, 255, 255]
            } else {
                [32, 96, 140, 255]
            };
            rgba.extend_from_slice(&pixel);
        }
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icon_has_rgba_for_every_pixel() {
        let rgba = icon_rgba(ICON_SIZE);
        assert_eq!(rgba.len(), (ICON_SIZE * ICON_SIZE * 4) as usize);
    }

    #[test]
    fn icon_corners_are_transparent_and_center_opaque() {
        let size = 16;
        let rgba = icon_rgba(size);
        let alpha = |x: u32, y: u32| rgba[((y * size + x) * 4 + 3) as usize];
        assert_eq!(alpha(0, 0), 0);
        assert_eq!(alpha(size - 1, size - 1), 0);
        assert_eq!(alpha(size / 2, size / 2), 255);
    }
}
