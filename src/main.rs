//! Entry point for the bobrik tray app.
#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]
use std::sync::Arc;

use bobrik::config::{self, AppConfig};
use bobrik::first_run;
use bobrik::log_sink::LogSink;
use bobrik::logging;
use bobrik::ui::{BobrikApp, MIN_VIEWPORT_SIZE, tray};
use eframe::egui;
use egui::viewport::IconData;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(all(target_os = "windows", not(debug_assertions)))]
    if console_requested() {
        enable_windows_console();
    }

    let config = load_config();
    match logging::init(&config.logging) {
        Ok(path) => tracing::info!("Logging to {}", path.display()),
        Err(err) => eprintln!("Logging disabled: {err}"),
    }
    match first_run::ensure_startup_entry() {
        Ok(outcome) => tracing::info!("Autostart check: {outcome:?}"),
        Err(err) => tracing::warn!("Autostart check failed: {err}"),
    }

    let config = Arc::new(config);
    let (sink, log_rx) = LogSink::channel();
    let viewport = egui::ViewportBuilder::default()
        .with_title("bobrik")
        .with_inner_size(MIN_VIEWPORT_SIZE)
        .with_min_inner_size(MIN_VIEWPORT_SIZE)
        .with_visible(false)
        .with_icon(app_icon());
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "bobrik",
        native_options,
        Box::new(move |cc| Ok(Box::new(BobrikApp::new(&cc.egui_ctx, config, sink, log_rx)))),
    )?;
    tracing::info!("bobrik stopped");
    Ok(())
}

/// A broken config file must not keep the lock screen from starting.
fn load_config() -> AppConfig {
    match config::load_or_default() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Using default configuration: {err}");
            AppConfig::default()
        }
    }
}

fn app_icon() -> IconData {
    IconData {
        rgba: tray::icon_rgba(tray::ICON_SIZE),
        width: tray::ICON_SIZE,
        height: tray::ICON_SIZE,
    }
}

#[cfg(all(target_os = "windows", not(debug_assertions)))]
fn console_requested() -> bool {
    std::env::args_os().any(|arg| arg == "--console")
}

#[cfg(all(target_os = "windows", not(debug_assertions)))]
fn enable_windows_console() {
    use windows::Win32::Foundation::HANDLE;
    use windows::Win32::Storage::FileSystem::{
        CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_GENERIC_WRITE, FILE_SHARE_READ, FILE_SHARE_WRITE,
        OPEN_EXISTING,
    };
    use windows::Win32::System::Console::{
        ATTACH_PARENT_PROCESS, AllocConsole, AttachConsole, STD_ERROR_HANDLE, STD_OUTPUT_HANDLE,
        SetStdHandle,
    };

    unsafe {
        if AttachConsole(ATTACH_PARENT_PROCESS).is_err() {
            let _ = AllocConsole();
        }

        let Ok(handle) = CreateFileW(
            windows::core::w!("CONOUT$"),
            FILE_GENERIC_WRITE.0,
            FILE_SHARE_READ | FILE_SHARE_WRITE,
            None,
            OPEN_EXISTING,
            FILE_ATTRIBUTE_NORMAL,
            None,
        ) else {
            return;
        };

        let handle = HANDLE(handle.0);
        let _ = SetStdHandle(STD_OUTPUT_HANDLE, handle);
        let _ = SetStdHandle(STD_ERROR_HANDLE, handle);
    }
}
