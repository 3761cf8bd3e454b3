//! Tray-resident support toolbox: PIN screen lock, self-update and
//! installer downloads.
/// Application directory helpers.
pub mod app_dirs;
/// `config.toml` loading and defaults.
pub mod config;
/// Tracing subscriber setup.
pub mod logging;
/// Shared HTTP agent and bounded response readers.
pub(crate) mod http_client;
/// Console log entries and the channel that carries them.
pub mod log_sink;
/// PIN lock state machine and idle timer.
pub mod session;
/// Update check, download and relaunch.
pub mod updater;
/// Program and plugin installer downloads.
pub mod installer;
/// Lazily built managers and the `Loggable` capability.
pub mod managers;
/// Worker threads for UI actions.
pub mod jobs;
/// First-run marker and autostart registration.
pub mod first_run;
/// egui application shell.
pub mod ui;
