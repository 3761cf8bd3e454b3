//! egui shell: lock screen, catalog buttons, console and update prompts.
//!
//! The window is only shown while the session is authenticating or
//! unlocked. Hiding goes to the tray where one exists and minimizes
//! otherwise.

mod console;
mod lock_screen;
mod main_panel;
mod prompts;
pub mod style;
pub mod tray;

use std::{
    sync::{Arc, atomic::AtomicBool, mpsc::Receiver},
    time::{Duration, Instant},
};

use eframe::egui;

use crate::config::AppConfig;
use crate::jobs::{BackgroundJobs, JobMessage};
use crate::log_sink::{ConsoleLog, LogEntry, LogSink};
use crate::managers::ManagerRegistry;
use crate::session::{LockReason, SessionController, SessionState, Transition};
use crate::updater::CURRENT_VERSION;
use main_panel::{PanelAction, PanelView};
use prompts::{PromptAnswer, UpdatePrompt};
use tray::{Tray, TrayCommand};

pub const MIN_VIEWPORT_SIZE: egui::Vec2 = egui::vec2(420.0, 560.0);
const JOB_POLL_INTERVAL: Duration = Duration::from_millis(100);
const CONSOLE_HEIGHT: f32 = 220.0;

pub struct BobrikApp {
    config: Arc<AppConfig>,
    session: SessionController,
    registry: ManagerRegistry,
    jobs: BackgroundJobs,
    console: ConsoleLog,
    prompt: Option<UpdatePrompt>,
    tray: Option<Tray>,
    window_shown: bool,
    seen_minimized: bool,
    exit_at: Option<Instant>,
    quitting: bool,
    visuals_applied: bool,
}

impl BobrikApp {
    pub fn new(
        ctx: &egui::Context,
        config: Arc<AppConfig>,
        sink: LogSink,
        log_rx: Receiver<LogEntry>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let session = SessionController::new(&config.session, Instant::now());
        let registry = ManagerRegistry::new(Arc::clone(&config), sink.clone(), Arc::clone(&shutdown));
        let console = ConsoleLog::new(log_rx, config.console.max_lines);
        let tray = tray::create(ctx);
        let mut app = Self {
            config,
            session,
            registry,
            jobs: BackgroundJobs::new(shutdown),
            console,
            prompt: None,
            window_shown: false,
            tray,
            seen_minimized: false,
            exit_at: None,
            quitting: false,
            visuals_applied: false,
        };
        if app.tray.is_none() {
            // No tray to click: start on the PIN pad instead.
            app.session.request_show();
            app.sync_window(ctx);
        }
        sink.info(format!("bobrik {CURRENT_VERSION} started"));
        app
    }

    fn handle_tray(&mut self) {
        let Some(tray) = self.tray.as_ref() else {
            return;
        };
        while let Some(command) = tray.try_recv() {
            match command {
                TrayCommand::Show => {
                    self.session.request_show();
                }
            }
        }
    }

    fn handle_close_request(&mut self, ctx: &egui::Context) {
        if !ctx.input(|i| i.viewport().close_requested()) || self.quitting {
            return;
        }
        ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
        match self.session.state() {
            SessionState::Authenticating(_) => {
                self.session.dismiss();
            }
            SessionState::Unlocked => {
                let transition = self.session.hide();
                self.log_transition(transition);
            }
            _ => {}
        }
    }

    /// Without a tray the taskbar is the only way back: restoring a
    /// minimized window while locked opens the PIN pad.
    fn handle_restore_from_taskbar(&mut self, ctx: &egui::Context) {
        if self.tray.is_some() || self.window_shown {
            return;
        }
        match ctx.input(|i| i.viewport().minimized) {
            Some(true) => self.seen_minimized = true,
            Some(false) if self.seen_minimized => {
                self.seen_minimized = false;
                self.session.request_show();
            }
            _ => {}
        }
    }

    fn poll_jobs(&mut self) {
        while let Ok(message) = self.jobs.try_recv_message() {
            match message {
                JobMessage::UpdateChecked(Some(offer)) => {
                    self.prompt = Some(UpdatePrompt::Offer(offer));
                }
                JobMessage::UpdatePrepared(Some(prepared)) => {
                    self.prompt = Some(UpdatePrompt::Confirm(prepared));
                }
                JobMessage::UpdateChecked(None) | JobMessage::UpdatePrepared(None) => {}
                JobMessage::ProgramInstalled { key, ok } => {
                    tracing::debug!("Program {key} finished (ok: {ok})");
                }
                JobMessage::PluginInstalled { name, ok } => {
                    tracing::debug!("Plugin {name} finished (ok: {ok})");
                }
            }
        }
    }

    fn apply_panel_action(&mut self, action: PanelAction, now: Instant) {
        match action {
            PanelAction::CheckUpdates if self.exit_at.is_none() => {
                self.jobs.begin_update_check(self.registry.updates());
            }
            PanelAction::CheckUpdates => {}
            PanelAction::InstallProgram(key) => {
                self.jobs.begin_program_install(self.registry.installer(), key);
            }
            PanelAction::InstallPlugin(plugin) => {
                self.jobs.begin_plugin_install(self.registry.installer(), plugin);
            }
            PanelAction::Lock => {
                let transition = self.session.hide();
                self.log_transition(transition);
            }
            PanelAction::Exit => {
                if self.session.request_exit().is_some() {
                    self.exit_at = Some(now);
                }
            }
        }
    }

    fn answer_prompt(&mut self, answer: PromptAnswer, now: Instant) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let updates = self.registry.updates();
        match (prompt, answer) {
            (UpdatePrompt::Offer(offer), PromptAnswer::Accept) => {
                self.jobs.begin_update_download(updates, offer);
            }
            (UpdatePrompt::Offer(offer), PromptAnswer::Decline) => {
                self.registry
                    .sink()
                    .info(format!("Update to {} postponed", offer.version));
            }
            (UpdatePrompt::Confirm(prepared), PromptAnswer::Accept) => {
                if updates.install_prepared(&prepared) {
                    let grace = updates.exit_grace();
                    self.registry.sink().info(format!(
                        "bobrik will close in {} s to finish the update",
                        grace.as_secs()
                    ));
                    self.exit_at = Some(now + grace);
                }
            }
            (UpdatePrompt::Confirm(prepared), PromptAnswer::Decline) => {
                updates.discard_prepared(prepared);
            }
        }
    }

    fn maybe_quit(&mut self, ctx: &egui::Context, now: Instant) {
        let Some(exit_at) = self.exit_at else {
            return;
        };
        if now < exit_at || self.quitting {
            return;
        }
        self.quitting = true;
        self.jobs.shutdown(self.registry.updates().exit_grace());
        tracing::info!("Exiting");
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    fn log_transition(&self, transition: Option<Transition>) {
        match transition {
            Some(Transition::Unlocked) => tracing::info!("Session unlocked"),
            Some(Transition::Locked(LockReason::Idle)) => {
                self.registry.sink().info("Locked after inactivity");
            }
            Some(Transition::Locked(LockReason::Hidden)) => tracing::info!("Session locked"),
            _ => {}
        }
    }

    /// Show or hide the window to match the session.
    fn sync_window(&mut self, ctx: &egui::Context) {
        let want_shown = self.quitting
            || matches!(
                self.session.state(),
                SessionState::Authenticating(_) | SessionState::Unlocked
            );
        if want_shown == self.window_shown {
            return;
        }
        self.window_shown = want_shown;
        if want_shown {
            ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(false));
            ctx.send_viewport_cmd(egui::ViewportCommand::Visible(true));
            ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
        } else if self.tray.is_some() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Visible(false));
        } else {
            self.seen_minimized = false;
            ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
        }
    }

    fn schedule_repaint(&mut self, ctx: &egui::Context, now: Instant) {
        let mut next = self.session.next_deadline();
        if let Some(exit_at) = self.exit_at {
            next = Some(next.map_or(exit_at, |deadline| deadline.min(exit_at)));
        }
        if let Some(deadline) = next {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }
        if self.jobs.active_workers() > 0 {
            ctx.request_repaint_after(JOB_POLL_INTERVAL);
        }
        if matches!(self.session.state(), SessionState::Unlocked) {
            // Keeps the idle countdown label current.
            ctx.request_repaint_after(Duration::from_secs(1));
        }
    }

    fn render(&mut self, ctx: &egui::Context, now: Instant) {
        match self.session.state() {
            SessionState::Authenticating(pad) => {
                let pad = pad.clone();
                let keys = egui::CentralPanel::default()
                    .show(ctx, |ui| lock_screen::render(ui, &pad))
                    .inner;
                for key in keys {
                    let transition = self.session.press_key(key, now);
                    self.log_transition(transition);
                }
            }
            SessionState::Unlocked => self.render_unlocked(ctx, now),
            SessionState::Locked | SessionState::Terminated => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.centered_and_justified(|ui| ui.label("Locked"));
                });
            }
        }
    }

    fn render_unlocked(&mut self, ctx: &egui::Context, now: Instant) {
        let clear_console = egui::TopBottomPanel::bottom("console")
            .resizable(true)
            .default_height(CONSOLE_HEIGHT)
            .show(ctx, |ui| console::render(ui, &self.console))
            .inner;
        if clear_console {
            self.console.clear();
        }

        let installer_settings = &self.config.installer;
        let view = PanelView {
            version: CURRENT_VERSION,
            programs: &installer_settings.programs,
            plugins: &installer_settings.plugins,
            update_busy: update_busy(
                self.jobs.update_check_in_progress(),
                self.jobs.update_download_in_progress(),
                self.prompt.is_some(),
                self.exit_at.is_some(),
            ),
            idle_remaining: self.session.idle_remaining(now),
        };
        let actions = egui::CentralPanel::default()
            .show(ctx, |ui| main_panel::render(ui, &view))
            .inner;
        for action in actions {
            self.apply_panel_action(action, now);
        }

        if let Some(prompt) = self.prompt.as_ref()
            && let Some(answer) = prompts::render(ctx, prompt)
        {
            self.answer_prompt(answer, now);
        }
    }
}

impl eframe::App for BobrikApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.visuals_applied {
            ctx.style_mut(|style| style::apply_visuals(&mut style.visuals));
            self.visuals_applied = true;
        }
        let now = Instant::now();
        self.handle_tray();
        self.handle_restore_from_taskbar(ctx);
        self.handle_close_request(ctx);
        // Timers first, so input after a stalled frame cannot outrun the lock.
        let transition = self.session.tick(now);
        self.log_transition(transition);
        if ctx.input(|i| has_user_input(&i.events)) {
            self.session.record_activity(now);
        }
        self.console.drain();
        self.poll_jobs();

        self.render(ctx, now);
        self.maybe_quit(ctx, now);
        self.sync_window(ctx);
        self.schedule_repaint(ctx, now);
    }
}

/// Update checks are disabled while one is in flight and once a confirmed
/// install is waiting for exit, since the relaunch script reads the staged files.
fn update_busy(checking: bool, downloading: bool, prompting: bool, exiting: bool) -> bool {
    checking || downloading || prompting || exiting
}

/// Pointer, keyboard and wheel events count as activity. Focus changes and
/// window events do not.
fn has_user_input(events: &[egui::Event]) -> bool {
    events.iter().any(|event| {
        matches!(
            event,
            egui::Event::PointerMoved(_)
                | egui::Event::PointerButton { .. }
                | egui::Event::Key { .. }
                | egui::Event::Text(_)
                | egui::Event::MouseWheel { .. }
                | egui::Event::Touch { .. }
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_and_keys_count_as_activity() {
        assert!(has_user_input(&[egui::Event::PointerMoved(egui::pos2(1.0, 2.0))]));
        assert!(has_user_input(&[egui::Event::Text("a".into())]));
        assert!(!has_user_input(&[egui::Event::WindowFocused(true)]));
        assert!(!has_user_input(&[]));
    }

    #[test]
    fn pending_exit_keeps_updates_busy() {
        assert!(update_busy(false, false, false, true));
        assert!(update_busy(true, false, false, false));
        assert!(!update_busy(false, false, false, false));
    }
}
