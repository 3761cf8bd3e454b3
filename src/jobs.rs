//! Short-lived worker threads started by UI actions.
//!
//! Each action runs on its own thread and reports back with exactly one
//! [`JobMessage`]. The UI thread polls [`BackgroundJobs::try_recv_message`]
//! every frame.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender, TryRecvError},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::config::PluginSpec;
use crate::installer::InstallerManager;
use crate::updater::{PreparedUpdate, UpdateManager, UpdateOffer};

const SHUTDOWN_POLL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub enum JobMessage {
    UpdateChecked(Option<UpdateOffer>),
    UpdatePrepared(Option<PreparedUpdate>),
    ProgramInstalled { key: String, ok: bool },
    PluginInstalled { name: String, ok: bool },
}

pub struct BackgroundJobs {
    message_tx: Sender<JobMessage>,
    message_rx: Receiver<JobMessage>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    update_check_in_progress: bool,
    update_download_in_progress: bool,
}

impl BackgroundJobs {
    pub fn new(shutdown: Arc<AtomicBool>) -> Self {
        let (message_tx, message_rx) = mpsc::channel();
        Self {
            message_tx,
            message_rx,
            workers: Vec::new(),
            shutdown,
            update_check_in_progress: false,
            update_download_in_progress: false,
        }
    }

    pub fn try_recv_message(&mut self) -> Result<JobMessage, TryRecvError> {
        let message = self.message_rx.try_recv()?;
        match &message {
            JobMessage::UpdateChecked(_) => self.update_check_in_progress = false,
            JobMessage::UpdatePrepared(_) => self.update_download_in_progress = false,
            _ => {}
        }
        Ok(message)
    }

    pub fn update_check_in_progress(&self) -> bool {
        self.update_check_in_progress
    }

    pub fn update_download_in_progress(&self) -> bool {
        self.update_download_in_progress
    }

    /// Start an update check unless one is already running.
    pub fn begin_update_check(&mut self, manager: Arc<UpdateManager>) -> bool {
        if self.update_check_in_progress {
            tracing::debug!("Update check already running; ignoring request");
            return false;
        }
        let started = self.spawn("update-check", move || {
            JobMessage::UpdateChecked(manager.check_for_updates())
        });
        self.update_check_in_progress = started;
        started
    }

    pub fn begin_update_download(&mut self, manager: Arc<UpdateManager>, offer: UpdateOffer) -> bool {
        if self.update_download_in_progress {
            return false;
        }
        let started = self.spawn("update-download", move || {
            JobMessage::UpdatePrepared(manager.prepare_update(&offer))
        });
        self.update_download_in_progress = started;
        started
    }

    pub fn begin_program_install(&mut self, manager: Arc<InstallerManager>, key: String) -> bool {
        self.spawn("program-install", move || {
            let ok = manager.install_program(&key);
            JobMessage::ProgramInstalled { key, ok }
        })
    }

    pub fn begin_plugin_install(&mut self, manager: Arc<InstallerManager>, plugin: PluginSpec) -> bool {
        self.spawn("plugin-install", move || {
            let ok = manager.install_plugin(&plugin);
            JobMessage::PluginInstalled {
                name: plugin.name,
                ok,
            }
        })
    }

    /// Workers that have not finished yet.
    pub fn active_workers(&mut self) -> usize {
        self.reap_finished();
        self.workers.len()
    }

    /// Raise the shutdown flag and join workers for up to `grace`.
    ///
    /// Returns how many workers were still running when the grace period
    /// ran out. Those are left to die with the process.
    pub fn shutdown(&mut self, grace: Duration) -> usize {
        self.shutdown.store(true, Ordering::Relaxed);
        let deadline = Instant::now() + grace;
        loop {
            self.reap_finished();
            if self.workers.is_empty() || Instant::now() >= deadline {
                break;
            }
            thread::sleep(SHUTDOWN_POLL);
        }
        let remaining = self.workers.len();
        if remaining > 0 {
            tracing::warn!("{remaining} background job(s) still running at exit");
        }
        self.workers.clear();
        remaining
    }

    fn spawn<F>(&mut self, name: &str, job: F) -> bool
    where
        F: FnOnce() -> JobMessage + Send + 'static,
    {
        self.reap_finished();
        let tx = self.message_tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("bobrik-{name}"))
            .spawn(move || {
                let _ = tx.send(job());
            });
        match spawned {
            Ok(handle) => {
                self.workers.push(handle);
                true
            }
            Err(err) => {
                tracing::error!("Failed to start {name} worker: {err}");
                false
            }
        }
    }

    fn reap_finished(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.workers)
            .into_iter()
            .partition(|handle| handle.is_finished());
        for handle in finished {
            if handle.join().is_err() {
                tracing::error!("Background job panicked");
            }
        }
        self.workers = running;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::log_sink::LogSink;
    use std::net::TcpListener;

    fn wait_for_message(jobs: &mut BackgroundJobs) -> JobMessage {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match jobs.try_recv_message() {
                Ok(message) => return message,
                Err(_) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
                Err(err) => panic!("no job message: {err}"),
            }
        }
    }

    fn offline_update_manager(shutdown: Arc<AtomicBool>) -> Arc<UpdateManager> {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = AppConfig::default();
        config.updates.descriptor_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let (sink, _rx) = LogSink::channel();
        Arc::new(UpdateManager::new(&config, sink, shutdown))
    }

    #[test]
    fn duplicate_update_checks_are_ignored_while_running() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut jobs = BackgroundJobs::new(Arc::clone(&shutdown));
        let manager = offline_update_manager(shutdown);

        assert!(jobs.begin_update_check(Arc::clone(&manager)));
        assert!(!jobs.begin_update_check(Arc::clone(&manager)));

        assert!(matches!(
            wait_for_message(&mut jobs),
            JobMessage::UpdateChecked(None)
        ));
        assert!(!jobs.update_check_in_progress());
        assert!(jobs.begin_update_check(manager));
    }

    #[test]
    fn shutdown_raises_flag_and_joins_workers() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut jobs = BackgroundJobs::new(Arc::clone(&shutdown));
        let flag = Arc::clone(&shutdown);
        jobs.spawn("waiter", move || {
            while !flag.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(5));
            }
            JobMessage::ProgramInstalled {
                key: "x".into(),
                ok: false,
            }
        });

        assert_eq!(jobs.shutdown(Duration::from_secs(5)), 0);
        assert!(shutdown.load(Ordering::Relaxed));
        assert_eq!(jobs.active_workers(), 0);
    }
}
