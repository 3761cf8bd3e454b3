//! Lazily constructed managers and the logging capability they share.

use std::sync::{Arc, OnceLock, atomic::AtomicBool};

use crate::config::AppConfig;
use crate::installer::InstallerManager;
use crate::log_sink::{LogLevel, LogSink};
use crate::updater::UpdateManager;

/// Components that write entries to the console log.
pub trait Loggable {
    fn log_sink(&self) -> &LogSink;

    fn log(&self, level: LogLevel, message: &str) {
        self.log_sink().emit(level, message);
    }
}

/// Managers the registry can construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerKind {
    Updates,
    Installer,
}

impl ManagerKind {
    pub const ALL: [ManagerKind; 2] = [ManagerKind::Updates, ManagerKind::Installer];
}

/// Builds each manager on first access and hands out shared handles.
pub struct ManagerRegistry {
    config: Arc<AppConfig>,
    sink: LogSink,
    shutdown: Arc<AtomicBool>,
    updates: OnceLock<Arc<UpdateManager>>,
    installer: OnceLock<Arc<InstallerManager>>,
}

impl ManagerRegistry {
    pub fn new(config: Arc<AppConfig>, sink: LogSink, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            config,
            sink,
            shutdown,
            updates: OnceLock::new(),
            installer: OnceLock::new(),
        }
    }

    pub fn updates(&self) -> Arc<UpdateManager> {
        self.updates
            .get_or_init(|| {
                tracing::debug!("Constructing update manager");
                Arc::new(UpdateManager::new(
                    &self.config,
                    self.sink.clone(),
                    Arc::clone(&self.shutdown),
                ))
            })
            .clone()
    }

    pub fn installer(&self) -> Arc<InstallerManager> {
        self.installer
            .get_or_init(|| {
                tracing::debug!("Constructing installer manager");
                Arc::new(InstallerManager::new(
                    &self.config,
                    self.sink.clone(),
                    Arc::clone(&self.shutdown),
                ))
            })
            .clone()
    }

    /// Logging view of a manager, constructing it if needed.
    pub fn loggable(&self, kind: ManagerKind) -> Arc<dyn Loggable + Send + Sync> {
        match kind {
            ManagerKind::Updates => self.updates(),
            ManagerKind::Installer => self.installer(),
        }
    }

    pub fn is_constructed(&self, kind: ManagerKind) -> bool {
        match kind {
            ManagerKind::Updates => self.updates.get().is_some(),
            ManagerKind::Installer => self.installer.get().is_some(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::ConsoleLog;

    fn registry() -> (ManagerRegistry, ConsoleLog) {
        let (sink, rx) = LogSink::channel();
        let registry = ManagerRegistry::new(
            Arc::new(AppConfig::default()),
            sink,
            Arc::new(AtomicBool::new(false)),
        );
        (registry, ConsoleLog::new(rx, 100))
    }

    #[test]
    fn managers_are_built_on_first_access_and_cached() {
        let (registry, _console) = registry();
        assert!(!registry.is_constructed(ManagerKind::Updates));

        let first = registry.updates();
        let second = registry.updates();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.is_constructed(ManagerKind::Updates));
        assert!(!registry.is_constructed(ManagerKind::Installer));
    }

    #[test]
    fn every_kind_logs_through_the_shared_sink() {
        let (registry, mut console) = registry();
        for kind in ManagerKind::ALL {
            registry
                .loggable(kind)
                .log(LogLevel::Info, &format!("{kind:?} ready"));
        }
        console.drain();
        let lines = console.lines().map(|e| e.message.as_str()).collect::<Vec<_>>();
        assert_eq!(lines, ["Updates ready", "Installer ready"]);
    }
}
