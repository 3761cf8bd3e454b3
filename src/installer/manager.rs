use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Command,
    sync::{Arc, atomic::AtomicBool},
    time::Duration,
};

use crate::app_dirs;
use crate::config::{AppConfig, InstallerSettings, PluginSpec, ProgramSpec};
use crate::log_sink::{LogLevel, LogSink};
use crate::managers::Loggable;
use crate::updater::{
    DownloadProgress, DownloadRequest, archive, download_artifact,
    fs_ops::{self, FreshDir},
};

use super::{InstallError, InstallerExit, UnblockReport, installer_command, run_installer};

/// Downloads and installs catalog programs and plugin archives.
///
/// Boundary methods run on worker threads and report through the console
/// log, returning `true` on success.
pub struct InstallerManager {
    settings: InstallerSettings,
    sink: LogSink,
    shutdown: Arc<AtomicBool>,
    temp_dir: PathBuf,
    launch: bool,
}

impl Loggable for InstallerManager {
    fn log_sink(&self) -> &LogSink {
        &self.sink
    }
}

impl InstallerManager {
    pub fn new(config: &AppConfig, sink: LogSink, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            settings: config.installer.clone(),
            sink,
            shutdown,
            temp_dir: std::env::temp_dir(),
            launch: true,
        }
    }

    /// Scratch directory for installers and extracted programs.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Skip starting extracted programs and opening folders.
    pub fn without_launching(mut self) -> Self {
        self.launch = false;
        self
    }

    pub fn programs(&self) -> &[ProgramSpec] {
        &self.settings.programs
    }

    pub fn plugins(&self) -> &[PluginSpec] {
        &self.settings.plugins
    }

    pub fn install_program(&self, key: &str) -> bool {
        let Some(program) = self.settings.program(key) else {
            self.log(
                LogLevel::Error,
                &InstallError::UnknownProgram(key.to_string()).to_string(),
            );
            return false;
        };
        match self.try_install_program(program) {
            Ok(()) => true,
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    &format!("Installing {} failed: {err}", program.name),
                );
                false
            }
        }
    }

    pub fn install_plugin(&self, plugin: &PluginSpec) -> bool {
        match self.try_install_plugin(plugin) {
            Ok(dir) => {
                self.log(
                    LogLevel::Success,
                    &format!("Plugin {} is ready in {}", plugin.name, dir.display()),
                );
                true
            }
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    &format!("Installing plugin {} failed: {err}", plugin.name),
                );
                false
            }
        }
    }

    fn try_install_program(&self, program: &ProgramSpec) -> Result<(), InstallError> {
        let artifact = self.temp_dir.join(file_name_of(&program.filename));
        self.log(LogLevel::Info, &format!("Downloading {}...", program.name));
        self.download(&program.url, &artifact)?;
        if program.archive {
            let outcome = self.install_archive(program, &artifact);
            self.remove_artifact(&artifact);
            outcome
        } else {
            self.run_silent(program, &artifact)
        }
    }

    fn install_archive(&self, program: &ProgramSpec, archive_path: &Path) -> Result<(), InstallError> {
        let extract_dir = self.temp_dir.join(format!("{}_extracted", program.name));
        let files = self.extract_fresh(archive_path, &extract_dir)?;
        self.log(
            LogLevel::Info,
            &format!("Extracted {} to {}", program.name, extract_dir.display()),
        );

        let target = program.launch_after_extract.as_deref().and_then(|name| {
            files
                .iter()
                .find(|path| path.file_name() == Some(OsStr::new(name)))
        });
        match (target, program.launch_after_extract.as_deref()) {
            (Some(exe), _) => {
                if self.launch {
                    Command::new(exe)
                        .current_dir(exe.parent().unwrap_or(&extract_dir))
                        .spawn()
                        .map_err(|source| InstallError::Spawn {
                            path: exe.clone(),
                            source,
                        })?;
                }
                self.log(
                    LogLevel::Success,
                    &format!("{}: started {}", program.name, exe.display()),
                );
            }
            (None, missing) => {
                if let Some(name) = missing {
                    self.log(
                        LogLevel::Warning,
                        &format!("{name} was not found in the {} archive", program.name),
                    );
                }
                self.open_folder(&extract_dir);
            }
        }
        Ok(())
    }

    fn run_silent(&self, program: &ProgramSpec, installer: &Path) -> Result<(), InstallError> {
        self.log(LogLevel::Info, &format!("Installing {}...", program.name));
        let command = installer_command(installer, &program.silent_args);
        let wait = Duration::from_secs(self.settings.install_wait_secs);
        let exit = match run_installer(command, wait, &self.shutdown) {
            Ok(exit) => exit,
            Err(err) => {
                self.remove_artifact(installer);
                return Err(err);
            }
        };
        match exit {
            InstallerExit::Exited(Some(0)) => {
                self.remove_artifact(installer);
                self.log(
                    LogLevel::Success,
                    &format!("{} installed successfully", program.name),
                );
            }
            InstallerExit::Exited(code) => {
                self.remove_artifact(installer);
                let code = code.map_or_else(|| "none".to_string(), |code| code.to_string());
                self.log(
                    LogLevel::Warning,
                    &format!("{} installer finished with exit code {code}", program.name),
                );
            }
            InstallerExit::StillRunning => self.log(
                LogLevel::Info,
                &format!(
                    "{} installation is taking longer than expected; no longer waiting",
                    program.name
                ),
            ),
        }
        Ok(())
    }

    fn try_install_plugin(&self, plugin: &PluginSpec) -> Result<PathBuf, InstallError> {
        let downloads = match &self.settings.downloads_dir {
            Some(dir) => dir.clone(),
            None => app_dirs::downloads_dir()?,
        };
        let folder = file_name_of(&plugin.folder_name()).to_os_string();
        let mut zip_name = folder.clone();
        zip_name.push(".zip");
        let zip_path = downloads.join(zip_name);
        let extract_dir = downloads.join(&folder);

        self.log(
            LogLevel::Info,
            &format!("Downloading plugin {} {}...", plugin.name, plugin.version),
        );
        self.download(&plugin.url, &zip_path)?;
        let outcome = self.extract_fresh(&zip_path, &extract_dir);
        self.remove_artifact(&zip_path);
        outcome?;

        self.open_folder(&extract_dir);
        Ok(extract_dir)
    }

    fn extract_fresh(&self, archive_path: &Path, dest: &Path) -> Result<Vec<PathBuf>, InstallError> {
        let fresh = fs_ops::prepare_fresh_dir(
            dest,
            self.settings.remove_attempts,
            Duration::from_millis(self.settings.remove_retry_delay_ms),
        )?;
        if let FreshDir::RenamedAside(aside) = fresh {
            self.log(
                LogLevel::Warning,
                &format!(
                    "{} was in use; moved it to {}",
                    dest.display(),
                    aside.display()
                ),
            );
        }
        let mut report = UnblockReport::default();
        let extraction = archive::extract_archive(
            archive_path,
            dest,
            archive::ArchiveLimits::default(),
            |path| report.unblock(path),
        )?;
        for name in &extraction.skipped {
            self.log(
                LogLevel::Warning,
                &format!("Skipped archive entry outside the folder: {name}"),
            );
        }
        for (path, err) in &report.failures {
            self.log(
                LogLevel::Warning,
                &format!("Could not unblock {}: {err}", path.display()),
            );
        }
        self.log(
            LogLevel::Info,
            &format!(
                "Unblocked {} of {} files",
                report.unblocked,
                extraction.files.len()
            ),
        );
        Ok(extraction.files)
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, InstallError> {
        let request = DownloadRequest {
            url,
            dest,
            min_bytes: self.settings.min_installer_bytes,
            sha256: None,
            read_timeout: Duration::from_secs(self.settings.download_timeout_secs),
            progress_step: self.settings.progress_step_percent,
        };
        let size = download_artifact(&request, &self.shutdown, |progress| match progress {
            DownloadProgress::Percent(percent) => {
                self.log(LogLevel::Info, &format!("Download progress: {percent}%"))
            }
            DownloadProgress::SizeUnknown => self.log(
                LogLevel::Info,
                "Download size unknown; progress will not be shown",
            ),
        })?;
        Ok(size)
    }

    fn open_folder(&self, dir: &Path) {
        if !self.launch {
            return;
        }
        match open::that(dir) {
            Ok(()) => self.log(LogLevel::Info, &format!("Opened {}", dir.display())),
            Err(err) => self.log(
                LogLevel::Warning,
                &format!("Could not open {}: {err}", dir.display()),
            ),
        }
    }

    fn remove_artifact(&self, path: &Path) {
        if let Err(err) = fs_ops::remove_file_quietly(path) {
            tracing::warn!("Failed to remove {}: {err}", path.display());
        }
    }
}

/// Last path component, so configured names cannot point outside a folder.
fn file_name_of(name: &str) -> &OsStr {
    Path::new(name)
        .file_name()
        .unwrap_or_else(|| OsStr::new("download"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::test_server::{ok_response, serve_once};
    use crate::log_sink::LogEntry;
    use crate::updater::archive::test_support::write_zip;
    use std::sync::mpsc::Receiver;
    use tempfile::tempdir;

    fn manager(config: &AppConfig, temp: &Path) -> (InstallerManager, Receiver<LogEntry>) {
        let (sink, rx) = LogSink::channel();
        let manager = InstallerManager::new(config, sink, Arc::new(AtomicBool::new(false)))
            .with_temp_dir(temp)
            .without_launching();
        (manager, rx)
    }

    fn noise(len: usize) -> Vec<u8> {
        let mut state = 0x2545_f491_u32;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            })
            .collect()
    }

    fn zip_bytes(dir: &Path, entries: &[(&str, &[u8])]) -> Vec<u8> {
        let path = dir.join("fixture.zip");
        write_zip(&path, entries);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        bytes
    }

    #[test]
    fn unknown_program_logs_an_error() {
        let temp = tempdir().unwrap();
        let (manager, rx) = manager(&AppConfig::default(), temp.path());
        assert!(!manager.install_program("nope"));
        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.message, "Unknown program 'nope'");
    }

    #[test]
    fn archive_program_extracts_and_removes_download() {
        let temp = tempdir().unwrap();
        let payload = noise(2048);
        let body = zip_bytes(temp.path(), &[("Tool/Tool.exe", &payload)]);
        let mut config = AppConfig::default();
        config.installer.programs = vec![ProgramSpec {
            key: "tool".into(),
            name: "Tool".into(),
            url: serve_once(ok_response(&body)),
            filename: "Tool.zip".into(),
            silent_args: Vec::new(),
            archive: true,
            launch_after_extract: Some("Tool.exe".into()),
        }];
        config.installer.min_installer_bytes = 1;
        let (manager, rx) = manager(&config, temp.path());

        assert!(manager.install_program("tool"));

        assert!(temp.path().join("Tool_extracted/Tool/Tool.exe").exists());
        assert!(!temp.path().join("Tool.zip").exists());
        let lines = rx.try_iter().map(|e| e.message).collect::<Vec<_>>();
        assert!(lines.iter().any(|line| line.starts_with("Tool: started")));
    }

    #[test]
    fn plugin_extracts_into_versioned_folder() {
        let temp = tempdir().unwrap();
        let downloads = temp.path().join("Downloads");
        let body = zip_bytes(temp.path(), &[("Plugin.dll", &noise(4096))]);
        let mut config = AppConfig::default();
        config.installer.downloads_dir = Some(downloads.clone());
        let plugin = PluginSpec {
            name: "Loyalty".into(),
            version: "8.4".into(),
            url: serve_once(ok_response(&body)),
        };
        std::fs::create_dir_all(downloads.join("Loyalty_8.4")).unwrap();
        std::fs::write(downloads.join("Loyalty_8.4/old.dll"), b"old").unwrap();
        let (manager, _rx) = manager(&config, temp.path());

        assert!(manager.install_plugin(&plugin));

        let dir = downloads.join("Loyalty_8.4");
        assert!(dir.join("Plugin.dll").exists());
        assert!(!dir.join("old.dll").exists());
        assert!(!downloads.join("Loyalty_8.4.zip").exists());
    }

    #[test]
    fn plugin_reports_entries_outside_its_folder() {
        let temp = tempdir().unwrap();
        let downloads = temp.path().join("Downloads");
        let payload = noise(4096);
        let body = zip_bytes(
            temp.path(),
            &[("Plugin.dll", &payload), ("../Startup/run.exe", b"x")],
        );
        let mut config = AppConfig::default();
        config.installer.downloads_dir = Some(downloads.clone());
        let plugin = PluginSpec {
            name: "Loyalty".into(),
            version: "8.5".into(),
            url: serve_once(ok_response(&body)),
        };
        let (manager, rx) = manager(&config, temp.path());

        assert!(manager.install_plugin(&plugin));

        assert!(!downloads.join("Startup").exists());
        let lines = rx.try_iter().collect::<Vec<_>>();
        assert!(lines.iter().any(|entry| entry.level == LogLevel::Warning
            && entry.message == "Skipped archive entry outside the folder: ../Startup/run.exe"));
        assert!(lines.iter().any(|entry| entry.message == "Unblocked 0 of 1 files"));
    }

    #[test]
    fn failed_download_leaves_nothing_behind() {
        let temp = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.installer.programs[0].url = serve_once(ok_response(b"tiny"));
        let key = config.installer.programs[0].key.clone();
        let (manager, rx) = manager(&config, temp.path());

        assert!(!manager.install_program(&key));

        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
        let last = rx.try_iter().last().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert!(last.message.contains("too small"));
    }
}
