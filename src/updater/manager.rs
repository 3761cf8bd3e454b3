use std::{
    path::PathBuf,
    sync::{Arc, atomic::AtomicBool},
    time::Duration,
};

use crate::config::{AppConfig, UpdateSettings};
use crate::log_sink::{LogLevel, LogSink};
use crate::managers::Loggable;

use super::{
    CURRENT_VERSION, DownloadProgress, DownloadRequest, RelaunchPlan, UpdateCheckOutcome,
    UpdateCheckRequest, UpdateError, UpdateOffer, check_for_updates, download_artifact,
    fs_ops::remove_file_quietly, relaunch,
};

/// A validated download waiting for the user's final confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedUpdate {
    pub version: String,
    pub plan: RelaunchPlan,
}

impl PreparedUpdate {
    pub fn artifact_path(&self) -> &PathBuf {
        &self.plan.artifact_path
    }

    pub fn script_path(&self) -> &PathBuf {
        &self.plan.script_path
    }
}

/// Checks for and stages self-updates, reporting through the console log.
///
/// Methods run on worker threads and never return errors; failures become
/// log entries and `None`/`false` results.
pub struct UpdateManager {
    settings: UpdateSettings,
    sink: LogSink,
    shutdown: Arc<AtomicBool>,
    current_version: String,
    work_dir: PathBuf,
    exe_path: Option<PathBuf>,
}

impl Loggable for UpdateManager {
    fn log_sink(&self) -> &LogSink {
        &self.sink
    }
}

impl UpdateManager {
    pub fn new(config: &AppConfig, sink: LogSink, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            settings: config.updates.clone(),
            sink,
            shutdown,
            current_version: CURRENT_VERSION.to_string(),
            work_dir: std::env::temp_dir(),
            exe_path: None,
        }
    }

    /// Directory for downloaded binaries and relaunch scripts.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    /// Executable to replace. Defaults to the running one.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.exe_path = Some(path.into());
        self
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn check_for_updates(&self) -> Option<UpdateOffer> {
        self.log(LogLevel::Info, "Checking for updates...");
        let request = UpdateCheckRequest {
            descriptor_url: self.settings.descriptor_url.clone(),
            current_version: self.current_version.clone(),
            fallback_download_url: self.settings.fallback_download_url.clone(),
            timeout: Duration::from_secs(self.settings.check_timeout_secs),
        };
        match check_for_updates(&request) {
            Ok(UpdateCheckOutcome::UpToDate { latest }) => {
                self.log(
                    LogLevel::Success,
                    &format!(
                        "You are running the latest version ({}; published {latest})",
                        self.current_version
                    ),
                );
                None
            }
            Ok(UpdateCheckOutcome::UpdateAvailable(offer)) => {
                self.log(
                    LogLevel::Info,
                    &format!(
                        "Update available: {} (current {})",
                        offer.version, self.current_version
                    ),
                );
                Some(offer)
            }
            Err(err) => {
                self.log(LogLevel::Error, &describe_check_error(&err));
                None
            }
        }
    }

    /// Download the offered binary and write the relaunch script.
    pub fn prepare_update(&self, offer: &UpdateOffer) -> Option<PreparedUpdate> {
        let exe_path = match self.exe_path.clone() {
            Some(path) => path,
            None => match std::env::current_exe() {
                Ok(path) => path,
                Err(err) => {
                    self.log(
                        LogLevel::Error,
                        &format!("Cannot locate the running executable: {err}"),
                    );
                    return None;
                }
            },
        };
        let artifact_path = self.work_dir.join(format!(
            "bobrik_new_{}{}",
            sanitize_version(&offer.version),
            std::env::consts::EXE_SUFFIX
        ));
        self.log(
            LogLevel::Info,
            &format!("Downloading version {}...", offer.version),
        );
        let request = DownloadRequest {
            url: &offer.download_url,
            dest: &artifact_path,
            min_bytes: self.settings.min_binary_bytes,
            sha256: offer.sha256.as_deref(),
            read_timeout: Duration::from_secs(self.settings.download_timeout_secs),
            progress_step: self.settings.progress_step_percent,
        };
        let size = match download_artifact(&request, &self.shutdown, |progress| {
            self.log_progress(progress)
        }) {
            Ok(size) => size,
            Err(err) => {
                self.log(LogLevel::Error, &format!("Update download failed: {err}"));
                return None;
            }
        };
        self.log(
            LogLevel::Success,
            &format!("Download complete ({:.1} MB)", size as f64 / (1024.0 * 1024.0)),
        );

        let plan = RelaunchPlan {
            exe_path,
            artifact_path,
            script_path: self.work_dir.join(relaunch::script_file_name()),
            delay_secs: self.settings.relaunch_delay_secs,
        };
        if let Err(err) = relaunch::write_script(&plan) {
            self.log(
                LogLevel::Error,
                &format!("Failed to write the update script: {err}"),
            );
            self.remove_staged(&plan);
            return None;
        }
        Some(PreparedUpdate {
            version: offer.version.clone(),
            plan,
        })
    }

    /// Start the relaunch script. The caller exits after the grace period.
    pub fn install_prepared(&self, prepared: &PreparedUpdate) -> bool {
        match relaunch::spawn_script(prepared.script_path()) {
            Ok(()) => {
                self.log(
                    LogLevel::Success,
                    &format!(
                        "Installing version {}; the app will restart shortly",
                        prepared.version
                    ),
                );
                true
            }
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    &format!("Failed to start the update script: {err}"),
                );
                self.remove_staged(&prepared.plan);
                false
            }
        }
    }

    /// The user declined the install. Not an error.
    pub fn discard_prepared(&self, prepared: PreparedUpdate) {
        self.remove_staged(&prepared.plan);
        self.log(
            LogLevel::Info,
            &format!("Update to {} postponed", prepared.version),
        );
    }

    pub fn exit_grace(&self) -> Duration {
        self.settings.exit_grace()
    }

    fn remove_staged(&self, plan: &RelaunchPlan) {
        for path in [&plan.artifact_path, &plan.script_path] {
            if let Err(err) = remove_file_quietly(path) {
                tracing::warn!("Failed to remove {}: {err}", path.display());
            }
        }
    }

    fn log_progress(&self, progress: DownloadProgress) {
        match progress {
            DownloadProgress::Percent(percent) => {
                self.log(LogLevel::Info, &format!("Download progress: {percent}%"))
            }
            DownloadProgress::SizeUnknown => self.log(
                LogLevel::Info,
                "Download size unknown; progress will not be shown",
            ),
        }
    }
}

fn describe_check_error(err: &UpdateError) -> String {
    match err {
        UpdateError::Timeout(_) => "Update check timed out; the server did not answer".into(),
        UpdateError::Http(detail) => format!("Cannot reach the update server: {detail}"),
        UpdateError::Status { code, .. } => format!("Update server returned HTTP {code}"),
        UpdateError::Json(detail) => format!("Update descriptor is malformed: {detail}"),
        other => format!("Update check failed: {other}"),
    }
}

fn sanitize_version(version: &str) -> String {
    version
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect()
}
