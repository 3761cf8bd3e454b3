use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Immutable application configuration, built once at startup.
///
/// Shared by reference (usually behind an `Arc`) with every manager; nothing
/// mutates it after [`super::load_or_default`] returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub updates: UpdateSettings,
    #[serde(default)]
    pub installer: InstallerSettings,
    #[serde(default)]
    pub console: ConsoleSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Screen lock behavior.
///
/// Config keys: `pin`, `idle_timeout_ms`, `check_delay_ms`, `accept_delay_ms`,
/// `reject_delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Four-digit unlock PIN. A screen lock, not a credential.
    #[serde(default = "default_pin")]
    pub pin: String,
    /// Inactivity after which an unlocked session locks itself.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Delay between the fourth digit and the comparison.
    #[serde(default = "default_check_delay_ms")]
    pub check_delay_ms: u64,
    /// How long the success state is shown before unlocking.
    #[serde(default = "default_accept_delay_ms")]
    pub accept_delay_ms: u64,
    /// How long the error state is shown before the buffer clears.
    #[serde(default = "default_reject_delay_ms")]
    pub reject_delay_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            pin: default_pin(),
            idle_timeout_ms: default_idle_timeout_ms(),
            check_delay_ms: default_check_delay_ms(),
            accept_delay_ms: default_accept_delay_ms(),
            reject_delay_ms: default_reject_delay_ms(),
        }
    }
}

/// Self-update settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSettings {
    /// URL of the JSON version descriptor.
    #[serde(default = "default_descriptor_url")]
    pub descriptor_url: String,
    /// Binary URL used when the descriptor has no `download_url`.
    #[serde(default = "default_release_download_url")]
    pub fallback_download_url: String,
    /// Downloads smaller than this are treated as truncated.
    #[serde(default = "default_min_binary_bytes")]
    pub min_binary_bytes: u64,
    /// Timeout for the descriptor request.
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,
    /// Read timeout for the binary download.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
    /// Pause inside the relaunch script before touching the executable.
    #[serde(default = "default_relaunch_delay_secs")]
    pub relaunch_delay_secs: u64,
    /// Time the app keeps running after starting the relaunch script.
    #[serde(default = "default_exit_grace_ms")]
    pub exit_grace_ms: u64,
    /// Progress is logged every time it advances by this many percent.
    #[serde(default = "default_update_progress_step")]
    pub progress_step_percent: u8,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            descriptor_url: default_descriptor_url(),
            fallback_download_url: default_release_download_url(),
            min_binary_bytes: default_min_binary_bytes(),
            check_timeout_secs: default_check_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            relaunch_delay_secs: default_relaunch_delay_secs(),
            exit_grace_ms: default_exit_grace_ms(),
            progress_step_percent: default_update_progress_step(),
        }
    }
}

/// Program and plugin installation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallerSettings {
    /// Installers smaller than this are treated as corrupt.
    #[serde(default = "default_min_installer_bytes")]
    pub min_installer_bytes: u64,
    /// How long a worker waits for a silent installer to exit.
    #[serde(default = "default_install_wait_secs")]
    pub install_wait_secs: u64,
    /// Read timeout for installer and plugin downloads.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
    /// Progress is logged every time it advances by this many percent.
    #[serde(default = "default_install_progress_step")]
    pub progress_step_percent: u8,
    /// Removal attempts before a blocked extraction folder is renamed aside.
    #[serde(default = "default_remove_attempts")]
    pub remove_attempts: u32,
    /// Pause between removal attempts.
    #[serde(default = "default_remove_retry_delay_ms")]
    pub remove_retry_delay_ms: u64,
    /// Where plugin archives land. Defaults to the user's Downloads folder.
    #[serde(default)]
    pub downloads_dir: Option<PathBuf>,
    #[serde(default = "default_programs")]
    pub programs: Vec<ProgramSpec>,
    #[serde(default)]
    pub plugins: Vec<PluginSpec>,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            min_installer_bytes: default_min_installer_bytes(),
            install_wait_secs: default_install_wait_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            progress_step_percent: default_install_progress_step(),
            remove_attempts: default_remove_attempts(),
            remove_retry_delay_ms: default_remove_retry_delay_ms(),
            downloads_dir: None,
            programs: default_programs(),
            plugins: Vec::new(),
        }
    }
}

impl InstallerSettings {
    /// Look up a catalog entry by key.
    pub fn program(&self, key: &str) -> Option<&ProgramSpec> {
        self.programs.iter().find(|program| program.key == key)
    }
}

/// One downloadable program in the installer catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSpec {
    pub key: String,
    pub name: String,
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub silent_args: Vec<String>,
    /// The download is a zip archive rather than an installer.
    #[serde(default)]
    pub archive: bool,
    /// File inside the archive to start after extraction.
    #[serde(default)]
    pub launch_after_extract: Option<String>,
}

/// A plugin archive published for a given version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: String,
    pub version: String,
    pub url: String,
}

impl PluginSpec {
    /// Folder name the archive extracts into.
    pub fn folder_name(&self) -> String {
        format!("{}_{}", self.name, self.version)
    }
}

/// Console panel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Oldest lines are dropped beyond this count.
    #[serde(default = "default_console_max_lines")]
    pub max_lines: usize,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            max_lines: default_console_max_lines(),
        }
    }
}

/// Tracing output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Env-filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Number of per-launch log files to keep.
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}
