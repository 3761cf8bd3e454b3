//! Application configuration stored as `config.toml` in the app root.
//!
//! Every key has a default, so a missing or partial file is valid. The
//! loaded [`AppConfig`] is treated as read-only for the rest of the run.

mod defaults;
mod errors;
mod types;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs;

pub use errors::ConfigError;
pub use types::{
    AppConfig, ConsoleSettings, InstallerSettings, LoggingSettings, PluginSpec, ProgramSpec,
    SessionSettings, UpdateSettings,
};

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the configuration file path inside the app root.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from the app root, returning defaults if it is missing.
pub fn load_or_default() -> Result<AppConfig, ConfigError> {
    load_from(&config_path()?)
}

/// Load configuration from `path`, returning defaults if it does not exist.
pub fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Save configuration to a specific path, creating parent directories as needed.
pub fn save_to_path(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

impl AppConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let pin = &self.session.pin;
        if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue {
                key: "session.pin",
                reason: "expected exactly four digits".into(),
            });
        }
        if self.session.idle_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session.idle_timeout_ms",
                reason: "must be greater than zero".into(),
            });
        }
        for (key, step) in [
            ("updates.progress_step_percent", self.updates.progress_step_percent),
            (
                "installer.progress_step_percent",
                self.installer.progress_step_percent,
            ),
        ] {
            if step == 0 || step > 100 {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: format!("{step} is outside 1..=100"),
                });
            }
        }
        Ok(())
    }
}

impl SessionSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn check_delay(&self) -> Duration {
        Duration::from_millis(self.check_delay_ms)
    }

    pub fn accept_delay(&self) -> Duration {
        Duration::from_millis(self.accept_delay_ms)
    }

    pub fn reject_delay(&self) -> Duration {
        Duration::from_millis(self.reject_delay_ms)
    }
}

impl UpdateSettings {
    pub fn exit_grace(&self) -> Duration {
        Duration::from_millis(self.exit_grace_ms)
    }
}
