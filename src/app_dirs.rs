//! Application directory helpers anchored to a single `bobrik` folder.
//!
//! Config, logs and the first-run marker all live under the OS config
//! directory (`%APPDATA%` on Windows). `BOBRIK_CONFIG_HOME` overrides the base
//! for portable installs and tests.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::{BaseDirs, UserDirs};
use thiserror::Error;

/// Name of the application directory that lives under the OS config root.
pub const APP_DIR_NAME: &str = "bobrik";

static CONFIG_BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// No suitable base config directory could be resolved.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    /// Failed to create the application directory.
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the root `bobrik` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = config_base_dir().ok_or(AppDirError::NoBaseDir)?;
    let path = base.join(APP_DIR_NAME);
    create(&path)?;
    Ok(path)
}

/// Return the logs directory inside the `bobrik` root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    let path = app_root_dir()?.join("logs");
    create(&path)?;
    Ok(path)
}

/// Folder that receives plugin archives, usually the user's Downloads.
///
/// Falls back to `<root>/downloads` when the OS has no Downloads folder.
pub fn downloads_dir() -> Result<PathBuf, AppDirError> {
    if let Some(path) = UserDirs::new().and_then(|dirs| dirs.download_dir().map(|p| p.to_path_buf()))
    {
        return Ok(path);
    }
    let path = app_root_dir()?.join("downloads");
    create(&path)?;
    Ok(path)
}

fn create(path: &PathBuf) -> Result<(), AppDirError> {
    std::fs::create_dir_all(path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })
}

fn config_base_dir() -> Option<PathBuf> {
    if let Some(path) = CONFIG_BASE_OVERRIDE
        .lock()
        .ok()
        .and_then(|guard| guard.clone())
    {
        return Some(path);
    }
    if let Ok(path) = std::env::var("BOBRIK_CONFIG_HOME") {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(test)]
pub(crate) fn set_config_base_override(path: Option<PathBuf>) {
    let mut guard = CONFIG_BASE_OVERRIDE
        .lock()
        .expect("config base override mutex poisoned");
    *guard = path;
}
