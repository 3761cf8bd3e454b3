//! Program and plugin installation.
//!
//! Programs come from the configured catalog and are either silent
//! installers or zip archives. Plugins are zip archives unpacked into the
//! downloads folder. Downloads and extraction reuse the updater pipeline.

mod manager;
mod process;
mod unblock;

use std::path::PathBuf;

use crate::updater::UpdateError;

pub use manager::InstallerManager;
pub use process::{InstallerExit, installer_command, run_installer};
pub use unblock::{UnblockReport, unblock_files};

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("Unknown program '{0}'")]
    UnknownProgram(String),
    #[error(transparent)]
    Pipeline(#[from] UpdateError),
    #[error("Downloads folder unavailable: {0}")]
    Dir(#[from] crate::app_dirs::AppDirError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to start {path}: {source}")]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },
}
