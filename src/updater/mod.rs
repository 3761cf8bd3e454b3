//! Self-update pipeline.
//!
//! A JSON descriptor names the latest version. When it is newer than the
//! running build the binary is streamed to a temp file, validated, and
//! handed to a generated relaunch script that swaps it in after the app
//! exits. The download and archive helpers are shared with the installer.

pub(crate) mod archive;
mod check;
mod descriptor;
pub(crate) mod download;
pub(crate) mod fs_ops;
mod manager;
mod relaunch;
mod version;

pub use check::{UpdateCheckOutcome, UpdateCheckRequest, UpdateOffer, check_for_updates};
pub use descriptor::{UpdateDescriptor, fetch_descriptor};
pub use download::{DownloadProgress, DownloadRequest, ProgressTracker, download_artifact};
pub use manager::{PreparedUpdate, UpdateManager};
pub use relaunch::{RelaunchPlan, render_script, spawn_script, write_script};
pub use version::{compare_versions, is_newer};

/// Version of the running build.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");
/// User agent sent with every updater request.
pub const USER_AGENT: &str = "bobrik-updater/1.0";

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Server returned HTTP {code} for {url}")]
    Status { code: u16, url: String },
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Zip error: {0}")]
    Zip(String),
    #[error("Downloaded file is too small ({size} bytes, expected at least {min})")]
    ArtifactTooSmall { size: u64, min: u64 },
    #[error("Checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },
    #[error("Download cancelled")]
    Cancelled,
    #[error("Invalid update: {0}")]
    Invalid(String),
}

impl UpdateError {
    /// Map a ureq failure onto the network half of the taxonomy.
    pub(crate) fn from_request(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => Self::Status {
                code,
                url: response.get_url().to_string(),
            },
            ureq::Error::Transport(transport) if crate::http_client::is_timeout(&transport) => {
                Self::Timeout(transport.to_string())
            }
            ureq::Error::Transport(transport) => Self::Http(transport.to_string()),
        }
    }

    /// Map a body read failure, keeping socket timeouts distinct.
    pub(crate) fn from_read(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                Self::Timeout(err.to_string())
            }
            std::io::ErrorKind::Interrupted => Self::Cancelled,
            _ => Self::Io(err),
        }
    }
}
