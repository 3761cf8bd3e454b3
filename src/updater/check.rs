use std::time::Duration;

use super::{UpdateError, descriptor, version};

/// Release notes longer than this are cut in the update prompt.
const NOTES_PREVIEW_CHARS: usize = 300;

/// Input for checking whether an update is available.
#[derive(Debug, Clone)]
pub struct UpdateCheckRequest {
    /// URL of the JSON version descriptor.
    pub descriptor_url: String,
    /// Version of the running build.
    pub current_version: String,
    /// Binary URL used when the descriptor does not name one.
    pub fallback_download_url: String,
    pub timeout: Duration,
}

/// A newer build the user may install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOffer {
    pub version: String,
    pub notes: String,
    pub download_url: String,
    pub sha256: Option<String>,
}

impl UpdateOffer {
    /// Notes shortened for the prompt, with an ellipsis when cut.
    pub fn notes_preview(&self) -> String {
        let mut chars = self.notes.chars();
        let preview: String = chars.by_ref().take(NOTES_PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{preview}...")
        } else {
            preview
        }
    }
}

/// Result of the update check used by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheckOutcome {
    /// The running build is current. Carries the published version.
    UpToDate { latest: String },
    UpdateAvailable(UpdateOffer),
}

pub fn check_for_updates(request: &UpdateCheckRequest) -> Result<UpdateCheckOutcome, UpdateError> {
    let descriptor = descriptor::fetch_descriptor(&request.descriptor_url, request.timeout)?;
    if !version::is_newer(&descriptor.version, &request.current_version) {
        return Ok(UpdateCheckOutcome::UpToDate {
            latest: descriptor.version,
        });
    }
    let download_url = descriptor
        .download_url
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| request.fallback_download_url.clone());
    Ok(UpdateCheckOutcome::UpdateAvailable(UpdateOffer {
        version: descriptor.version,
        notes: descriptor.notes,
        download_url,
        sha256: descriptor.sha256,
    }))
}
