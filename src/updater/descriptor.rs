use std::time::Duration;

use serde::Deserialize;

use crate::http_client;

use super::{USER_AGENT, UpdateError};

const MAX_DESCRIPTOR_BYTES: usize = 64 * 1024;

/// Remote `version.json` contents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateDescriptor {
    pub version: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub download_url: Option<String>,
    /// Hex SHA-256 of the binary. Integrity only, not a signature.
    #[serde(default)]
    pub sha256: Option<String>,
}

/// Fetch and parse the descriptor. No retry.
pub fn fetch_descriptor(url: &str, timeout: Duration) -> Result<UpdateDescriptor, UpdateError> {
    let response = http_client::agent()
        .get(url)
        .timeout(timeout)
        .set("User-Agent", USER_AGENT)
        .set("Cache-Control", "no-cache")
        .call()
        .map_err(UpdateError::from_request)?;
    let bytes = http_client::read_response_bytes(response, MAX_DESCRIPTOR_BYTES)
        .map_err(UpdateError::from_read)?;
    let descriptor: UpdateDescriptor = serde_json::from_slice(&bytes)?;
    if descriptor.version.trim().is_empty() {
        return Err(UpdateError::Invalid("Descriptor has an empty version".into()));
    }
    Ok(descriptor)
}
