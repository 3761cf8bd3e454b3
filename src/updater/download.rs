use std::{
    fs::File,
    io::Read,
    path::Path,
    sync::atomic::AtomicBool,
    time::Duration,
};

use sha2::{Digest, Sha256};

use crate::http_client;

use super::{USER_AGENT, UpdateError};

const MAX_ARTIFACT_BYTES: usize = 1024 * 1024 * 1024;

/// Parameters for one streamed download.
#[derive(Debug, Clone)]
pub struct DownloadRequest<'a> {
    pub url: &'a str,
    /// Final location. Only written once the artifact passes validation.
    pub dest: &'a Path,
    /// Anything smaller is treated as truncated and rejected.
    pub min_bytes: u64,
    /// Optional hex SHA-256 the artifact must match.
    pub sha256: Option<&'a str>,
    pub read_timeout: Duration,
    /// Percent granularity of progress reports.
    pub progress_step: u8,
}

/// Coarse progress report for the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadProgress {
    Percent(u8),
    /// The server sent no length, so no percentages follow.
    SizeUnknown,
}

/// Turns running byte counts into step-aligned, non-decreasing percentages.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    step: u8,
    total: u64,
    last_reported: u8,
}

impl ProgressTracker {
    pub fn new(step: u8, total: u64) -> Self {
        Self {
            step: step.clamp(1, 100),
            total,
            last_reported: 0,
        }
    }

    /// Percentage to report for `written` bytes, if a new step was reached.
    pub fn observe(&mut self, written: u64) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let percent = (written.saturating_mul(100) / self.total).min(100) as u8;
        let aligned = percent - percent % self.step;
        if aligned > self.last_reported {
            self.last_reported = aligned;
            Some(aligned)
        } else {
            None
        }
    }
}

/// Stream `request.url` to `request.dest` and validate it.
///
/// The body goes to a temp file next to `dest`; a failed or rejected
/// download never leaves a file behind. Returns the artifact size.
pub fn download_artifact(
    request: &DownloadRequest<'_>,
    cancel: &AtomicBool,
    mut progress: impl FnMut(DownloadProgress),
) -> Result<u64, UpdateError> {
    validate_download_url(request.url)?;
    let dir = request
        .dest
        .parent()
        .ok_or_else(|| UpdateError::Invalid(format!("No parent for {}", request.dest.display())))?;
    std::fs::create_dir_all(dir)?;

    let response = http_client::download_agent(request.read_timeout)
        .get(request.url)
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(UpdateError::from_request)?;
    let mut tracker = match http_client::content_length(&response) {
        Some(total) => Some(ProgressTracker::new(request.progress_step, total)),
        None => {
            progress(DownloadProgress::SizeUnknown);
            None
        }
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".download-")
        .tempfile_in(dir)?;
    let size = http_client::copy_response_to_writer(
        response,
        temp.as_file_mut(),
        MAX_ARTIFACT_BYTES,
        cancel,
        |written| {
            if let Some(percent) = tracker.as_mut().and_then(|t| t.observe(written)) {
                progress(DownloadProgress::Percent(percent));
            }
        },
    )
    .map_err(UpdateError::from_read)?;

    if size < request.min_bytes {
        return Err(UpdateError::ArtifactTooSmall {
            size,
            min: request.min_bytes,
        });
    }
    if let Some(expected) = request.sha256 {
        verify_checksum(temp.path(), expected, request.dest)?;
    }
    temp.persist(request.dest).map_err(|err| err.error)?;
    Ok(size)
}

/// Only absolute http(s) URLs are downloaded.
pub(crate) fn validate_download_url(raw: &str) -> Result<url::Url, UpdateError> {
    let parsed = url::Url::parse(raw)
        .map_err(|err| UpdateError::Invalid(format!("Invalid download URL '{raw}': {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(UpdateError::Invalid(format!(
            "Unsupported URL scheme '{scheme}' in {raw}"
        ))),
    }
}

/// Compute the SHA-256 hex digest for a local file.
pub(crate) fn sha256_file(path: &Path) -> Result<String, UpdateError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; http_client::CHUNK_SIZE];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn verify_checksum(path: &Path, expected: &str, dest: &Path) -> Result<(), UpdateError> {
    let actual = sha256_file(path)?;
    let expected = expected.trim().to_ascii_lowercase();
    if actual != expected {
        return Err(UpdateError::ChecksumMismatch {
            filename: dest
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("artifact")
                .to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::test_server::{ok_response, serve_once};
    use tempfile::tempdir;

    fn request<'a>(url: &'a str, dest: &'a Path, min_bytes: u64) -> DownloadRequest<'a> {
        DownloadRequest {
            url,
            dest,
            min_bytes,
            sha256: None,
            read_timeout: Duration::from_secs(5),
            progress_step: 20,
        }
    }

    #[test]
    fn tracker_reports_each_step_once() {
        let mut tracker = ProgressTracker::new(20, 1000);
        let reported = [100, 150, 200, 390, 400, 410, 999, 1000]
            .into_iter()
            .filter_map(|written| tracker.observe(written))
            .collect::<Vec<_>>();
        assert_eq!(reported, [20, 40, 80, 100]);
    }

    #[test]
    fn tracker_never_goes_backwards() {
        let mut tracker = ProgressTracker::new(10, 100);
        assert_eq!(tracker.observe(55), Some(50));
        assert_eq!(tracker.observe(30), None);
        assert_eq!(tracker.observe(60), Some(60));
    }

    #[test]
    fn undersized_artifact_is_rejected_and_removed() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("bobrik_new.exe");
        let url = serve_once(ok_response(&[0u8; 512]));

        let err = download_artifact(
            &request(&url, &dest, 5 * 1024 * 1024),
            &AtomicBool::new(false),
            |_| {},
        )
        .unwrap_err();

        assert!(matches!(err, UpdateError::ArtifactTooSmall { size: 512, .. }));
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn checksum_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("tool.zip");
        let url = serve_once(ok_response(b"payload"));
        let mut req = request(&url, &dest, 1);
        req.sha256 = Some("00");

        let err = download_artifact(&req, &AtomicBool::new(false), |_| {}).unwrap_err();

        assert!(matches!(err, UpdateError::ChecksumMismatch { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn valid_download_lands_at_dest_with_progress() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("tool.bin");
        let body = vec![3u8; 300 * 1024];
        let url = serve_once(ok_response(&body));
        let mut req = request(&url, &dest, 1024);
        let digest = format!("{:X}", Sha256::digest(&body));
        req.sha256 = Some(&digest);

        let mut seen = Vec::new();
        let size = download_artifact(&req, &AtomicBool::new(false), |p| seen.push(p)).unwrap();

        assert_eq!(size, body.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert_eq!(seen.last(), Some(&DownloadProgress::Percent(100)));
        assert!(!seen.contains(&DownloadProgress::SizeUnknown));
    }

    #[test]
    fn missing_length_reports_size_unknown_once() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("tool.bin");
        let mut response = b"HTTP/1.0 200 OK\r\n\r\n".to_vec();
        response.extend_from_slice(&[1u8; 4096]);
        let url = serve_once(response);

        let mut seen = Vec::new();
        download_artifact(&request(&url, &dest, 1024), &AtomicBool::new(false), |p| {
            seen.push(p)
        })
        .unwrap();

        assert_eq!(seen, [DownloadProgress::SizeUnknown]);
    }

    #[test]
    fn rejects_non_http_urls() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("x");
        let err = download_artifact(
            &request("file:///etc/passwd", &dest, 1),
            &AtomicBool::new(false),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, UpdateError::Invalid(_)));
    }
}
