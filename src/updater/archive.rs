//! Zip extraction for plugin and program archives.
//!
//! The whole central directory is checked against [`ArchiveLimits`] before
//! anything is written, so a rejected archive leaves the destination empty.

use std::{
    fs::File,
    io::{Read, Seek},
    path::{Path, PathBuf},
};

use zip::ZipArchive;

use super::UpdateError;

/// Size budget for one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArchiveLimits {
    pub max_entries: usize,
    pub max_file_bytes: u64,
    pub max_total_bytes: u64,
    /// Uncompressed bytes allowed per compressed byte.
    pub max_ratio: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_file_bytes: 1024 * 1024 * 1024,
            max_total_bytes: 4 * 1024 * 1024 * 1024,
            max_ratio: 200,
        }
    }
}

/// What an extraction produced.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Extraction {
    /// Regular files written, in archive order.
    pub files: Vec<PathBuf>,
    /// Entry names that would have landed outside the destination.
    pub skipped: Vec<String>,
}

/// Extract `zip_path` into `dest` with the default limits.
pub(crate) fn unzip_to_dir(zip_path: &Path, dest: &Path) -> Result<Extraction, UpdateError> {
    extract_archive(zip_path, dest, ArchiveLimits::default(), |_| {})
}

/// Extract `zip_path` into `dest`, calling `on_file` for each file right
/// after it is written.
pub(crate) fn extract_archive(
    zip_path: &Path,
    dest: &Path,
    limits: ArchiveLimits,
    mut on_file: impl FnMut(&Path),
) -> Result<Extraction, UpdateError> {
    let mut archive = ZipArchive::new(File::open(zip_path)?).map_err(zip_error)?;
    check_limits(&mut archive, &limits)?;

    std::fs::create_dir_all(dest)?;
    let mut extraction = Extraction::default();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(zip_error)?;
        let Some(relative) = entry.enclosed_name() else {
            extraction.skipped.push(entry.name().to_string());
            continue;
        };
        let target = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::io::copy(&mut entry, &mut File::create(&target)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let mode = if mode & 0o111 == 0 { 0o644 } else { 0o755 };
                std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode))?;
            }
        }
        on_file(&target);
        extraction.files.push(target);
    }
    if !extraction.skipped.is_empty() {
        tracing::warn!(
            "Skipped {} archive entries outside {}",
            extraction.skipped.len(),
            dest.display()
        );
    }
    Ok(extraction)
}

/// Walks the central directory without decompressing anything.
fn check_limits<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    limits: &ArchiveLimits,
) -> Result<(), UpdateError> {
    if archive.len() > limits.max_entries {
        return Err(UpdateError::Invalid(format!(
            "archive lists {} entries (at most {} allowed)",
            archive.len(),
            limits.max_entries
        )));
    }
    let mut total: u64 = 0;
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index).map_err(zip_error)?;
        let size = entry.size();
        if size > limits.max_file_bytes {
            return Err(UpdateError::Invalid(format!(
                "archive entry {} unpacks to {size} bytes (at most {} allowed)",
                entry.name(),
                limits.max_file_bytes
            )));
        }
        if size > entry.compressed_size().saturating_mul(limits.max_ratio) {
            return Err(UpdateError::Invalid(format!(
                "archive entry {} has an implausible compression ratio",
                entry.name()
            )));
        }
        total = total.saturating_add(size);
    }
    if total > limits.max_total_bytes {
        return Err(UpdateError::Invalid(format!(
            "archive unpacks to {total} bytes (at most {} allowed)",
            limits.max_total_bytes
        )));
    }
    Ok(())
}

fn zip_error(err: zip::result::ZipError) -> UpdateError {
    UpdateError::Zip(err.to_string())
}
