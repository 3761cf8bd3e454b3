use std::{
    fs, io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use super::UpdateError;

/// How a destination directory was made available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FreshDir {
    Created,
    Replaced,
    /// Removal kept failing, so the old directory was moved here.
    RenamedAside(PathBuf),
}

/// Ensure `path` is a new empty directory.
///
/// An existing directory is removed with up to `attempts` tries spaced by
/// `retry_delay`. If it stays locked it is renamed to
/// `<name>.stale-<unix secs>` instead.
pub(crate) fn prepare_fresh_dir(
    path: &Path,
    attempts: u32,
    retry_delay: Duration,
) -> Result<FreshDir, UpdateError> {
    prepare_fresh_dir_with(path, attempts, retry_delay, |dir| fs::remove_dir_all(dir))
}

fn prepare_fresh_dir_with(
    path: &Path,
    attempts: u32,
    retry_delay: Duration,
    mut remove: impl FnMut(&Path) -> io::Result<()>,
) -> Result<FreshDir, UpdateError> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        return Ok(FreshDir::Created);
    }
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match remove(path) {
            Ok(()) => {
                fs::create_dir_all(path)?;
                return Ok(FreshDir::Replaced);
            }
            Err(err) => {
                tracing::warn!(
                    "Removing {} failed (attempt {attempt}/{attempts}): {err}",
                    path.display()
                );
                if attempt < attempts {
                    thread::sleep(retry_delay);
                }
            }
        }
    }
    let aside = stale_path(path);
    fs::rename(path, &aside)?;
    fs::create_dir_all(path)?;
    Ok(FreshDir::RenamedAside(aside))
}

fn stale_path(path: &Path) -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let mut name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("dir")
        .to_string();
    name.push_str(&format!(".stale-{secs}"));
    path.with_file_name(name)
}

/// Delete a file, treating "already gone" as success.
pub(crate) fn remove_file_quietly(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_dir() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("Plugin_1.0");
        let outcome = prepare_fresh_dir(&target, 3, Duration::ZERO).unwrap();
        assert_eq!(outcome, FreshDir::Created);
        assert!(target.is_dir());
    }

    #[test]
    fn replaces_existing_dir_contents() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("Plugin_1.0");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("old.dll"), b"old").unwrap();

        let outcome = prepare_fresh_dir(&target, 3, Duration::ZERO).unwrap();

        assert_eq!(outcome, FreshDir::Replaced);
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn renames_aside_when_removal_keeps_failing() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("Plugin_1.0");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("locked.dll"), b"old").unwrap();
        let mut calls = 0;

        let outcome = prepare_fresh_dir_with(&target, 3, Duration::ZERO, |_| {
            calls += 1;
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "in use"))
        })
        .unwrap();

        assert_eq!(calls, 3);
        let FreshDir::RenamedAside(aside) = outcome else {
            panic!("expected rename aside");
        };
        assert!(aside.join("locked.dll").exists());
        let name = aside.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("Plugin_1.0.stale-"));
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn removing_missing_file_is_ok() {
        let temp = tempdir().unwrap();
        remove_file_quietly(&temp.path().join("gone.exe")).unwrap();
    }
}
