//! First-run marker and autostart registration.
//!
//! On first launch the app registers itself to start with the user session
//! and writes `startup_added.txt` so setup is not repeated. Later launches
//! only check that the autostart entry still exists and restore it if not.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::app_dirs;

pub const MARKER_FILE_NAME: &str = "startup_added.txt";
const MARKER_CONTENTS: &str = "startup_configured";

#[cfg(target_os = "windows")]
const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";
#[cfg(target_os = "windows")]
const RUN_VALUE: &str = "bobrik";

#[derive(Debug, Error)]
pub enum FirstRunError {
    #[error(transparent)]
    Dir(#[from] app_dirs::AppDirError),
    #[error("Failed to resolve the running executable: {0}")]
    CurrentExe(std::io::Error),
    #[error("Failed to write first-run marker {path}: {source}")]
    Marker {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Autostart registration failed: {0}")]
    Registry(String),
}

/// What the startup check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupOutcome {
    Registered,
    /// First run, registration failed. The marker is still written so the
    /// attempt is not repeated on every launch.
    RegistrationFailed,
    AlreadyPresent,
    Restored,
    RestoreFailed,
    /// The platform has no autostart store; only the marker is kept.
    Unsupported,
}

/// Where the autostart entry lives.
pub trait AutostartStore {
    fn is_supported(&self) -> bool {
        true
    }
    fn is_registered(&self) -> bool;
    fn register(&self, exe: &Path) -> Result<(), FirstRunError>;
}

/// `HKCU\...\Run` value on Windows; unsupported elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAutostart;

#[cfg(target_os = "windows")]
impl AutostartStore for SystemAutostart {
    fn is_registered(&self) -> bool {
        use winreg::RegKey;
        use winreg::enums::HKEY_CURRENT_USER;

        RegKey::predef(HKEY_CURRENT_USER)
            .open_subkey(RUN_KEY)
            .and_then(|key| key.get_value::<String, _>(RUN_VALUE))
            .is_ok()
    }

    fn register(&self, exe: &Path) -> Result<(), FirstRunError> {
        use winreg::RegKey;
        use winreg::enums::HKEY_CURRENT_USER;

        let (key, _) = RegKey::predef(HKEY_CURRENT_USER)
            .create_subkey(RUN_KEY)
            .map_err(|err| FirstRunError::Registry(format!("open Run key: {err}")))?;
        let command = format!("\"{}\"", exe.display());
        key.set_value(RUN_VALUE, &command)
            .map_err(|err| FirstRunError::Registry(format!("set {RUN_VALUE}: {err}")))
    }
}

#[cfg(not(target_os = "windows"))]
impl AutostartStore for SystemAutostart {
    fn is_supported(&self) -> bool {
        false
    }

    fn is_registered(&self) -> bool {
        false
    }

    fn register(&self, _exe: &Path) -> Result<(), FirstRunError> {
        Err(FirstRunError::Registry(
            "autostart is only supported on Windows".into(),
        ))
    }
}

pub fn marker_path() -> Result<PathBuf, FirstRunError> {
    Ok(app_dirs::app_root_dir()?.join(MARKER_FILE_NAME))
}

pub fn is_first_run(marker: &Path) -> bool {
    !marker.exists()
}

/// Run the startup check for the current executable and app root.
pub fn ensure_startup_entry() -> Result<StartupOutcome, FirstRunError> {
    let marker = marker_path()?;
    let exe = std::env::current_exe().map_err(FirstRunError::CurrentExe)?;
    ensure_startup_entry_with(&marker, &exe, &SystemAutostart)
}

pub fn ensure_startup_entry_with(
    marker: &Path,
    exe: &Path,
    store: &dyn AutostartStore,
) -> Result<StartupOutcome, FirstRunError> {
    if is_first_run(marker) {
        let outcome = if !store.is_supported() {
            StartupOutcome::Unsupported
        } else {
            match store.register(exe) {
                Ok(()) => {
                    tracing::info!("Registered autostart for {}", exe.display());
                    StartupOutcome::Registered
                }
                Err(err) => {
                    tracing::warn!("{err}");
                    StartupOutcome::RegistrationFailed
                }
            }
        };
        write_marker(marker)?;
        return Ok(outcome);
    }
    if !store.is_supported() {
        return Ok(StartupOutcome::Unsupported);
    }
    if store.is_registered() {
        return Ok(StartupOutcome::AlreadyPresent);
    }
    tracing::warn!("Autostart entry missing; restoring");
    match store.register(exe) {
        Ok(()) => Ok(StartupOutcome::Restored),
        Err(err) => {
            tracing::warn!("{err}");
            Ok(StartupOutcome::RestoreFailed)
        }
    }
}

fn write_marker(marker: &Path) -> Result<(), FirstRunError> {
    let wrap = |source| FirstRunError::Marker {
        path: marker.to_path_buf(),
        source,
    };
    if let Some(parent) = marker.parent() {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    std::fs::write(marker, MARKER_CONTENTS).map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeStore {
        registered: Cell<bool>,
        fail: bool,
        calls: RefCell<Vec<PathBuf>>,
    }

    impl AutostartStore for FakeStore {
        fn is_registered(&self) -> bool {
            self.registered.get()
        }

        fn register(&self, exe: &Path) -> Result<(), FirstRunError> {
            self.calls.borrow_mut().push(exe.to_path_buf());
            if self.fail {
                return Err(FirstRunError::Registry("denied".into()));
            }
            self.registered.set(true);
            Ok(())
        }
    }

    struct Unsupported;

    impl AutostartStore for Unsupported {
        fn is_supported(&self) -> bool {
            false
        }
        fn is_registered(&self) -> bool {
            false
        }
        fn register(&self, _exe: &Path) -> Result<(), FirstRunError> {
            unreachable!("unsupported store must not be written")
        }
    }

    #[test]
    fn first_run_registers_and_writes_marker() {
        let temp = tempdir().unwrap();
        let marker = temp.path().join(MARKER_FILE_NAME);
        let store = FakeStore::default();

        let outcome = ensure_startup_entry_with(&marker, Path::new("/opt/bobrik"), &store).unwrap();

        assert_eq!(outcome, StartupOutcome::Registered);
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), MARKER_CONTENTS);
        assert_eq!(store.calls.borrow().len(), 1);
    }

    #[test]
    fn failed_registration_still_marks_first_run_done() {
        let temp = tempdir().unwrap();
        let marker = temp.path().join(MARKER_FILE_NAME);
        let store = FakeStore {
            fail: true,
            ..FakeStore::default()
        };

        let outcome = ensure_startup_entry_with(&marker, Path::new("/opt/bobrik"), &store).unwrap();

        assert_eq!(outcome, StartupOutcome::RegistrationFailed);
        assert!(!is_first_run(&marker));
    }

    #[test]
    fn later_runs_restore_a_missing_entry() {
        let temp = tempdir().unwrap();
        let marker = temp.path().join(MARKER_FILE_NAME);
        std::fs::write(&marker, MARKER_CONTENTS).unwrap();
        let store = FakeStore::default();

        let first = ensure_startup_entry_with(&marker, Path::new("/opt/bobrik"), &store).unwrap();
        let second = ensure_startup_entry_with(&marker, Path::new("/opt/bobrik"), &store).unwrap();

        assert_eq!(first, StartupOutcome::Restored);
        assert_eq!(second, StartupOutcome::AlreadyPresent);
        assert_eq!(store.calls.borrow().len(), 1);
    }

    #[test]
    fn unsupported_platform_only_writes_marker() {
        let temp = tempdir().unwrap();
        let marker = temp.path().join("nested").join(MARKER_FILE_NAME);

        let outcome =
            ensure_startup_entry_with(&marker, Path::new("/opt/bobrik"), &Unsupported).unwrap();

        assert_eq!(outcome, StartupOutcome::Unsupported);
        assert!(marker.exists());
    }
}
