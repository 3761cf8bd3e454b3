use std::{
    path::Path,
    process::{Command, Stdio},
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use super::InstallError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How waiting on an installer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallerExit {
    /// Exit code, or `None` when the process was killed by a signal.
    Exited(Option<i32>),
    /// Still running when the wait limit or shutdown arrived.
    StillRunning,
}

/// Build the command for a silent install.
///
/// `.msi` packages go through `msiexec /i` and default to `/quiet` when no
/// arguments are configured. Anything else is executed directly.
pub fn installer_command(path: &Path, silent_args: &[String]) -> Command {
    let is_msi = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("msi"));
    let mut command = if is_msi {
        let mut command = Command::new("msiexec");
        command.arg("/i").arg(path);
        if silent_args.is_empty() {
            command.arg("/quiet");
        }
        command
    } else {
        Command::new(path)
    };
    command.args(silent_args);
    hide_window(&mut command);
    command
}

#[cfg(windows)]
fn hide_window(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_window(_command: &mut Command) {}

/// Run `command` and wait up to `limit` for it to exit.
///
/// The `cancel` flag is polled while waiting; a raised flag stops the wait
/// but leaves the installer running.
pub fn run_installer(
    mut command: Command,
    limit: Duration,
    cancel: &AtomicBool,
) -> Result<InstallerExit, InstallError> {
    let program = command.get_program().to_owned();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| InstallError::Spawn {
            path: program.into(),
            source,
        })?;
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(InstallerExit::Exited(status.code()));
        }
        if Instant::now() >= deadline || cancel.load(Ordering::Relaxed) {
            return Ok(InstallerExit::StillRunning);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn msi_goes_through_msiexec_with_quiet_default() {
        let command = installer_command(Path::new("C:/tmp/Tool.MSI"), &[]);
        assert_eq!(command.get_program(), "msiexec");
        let args = command.get_args().collect::<Vec<_>>();
        assert_eq!(args, ["/i", "C:/tmp/Tool.MSI", "/quiet"]);
    }

    #[test]
    fn exe_runs_directly_with_silent_args() {
        let command = installer_command(
            Path::new("/tmp/setup.exe"),
            &["/VERYSILENT".to_string(), "/NORESTART".to_string()],
        );
        assert_eq!(PathBuf::from(command.get_program()), PathBuf::from("/tmp/setup.exe"));
        assert_eq!(command.get_args().count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn reports_exit_code() {
        let mut command = Command::new("sh");
        command.args(["-c", "exit 3"]);
        let exit = run_installer(command, Duration::from_secs(10), &AtomicBool::new(false)).unwrap();
        assert_eq!(exit, InstallerExit::Exited(Some(3)));
    }

    #[cfg(unix)]
    #[test]
    fn stops_waiting_at_the_limit() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let exit = run_installer(command, Duration::from_millis(100), &AtomicBool::new(false))
            .unwrap();
        assert_eq!(exit, InstallerExit::StillRunning);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let command = Command::new("/definitely/not/here/setup.exe");
        let err = run_installer(command, Duration::from_secs(1), &AtomicBool::new(false))
            .unwrap_err();
        assert!(matches!(err, InstallError::Spawn { .. }));
    }
}
