//! Generated script that swaps in a downloaded binary after the app exits.
//!
//! Effect sequence: wait, drop any previous `<exe>.backup`, move the
//! running executable to `<exe>.backup`, copy the new binary into place,
//! then either relaunch it or restore the backup when the copy failed.
//! The artifact and the script itself are deleted in both cases.

use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use super::UpdateError;

/// Inputs for one relaunch script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaunchPlan {
    /// Executable being replaced.
    pub exe_path: PathBuf,
    /// Validated download that replaces it.
    pub artifact_path: PathBuf,
    pub script_path: PathBuf,
    /// Seconds to wait so the running process can exit first.
    pub delay_secs: u64,
}

impl RelaunchPlan {
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.exe_path.as_os_str().to_os_string();
        name.push(".backup");
        PathBuf::from(name)
    }
}

/// Script file name for the current platform.
pub(crate) fn script_file_name() -> &'static str {
    if cfg!(windows) {
        "bobrik_update.bat"
    } else {
        "bobrik_update.sh"
    }
}

/// Render the script for the current platform.
pub fn render_script(plan: &RelaunchPlan) -> String {
    if cfg!(windows) {
        render_batch(plan)
    } else {
        render_shell(plan)
    }
}

fn render_batch(plan: &RelaunchPlan) -> String {
    let exe = batch_quote(&plan.exe_path);
    let backup = batch_quote(&plan.backup_path());
    let artifact = batch_quote(&plan.artifact_path);
    let delay = plan.delay_secs;
    format!(
        "@echo off\r\n\
         timeout /t {delay} /nobreak >nul\r\n\
         if exist {backup} del /f /q {backup} >nul 2>&1\r\n\
         move /y {exe} {backup} >nul 2>&1\r\n\
         copy /y {artifact} {exe} >nul 2>&1\r\n\
         if errorlevel 1 goto restore\r\n\
         start \"\" {exe}\r\n\
         goto cleanup\r\n\
         :restore\r\n\
         if exist {exe} del /f /q {exe} >nul 2>&1\r\n\
         move /y {backup} {exe} >nul 2>&1\r\n\
         :cleanup\r\n\
         del /f /q {artifact} >nul 2>&1\r\n\
         (goto) 2>nul & del /f /q \"%~f0\"\r\n"
    )
}

fn render_shell(plan: &RelaunchPlan) -> String {
    let exe = shell_quote(&plan.exe_path);
    let backup = shell_quote(&plan.backup_path());
    let artifact = shell_quote(&plan.artifact_path);
    let delay = plan.delay_secs;
    format!(
        "#!/bin/sh\n\
         sleep {delay}\n\
         rm -f {backup}\n\
         mv -f {exe} {backup}\n\
         if cp -f {artifact} {exe} && chmod +x {exe}; then\n  \
           {exe} >/dev/null 2>&1 &\n\
         else\n  \
           rm -f {exe}\n  \
           mv -f {backup} {exe}\n\
         fi\n\
         rm -f {artifact}\n\
         rm -f \"$0\"\n"
    )
}

fn batch_quote(path: &Path) -> String {
    format!("\"{}\"", path.display().to_string().replace('%', "%%"))
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}

/// Write the script to `plan.script_path`.
pub fn write_script(plan: &RelaunchPlan) -> Result<(), UpdateError> {
    std::fs::write(&plan.script_path, render_script(plan))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&plan.script_path, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// Start the script detached. It outlives this process.
pub fn spawn_script(script_path: &Path) -> Result<(), UpdateError> {
    let mut command = script_command(script_path);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command.spawn()?;
    Ok(())
}

#[cfg(windows)]
fn script_command(script_path: &Path) -> Command {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    let mut command = Command::new("cmd");
    command
        .arg("/C")
        .arg(script_path)
        .creation_flags(CREATE_NO_WINDOW);
    command
}

#[cfg(not(windows))]
fn script_command(script_path: &Path) -> Command {
    let mut command = Command::new("sh");
    command.arg(script_path);
    command
}
