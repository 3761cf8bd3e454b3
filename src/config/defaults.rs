use super::types::ProgramSpec;

const RELEASES: &str = "https://github.com/Feuda1/Programs-for-Bobrik/releases/download/v1.0.0";

pub(super) fn default_pin() -> String {
    "2289".to_string()
}

pub(super) fn default_idle_timeout_ms() -> u64 {
    600_000
}

pub(super) fn default_check_delay_ms() -> u64 {
    200
}

pub(super) fn default_accept_delay_ms() -> u64 {
    1_000
}

pub(super) fn default_reject_delay_ms() -> u64 {
    1_500
}

pub(super) fn default_descriptor_url() -> String {
    "https://raw.githubusercontent.com/Feuda1/bobrik/main/version.json".to_string()
}

pub(super) fn default_release_download_url() -> String {
    "https://github.com/Feuda1/bobrik/releases/latest/download/bobrik.exe".to_string()
}

pub(super) fn default_min_binary_bytes() -> u64 {
    5 * 1024 * 1024
}

pub(super) fn default_check_timeout_secs() -> u64 {
    10
}

pub(super) fn default_download_timeout_secs() -> u64 {
    60
}

pub(super) fn default_relaunch_delay_secs() -> u64 {
    2
}

pub(super) fn default_exit_grace_ms() -> u64 {
    3_000
}

pub(super) fn default_update_progress_step() -> u8 {
    20
}

pub(super) fn default_install_progress_step() -> u8 {
    10
}

pub(super) fn default_min_installer_bytes() -> u64 {
    1024
}

pub(super) fn default_install_wait_secs() -> u64 {
    300
}

pub(super) fn default_remove_attempts() -> u32 {
    3
}

pub(super) fn default_remove_retry_delay_ms() -> u64 {
    500
}

pub(super) fn default_console_max_lines() -> usize {
    500
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_max_log_files() -> usize {
    10
}

pub(super) fn default_programs() -> Vec<ProgramSpec> {
    vec![
        installer("7zip", "7-Zip", "7z2500-x64.exe", &["/S"]),
        installer(
            "advanced_ip_scanner",
            "Advanced IP Scanner",
            "Advanced_IP_Scanner_2.5.4594.1.exe",
            &["/VERYSILENT", "/NORESTART"],
        ),
        installer("anydesk", "AnyDesk", "AnyDesk.exe", &["--install", "--silent"]),
        installer("assistant", "Ассистент", "assistant_install_6.exe", &["/S"]),
        archive(
            "com_port_checker",
            "Com Port Checker",
            "ComPortChecker.1.1.zip",
            "ComPortChecker.exe",
        ),
        archive("database_net", "Database Net", "DatabaseNet5Pro.zip", "setup.exe"),
        installer("notepad_plus", "Notepad++", "npp.8.8.2.Installer.x64.exe", &["/S"]),
        archive(
            "printer_test",
            "Printer TEST V3.1C",
            "Printer-TEST-V3.1C.zip",
            "PrinterTEST.exe",
        ),
        installer(
            "rhelper",
            "Rhelper (Remote Access)",
            "remote-access-setup.exe",
            &["/S"],
        ),
    ]
}

fn installer(key: &str, name: &str, filename: &str, silent_args: &[&str]) -> ProgramSpec {
    ProgramSpec {
        key: key.to_string(),
        name: name.to_string(),
        url: format!("{RELEASES}/{filename}"),
        filename: filename.to_string(),
        silent_args: silent_args.iter().map(|arg| arg.to_string()).collect(),
        archive: false,
        launch_after_extract: None,
    }
}

fn archive(key: &str, name: &str, filename: &str, launch: &str) -> ProgramSpec {
    ProgramSpec {
        key: key.to_string(),
        name: name.to_string(),
        url: format!("{RELEASES}/{filename}"),
        filename: filename.to_string(),
        silent_args: Vec::new(),
        archive: true,
        launch_after_extract: Some(launch.to_string()),
    }
}
