mod support;

use std::sync::{Arc, atomic::AtomicBool};

use bobrik::config::AppConfig;
use bobrik::log_sink::{ConsoleLog, LogSink};
use bobrik::updater::{UpdateManager, UpdateOffer};
use sha2::{Digest, Sha256};
use support::http::{closed_port_url, ok_response, serve_json, serve_once};
use tempfile::TempDir;

struct Harness {
    manager: UpdateManager,
    console: ConsoleLog,
    work: TempDir,
}

impl Harness {
    fn new(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::default();
        configure(&mut config);
        let work = tempfile::tempdir().expect("tempdir");
        let (sink, rx) = LogSink::channel();
        let manager = UpdateManager::new(&config, sink, Arc::new(AtomicBool::new(false)))
            .with_work_dir(work.path())
            .with_current_version("1.1.4")
            .with_executable(work.path().join("bobrik.exe"));
        Self {
            manager,
            console: ConsoleLog::new(rx, 1_000),
            work,
        }
    }

    fn messages(&mut self) -> Vec<String> {
        self.console.drain();
        self.console.lines().map(|entry| entry.message.clone()).collect()
    }

    fn work_files(&self) -> Vec<String> {
        let mut names = std::fs::read_dir(self.work.path())
            .expect("read work dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names
    }
}

fn offer(download_url: String, sha256: Option<String>) -> UpdateOffer {
    UpdateOffer {
        version: "1.2.0".into(),
        notes: String::new(),
        download_url,
        sha256,
    }
}

#[test]
fn newer_descriptor_offers_the_update_once() {
    let url = serve_json(r#"{"version":"1.2.0","notes":"Fixes"}"#);
    let mut harness = Harness::new(|config| config.updates.descriptor_url = url);

    let offer = harness.manager.check_for_updates().expect("update offered");

    assert_eq!(offer.version, "1.2.0");
    assert_eq!(offer.notes, "Fixes");
    assert_eq!(
        offer.download_url,
        AppConfig::default().updates.fallback_download_url
    );
    let offers = harness
        .messages()
        .into_iter()
        .filter(|line| line.starts_with("Update available"))
        .count();
    assert_eq!(offers, 1);
}

#[test]
fn same_version_takes_the_no_update_path() {
    let url = serve_json(r#"{"version":"1.1.4"}"#);
    let mut harness = Harness::new(|config| config.updates.descriptor_url = url);

    assert!(harness.manager.check_for_updates().is_none());

    let messages = harness.messages();
    assert!(messages.iter().any(|line| line.contains("latest version")));
    assert!(!messages.iter().any(|line| line.starts_with("Update available")));
}

#[test]
fn unreachable_server_reports_a_network_error() {
    let url = closed_port_url();
    let mut harness = Harness::new(|config| config.updates.descriptor_url = url.clone());

    assert!(harness.manager.check_for_updates().is_none());
    assert!(harness.manager.prepare_update(&offer(url, None)).is_none());

    let messages = harness.messages();
    assert!(
        messages.iter().any(|line| line.starts_with("Cannot reach the update server")
            || line.starts_with("Update check timed out")),
        "{messages:?}"
    );
    assert!(!messages.iter().any(|line| line.starts_with("Update available")));
    assert!(harness.work_files().is_empty());
}

#[test]
fn undersized_binary_is_rejected_before_anything_is_staged() {
    let url = serve_once(ok_response(&[0x4d; 512]));
    let mut harness = Harness::new(|_| {});

    assert!(harness.manager.prepare_update(&offer(url, None)).is_none());

    assert!(harness.work_files().is_empty());
    assert!(
        harness
            .messages()
            .iter()
            .any(|line| line.contains("too small"))
    );
}

#[test]
fn validated_binary_is_staged_with_script_and_removed_on_decline() {
    let body = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect::<Vec<_>>();
    let digest = format!("{:x}", Sha256::digest(&body));
    let url = serve_once(ok_response(&body));
    let mut harness = Harness::new(|config| config.updates.min_binary_bytes = 1024);

    let prepared = harness
        .manager
        .prepare_update(&offer(url, Some(digest)))
        .expect("update staged");

    assert_eq!(std::fs::read(prepared.artifact_path()).expect("artifact"), body);
    let script = std::fs::read_to_string(prepared.script_path()).expect("script");
    assert!(script.contains(&prepared.artifact_path().display().to_string()));
    assert_eq!(harness.work_files().len(), 2);

    harness.manager.discard_prepared(prepared);

    assert!(harness.work_files().is_empty());
    assert!(
        harness
            .messages()
            .iter()
            .any(|line| line == "Update to 1.2.0 postponed")
    );
}

#[test]
fn checksum_mismatch_leaves_nothing_behind() {
    let url = serve_once(ok_response(&[7u8; 2048]));
    let mut harness = Harness::new(|config| config.updates.min_binary_bytes = 1024);

    let staged = harness
        .manager
        .prepare_update(&offer(url, Some("00".repeat(32))));

    assert!(staged.is_none());
    assert!(harness.work_files().is_empty());
    assert!(
        harness
            .messages()
            .iter()
            .any(|line| line.contains("Checksum mismatch"))
    );
}
