#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use mavrelay::frame::{Heartbeat, Origin};
use mavrelay::replay::LogWriter;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/mavrelay-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn mavrelay(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mavrelay"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("mavrelay should run")
}

fn write_log(path: &Path, stamps: &[u64]) {
    let heartbeat = Heartbeat::default().to_envelope(Origin::new(1, 1));
    let mut writer = LogWriter::create(path).expect("log should be creatable");
    for stamp in stamps {
        writer
            .write_record(*stamp, &heartbeat, None)
            .expect("record should be writable");
    }
    writer.into_inner().expect("log should flush");
}

#[test]
fn version_prints_package_version() {
    let output = mavrelay(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_extended_lists_baud_rates() {
    let output = mavrelay(&["version", "--extended"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("baud_rates:"));
    assert!(stdout.contains("115200"));
}

#[test]
fn replay_of_missing_log_fails() {
    let dir = unique_temp_dir("missing-log");
    let log = dir.join("absent.mavlink");

    let output = mavrelay(&["replay", log.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent.mavlink"), "stderr: {stderr}");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn replay_reports_records() {
    let dir = unique_temp_dir("replay");
    let log = dir.join("session.mavlink");
    write_log(&log, &[0, 1_000, 2_000]);

    let output = mavrelay(&["replay", log.to_str().expect("utf-8 path")]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("report should be JSON");
    assert_eq!(report["kind"], "replay-report");
    assert_eq!(report["records"], 3);
    assert_eq!(report["start_reached"], true);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn replay_with_unreached_start_fails() {
    let dir = unique_temp_dir("unreached-start");
    let log = dir.join("session.mavlink");
    write_log(&log, &[10, 20]);

    let output = mavrelay(&[
        "replay",
        log.to_str().expect("utf-8 path"),
        "--start",
        "1000000",
        "--no-images",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("1000000"), "stderr: {stderr}");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn bridge_on_missing_port_is_a_transport_error() {
    let output = mavrelay(&["bridge", "--port", "/dev/mavrelay-no-such-port"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn ping_rejects_bad_interval() {
    let output = mavrelay(&["ping", "--interval", "soon"]);
    assert_eq!(output.status.code(), Some(64));
}
