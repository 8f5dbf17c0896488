#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::Command;

fn modlink() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_modlink"));
    command.arg("--log-level").arg("error");
    command
}

fn missing_library() -> PathBuf {
    std::env::temp_dir().join(format!(
        "modlink-cli-missing-{}-{}.so",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

#[test]
fn version_prints_package_version() {
    let output = modlink().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("modlink {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn extended_version_reports_protocol_details() {
    let output = modlink()
        .args(["--handshake-symbol", "custom_handshake", "version", "--extended"])
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("handshake_symbol: custom_handshake"));
    assert!(stdout.contains("reserved_codes: shutdown=-1 ping=1 composite=200"));
}

#[test]
fn inspect_missing_library_exits_3() {
    let output = modlink()
        .arg("inspect")
        .arg(missing_library())
        .output()
        .expect("inspect should run");
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to open"));
}

#[test]
fn ping_missing_library_exits_3() {
    let output = modlink()
        .arg("ping")
        .arg(missing_library())
        .output()
        .expect("ping should run");
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("load failed"));
}

#[test]
fn sending_shutdown_code_is_a_usage_error() {
    let output = modlink()
        .args(["send", "libwhatever.so", "--code", "-1"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn zero_ping_count_is_a_usage_error() {
    let output = modlink()
        .args(["ping", "libwhatever.so", "--count", "0"])
        .output()
        .expect("ping should run");
    assert_eq!(output.status.code(), Some(64));
}
