//! Integration tests for snapkit CLI

use httpmock::prelude::*;
use std::process::Command;

/// The binary with an empty config directory and no snapkit environment
fn snapkit(config_home: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_snapkit"));
    command.env("XDG_CONFIG_HOME", config_home);
    for var in [
        "SNAPKIT_SOCKET",
        "SNAPKIT_TCP",
        "SNAPKIT_STORE_URL",
        "SNAPKIT_OUTPUT",
        "SNAPKIT_RETRIES",
        "SNAPKIT_POLL_INTERVAL_MS",
        "SNAPKIT_POLL_TIMEOUT_SECS",
        "SNAPKIT_ALLOW_INTERACTION",
        "RUST_LOG",
    ] {
        command.env_remove(var);
    }
    command
}

#[test]
fn test_cli_version() {
    let home = tempfile::tempdir().unwrap();
    let output = snapkit(home.path())
        .arg("--version")
        .output()
        .expect("Failed to execute snapkit");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("snapkit"));
}

#[test]
fn test_cli_help() {
    let home = tempfile::tempdir().unwrap();
    let output = snapkit(home.path())
        .arg("--help")
        .output()
        .expect("Failed to execute snapkit");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Client for snapd and the Snap Store"));
    assert!(stdout.contains("install"));
    assert!(stdout.contains("watch"));
    assert!(stdout.contains("mirror"));
}

#[test]
fn test_cli_invalid_command() {
    let home = tempfile::tempdir().unwrap();
    let output = snapkit(home.path())
        .arg("invalid-command")
        .output()
        .expect("Failed to execute snapkit");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_config_set_requires_pairs() {
    let home = tempfile::tempdir().unwrap();
    let output = snapkit(home.path())
        .args(["config", "set", "hello"])
        .output()
        .expect("Failed to execute snapkit");

    assert!(!output.status.success());
}

#[test]
fn test_socket_and_tcp_conflict() {
    let home = tempfile::tempdir().unwrap();
    let output = snapkit(home.path())
        .args(["--socket", "/tmp/x.socket", "--tcp", "http://127.0.0.1:1", "ping"])
        .output()
        .expect("Failed to execute snapkit");

    assert!(!output.status.success());
}

#[test]
fn test_json_list_over_tcp() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/v2/snaps");
        then.status(200).json_body(serde_json::json!({
            "type": "sync",
            "status-code": 200,
            "status": "OK",
            "result": [{
                "id": "x1", "name": "hello", "version": "2.10", "revision": "42",
                "confinement": "strict"
            }]
        }));
    });

    let home = tempfile::tempdir().unwrap();
    let output = snapkit(home.path())
        .args(["--json", "--tcp", &server.base_url(), "list"])
        .output()
        .expect("Failed to execute snapkit");

    mock.assert_hits(1);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let snaps: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snaps[0]["name"], "hello");
}

#[test]
fn test_unreachable_socket_fails_with_hint() {
    let home = tempfile::tempdir().unwrap();
    let socket = home.path().join("missing.socket");
    let output = snapkit(home.path())
        .args(["--socket", socket.to_str().unwrap(), "ping"])
        .env("SNAPKIT_RETRIES", "1")
        .output()
        .expect("Failed to execute snapkit");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Hint:"), "stderr: {stderr}");
}

#[test]
fn test_watch_unknown_change_gives_up_after_poll_timeout() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v2/changes/999");
        then.status(404).body("cannot find change");
    });

    let home = tempfile::tempdir().unwrap();
    let output = snapkit(home.path())
        .args(["--tcp", &server.base_url(), "--poll-timeout", "1", "watch", "999"])
        .output()
        .expect("Failed to execute snapkit");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("999"), "stderr: {stderr}");
    assert!(stderr.contains("change.timeout"), "stderr: {stderr}");
}
