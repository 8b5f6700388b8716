// Test module - relaxed lint rules
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]
#![allow(clippy::manual_assert)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

//! `pkgprobe run` argument handling and isolation failures, without a Docker daemon.

use std::fs;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn pkgprobe_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pkgprobe"));
    cmd.arg("--color=never").env_remove("PKGPROBE_LOG");
    cmd
}

#[test]
fn missing_package_is_a_usage_error() {
    let output = pkgprobe_bin()
        .args(["run", "--command", "mytool"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no package to test"), "{stderr}");
}

#[test]
fn nothing_to_run_is_a_usage_error() {
    let output = pkgprobe_bin()
        .args(["run", "--package", "my-cli", "--no-default-probes", "--command", "my-cli"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_auth_token_variable_is_a_usage_error() {
    let output = pkgprobe_bin()
        .args([
            "run",
            "--package",
            "my-cli",
            "--command",
            "my-cli",
            "--auth-token-env",
            "PKGPROBE_TEST_TOKEN_THAT_IS_NOT_SET",
        ])
        .env_remove("PKGPROBE_TEST_TOKEN_THAT_IS_NOT_SET")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn invalid_config_file_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("pkgprobe.json");
    fs::write(&config, r#"{ "package": "x", "unknownKey": true }"#).unwrap();
    let output = pkgprobe_bin()
        .args(["run", "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn unreachable_docker_is_an_isolation_failure() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("no-docker.sock");
    let config = dir.path().join("pkgprobe.yaml");
    fs::write(
        &config,
        "package: my-cli\nversions: ['18', '20']\ncommands: [my-cli]\n",
    )
    .unwrap();

    let output = pkgprobe_bin()
        .args([
            "run",
            "--json",
            "--config",
            config.to_str().unwrap(),
            "--docker-socket",
            socket.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["package"], "my-cli");
    assert_eq!(summary["total"], 0);
    let environments = summary["environments"].as_array().unwrap();
    assert_eq!(environments.len(), 2);
    assert_eq!(environments[0]["version"], "18");
    assert_eq!(environments[0]["image"], "node");
    assert!(environments[0]["error"]
        .as_str()
        .unwrap()
        .contains("failed to create environment"));
}
