//! Integration tests for the `owfleet` CLI binary.
//!
//! Argument parsing, help output, completions and config error handling run
//! without a network; device commands run against a wiremock cloud.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `owfleet` binary with env isolation.
///
/// Clears `OWFLEET_*` variables and runs inside `workdir` so the relative
/// cache and results directories never touch the real tree.
fn owfleet_cmd(workdir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("owfleet");
    cmd.current_dir(workdir)
        .env("HOME", workdir)
        .env("XDG_CONFIG_HOME", workdir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("OWFLEET_CONFIG_DIR")
        .env_remove("OWFLEET_DEPLOYMENT")
        .env_remove("OWFLEET_OUTPUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn endpoint(port: u16) -> serde_json::Value {
    json!({ "host": "127.0.0.1", "port": port, "scheme": "http" })
}

/// Config dir with a `lab` deployment whose services all live on `port`.
fn config_dir(port: u16, with_credentials: bool) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let topology = json!({
        "lab": { "owsec": endpoint(port), "owgw": endpoint(port), "owprov": endpoint(port) },
        "edge": { "owsec": endpoint(port) }
    });
    std::fs::write(dir.path().join("clouds.json"), topology.to_string()).unwrap();
    if with_credentials {
        std::fs::write(
            dir.path().join("PRIV-creds.json"),
            json!({ "LAB": { "userId": "ops@example.com", "password": "hunter2" } }).to_string(),
        )
        .unwrap();
    }
    dir
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let work = tempfile::tempdir().unwrap();
    let output = owfleet_cmd(work.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let work = tempfile::tempdir().unwrap();
    owfleet_cmd(work.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("OpenWiFi")
                .and(predicate::str::contains("collect"))
                .and(predicate::str::contains("targets"))
                .and(predicate::str::contains("device")),
        );
}

#[test]
fn test_version_flag() {
    let work = tempfile::tempdir().unwrap();
    owfleet_cmd(work.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("owfleet"));
}

#[test]
fn test_collect_requires_deployment() {
    let work = tempfile::tempdir().unwrap();
    let output = owfleet_cmd(work.path()).arg("collect").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--deployment"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_zsh() {
    let work = tempfile::tempdir().unwrap();
    owfleet_cmd(work.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    let work = tempfile::tempdir().unwrap();
    owfleet_cmd(work.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_missing_topology_is_config_error() {
    let work = tempfile::tempdir().unwrap();
    let empty = tempfile::tempdir().unwrap();
    let output = owfleet_cmd(work.path())
        .arg("--config-dir")
        .arg(empty.path())
        .args(["collect", "-d", "lab"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("clouds.json"));
}

#[test]
fn test_unknown_deployment_is_config_error() {
    let work = tempfile::tempdir().unwrap();
    let config = config_dir(1, true);
    let output = owfleet_cmd(work.path())
        .arg("--config-dir")
        .arg(config.path())
        .args(["targets", "-d", "prod"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("PROD"));
}

#[test]
fn test_incomplete_topology_names_missing_service() {
    let work = tempfile::tempdir().unwrap();
    let config = config_dir(1, true);
    let output = owfleet_cmd(work.path())
        .arg("--config-dir")
        .arg(config.path())
        .args(["collect", "-d", "edge"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("owgw"));
}

#[test]
fn test_fresh_login_without_credentials_is_auth_error() {
    let work = tempfile::tempdir().unwrap();
    let config = config_dir(1, false);
    let output = owfleet_cmd(work.path())
        .arg("--config-dir")
        .arg(config.path())
        .args(["collect", "-d", "lab", "--fresh-login"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_config_show_renders_defaults() {
    let work = tempfile::tempdir().unwrap();
    let config = tempfile::tempdir().unwrap();
    owfleet_cmd(work.path())
        .arg("--config-dir")
        .arg(config.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("page_size = 75")
                .and(predicate::str::contains("[thresholds]")),
        );
}

#[test]
fn test_config_show_reads_environment() {
    let work = tempfile::tempdir().unwrap();
    let config = tempfile::tempdir().unwrap();
    owfleet_cmd(work.path())
        .env("OWFLEET_STATS__ATTEMPTS", "7")
        .arg("--config-dir")
        .arg(config.path())
        .args(["--output", "json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"attempts\": 7"));
}

#[test]
fn test_config_deployments_lists_topology() {
    let work = tempfile::tempdir().unwrap();
    let config = config_dir(1, true);
    owfleet_cmd(work.path())
        .arg("--config-dir")
        .arg(config.path())
        .args(["--output", "plain", "config", "deployments"])
        .assert()
        .success()
        .stdout("EDGE\nLAB\n");
}

#[test]
fn test_device_status_rejects_bad_uuid() {
    let work = tempfile::tempdir().unwrap();
    let config = config_dir(1, true);
    let output = owfleet_cmd(work.path())
        .arg("--config-dir")
        .arg(config.path())
        .args(["device", "status", "-d", "lab", "903cb3bb2521", "not-a-uuid"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("uuid"));
}

// ── Device commands against a mock cloud ────────────────────────────

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/oauth2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok-abcdefghijk" })),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_device_status_prints_command_state() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    let uuid = "6f1c2a5e-3c1b-4b8e-9a55-0d6a3a1f9e21";
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/command/{uuid}")))
        .and(query_param("serialNumber", "903cb3bb2521"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "UUID": uuid,
            "command": "script",
            "status": "completed",
            "errorCode": 0
        })))
        .mount(&server)
        .await;

    let work = tempfile::tempdir().unwrap();
    let config = config_dir(server.address().port(), true);
    owfleet_cmd(work.path())
        .arg("--config-dir")
        .arg(config.path())
        .args(["--output", "plain", "device", "status", "-d", "lab", "903CB3BB2521", uuid])
        .assert()
        .success()
        .stdout("completed\n");

    assert!(config.path().join("PRIV-auth-cache.json").is_file());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_device_script_sends_base64_body() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/device/903cb3bb2521/script"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "UUID": "0b7f3f9c-8d0e-4a8b-bf1c-2f4a9e6b1d11",
            "results": { "status": { "resultCode": 0, "text": "queued" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let work = tempfile::tempdir().unwrap();
    let script = work.path().join("hello.sh");
    std::fs::write(&script, "echo hello\n").unwrap();
    let config = config_dir(server.address().port(), true);

    owfleet_cmd(work.path())
        .arg("--config-dir")
        .arg(config.path())
        .args(["--output", "json", "device", "script", "-d", "lab", "903cb3bb2521", "-f"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("0b7f3f9c-8d0e-4a8b-bf1c-2f4a9e6b1d11"));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests
        .iter()
        .find(|r| r.url.path().ends_with("/script"))
        .unwrap()
        .body_json()
        .unwrap();
    assert_eq!(body["script"], "ZWNobyBoZWxsbwo=");
    assert_eq!(body["deferred"], false);
}
