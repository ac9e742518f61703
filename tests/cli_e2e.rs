//! End-to-end CLI tests for the concurrent-requests binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mock_server
    }};
}

fn binary() -> Command {
    Command::cargo_bin("concurrent-requests").unwrap()
}

/// Test that the binary exits cleanly when there is nothing to do.
#[test]
fn test_binary_without_input_returns_zero() {
    binary().write_stdin("").assert().success();
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    binary()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--workers"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    binary()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("concurrent-requests"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    binary()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_zero_workers_rejected() {
    binary()
        .args(["-w", "0", "https://example.test"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("workers"));
}

#[test]
fn test_binary_malformed_request_file_fails() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("requests.json");
    std::fs::write(&file, r#"[{"method": "FETCH", "url": "https://example.test"}]"#).unwrap();

    binary()
        .arg("--requests")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid request file"));
}

#[test]
fn test_binary_unknown_config_key_fails() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("config.json");
    std::fs::write(&file, r#"{"executor": {"threads": 4}}"#).unwrap();

    binary()
        .arg("--config")
        .arg(&file)
        .write_stdin("")
        .assert()
        .failure();
}

#[tokio::test]
async fn test_binary_prints_bodies_in_order() {
    let mock_server = require_mock_server!();
    for (name, delay) in [("first", 50), ("second", 0)] {
        Mock::given(method("GET"))
            .and(path(format!("/{name}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(name)
                    .set_delay(std::time::Duration::from_millis(delay)),
            )
            .mount(&mock_server)
            .await;
    }
    let base = mock_server.uri();

    let assert = tokio::task::spawn_blocking(move || {
        binary()
            .args(["-q", "-w", "2"])
            .arg(format!("{base}/first"))
            .arg(format!("{base}/second"))
            .assert()
    })
    .await
    .unwrap();

    assert.success().stdout("first\nsecond\n");
}

#[tokio::test]
async fn test_binary_reads_urls_from_stdin() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/piped"))
        .respond_with(ResponseTemplate::new(200).set_body_string("piped body"))
        .expect(1)
        .mount(&mock_server)
        .await;
    let input = format!("# comment\n\n{}/piped\n", mock_server.uri());

    let assert = tokio::task::spawn_blocking(move || binary().arg("-q").write_stdin(input).assert())
        .await
        .unwrap();

    assert.success().stdout("piped body\n");
}

#[tokio::test]
async fn test_binary_strict_fails_on_failed_request() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    let url = format!("{}/missing", mock_server.uri());

    let assert = tokio::task::spawn_blocking(move || {
        binary()
            .args(["--strict", "--error-for-status", "--transient-only"])
            .arg(url)
            .assert()
    })
    .await
    .unwrap();

    assert
        .failure()
        .stderr(predicate::str::contains("1 of 1 requests failed"));
}

#[tokio::test]
async fn test_binary_output_dir_writes_files() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/data/report.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("report"))
        .mount(&mock_server)
        .await;
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let url = format!("{}/data/report.txt", mock_server.uri());

    let target = out.clone();
    let assert = tokio::task::spawn_blocking(move || {
        binary().arg("-q").arg("-o").arg(&target).arg(url).assert()
    })
    .await
    .unwrap();

    assert.success().stdout("");
    assert_eq!(
        std::fs::read_to_string(out.join("0000-report.txt")).unwrap(),
        "report"
    );
}

#[tokio::test]
async fn test_binary_request_file_sends_post() {
    let mock_server = require_mock_server!();
    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_string("accepted"))
        .expect(1)
        .mount(&mock_server)
        .await;
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("requests.json");
    let entries = format!(
        r#"[{{"method": "POST", "url": "{}/submit", "body": {{"id": 1}}}}]"#,
        mock_server.uri()
    );
    std::fs::write(&file, entries).unwrap();

    let assert = tokio::task::spawn_blocking(move || {
        binary().arg("-q").arg("--requests").arg(&file).assert()
    })
    .await
    .unwrap();

    assert.success().stdout("accepted\n");
}
