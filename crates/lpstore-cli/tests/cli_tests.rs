//! Integration tests for the `lpstore` CLI binary.
//!
//! These run the CLI as a subprocess. Tests that need a proxy endpoint start a
//! local `wiremock` server; none of them reach the real service.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};
use wiremock::matchers::{body_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: locate the `lpstore` binary built by `cargo test`.
fn lpstore_bin() -> String {
    let path = env!("CARGO_BIN_EXE_lpstore");
    assert!(
        Path::new(path).exists(),
        "lpstore binary not found at {path}"
    );
    path.to_owned()
}

/// Helper: a command with a clean `LPSTORE_*` environment.
fn command(args: &[&str]) -> Command {
    let mut cmd = Command::new(lpstore_bin());
    cmd.args(args)
        .env_remove("LPSTORE_PROJECT_ID")
        .env_remove("LPSTORE_TOKEN")
        .env_remove("LPSTORE_ENDPOINT_URL")
        .env_remove("LPSTORE_TIMEOUT_SECS")
        .env_remove("LPSTORE_LOG_LEVEL")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// Helper: run lpstore with args and return (`exit_code`, stdout, stderr).
fn run(args: &[&str]) -> (i32, String, String) {
    split(command(args).output().expect("failed to execute lpstore"))
}

fn split(output: Output) -> (i32, String, String) {
    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

/// Helper: run lpstore against `endpoint` off the async runtime.
async fn run_against(endpoint: String, args: &[&str]) -> (i32, String, String) {
    let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = command(&args)
            .env("LPSTORE_PROJECT_ID", "cli-project")
            .env("LPSTORE_TOKEN", "lp_cli_token")
            .env("LPSTORE_ENDPOINT_URL", endpoint)
            .output()
            .expect("failed to execute lpstore");
        split(output)
    })
    .await
    .unwrap()
}

// ── Version & help ───────────────────────────────────────────────────

#[test]
fn test_version_flag() {
    let (code, stdout, _) = run(&["--version"]);
    assert_eq!(code, 0, "lpstore --version should exit 0");
    assert!(stdout.contains("lpstore"), "version output: {stdout}");
}

#[test]
fn test_help_flag() {
    let (code, stdout, _) = run(&["--help"]);
    assert_eq!(code, 0, "lpstore --help should exit 0");
    for sub in ["usage", "list", "mcp-server", "doctor"] {
        assert!(stdout.contains(sub), "help should list '{sub}': {stdout}");
    }
    assert!(stdout.contains("LPSTORE_TOKEN"));
}

// ── Configuration errors ─────────────────────────────────────────────

#[test]
fn test_usage_without_project_id_fails() {
    let (code, stdout, stderr) = run(&["usage"]);
    assert_ne!(code, 0);
    assert!(stdout.is_empty(), "nothing should reach stdout: {stdout}");
    assert!(stderr.contains("LPSTORE_PROJECT_ID"), "stderr: {stderr}");
}

#[test]
fn test_list_without_token_fails() {
    let (code, _, stderr) = run(&["--project-id", "p", "list"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("LPSTORE_TOKEN"), "stderr: {stderr}");
}

#[test]
fn test_doctor_reports_missing_config() {
    let (code, stdout, stderr) = run(&["doctor"]);
    assert_ne!(code, 0);
    assert!(stdout.contains("not set (LPSTORE_PROJECT_ID)"), "{stdout}");
    assert!(stdout.contains("skipped"), "{stdout}");
    assert!(stderr.contains("2 check(s) failed"), "{stderr}");
}

#[test]
fn test_unreachable_endpoint_fails() {
    let (code, _, stderr) = run(&[
        "--project-id",
        "p",
        "--token",
        "t",
        "--endpoint-url",
        "http://127.0.0.1:9/proxy",
        "usage",
    ]);
    assert_ne!(code, 0);
    assert!(stderr.contains("failed to fetch storage usage"), "{stderr}");
    assert!(stderr.contains("transport"), "{stderr}");
}

// ── Against a stub proxy ─────────────────────────────────────────────

#[tokio::test]
async fn test_usage_prints_proxy_json() {
    let server = MockServer::start().await;
    let stats = json!({"total_bytes": 1024, "file_count": 3, "quota_bytes": 1_048_576});
    Mock::given(method("POST"))
        .and(body_json(json!({
            "projectId": "cli-project",
            "token": "lp_cli_token",
            "path": "usage",
            "params": {}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(stats.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let (code, stdout, stderr) = run_against(server.uri(), &["usage"]).await;
    assert_eq!(code, 0, "stderr: {stderr}");
    assert_eq!(serde_json::from_str::<Value>(&stdout).unwrap(), stats);
}

#[tokio::test]
async fn test_usage_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_bytes": 1024, "file_count": 3, "quota_bytes": 1_048_576
        })))
        .mount(&server)
        .await;

    let (code, stdout, _) = run_against(server.uri(), &["usage", "--summary"]).await;
    assert_eq!(code, 0);
    assert!(stdout.contains("Files: 3"), "{stdout}");
    assert!(stdout.contains("of 1.0 MiB"), "{stdout}");
}

#[tokio::test]
async fn test_usage_summary_shows_error_payload_verbatim() {
    let server = MockServer::start().await;
    let payload = json!({"error": "invalid token"});
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(payload.clone()))
        .mount(&server)
        .await;

    let (code, stdout, _) = run_against(server.uri(), &["usage", "--summary"]).await;
    assert_eq!(code, 0);
    assert!(!stdout.contains("unknown"), "{stdout}");
    assert_eq!(serde_json::from_str::<Value>(&stdout).unwrap(), payload);
}

#[tokio::test]
async fn test_usage_summary_keeps_fields_next_to_float_quota() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_bytes": 1024, "file_count": 3, "quota_bytes": 1_048_576.0
        })))
        .mount(&server)
        .await;

    let (code, stdout, _) = run_against(server.uri(), &["usage", "--summary"]).await;
    assert_eq!(code, 0);
    assert!(stdout.contains("Files: 3"), "{stdout}");
    assert!(stdout.contains("Used:  1.0 KiB of 1.0 MiB"), "{stdout}");
}

#[tokio::test]
async fn test_list_summary_shows_error_payload_verbatim() {
    let server = MockServer::start().await;
    let payload = json!({"error": "project not found"});
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(payload.clone()))
        .mount(&server)
        .await;

    let (code, stdout, _) = run_against(server.uri(), &["list", "--summary"]).await;
    assert_eq!(code, 0);
    assert_eq!(serde_json::from_str::<Value>(&stdout).unwrap(), payload);
}

#[tokio::test]
async fn test_unparseable_timeout_env_falls_back_to_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file_count": 1})))
        .mount(&server)
        .await;

    let endpoint = server.uri();
    let (code, stdout, stderr) = tokio::task::spawn_blocking(move || {
        split(
            command(&["usage"])
                .env("LPSTORE_PROJECT_ID", "cli-project")
                .env("LPSTORE_TOKEN", "lp_cli_token")
                .env("LPSTORE_ENDPOINT_URL", endpoint)
                .env("LPSTORE_TIMEOUT_SECS", "abc")
                .output()
                .expect("failed to execute lpstore"),
        )
    })
    .await
    .unwrap();
    assert_eq!(code, 0, "stderr: {stderr}");
    assert_eq!(serde_json::from_str::<Value>(&stdout).unwrap(), json!({"file_count": 1}));
}

#[test]
fn test_blank_project_id_env_counts_as_unset() {
    let output = command(&["usage"])
        .env("LPSTORE_PROJECT_ID", "   ")
        .env("LPSTORE_TOKEN", "t")
        .output()
        .expect("failed to execute lpstore");
    let (code, _, stderr) = split(output);
    assert_ne!(code, 0);
    assert!(stderr.contains("missing project id"), "{stderr}");
}

#[tokio::test]
async fn test_list_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"filename": "hero.png", "size": 2048, "content_type": "image/png"},
            {"filename": "copy.md", "size": 10, "content_type": "text/markdown"}
        ])))
        .mount(&server)
        .await;

    let (code, stdout, _) = run_against(server.uri(), &["list", "--summary"]).await;
    assert_eq!(code, 0);
    assert!(stdout.starts_with("2 file(s):"), "{stdout}");
    let hero = stdout.find("hero.png").unwrap();
    let copy = stdout.find("copy.md").unwrap();
    assert!(hero < copy, "order should be preserved: {stdout}");
}

#[tokio::test]
async fn test_malformed_proxy_body_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let (code, stdout, stderr) = run_against(server.uri(), &["list"]).await;
    assert_ne!(code, 0);
    assert!(stdout.is_empty());
    assert!(stderr.contains("malformed JSON"), "{stderr}");
}

#[tokio::test]
async fn test_doctor_passes_with_reachable_proxy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (code, stdout, _) = run_against(server.uri(), &["doctor"]).await;
    assert_eq!(code, 0, "{stdout}");
    assert!(stdout.contains("lp_***"), "token should be redacted: {stdout}");
    assert!(!stdout.contains("lp_cli_token"));
    assert!(stdout.contains("All checks passed."));
}

// ── MCP server ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_mcp_server_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"filename": "a.txt"}])))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = server.uri();
    let (code, stdout, stderr) = tokio::task::spawn_blocking(move || {
        let mut child = command(&["mcp-server"])
            .env("LPSTORE_PROJECT_ID", "cli-project")
            .env("LPSTORE_TOKEN", "lp_cli_token")
            .env("LPSTORE_ENDPOINT_URL", endpoint)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn lpstore mcp-server");

        {
            let mut stdin = child.stdin.take().unwrap();
            let requests = [
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
                r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"list_project_files","arguments":{}}}"#,
            ];
            for req in requests {
                writeln!(stdin, "{req}").unwrap();
            }
        }

        split(child.wait_with_output().unwrap())
    })
    .await
    .unwrap();

    assert_eq!(code, 0, "stderr: {stderr}");
    let responses: Vec<Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 3, "stdout: {stdout}");
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "lpstore-mcp");
    assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 2);

    let text = responses[2]["result"]["content"][0]["text"].as_str().unwrap();
    assert_eq!(
        serde_json::from_str::<Value>(text).unwrap(),
        json!([{"filename": "a.txt"}])
    );
}
