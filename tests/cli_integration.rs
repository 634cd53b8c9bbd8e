//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end. No test reaches a real text
//! generation provider: without credentials every generation fails fast.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const REQUIREMENTS: &str = r"# Requirements Document

## Introduction

CSV export for the reports page.

## Requirements

### Requirement 1

**User Story:** As an analyst, I want to export reports as CSV, so that I can use spreadsheets

#### Acceptance Criteria

1. WHEN the user clicks export THEN the system SHALL download a CSV file
";

/// Get the binary to test.
fn specflow() -> Command {
    Command::cargo_bin("specflow").unwrap()
}

/// A working directory with a local config and no credentials.
fn workspace() -> (assert_fs::TempDir, Command) {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".specflow.toml")
        .write_str("[generation]\nprovider = \"claude\"\ntimeout_secs = 5\n\n[retry]\nmax_attempts = 0\n")
        .unwrap();

    let mut cmd = specflow();
    cmd.current_dir(temp.path()).env_remove("ANTHROPIC_API_KEY").env_remove("SPECFLOW_CONFIG");
    (temp, cmd)
}

/// Serve Ollama's generate endpoint on a local port, answering every request
/// with `text` after `delay`. Returns the base URL.
fn fake_ollama(text: &'static str, delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || answer(stream, text, delay));
        }
    });
    url
}

fn answer(stream: TcpStream, text: &str, delay: Duration) {
    let mut reader = BufReader::new(stream);
    let mut content_length = 0;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return;
        }
        if line == "\r\n" {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0; content_length];
    let _ = reader.read_exact(&mut body);

    thread::sleep(delay);

    let payload = serde_json::json!({ "response": text }).to_string();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(response.as_bytes());
}

/// A working directory configured against a fake Ollama server.
fn ollama_workspace(text: &'static str, delay: Duration) -> assert_fs::TempDir {
    let url = fake_ollama(text, delay);
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".specflow.toml")
        .write_str(&format!(
            "[generation]\nprovider = \"ollama\"\ntimeout_secs = 30\n\n[generation.ollama]\nbase_url = \"{url}\"\n\n[retry]\nmax_attempts = 0\n"
        ))
        .unwrap();
    temp
}

fn specflow_in(temp: &assert_fs::TempDir) -> Command {
    let mut cmd = specflow();
    cmd.current_dir(temp.path()).env_remove("SPECFLOW_CONFIG");
    cmd
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    specflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("approval gates"));
}

#[test]
fn test_short_help_flag() {
    specflow().arg("-h").assert().success().stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    specflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_subcommand_help() {
    specflow()
        .args(["approve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Approve the document under review"));
}

#[test]
fn test_unknown_document_type_is_rejected() {
    specflow()
        .args(["show", "roadmap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown document type 'roadmap'"));
}

// ============================================================================
// Validate Command Tests
// ============================================================================

#[test]
fn test_validate_well_formed_requirements() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("requirements.md");
    file.write_str(REQUIREMENTS).unwrap();

    specflow()
        .args(["validate", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("is a valid requirements document"))
        .stdout(predicate::str::contains("suggestion: Consider adding more detailed requirements"));
}

#[test]
fn test_validate_empty_requirements() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("empty.md");
    file.write_str("").unwrap();

    specflow()
        .args(["validate", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("issue: Missing main title '# Requirements Document'"))
        .stdout(predicate::str::contains("issue: No EARS format criteria found"))
        .stderr(predicate::str::contains("is not a valid requirements document"));
}

#[test]
fn test_validate_missing_file() {
    specflow()
        .args(["validate", "/definitely/not/here.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

// ============================================================================
// Status & Show Tests
// ============================================================================

#[test]
fn test_status_of_fresh_session() {
    let (_temp, mut cmd) = workspace();
    cmd.arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Phase:   Input  [1/5] Input"))
        .stdout(predicate::str::contains("requirements  -"));
}

#[test]
fn test_status_json() {
    let (_temp, mut cmd) = workspace();
    cmd.args(["status", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"phase\": \"input\""))
        .stdout(predicate::str::contains("\"total\": 5"));
}

#[test]
fn test_show_missing_document() {
    let (_temp, mut cmd) = workspace();
    cmd.args(["show", "design"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No design document yet"));
}

// ============================================================================
// Workflow Command Tests
// ============================================================================

#[test]
fn test_approve_without_document_under_review() {
    let (_temp, mut cmd) = workspace();
    cmd.arg("approve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No document is under review in phase 'Input'"));
}

#[test]
fn test_explicit_approve_in_wrong_phase() {
    let (_temp, mut cmd) = workspace();
    cmd.args(["approve", "--doc", "design"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot approve design while in phase 'Input'"));
}

#[test]
fn test_back_from_input() {
    let (_temp, mut cmd) = workspace();
    cmd.arg("back")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to go back to"));
}

#[test]
fn test_submit_empty_description() {
    let (_temp, mut cmd) = workspace();
    cmd.args(["submit", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("feature description must not be empty"));
}

#[test]
fn test_submit_without_provider_keeps_input_phase() {
    let (temp, mut cmd) = workspace();
    cmd.args(["submit", "Add CSV export"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("provider unavailable"))
        .stderr(predicate::str::contains("Run the same command again to retry"));

    temp.child(".specflow/session.json").assert(predicate::path::exists());

    let mut status = specflow();
    status
        .current_dir(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Phase:   Input"))
        .stdout(predicate::str::contains("Last error: generation failed"));
}

#[test]
fn test_restart_always_succeeds() {
    let (_temp, mut cmd) = workspace();
    cmd.arg("restart")
        .assert()
        .success()
        .stdout(predicate::str::contains("[1/5] Input"));
}

// ============================================================================
// Export Tests
// ============================================================================

#[test]
fn test_export_with_nothing_drafted() {
    let (_temp, mut cmd) = workspace();
    cmd.arg("export").assert().success().stdout(predicate::str::contains("Nothing to export yet"));
}

// ============================================================================
// Config & Completions Tests
// ============================================================================

#[test]
fn test_config_prints_toml() {
    let (_temp, mut cmd) = workspace();
    cmd.arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[generation]"))
        .stdout(predicate::str::contains("timeout_secs = 5"));
}

#[test]
fn test_config_path_prefers_local_file() {
    let (_temp, mut cmd) = workspace();
    cmd.args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".specflow.toml"));
}

#[test]
fn test_explicit_config_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let config = temp.child("custom.toml");
    config.write_str("[export]\nrender_tasks = false\n").unwrap();

    specflow()
        .current_dir(temp.path())
        .args(["--config", config.path().to_str().unwrap(), "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("render_tasks = false"));
}

#[test]
fn test_invalid_config_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child(".specflow.toml").write_str("[generation]\nprovider = \"bard\"\n").unwrap();

    specflow()
        .current_dir(temp.path())
        .env_remove("SPECFLOW_CONFIG")
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config file"));
}

#[test]
fn test_completions_bash() {
    specflow()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("specflow"));
}

// ============================================================================
// Generation Tests
// ============================================================================

#[test]
fn test_full_session_against_local_provider() {
    let temp = ollama_workspace(REQUIREMENTS, Duration::ZERO);
    temp.child("src/main.rs").write_str("fn main() {}").unwrap();

    specflow_in(&temp)
        .args(["submit", "Add CSV export", "--context", "src"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Requirements v1 is ready for review"));

    specflow_in(&temp).arg("approve").assert().success();
    specflow_in(&temp).arg("approve").assert().success();

    specflow_in(&temp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Codebase: Rust (1 files)"))
        .stdout(predicate::str::contains("tasks         v1   pending"))
        .stdout(predicate::str::contains("1 task(s), 8.0 estimated hours"));
}

#[test]
fn test_concurrent_commands_on_one_session() {
    let temp = ollama_workspace(REQUIREMENTS, Duration::from_millis(1500));
    specflow_in(&temp).args(["submit", "Add CSV export"]).assert().success();

    let mut first = std::process::Command::new(assert_cmd::cargo::cargo_bin("specflow"))
        .current_dir(temp.path())
        .env_remove("SPECFLOW_CONFIG")
        .arg("regenerate")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .unwrap();
    thread::sleep(Duration::from_millis(300));

    specflow_in(&temp)
        .arg("regenerate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("another operation is already in flight"));

    assert!(first.wait().unwrap().success());

    specflow_in(&temp)
        .args(["status", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"version\": 2"))
        .stdout(predicate::str::contains("\"version\": 3").not());

    specflow_in(&temp).arg("regenerate").assert().success();
}
