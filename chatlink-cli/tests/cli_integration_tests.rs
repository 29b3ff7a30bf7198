//! CLI Integration Tests

use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chatlink"))
        .env_remove("CHATLINK_TOKEN")
        .env_remove("CHATLINK_USER_ID")
        .env_remove("CHATLINK_SERVER_URL")
        .args(args)
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_help_lists_commands() {
    let output = run(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for command in ["listen", "status", "ping", "typing", "completions"] {
        assert!(stdout.contains(command), "missing {} in help", command);
    }
}

#[test]
fn test_completions() {
    let output = run(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("chatlink"));
}

#[test]
fn test_status_requires_token() {
    let output = run(&["status"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("CHATLINK_TOKEN"), "stderr: {}", stderr);
}

#[test]
fn test_status_reports_unreachable_server() {
    let output = run(&[
        "--server",
        "ws://127.0.0.1:1/ws",
        "--token",
        "t",
        "status",
        "--wait",
        "1",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success());
    assert!(stdout.contains("connected: no"), "stdout: {}", stdout);
}

#[test]
fn test_status_rejects_non_websocket_url() {
    let output = run(&[
        "--server",
        "https://example.com/ws",
        "--token",
        "t",
        "status",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Invalid URL"), "stderr: {}", stderr);
}

#[test]
fn test_status_gives_up_after_wait() {
    let output = run(&[
        "--server",
        "ws://127.0.0.1:1/ws",
        "--token",
        "t",
        "status",
        "--wait",
        "1",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Not connected after 1s"), "stderr: {}", stderr);
}
