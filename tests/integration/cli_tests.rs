//! Integration tests for the CLI binary.
//!
//! This test is registered as a [[test]] in the authkey-rotate-cli crate
//! so that CARGO_BIN_EXE_rotate-auth-key is available.

use std::process::{Command, Output};

const KEY_A: &str = "0x9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";
const KEY_B: &str = "0x0e5070144da800e1528a09e39ee0f589a4feafb880968de6f0d5479f7258bd82";

/// A Command for the binary with no rotation settings leaking in from the
/// environment.
fn rotate_binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rotate-auth-key"));
    for var in [
        "NODE_URL",
        "FOR_ACCOUNT_ADDRESS",
        "FOR_ACCOUNT_PRIVATE_KEY",
        "TO_ACCOUNT_ADDRESS",
        "TO_ACCOUNT_PRIVATE_KEY",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("RUST_LOG", "error");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn cli_responds_to_help() {
    let output = rotate_binary()
        .arg("--help")
        .output()
        .expect("failed to execute rotate-auth-key --help");

    assert!(
        output.status.success(),
        "--help should exit with success, stderr: {}",
        stderr(&output)
    );
    let out = stdout(&output);
    assert!(out.contains("rotate"), "help should list subcommands: {out}");
    assert!(out.contains("lookup"), "help should list subcommands: {out}");
}

#[test]
fn cli_responds_to_version() {
    let output = rotate_binary()
        .arg("--version")
        .output()
        .expect("failed to execute rotate-auth-key --version");

    assert!(output.status.success());
    assert!(stdout(&output).contains("0.1"));
}

#[test]
fn rotate_help_names_environment_variables() {
    let output = rotate_binary()
        .args(["rotate", "--help"])
        .output()
        .expect("failed to execute rotate --help");

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("NODE_URL"));
    assert!(out.contains("FOR_ACCOUNT_PRIVATE_KEY"));
    assert!(out.contains("TO_ACCOUNT_PRIVATE_KEY"));
}

#[test]
fn show_redacts_private_key_by_default() {
    let output = rotate_binary()
        .args(["show", "--private-key", KEY_A])
        .output()
        .expect("failed to execute show");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("<redacted>"));
    assert!(!out.contains(&KEY_A[2..]), "private key leaked: {out}");
    assert!(out.contains("publicKeyHex"));
}

#[test]
fn show_reveals_private_key_on_request() {
    let output = rotate_binary()
        .args(["--json", "--reveal-secrets", "show", "--private-key", KEY_A])
        .output()
        .expect("failed to execute show");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains(r#""privateKeyHex""#));
    assert!(out.contains(KEY_A));
}

#[test]
fn show_rejects_malformed_key() {
    let output = rotate_binary()
        .args(["show", "--private-key", "0xzz"])
        .output()
        .expect("failed to execute show");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Malformed private key"));
}

#[test]
fn rotate_rejects_malformed_key_before_contacting_node() {
    // Port 9 (discard) is never a fullnode; the key check must come first.
    let output = rotate_binary()
        .args([
            "rotate",
            "--node-url",
            "http://127.0.0.1:9/v1",
            "--for-account-private-key",
            "0xnot-a-key",
            "--to-account-private-key",
            KEY_B,
        ])
        .output()
        .expect("failed to execute rotate");

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("Malformed private key"), "stderr: {err}");
    assert!(!stdout(&output).contains("Initial accounts"));
}

#[test]
fn rotate_rejects_overflowing_timeout_without_panicking() {
    let output = rotate_binary()
        .args([
            "rotate",
            "--node-url",
            "http://127.0.0.1:9/v1",
            "--for-account-private-key",
            KEY_A,
            "--to-account-private-key",
            KEY_B,
            "--timeout-secs",
            "18446744073709551615",
        ])
        .output()
        .expect("failed to execute rotate");

    assert!(!output.status.success());
    // 101 is the exit code of a Rust panic.
    assert_ne!(output.status.code(), Some(101));
    let err = stderr(&output);
    assert!(err.contains("Invalid configuration"), "stderr: {err}");
}

#[test]
fn rotate_requires_both_keys() {
    let output = rotate_binary()
        .args([
            "rotate",
            "--node-url",
            "http://127.0.0.1:9/v1",
            "--for-account-private-key",
            KEY_A,
        ])
        .output()
        .expect("failed to execute rotate");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("--to-account-private-key"));
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = rotate_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute rotate-auth-key");

    assert!(!output.status.success());
}
