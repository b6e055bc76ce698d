// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI Integration Tests
//!
//! Runs the binary for everything that does not need a live gateway.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Runs CLI commands with an isolated configuration directory
struct CliTestContext {
    home: TempDir,
}

impl CliTestContext {
    fn new() -> Self {
        Self {
            home: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn write_config(&self, json: &str) -> PathBuf {
        let path = self.home.path().join("config.json");
        fs::write(&path, json).expect("Failed to write config");
        path
    }

    /// Run a CLI command and return the output
    fn run(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pushwire"));
        cmd.env("XDG_CONFIG_HOME", self.home.path())
            .env_remove("PUSHWIRE_CONFIG")
            .env_remove("PUSHWIRE_ENVIRONMENT")
            .env_remove("PUSHWIRE_CERTIFICATE")
            .env_remove("PUSHWIRE_PRIVATE_KEY")
            .args(args);

        cmd.output().expect("Failed to execute command")
    }

    /// Run a command and assert success
    fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        assert!(
            output.status.success(),
            "Command {:?} failed.\nStdout: {}\nStderr: {}",
            args,
            stdout,
            stderr
        );
        stdout
    }

    /// Run a command and assert failure
    fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        assert!(
            !output.status.success(),
            "Command {:?} should have failed but succeeded",
            args
        );
        stderr
    }
}

// ===========================================================================
// Help and Completions
// ===========================================================================

#[test]
fn test_help_lists_commands() {
    let ctx = CliTestContext::new();
    let stdout = ctx.run_success(&["--help"]);

    assert!(stdout.contains("send"));
    assert!(stdout.contains("feedback"));
    assert!(stdout.contains("check"));
}

#[test]
fn test_completions_need_no_configuration() {
    let ctx = CliTestContext::new();
    let stdout = ctx.run_success(&["completions", "bash"]);

    assert!(stdout.contains("pushwire"));
}

// ===========================================================================
// Configuration
// ===========================================================================

#[test]
fn test_check_without_certificate_fails() {
    let ctx = CliTestContext::new();
    let stderr = ctx.run_failure(&["check"]);

    assert!(stderr.contains("Push SSL certificate is required"));
}

#[test]
fn test_check_shows_sandbox_endpoints() {
    let ctx = CliTestContext::new();
    let stdout = ctx.run_success(&["--certificate", "cert.pem", "check"]);

    assert!(stdout.contains("Configuration is valid"));
    assert!(stdout.contains("gateway.sandbox.push.apple.com:2195"));
    assert!(stdout.contains("feedback.sandbox.push.apple.com:2196"));
}

#[test]
fn test_check_reads_config_file() {
    let ctx = CliTestContext::new();
    let path = ctx.write_config(
        r#"{ "environment": "production", "certificate_path": "prod.pem", "gateway_override": "127.0.0.1:3000" }"#,
    );
    let stdout = ctx.run_success(&["--config", path.to_str().unwrap(), "check"]);

    assert!(stdout.contains("Production"));
    assert!(stdout.contains("127.0.0.1:3000"));
    assert!(stdout.contains("feedback.push.apple.com:2196"));
}

#[test]
fn test_flags_override_config_file() {
    let ctx = CliTestContext::new();
    let path = ctx.write_config(r#"{ "environment": "production", "certificate_path": "prod.pem" }"#);
    let stdout = ctx.run_success(&[
        "--config",
        path.to_str().unwrap(),
        "--environment",
        "sandbox",
        "check",
    ]);

    assert!(stdout.contains("gateway.sandbox.push.apple.com:2195"));
}

#[test]
fn test_invalid_config_file_fails() {
    let ctx = CliTestContext::new();
    let path = ctx.write_config(r#"{ "certificate_path": "c.pem", "retries": 2 }"#);
    let stderr = ctx.run_failure(&["--config", path.to_str().unwrap(), "check"]);

    assert!(stderr.contains("Invalid configuration"));
}

#[test]
fn test_bad_gateway_address_fails() {
    let ctx = CliTestContext::new();
    let stderr = ctx.run_failure(&["--certificate", "c.pem", "--gateway", "nohost", "check"]);

    assert!(stderr.contains("host:port"));
}

// ===========================================================================
// Send
// ===========================================================================

#[test]
fn test_send_requires_token() {
    let ctx = CliTestContext::new();
    ctx.run_failure(&["--certificate", "c.pem", "send", "--alert", "Hi"]);
}

#[test]
fn test_send_rejects_bad_token_before_connecting() {
    let ctx = CliTestContext::new();
    let stderr = ctx.run_failure(&[
        "--certificate",
        "c.pem",
        "--gateway",
        "127.0.0.1:1",
        "send",
        "not-hex",
        "--alert",
        "Hi",
    ]);

    assert!(stderr.contains("Bad device token 'not-hex'"));
}

#[test]
fn test_send_rejects_payload_with_alert() {
    let ctx = CliTestContext::new();
    let token = "ab".repeat(32);
    ctx.run_failure(&[
        "--certificate",
        "c.pem",
        "send",
        &token,
        "--alert",
        "Hi",
        "--payload",
        "{}",
    ]);
}
