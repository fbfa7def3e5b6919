//! CLI smoke tests for the avc-forms-server binary: help output,
//! configuration validation and the administrative commands.

use std::path::Path;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Helper to run the avc-forms-server binary with given arguments
fn run_server(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_avc-forms-server"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute avc-forms-server")
}

/// Config with home_dir and a file-backed sqlite database inside `dir`.
fn write_config(dir: &Path) -> String {
    let home = dir.join("home");
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
server:
  home_dir: "{}"
  host: "127.0.0.1"
  port: 18080

database:
  url: "sqlite://database/avc.db"

logging:
  default:
    console_level: warn
    file: ""

modules:
  avc_forms:
    max_page_size: 50
"#,
        home.to_string_lossy().replace('\\', "/")
    );
    std::fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_string_lossy().to_string()
}

#[test]
fn test_cli_help_command() {
    let output = run_server(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    for sub in ["run", "check", "migrate", "create-user", "grant"] {
        assert!(stdout.contains(sub), "Should list '{sub}' subcommand");
    }
    assert!(stdout.contains("--config"), "Should mention config option");
}

#[test]
fn test_cli_version_command() {
    let output = run_server(&["--version"]);

    assert!(output.status.success(), "Version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("avc-forms-server"));
    assert!(stdout.contains("0.1.0"));
}

#[test]
fn test_cli_invalid_command() {
    let output = run_server(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "Should report the bad command");
}

#[test]
fn test_cli_config_validation_missing_file() {
    let output = run_server(&["--config", "/nonexistent/config.yaml", "check"]);

    assert!(!output.status.success(), "Should fail with missing config");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("config file not found"),
        "Should mention config file issue: {}",
        stderr
    );
}

#[test]
fn test_cli_config_validation_invalid_yaml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("invalid.yaml");
    std::fs::write(&config_path, "invalid: yaml: content: [unclosed")
        .expect("Failed to write file");

    let output = run_server(&["--config", config_path.to_str().unwrap(), "check"]);

    assert!(!output.status.success(), "Should fail with invalid YAML");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("yaml") || stderr.contains("parse"),
        "Should mention YAML parsing issue: {}",
        stderr
    );
}

#[test]
fn test_cli_config_validation_valid_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path());

    let output = run_server(&["--config", &config_path, "check"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "check should pass: {stderr}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration check passed"));
    assert!(temp_dir.path().join("home").is_dir(), "home_dir is created");
}

#[test]
fn test_cli_rejects_bad_module_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("bad_module.yaml");
    let content = format!(
        "server:\n  home_dir: \"{}\"\n  host: 127.0.0.1\n  port: 18081\nmodules:\n  avc_forms:\n    page: 3\n",
        temp_dir.path().join("h").to_string_lossy().replace('\\', "/")
    );
    std::fs::write(&config_path, content).expect("Failed to write config file");

    let output = run_server(&["--config", config_path.to_str().unwrap(), "check"]);
    assert!(!output.status.success(), "unknown module keys must fail");
}

#[test]
fn test_cli_rejects_code_length_wider_than_column() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("wide_code.yaml");
    let content = format!(
        "server:\n  home_dir: \"{}\"\n  host: 127.0.0.1\n  port: 18082\nmodules:\n  avc_forms:\n    max_code_length: 300\n",
        temp_dir.path().join("h").to_string_lossy().replace('\\', "/")
    );
    std::fs::write(&config_path, content).expect("Failed to write config file");

    let output = run_server(&["--config", config_path.to_str().unwrap(), "check"]);
    assert!(!output.status.success(), "max_code_length above 255 must fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("max_code_length"), "stderr: {stderr}");
}

#[test]
fn test_cli_print_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path());

    let output = run_server(&["--config", &config_path, "--port", "19999", "--print-config"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port: 19999"), "CLI port override: {stdout}");
}

#[test]
fn test_cli_migrate_create_user_and_grant() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path());

    let output = run_server(&["--config", &config_path, "migrate"]);
    assert!(
        output.status.success(),
        "migrate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(temp_dir.path().join("home/database/avc.db").is_file());

    let output = run_server(&[
        "--config",
        &config_path,
        "create-user",
        "--username",
        "nurse",
        "--password",
        "long-enough-pw",
    ]);
    assert!(
        output.status.success(),
        "create-user failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Created user nurse"));

    let output = run_server(&[
        "--config",
        &config_path,
        "grant",
        "--username",
        "nurse",
        "add_patient",
        "change_patient",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("add_patient, change_patient"), "{stdout}");

    let output = run_server(&[
        "--config",
        &config_path,
        "grant",
        "--username",
        "nurse",
        "fly_patient",
    ]);
    assert!(!output.status.success(), "unknown codename must fail");

    // usernames are unique
    let output = run_server(&[
        "--config",
        &config_path,
        "create-user",
        "--username",
        "nurse",
        "--password",
        "long-enough-pw",
    ]);
    assert!(!output.status.success());
}
