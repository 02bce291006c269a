//! Integration tests for the knnbench CLI

use std::process::Command;

fn cargo_run(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "--quiet", "--"])
        .args(args)
        .env_remove("KNNBENCH_CONFIG")
        .env_remove("KNNBENCH_PASSWORD")
        .output()
        .expect("Failed to run command")
}

#[test]
fn test_cli_help() {
    let output = cargo_run(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["create", "drop", "load", "search", "optimize", "info", "config"] {
        assert!(stdout.contains(command), "missing {command}");
    }
    assert!(stdout.contains("--host"));
    assert!(stdout.contains("--index-name"));
}

#[test]
fn test_cli_version() {
    let output = cargo_run(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("knnbench"));
}

#[test]
fn test_create_help() {
    let output = cargo_run(&["create", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--drop-old"));
    assert!(stdout.contains("--dim"));
}

#[test]
fn test_load_help() {
    let output = cargo_run(&["load", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--batch-size"));
    assert!(stdout.contains("--optimize"));
}

#[test]
fn test_search_help() {
    let output = cargo_run(&["search", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--top-k"));
    assert!(stdout.contains("--queries"));
    assert!(stdout.contains("--filter-id-gt"));
}

#[test]
fn test_search_requires_query() {
    let output = cargo_run(&["search"]);
    assert!(!output.status.success());
}

#[test]
fn test_config_show_defaults() {
    let missing = std::env::temp_dir().join("knnbench-missing-config.toml");
    let output = cargo_run(&["--config", missing.to_str().unwrap(), "config", "show"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("not found, using defaults"));
    assert!(stdout.contains("host = \"localhost\""));
    assert!(stdout.contains("thread_count = 8"));
}

#[test]
fn test_config_show_masks_password() {
    let missing = std::env::temp_dir().join("knnbench-missing-config.toml");
    let output = cargo_run(&[
        "--config",
        missing.to_str().unwrap(),
        "--password",
        "hunter2",
        "config",
        "show",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("hunter2"));
    assert!(stdout.contains("***"));
}

#[test]
fn test_config_init_and_path() {
    let dir = std::env::temp_dir().join(format!("knnbench-it-{}", std::process::id()));
    let path = dir.join("config.toml");
    let path_arg = path.to_str().unwrap();

    let output = cargo_run(&["--config", path_arg, "config", "path"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), path_arg);

    let output = cargo_run(&["--config", path_arg, "config", "init"]);
    assert!(output.status.success());
    assert!(path.exists());

    let output = cargo_run(&["--config", path_arg, "config", "init"]);
    assert!(!output.status.success());

    let output = cargo_run(&["--config", path_arg, "config", "init", "--force"]);
    assert!(output.status.success());

    std::fs::remove_dir_all(&dir).ok();
}
