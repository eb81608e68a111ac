use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn service_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("graph-service");
    path
}

fn run_service(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(service_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .expect("failed to run graph-service binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_help_lists_serve() {
    let output = Command::new(service_binary())
        .arg("--help")
        .output()
        .expect("failed to run graph-service binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"), "help output: {}", stdout);
    assert!(stdout.contains("--config"), "help output: {}", stdout);
}

#[test]
fn test_missing_config_file_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");
    let (_, stderr, success) = run_service(&missing, &["serve"]);
    assert!(!success);
    assert!(
        stderr.contains("Failed to read config file"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_invalid_config_fails_before_serving() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("graph-service.toml");
    fs::write(
        &config_path,
        "[server]\nbind = \"127.0.0.1:0\"\n\n[ingest]\ndocument_chunk_size = 0\n",
    )
    .unwrap();

    let (_, stderr, success) = run_service(&config_path, &["serve"]);
    assert!(!success);
    assert!(stderr.contains("document_chunk_size"), "stderr: {}", stderr);
}

#[test]
fn test_unparseable_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("graph-service.toml");
    fs::write(&config_path, "this is not toml = = =").unwrap();

    let (_, stderr, success) = run_service(&config_path, &["serve"]);
    assert!(!success);
    assert!(
        stderr.contains("Failed to parse config file"),
        "stderr: {}",
        stderr
    );
}
