//! CLI end-to-end tests
//!
//! Tests for the webpforge command-line interface.

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the webpforge binary
#[allow(deprecated)]
fn webpforge_cmd() -> Command {
    let mut cmd = Command::cargo_bin("webpforge").unwrap();
    // Keep the user's own config out of the way.
    cmd.env("HOME", std::env::temp_dir());
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = webpforge_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = webpforge_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("webpforge"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_flag() {
    let mut cmd = webpforge_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("webpforge"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = webpforge_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_convert_help() {
    let mut cmd = webpforge_cmd();
    cmd.args(["convert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Convert an image to WebP"))
        .stdout(predicate::str::contains("--near-lossless"));
}

// ---------------------------------------------------------------------------
// parse-size
// ---------------------------------------------------------------------------

#[test]
fn test_cli_parse_size() {
    for (input, expected) in [("2M", "2097152"), ("512", "512"), ("1.9K", "1024")] {
        webpforge_cmd()
            .args(["parse-size", input])
            .assert()
            .success()
            .stdout(predicate::str::diff(format!("{expected}\n")));
    }
}

#[test]
fn test_cli_parse_size_invalid() {
    webpforge_cmd()
        .args(["parse-size", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("abc"));
}

// ---------------------------------------------------------------------------
// check-backends
// ---------------------------------------------------------------------------

#[test]
fn test_cli_check_backends_lists_all() {
    webpforge_cmd()
        .arg("check-backends")
        .assert()
        .success()
        .stdout(predicate::str::contains("native"))
        .stdout(predicate::str::contains("vips"))
        .stdout(predicate::str::contains("cwebp"))
        .stdout(predicate::str::contains("cloud"));
}

#[test]
fn test_cli_check_backends_json() {
    let output = webpforge_cmd()
        .args(["check-backends", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let statuses: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let statuses = statuses.as_array().unwrap();
    let native = statuses.iter().find(|s| s["name"] == "native").unwrap();
    assert_eq!(native["status"], "operational");
    let cloud = statuses.iter().find(|s| s["name"] == "cloud").unwrap();
    assert_eq!(cloud["status"], "not_operational");
}

// ---------------------------------------------------------------------------
// convert
// ---------------------------------------------------------------------------

#[test]
fn test_cli_convert_native() {
    let dir = tempdir().unwrap();
    let src = common::write_png(dir.path(), "cat.png");
    let dst = dir.path().join("cat.webp");

    webpforge_cmd()
        .current_dir(dir.path())
        .args(["convert", src.to_str().unwrap(), dst.to_str().unwrap()])
        .args(["--backend", "native", "--quality", "70"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backend: native"));

    let bytes = fs::read(&dst).unwrap();
    assert_eq!(&bytes[8..12], b"WEBP");
}

#[test]
fn test_cli_convert_json_report() {
    let dir = tempdir().unwrap();
    let src = common::write_png(dir.path(), "cat.png");
    let dst = dir.path().join("cat.webp");

    let output = webpforge_cmd()
        .current_dir(dir.path())
        .args(["convert", src.to_str().unwrap(), dst.to_str().unwrap()])
        .args(["--encoding", "auto", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["backend"], "native");
    assert_eq!(report["quality"], 85);
    assert!(report["encoding"] == "lossy" || report["encoding"] == "lossless");
    assert_eq!(report["attempts"], 2);
}

#[test]
fn test_cli_convert_rejects_traversal() {
    let dir = tempdir().unwrap();
    webpforge_cmd()
        .current_dir(dir.path())
        .args(["convert", "../secret.png", "out.webp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("traversal"));
}

#[test]
fn test_cli_convert_rejects_stream_wrapper() {
    let dir = tempdir().unwrap();
    let src = common::write_png(dir.path(), "cat.png");
    webpforge_cmd()
        .current_dir(dir.path())
        .args(["convert", src.to_str().unwrap(), "php://filter/out.webp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("stream-wrapper"));
}

#[test]
fn test_cli_convert_missing_source() {
    let dir = tempdir().unwrap();
    webpforge_cmd()
        .current_dir(dir.path())
        .args(["convert", "missing.png", "out.webp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_convert_unknown_backend() {
    let dir = tempdir().unwrap();
    let src = common::write_png(dir.path(), "cat.png");
    webpforge_cmd()
        .current_dir(dir.path())
        .args(["convert", src.to_str().unwrap(), "out.webp", "--backend", "imagick"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown backend"));
}

#[test]
fn test_cli_convert_unconfigured_cloud() {
    let dir = tempdir().unwrap();
    let src = common::write_png(dir.path(), "cat.png");
    webpforge_cmd()
        .current_dir(dir.path())
        .args(["convert", src.to_str().unwrap(), "out.webp", "--backend", "cloud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cloud.url is not configured"));
}

#[test]
fn test_cli_convert_bad_quality() {
    webpforge_cmd()
        .args(["convert", "a.png", "b.webp", "--quality", "high"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quality"));
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn test_cli_validate_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("webpforge.toml");
    fs::write(
        &config,
        "[options]\nquality = 80\nencoding = \"auto\"\n\n[limits]\npost_max_size = \"lots\"\n",
    )
    .unwrap();

    for _ in 0..2 {
        webpforge_cmd()
            .args(["validate", config.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid"))
            .stdout(predicate::str::contains("Quality: 80"))
            .stdout(predicate::str::contains("post_max_size"));
    }
}

#[test]
fn test_cli_validate_rejects_bad_preset() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("webpforge.toml");
    fs::write(&config, "[options]\npreset = \"portrait\"\n").unwrap();

    webpforge_cmd()
        .args(["validate", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("portrait"));
}

#[test]
fn test_cli_validate_defaults() {
    let dir = tempdir().unwrap();
    webpforge_cmd()
        .current_dir(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"));
}
