//! CLI argument validation tests.
//!
//! Tests command-line argument parsing, validation, exit codes and the
//! models subcommand.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use idcheck_test_support::PortraitBuilder;
use predicates::prelude::*;

fn write_photo(dir: &Path, name: &str, builder: &PortraitBuilder) -> PathBuf {
    let path = dir.join(name);
    builder.build().save(&path).unwrap();
    path
}

fn idcheck(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("idcheck").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home)
        .current_dir(config_home);
    cmd
}

// === Missing/Invalid Path Tests ===

#[test]
fn test_missing_path_shows_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    idcheck(temp_dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No paths specified"));
}

#[test]
fn test_nonexistent_path_warns_but_continues() {
    let temp_dir = tempfile::tempdir().unwrap();
    idcheck(temp_dir.path())
        .arg("/nonexistent/path/to/photo.jpg")
        .arg("--no-detectors")
        .assert()
        .code(0)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_empty_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let photos = temp_dir.path().join("photos");
    fs::create_dir(&photos).unwrap();

    idcheck(temp_dir.path())
        .arg(&photos)
        .arg("--no-detectors")
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty());
}

// === Format Validation Tests ===

#[test]
fn test_invalid_format_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    idcheck(temp_dir.path())
        .args(["--format", "xml", "photo.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("json").or(predicate::str::contains("jsonl")));
}

// === Threshold Validation Tests ===

#[test]
fn test_threshold_without_name_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    idcheck(temp_dir.path())
        .args(["--threshold", "0.7", "photo.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=VALUE"));
}

#[test]
fn test_threshold_above_one_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    idcheck(temp_dir.path())
        .args(["--threshold", "occlusion=1.5", "photo.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("0.0..=1.0"));
}

#[test]
fn test_threshold_non_numeric_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    idcheck(temp_dir.path())
        .args(["--threshold", "occlusion=abc", "photo.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid"));
}

#[test]
fn test_zero_deadline_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    idcheck(temp_dir.path())
        .args(["--deadline-ms", "0", "photo.png"])
        .assert()
        .failure();
}

#[test]
fn test_malformed_resolution_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    idcheck(temp_dir.path())
        .args(["--min-resolution", "600", "photo.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("WIDTHxHEIGHT"));
}

// === Exit Code Tests ===

#[test]
fn test_approved_photo_exits_zero() {
    let temp_dir = tempfile::tempdir().unwrap();
    let photo = write_photo(temp_dir.path(), "ok.png", &PortraitBuilder::new());

    idcheck(temp_dir.path())
        .arg("--no-detectors")
        .arg(&photo)
        .assert()
        .code(0);
}

#[test]
fn test_needs_correction_exits_one() {
    let temp_dir = tempfile::tempdir().unwrap();
    let photo = write_photo(
        temp_dir.path(),
        "offset.png",
        &PortraitBuilder::new().center(0.65, 0.5),
    );

    idcheck(temp_dir.path())
        .args(["--no-detectors", "--no-autofix"])
        .arg(&photo)
        .assert()
        .code(1);
}

#[test]
fn test_unevaluable_photo_exits_two() {
    let temp_dir = tempfile::tempdir().unwrap();
    let photo = write_photo(
        temp_dir.path(),
        "empty.png",
        &PortraitBuilder::new().without_face(),
    );

    idcheck(temp_dir.path())
        .arg("--no-detectors")
        .arg(&photo)
        .assert()
        .code(2);
}

#[test]
fn test_resolution_floor_from_cli() {
    let temp_dir = tempfile::tempdir().unwrap();
    let photo = write_photo(temp_dir.path(), "ok.png", &PortraitBuilder::new());

    idcheck(temp_dir.path())
        .args(["--no-detectors", "--min-resolution", "800x800"])
        .arg(&photo)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"kind\":\"quality\""));
}

#[test]
fn test_missing_models_fall_back_to_quality_checks() {
    let temp_dir = tempfile::tempdir().unwrap();
    let models = temp_dir.path().join("models");
    fs::create_dir(&models).unwrap();
    let photo = write_photo(temp_dir.path(), "ok.png", &PortraitBuilder::new());

    idcheck(temp_dir.path())
        .arg("--models-dir")
        .arg(&models)
        .arg(&photo)
        .assert()
        .code(0);
}

// === Verbosity Level Tests ===

#[test]
fn test_verbosity_v_logs_info() {
    let temp_dir = tempfile::tempdir().unwrap();
    let photo = write_photo(temp_dir.path(), "ok.png", &PortraitBuilder::new());

    idcheck(temp_dir.path())
        .args(["-v", "--no-detectors"])
        .arg(&photo)
        .assert()
        .code(0)
        .stderr(predicate::str::contains("INFO"));
}

// === Subcommand Tests ===

#[test]
fn test_check_subcommand() {
    let temp_dir = tempfile::tempdir().unwrap();
    let photo = write_photo(temp_dir.path(), "ok.png", &PortraitBuilder::new());

    idcheck(temp_dir.path())
        .args(["check", "--no-detectors"])
        .arg(&photo)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\"status\":\"approved\""));
}

#[test]
fn test_models_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let models = temp_dir.path().join("models");

    idcheck(temp_dir.path())
        .args(["models", "--models-dir"])
        .arg(&models)
        .arg("path")
        .assert()
        .success()
        .stdout(predicate::str::contains(models.display().to_string()));
}

#[test]
fn test_models_list() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("occlusion.safetensors"), b"weights").unwrap();

    idcheck(temp_dir.path())
        .args(["models", "--models-dir"])
        .arg(temp_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ occlusion (occlusion.safetensors)"))
        .stdout(predicate::str::contains("✗ dress_code"))
        .stdout(predicate::str::contains("1/3 models installed"));
}

#[test]
fn test_models_verify_mismatch_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("occlusion.safetensors"), b"abc").unwrap();
    fs::write(
        temp_dir.path().join("occlusion.safetensors.sha256"),
        "0000000000000000000000000000000000000000000000000000000000000000\n",
    )
    .unwrap();

    idcheck(temp_dir.path())
        .args(["models", "--models-dir"])
        .arg(temp_dir.path())
        .arg("verify")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("✗ occlusion"))
        .stderr(predicate::str::contains("checksum verification"));
}

#[test]
fn test_models_verify_matching_checksum() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("occlusion.safetensors"), b"abc").unwrap();
    fs::write(
        temp_dir.path().join("occlusion.safetensors.sha256"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad  occlusion.safetensors\n",
    )
    .unwrap();

    idcheck(temp_dir.path())
        .args(["models", "--models-dir"])
        .arg(temp_dir.path())
        .arg("verify")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ occlusion"))
        .stdout(predicate::str::contains("head_covering: not installed"));
}

// === Help Tests ===

#[test]
fn test_help_lists_options() {
    let mut cmd = Command::cargo_bin("idcheck").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--threshold"))
        .stdout(predicate::str::contains("--no-autofix"))
        .stdout(predicate::str::contains("models"));
}
