//! Integration tests for configuration layering.
//!
//! Tests the full priority chain: built-in defaults < XDG config < project config < CLI args

#![allow(clippy::unwrap_used)] // Test code uses unwrap for brevity
#![allow(deprecated)] // cargo_bin deprecation warning

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use idcheck_test_support::PortraitBuilder;
use predicates::prelude::*;

/// Isolated home with an XDG config dir and a project dir.
struct Workspace {
    _root: tempfile::TempDir,
    xdg: PathBuf,
    project: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let xdg = root.path().join("xdg");
        let project = root.path().join("project");
        fs::create_dir_all(xdg.join("idcheck")).unwrap();
        fs::create_dir_all(&project).unwrap();
        Self {
            _root: root,
            xdg,
            project,
        }
    }

    fn xdg_config(&self, contents: &str) {
        fs::write(self.xdg.join("idcheck").join("config.toml"), contents).unwrap();
    }

    fn project_config(&self, contents: &str) {
        fs::write(self.project.join(".idcheck.toml"), contents).unwrap();
    }

    fn photo(&self, name: &str, builder: &PortraitBuilder) -> PathBuf {
        let path = self.project.join(name);
        builder.build().save(&path).unwrap();
        path
    }

    fn command(&self, cwd: &Path) -> Command {
        let mut cmd = Command::cargo_bin("idcheck").unwrap();
        cmd.env("XDG_CONFIG_HOME", &self.xdg)
            .current_dir(cwd)
            .arg("--no-detectors");
        cmd
    }
}

fn offset() -> PortraitBuilder {
    PortraitBuilder::new().center(0.65, 0.5)
}

#[test]
fn test_project_config_applies_format() {
    let ws = Workspace::new();
    ws.project_config(
        r"
[output]
format = 'json'
",
    );
    let photo = ws.photo("ok.png", &PortraitBuilder::new());

    ws.command(&ws.project)
        .arg(&photo)
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("["));
}

#[test]
fn test_cli_overrides_project_config() {
    let ws = Workspace::new();
    ws.project_config(
        r"
[output]
format = 'json'
",
    );
    let photo = ws.photo("ok.png", &PortraitBuilder::new());

    ws.command(&ws.project)
        .args(["--format", "jsonl"])
        .arg(&photo)
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("{"));
}

#[test]
fn test_project_config_disables_autofix() {
    let ws = Workspace::new();
    ws.project_config(
        r"
[autofix]
enabled = false
",
    );
    let photo = ws.photo("offset.png", &offset());

    ws.command(&ws.project)
        .arg(&photo)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"status\":\"needs_correction\""));
}

#[test]
fn test_project_config_threshold() {
    let ws = Workspace::new();
    ws.project_config(
        r"
[thresholds]
centering = 1.0
",
    );
    let photo = ws.photo("offset.png", &offset());

    ws.command(&ws.project)
        .arg(&photo)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\"attempts\":1"));
}

#[test]
fn test_cli_threshold_overrides_project_config() {
    let ws = Workspace::new();
    ws.project_config(
        r"
[thresholds]
centering = 1.0

[autofix]
enabled = false
",
    );
    let photo = ws.photo("offset.png", &offset());

    ws.command(&ws.project)
        .args(["--threshold", "centering=0.5"])
        .arg(&photo)
        .assert()
        .code(1);
}

#[test]
fn test_project_config_zero_retries_rejects() {
    let ws = Workspace::new();
    ws.project_config(
        r"
[autofix]
max_retries = 0
",
    );
    let photo = ws.photo("offset.png", &offset());

    ws.command(&ws.project)
        .arg(&photo)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"status\":\"rejected\""))
        .stdout(predicate::str::contains("after 0 automatic attempt(s)"));
}

#[test]
fn test_xdg_config_applies() {
    let ws = Workspace::new();
    ws.xdg_config(
        r"
[output]
format = 'json'
",
    );
    let photo = ws.photo("ok.png", &PortraitBuilder::new());

    ws.command(&ws.project)
        .arg(&photo)
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("["));
}

#[test]
fn test_project_config_overrides_xdg() {
    let ws = Workspace::new();
    ws.xdg_config(
        r"
[output]
format = 'json'

[autofix]
enabled = false
",
    );
    ws.project_config(
        r"
[output]
format = 'jsonl'
",
    );
    let photo = ws.photo("offset.png", &offset());

    // Format comes from the project file; autofix setting survives from XDG.
    ws.command(&ws.project)
        .arg(&photo)
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("{"))
        .stdout(predicate::str::contains("needs_correction"));
}

#[test]
fn test_project_config_found_in_parent() {
    let ws = Workspace::new();
    ws.project_config(
        r"
[output]
format = 'json'
",
    );
    let nested = ws.project.join("a").join("b");
    fs::create_dir_all(&nested).unwrap();
    let photo = ws.photo("ok.png", &PortraitBuilder::new());

    ws.command(&nested)
        .arg(&photo)
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("["));
}

#[test]
fn test_project_config_output_dir() {
    let ws = Workspace::new();
    ws.project_config(
        r"
[output]
dir = 'fixed'
",
    );
    let photo = ws.photo("offset.png", &offset());

    ws.command(&ws.project).arg(&photo).assert().code(0);

    assert!(ws.project.join("fixed").join("offset.corrected.png").is_file());
}

#[test]
fn test_invalid_config_value_warns() {
    let ws = Workspace::new();
    ws.project_config(
        r"
[pipeline]
deadline_ms = 0
",
    );
    let photo = ws.photo("ok.png", &PortraitBuilder::new());

    ws.command(&ws.project)
        .arg(&photo)
        .assert()
        .stderr(predicate::str::contains("pipeline.deadline_ms"));
}

#[test]
fn test_malformed_config_file_ignored() {
    let ws = Workspace::new();
    ws.project_config("[output\nformat = 'json'\n");
    let photo = ws.photo("ok.png", &PortraitBuilder::new());

    ws.command(&ws.project)
        .arg(&photo)
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("{"))
        .stderr(predicate::str::contains("Failed to parse config file"));
}
