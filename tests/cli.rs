//! End-to-end checks of the command line front end that never start a build.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn source_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let gui = dir.path().join("gui_data");
    fs::create_dir_all(&gui).unwrap();
    fs::write(
        gui.join("gui_modern_extractor.py"),
        "#!/usr/bin/env python3\n\"\"\"\nStemWeaver v1.1 - Professional Audio Stem Separation Tool\n\"\"\"\n",
    )
    .unwrap();
    dir
}

fn bundler(source: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stemweaver_bundler").unwrap();
    cmd.arg("--source")
        .arg(source.path())
        .env("STEMWEAVER_BUILD_DIR", source.path().join("scratch"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_the_selection_flag() {
    Command::cargo_bin("stemweaver_bundler")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--select"))
        .stdout(predicate::str::contains("STEMWEAVER_BUILD_DIR"));
}

#[test]
fn exit_selection_builds_nothing() {
    let source = source_tree();
    bundler(&source)
        .args(["--select", "0"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("StemWeaver 1.1"))
        .stdout(predicate::str::contains("Nothing to build."));
    assert!(!source.path().join("scratch").exists());
}

#[test]
fn menu_exits_on_zero_and_on_end_of_input() {
    let source = source_tree();
    bundler(&source)
        .write_stdin("0\n")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Available build targets:"))
        .stdout(predicate::str::contains("5) All Linux targets"));

    bundler(&source).write_stdin("").assert().code(0);
}

#[test]
fn declining_the_confirmation_exits_cleanly() {
    let source = source_tree();
    bundler(&source)
        .args(["--select", "3"])
        .write_stdin("n\n")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Nothing to build."));
}

#[test]
fn selection_without_targets_is_rejected() {
    let source = source_tree();
    bundler(&source)
        .args(["--select", "9", "--yes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("names no build targets"));
}

#[test]
fn explicit_config_must_exist() {
    let source = source_tree();
    bundler(&source)
        .arg("--config")
        .arg(source.path().join("missing.toml"))
        .args(["--select", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn unknown_config_tables_are_rejected() {
    let source = source_tree();
    fs::write(
        source.path().join("bundle.toml"),
        "[app]\nversion = \"1.2\"\n\n[macos]\nsigning = true\n",
    )
    .unwrap();
    bundler(&source)
        .args(["--select", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid bundle.toml"));
}

#[test]
fn configured_version_wins_over_the_header() {
    let source = source_tree();
    fs::write(source.path().join("bundle.toml"), "[app]\nversion = \"2.0\"\n").unwrap();
    bundler(&source)
        .args(["--select", "0"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("StemWeaver 2.0"));
}

#[test]
fn missing_source_directory_is_a_usage_error() {
    let source = source_tree();
    Command::cargo_bin("stemweaver_bundler")
        .unwrap()
        .arg("--source")
        .arg(source.path().join("nope"))
        .args(["--select", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[cfg(unix)]
#[test]
fn missing_tools_without_a_package_manager_exit_with_two() {
    let source = source_tree();
    let empty_path = source.path().join("bin");
    fs::create_dir_all(&empty_path).unwrap();
    bundler(&source)
        .env("PATH", &empty_path)
        .args(["--select", "4", "--yes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing required tools"))
        .stderr(predicate::str::contains("rpmbuild"));
}

#[cfg(unix)]
#[test]
fn declined_tool_install_exits_with_two() {
    use std::os::unix::fs::PermissionsExt;

    let source = source_tree();
    let bin = source.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    let apt = bin.join("apt-get");
    fs::write(&apt, "#!/bin/sh\nexit 1\n").unwrap();
    fs::set_permissions(&apt, fs::Permissions::from_mode(0o755)).unwrap();

    bundler(&source)
        .env("PATH", &bin)
        .args(["--select", "4"])
        .write_stdin("y\nn\n")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("install -y rpm"))
        .stderr(predicate::str::contains("install declined"));
}
