//! CLI integration tests for keel.
//!
//! These drive the binary against temporary projects. Nothing here needs
//! network access or a native toolchain.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use flate2::write::GzEncoder;
use flate2::Compression;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the keel binary command, isolated from the caller's environment.
fn keel(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("keel").unwrap();
    cmd.current_dir(dir)
        .env_remove("KEEL_PROJECT_DIR")
        .env_remove("KEEL_PROFILE")
        .env_remove("KEEL_GENERATOR")
        .arg("--no-color");
    cmd
}

fn init_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    keel(tmp.path()).arg("init").assert().success();
    tmp
}

/// Write a gzip tarball of `(path, contents)` pairs to `dest`.
fn write_tar_gz(dest: &Path, entries: &[(&str, &str)]) {
    let file = fs::File::create(dest).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

// ============================================================================
// keel init
// ============================================================================

#[test]
fn test_init_creates_layout() {
    let tmp = init_project();

    assert!(tmp.path().join("keel.toml").is_file());
    assert!(tmp.path().join("src").is_dir());
    assert!(tmp.path().join("src-arch").is_dir());
    assert!(tmp.path().join("packages").is_dir());

    let config = fs::read_to_string(tmp.path().join("keel.toml")).unwrap();
    assert!(config.contains("active = \"default\""));
}

#[test]
fn test_init_twice_fails() {
    let tmp = init_project();

    keel(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = TempDir::new().unwrap();

    keel(tmp.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find `keel.toml`"));
}

#[test]
fn test_project_dir_option() {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("deps");

    keel(tmp.path())
        .args(["--project-dir", "deps", "init"])
        .assert()
        .success();
    assert!(project.join("keel.toml").is_file());

    keel(tmp.path())
        .args(["--project-dir", "deps", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No packages found"));
}

// ============================================================================
// keel list / fetch
// ============================================================================

#[test]
fn test_list_empty_project() {
    let tmp = init_project();

    keel(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No packages found"));
}

#[test]
fn test_fetch_local_archive() {
    let tmp = init_project();
    let archive = tmp.path().join("hello-1.0.tar.gz");
    write_tar_gz(
        &archive,
        &[
            (
                "hello-1.0/CMakeLists.txt",
                "cmake_minimum_required(VERSION 3.10)\nproject(hello C)\n",
            ),
            ("hello-1.0/hello.c", "int hello(void) { return 1; }\n"),
        ],
    );

    keel(tmp.path())
        .args(["fetch", archive.to_str().unwrap()])
        .assert()
        .success();

    assert!(tmp.path().join("src/hello/CMakeLists.txt").is_file());
    assert!(tmp.path().join("src-arch/hello-1.0.tar.gz").is_file());
    assert!(tmp.path().join("packages/hello.json").is_file());

    keel(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("hello").and(predicate::str::contains("fetched")));
}

#[test]
fn test_fetch_rejects_bad_checksum() {
    let tmp = init_project();
    let archive = tmp.path().join("hello-1.0.tar.gz");
    write_tar_gz(&archive, &[("hello-1.0/CMakeLists.txt", "project(hello)\n")]);

    keel(tmp.path())
        .args(["fetch", archive.to_str().unwrap(), "--sha256"])
        .arg("0".repeat(64))
        .assert()
        .failure()
        .stderr(predicate::str::contains("checksum mismatch"));

    assert!(!tmp.path().join("src/hello").exists());
}

#[test]
fn test_fetch_unknown_name() {
    let tmp = init_project();

    keel(tmp.path())
        .args(["fetch", "zlib"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("package `zlib` not found"));
}

#[test]
fn test_remove_unknown_package() {
    let tmp = init_project();

    keel(tmp.path())
        .args(["remove", "zlib"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ============================================================================
// keel config
// ============================================================================

#[test]
fn test_config_add_and_use() {
    let tmp = init_project();

    keel(tmp.path())
        .args(["config", "add", "shared", "--shared", "-DFOO=1"])
        .assert()
        .success();
    keel(tmp.path())
        .args(["config", "use", "shared"])
        .assert()
        .success();

    keel(tmp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("* shared").and(predicate::str::contains("  default")));

    let config = fs::read_to_string(tmp.path().join("keel.toml")).unwrap();
    assert!(config.contains("[profiles.shared]"));
    assert!(config.contains("FOO"));
}

#[test]
fn test_config_add_conflicting_linkage() {
    let tmp = init_project();

    keel(tmp.path())
        .args(["config", "add", "bad", "--static", "--shared"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_config_use_unknown_profile() {
    let tmp = init_project();

    keel(tmp.path())
        .args(["config", "use", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("profile `nope` does not exist"));
}

// ============================================================================
// keel completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();

    keel(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("keel"));
}
