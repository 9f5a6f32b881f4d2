//! End-to-end tests for Cinder CLI commands.
//!
//! These tests run the `cinder` binary against temporary projects. Builds use
//! shell scripts standing in for cargo and wasm-bindgen.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin for tests

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// A temporary project with units under `crates/`.
struct TestProject {
    temp_dir: TempDir,
}

impl TestProject {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    fn add_unit(&self, name: &str, description: &str) -> PathBuf {
        let dir = self.path("crates").join(name);
        fs::create_dir_all(dir.join("src")).expect("Failed to create unit");
        fs::write(
            dir.join("Cargo.toml"),
            format!(
                "[package]\nname = \"{name}\"\nversion = \"0.1.0\"\ndescription = \"{description}\"\n"
            ),
        )
        .expect("Failed to write manifest");
        fs::write(dir.join("src/lib.rs"), "pub fn run() {}").expect("Failed to write source");
        dir
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn cinder(&self) -> Command {
        let mut cmd = Command::cargo_bin("cinder").expect("Failed to find cinder binary");
        cmd.arg("--root").arg(self.root());
        cmd
    }
}

#[cfg(unix)]
mod fake_tools {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Fake cargo: fails for `--package broken`, otherwise writes the wasm.
    const FAKE_CARGO: &str = r#"#!/bin/sh
pkg=""; profile="debug"
while [ $# -gt 0 ]; do
  case "$1" in
    --package) pkg="$2"; shift ;;
    --release) profile="release" ;;
  esac
  shift
done
if [ "$pkg" = "broken" ]; then echo "error: could not compile $pkg" >&2; exit 101; fi
mkdir -p "target/wasm32-unknown-unknown/$profile"
printf 'wasm' > "target/wasm32-unknown-unknown/$profile/$(echo $pkg | tr - _).wasm"
"#;

    /// Fake wasm-bindgen: copies the wasm and writes a glue module.
    const FAKE_BINDGEN: &str = r#"#!/bin/sh
input="$1"; shift
while [ $# -gt 0 ]; do
  case "$1" in
    --out-dir) out="$2"; shift ;;
    --out-name) name="$2"; shift ;;
  esac
  shift
done
[ -f "$input" ] || { echo "missing $input" >&2; exit 1; }
mkdir -p "$out"
cp "$input" "$out/${name}_bg.wasm"
echo "export default function init() {}" > "$out/$name.js"
"#;

    fn script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    /// Write a cinder.toml pointing at the fake tools.
    pub fn install(project: &TestProject, extra: &str) {
        let bin = project.path(".tools");
        fs::create_dir_all(&bin).unwrap();
        let cargo = script(&bin, "cargo", FAKE_CARGO);
        let bindgen = script(&bin, "wasm-bindgen", FAKE_BINDGEN);
        project.write(
            "cinder.toml",
            &format!(
                "{extra}\n[toolchain]\ncargo = \"{cargo}\"\nwasm_bindgen = \"{bindgen}\"\n"
            ),
        );
    }
}

// =============================================================================
// cinder list Tests
// =============================================================================

#[test]
fn test_list_nonexistent_root() {
    Command::cargo_bin("cinder")
        .expect("Failed to find cinder binary")
        .args(["--root", "/nonexistent/project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_list_units() {
    let project = TestProject::new();
    project.add_unit("snake", "Classic snake");
    project.add_unit("boids", "Flocking");
    fs::create_dir_all(project.path("crates/.hidden")).unwrap();

    project
        .cinder()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("snake"))
        .stdout(predicate::str::contains("Classic snake"))
        .stdout(predicate::str::is_match("(?s)boids.*snake").unwrap())
        .stdout(predicate::str::contains(".hidden").not());
}

#[test]
fn test_list_empty_project() {
    let project = TestProject::new();

    project
        .cinder()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No units found"));
}

#[test]
fn test_list_glob_patterns() {
    let project = TestProject::new();
    project.add_unit("snake", "Snake");
    project.add_unit("sokoban", "Sokoban");
    project.add_unit("boids", "Boids");
    let nested = project.path("games/arcade/pong");
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        nested.join("Cargo.toml"),
        "[package]\nname = \"pong\"\nversion = \"0.1.0\"\n",
    )
    .unwrap();
    project.write(
        "cinder.toml",
        "crates = [\"crates/s*\", \"./games/**/Cargo.toml\"]\n",
    );

    project
        .cinder()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_match("(?s)snake.*sokoban.*pong").unwrap())
        .stdout(predicate::str::contains("boids").not());
}

#[test]
fn test_invalid_config() {
    let project = TestProject::new();
    project.write("cinder.toml", "unknown_key = true\n");

    project
        .cinder()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_duplicate_unit_names() {
    let project = TestProject::new();
    project.add_unit("snake", "First");
    let second = project.path("games/snake");
    fs::create_dir_all(&second).unwrap();
    fs::write(
        second.join("Cargo.toml"),
        "[package]\nname = \"snake\"\nversion = \"0.2.0\"\ndescription = \"Second\"\n",
    )
    .unwrap();
    project.write("cinder.toml", "crates = [\"crates/*\", \"games/*\"]\n");

    project
        .cinder()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("First"))
        .stdout(predicate::str::contains("Second").not());
}

// =============================================================================
// cinder build Tests
// =============================================================================

#[cfg(unix)]
#[test]
fn test_build_production() {
    let project = TestProject::new();
    let alpha = project.add_unit("alpha", "Alpha");
    project.add_unit("beta", "Beta");
    fs::create_dir_all(alpha.join("assets")).unwrap();
    fs::write(alpha.join("assets/logo.svg"), "<svg/>").unwrap();
    fake_tools::install(&project, "");

    project
        .cinder()
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed"));

    assert_eq!(
        fs::read_to_string(project.path("dist/assets/alpha/logo.svg")).unwrap(),
        "<svg/>"
    );
    assert!(!project.path("dist/assets/beta").exists());
    for name in ["alpha", "beta"] {
        assert!(project.path(&format!("src/wasm_dist/{name}.js")).is_file());
        assert!(project.path(&format!("src/wasm_dist/{name}_bg.wasm")).is_file());
        let entry = fs::read_to_string(project.path(&format!("src/pages/{name}.vue"))).unwrap();
        assert!(entry.contains(&format!("import init from '~/wasm_dist/{name}'")));
    }
}

#[cfg(unix)]
#[test]
fn test_build_failure_is_isolated() {
    let project = TestProject::new();
    project.add_unit("broken", "Does not compile");
    project.add_unit("good", "Compiles");
    fake_tools::install(&project, "jobs = 2");

    project
        .cinder()
        .args(["build", "--dev"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("broken"))
        .stdout(predicate::str::contains("compile failed"));

    assert!(project.path("src/wasm/good.js").is_file());
    assert!(!project.path("src/wasm/broken.js").exists());
}

#[cfg(unix)]
#[test]
fn test_build_skips_fresh_units() {
    let project = TestProject::new();
    project.add_unit("alpha", "Alpha");
    fake_tools::install(&project, "");

    project
        .cinder()
        .args(["build", "--dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no prior artifact"));

    project
        .cinder()
        .args(["build", "--dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));
}

// =============================================================================
// cinder clean Tests
// =============================================================================

#[test]
fn test_clean_removes_outputs() {
    let project = TestProject::new();
    project.write("src/wasm/alpha.js", "");
    project.write("dist/assets/alpha/logo.svg", "");
    project.write("target/keep", "");

    project
        .cinder()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));

    assert!(!project.path("src/wasm").exists());
    assert!(!project.path("dist").exists());
    assert!(project.path("target/keep").exists());

    project
        .cinder()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to clean"));
}
