//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory for test projects and provides
/// utilities for setting up test scenarios.
#[allow(dead_code)]
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Test project with `bld.toml` set to `manifest`
    pub fn with_manifest(manifest: &str) -> Self {
        let project = Self::new();
        project.create_file("bld.toml", manifest);
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Run `bld` in the project directory
    pub fn bld(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_bld"))
            .current_dir(self.path())
            .env_remove("RUST_LOG")
            .env_remove("BLD_REPORTER")
            .args(args)
            .output()
            .expect("Failed to execute bld")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Stdout of a finished command
#[allow(dead_code)]
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr of a finished command
#[allow(dead_code)]
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Project whose artifacts need no external tools
///
/// `gpu` is never available, so `native` and `bindings` are pruned;
/// `core` and `app` have no sources, so building them runs nothing.
#[allow(dead_code)]
pub const MARKER_MANIFEST: &str = r#"
[project]
name = "hat"

[[artifact]]
name = "gpu"
kind = "opt"
available = false

[[artifact]]
name = "cpu"
kind = "opt"
available = true

[[artifact]]
name = "core"
kind = "jar"

[[artifact]]
name = "native"
kind = "jar"
deps = ["core", "gpu"]

[[artifact]]
name = "bindings"
kind = "jar"
deps = ["native"]

[[artifact]]
name = "app"
kind = "jar"
deps = ["core", "cpu"]
"#;

/// Directories the artifacts of [`MARKER_MANIFEST`] resolve to
#[allow(dead_code)]
pub fn marker_project() -> TestProject {
    let project = TestProject::with_manifest(MARKER_MANIFEST);
    for dir in ["core", "native", "bindings", "app"] {
        project.create_dir(dir);
    }
    project
}
