//! Common test utilities for capstan integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/capstan/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// The `cap()` method returns a `Command` that sets `CAP_DATA_DIR` (and a
/// fixed org/actor) per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an isolated data directory.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize the console database.
    pub fn init() -> Self {
        let env = Self::new();
        env.cap().args(["system", "init"]).assert().success();
        env
    }

    /// Get a Command for the cap binary with an isolated data directory.
    pub fn cap(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cap"));
        cmd.env("CAP_DATA_DIR", self.data_dir.path());
        cmd.env("CAP_ORG", "org-test");
        cmd.env("CAP_ACTOR", "tester");
        cmd
    }

    /// Run a cap command and parse its JSON stdout.
    pub fn cap_json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.cap().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
