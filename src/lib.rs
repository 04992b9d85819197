//! Capstan - a versioned-configuration release engine for AI agent consoles.
//!
//! This library provides the core functionality for the `cap` CLI tool:
//! prompts and triggers with a git-like model of one mutable working copy
//! plus an immutable, semantically versioned release history, with
//! pointer-style current-version switching, rollback, and adoption.

pub mod cli;
pub mod commands;
pub mod models;
pub mod services;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use tempfile::TempDir;

    use crate::models::Scope;
    use crate::storage::Storage;

    /// Test environment with isolated storage using dependency injection.
    pub struct TestEnv {
        /// Isolated data storage directory
        pub data_dir: TempDir,
    }

    impl TestEnv {
        /// Create a new test environment with an isolated data directory.
        pub fn new() -> Self {
            Self {
                data_dir: TempDir::new().unwrap(),
            }
        }

        /// Initialize storage for this test environment.
        pub fn init_storage(&self) -> Storage {
            Storage::init(self.data_dir.path()).unwrap()
        }

        /// Open previously initialized storage.
        pub fn open_storage(&self) -> Storage {
            Storage::open(self.data_dir.path()).unwrap()
        }

        /// A caller scope for the default test organization.
        pub fn scope(&self) -> Scope {
            Scope::new("org-test", "tester")
        }

        /// A caller scope for a different organization.
        pub fn other_scope(&self) -> Scope {
            Scope::new("org-other", "outsider")
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for Capstan operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not initialized: run `cap system init` first")]
    NotInitialized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Version {0} already exists for this entity")]
    DuplicateVersion(String),

    #[error("Slug '{0}' is reserved")]
    ReservedSlug(String),

    #[error("Invalid version: {0} (expected major.minor.patch)")]
    InvalidVersion(String),
}

/// Result type alias for Capstan operations.
pub type Result<T> = std::result::Result<T, Error>;
