//! Storage layer for Capstan data.
//!
//! This module handles persistence of versioned entities (prompts and
//! triggers), their release histories, and their working copies.
//!
//! ## Layout
//!
//! One SQLite database (`console.db`) under the data directory holds three
//! tables per entity kind:
//!
//! - `<kind>s` - the entity rows with the current-release pointer
//! - `<kind>_releases` - append-only release history, unique per
//!   `(entity_id, version)` and `(entity_id, major, minor, patch)`
//! - `<kind>_working_copies` - exactly one mutable draft row per entity
//!
//! Every multi-row transition (create, deploy) is a single transaction, so
//! partial entity/release/working-copy states are never visible.

pub mod engine;

pub use engine::VersionedKind;

use crate::{Error, Result};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Database file name under the data directory.
const DB_FILE: &str = "console.db";

/// Slugs that collide with console routes and can never name an entity.
const RESERVED_SLUGS: &[&str] = &[
    "new", "edit", "delete", "create", "settings", "admin", "api", "current", "draft", "releases",
];

/// Storage manager for one console database.
pub struct Storage {
    /// SQLite connection; also the transaction boundary for the engine
    conn: Connection,
}

impl Storage {
    /// Open existing storage rooted at the given data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let db_path = data_dir.join(DB_FILE);
        if !db_path.exists() {
            return Err(Error::NotInitialized);
        }

        let conn = Connection::open(&db_path)?;
        Self::configure(&conn)?;
        Self::init_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Initialize storage at the given data directory.
    pub fn init(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;
        Self::configure(&conn)?;
        Self::init_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Check if storage exists at the given data directory.
    pub fn exists(data_dir: &Path) -> bool {
        data_dir.join(DB_FILE).exists()
    }

    /// Connection-level pragmas.
    fn configure(conn: &Connection) -> Result<()> {
        // Entity deletion cascades to releases and working copies
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            -- Prompt tables
            CREATE TABLE IF NOT EXISTS prompts (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                current_release_id TEXT,
                created_by TEXT NOT NULL,
                updated_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (org_id, slug)
            );

            CREATE TABLE IF NOT EXISTS prompt_releases (
                id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL,
                version TEXT NOT NULL,
                major INTEGER NOT NULL,
                minor INTEGER NOT NULL,
                patch INTEGER NOT NULL,
                description TEXT,
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                published_at TEXT NOT NULL,
                created_by TEXT NOT NULL,
                UNIQUE (entity_id, version),
                UNIQUE (entity_id, major, minor, patch),
                FOREIGN KEY (entity_id) REFERENCES prompts(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS prompt_working_copies (
                entity_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                updated_by TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (entity_id) REFERENCES prompts(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_prompts_org ON prompts(org_id);
            CREATE INDEX IF NOT EXISTS idx_prompt_releases_entity ON prompt_releases(entity_id);

            -- Trigger tables
            CREATE TABLE IF NOT EXISTS triggers (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                current_release_id TEXT,
                created_by TEXT NOT NULL,
                updated_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (org_id, slug)
            );

            CREATE TABLE IF NOT EXISTS trigger_releases (
                id TEXT PRIMARY KEY,
                entity_id TEXT NOT NULL,
                version TEXT NOT NULL,
                major INTEGER NOT NULL,
                minor INTEGER NOT NULL,
                patch INTEGER NOT NULL,
                description TEXT,
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                published_at TEXT NOT NULL,
                created_by TEXT NOT NULL,
                UNIQUE (entity_id, version),
                UNIQUE (entity_id, major, minor, patch),
                FOREIGN KEY (entity_id) REFERENCES triggers(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS trigger_working_copies (
                entity_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                updated_by TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (entity_id) REFERENCES triggers(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_triggers_org ON triggers(org_id);
            CREATE INDEX IF NOT EXISTS idx_trigger_releases_entity ON trigger_releases(entity_id);
            "#,
        )?;

        Ok(())
    }
}

/// Resolve the data directory from the environment, falling back to the
/// platform data dir (e.g. `~/.local/share/capstan`).
pub fn default_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CAP_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }

    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::BadRequest("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("capstan"))
}

/// Generate a unique ID for an entity or release.
///
/// Format: `<prefix>-<8 hex chars>`
/// - Prompt prefix: "pmt"
/// - Trigger prefix: "trg"
/// - Release prefix: "rel"
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    hasher.update(Uuid::new_v4().as_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..8])
}

/// Derive a slug from free text: lowercase, alphanumeric runs joined by
/// single hyphens, everything else dropped.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Resolve an entity slug: explicit value, else derived from the name,
/// else a random identifier. Reserved words are rejected.
pub fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String> {
    let slug = match explicit {
        Some(raw) => {
            let slug = slugify(raw);
            if slug.is_empty() {
                return Err(Error::BadRequest(format!(
                    "Slug must contain at least one alphanumeric character: {}",
                    raw
                )));
            }
            slug
        }
        None => {
            let slug = slugify(name);
            if slug.is_empty() {
                format!("untitled-{}", &Uuid::new_v4().simple().to_string()[..8])
            } else {
                slug
            }
        }
    };

    if RESERVED_SLUGS.contains(&slug.as_str()) {
        return Err(Error::ReservedSlug(slug));
    }

    Ok(slug)
}
