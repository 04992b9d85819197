//! Generic versioned-entity engine.
//!
//! One implementation of the create / save / deploy / adopt / checkout
//! lifecycle, parameterized over an entity kind. Prompts and triggers share
//! every invariant - monotonic versioning, append-only releases, a single
//! working copy per entity, atomic multi-row transitions - so the engine
//! owns them once and the domain services supply only the content shape
//! and their validation rules.
//!
//! All operations are scoped: reads and writes are filtered to the
//! caller's organization, and anything outside it behaves as absent.

use crate::models::{
    BumpPart, Checkout, DeployOptions, DraftSaved, EntityWithRelease, NewEntity, Release, Scope,
    Version, VersionMode, VersionedEntity, WorkingCopy,
};
use crate::storage::{Storage, generate_id, resolve_slug};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A versioned entity kind: table layout plus content shape.
///
/// Implementations are zero-sized marker types; the engine never holds a
/// value of the kind itself.
pub trait VersionedKind {
    /// Kind name used in error messages and content hashing ("prompt")
    const KIND: &'static str;
    /// Entity ID prefix ("pmt")
    const ID_PREFIX: &'static str;
    /// Entity table name
    const ENTITY_TABLE: &'static str;
    /// Release table name
    const RELEASE_TABLE: &'static str;
    /// Working-copy table name
    const WORKING_COPY_TABLE: &'static str;

    /// The content fields that differ per domain.
    type Content: Clone + Serialize + DeserializeOwned;

    /// Canonical digest of a content value.
    fn content_hash(content: &Self::Content) -> String;
}

const ENTITY_COLS: &str =
    "id, org_id, agent_id, name, slug, current_release_id, created_by, updated_by, created_at, updated_at";
const RELEASE_COLS: &str =
    "id, entity_id, major, minor, patch, description, content, content_hash, published_at, created_by";
const WORKING_COPY_COLS: &str = "entity_id, content, content_hash, updated_by, updated_at";

impl Storage {
    /// Create an entity together with its first release and working copy.
    ///
    /// All four steps - entity insert, release insert, working-copy insert,
    /// pointer update - commit atomically or not at all.
    pub fn create_entity<K: VersionedKind>(
        &mut self,
        scope: &Scope,
        new: NewEntity<K::Content>,
    ) -> Result<EntityWithRelease<K::Content>> {
        let version = match new.version.as_deref() {
            Some(raw) => raw.parse::<Version>()?,
            None => Version::INITIAL,
        };
        let slug = resolve_slug(new.slug.as_deref(), &new.name)?;
        let content_hash = K::content_hash(&new.content);
        let content_json = serde_json::to_string(&new.content)?;
        let now = Utc::now();

        let entity_id = generate_id(K::ID_PREFIX, &format!("{}:{}", scope.org_id, slug));
        let release_id = generate_id("rel", &format!("{}:{}", entity_id, version));

        let tx = self.conn.transaction()?;

        let slug_taken: bool = tx.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE org_id = ?1 AND slug = ?2)",
                K::ENTITY_TABLE
            ),
            params![scope.org_id, slug],
            |row| row.get(0),
        )?;
        if slug_taken {
            return Err(Error::BadRequest(format!(
                "Slug already in use: {}",
                slug
            )));
        }

        tx.execute(
            &format!(
                "INSERT INTO {} (id, org_id, agent_id, name, slug, current_release_id, \
                 created_by, updated_by, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?6, ?7, ?7)",
                K::ENTITY_TABLE
            ),
            params![
                entity_id,
                scope.org_id,
                new.agent_id,
                new.name,
                slug,
                scope.actor,
                now.to_rfc3339(),
            ],
        )?;

        tx.execute(
            &format!(
                "INSERT INTO {} (id, entity_id, version, major, minor, patch, description, \
                 content, content_hash, published_at, created_by) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                K::RELEASE_TABLE
            ),
            params![
                release_id,
                entity_id,
                version.to_string(),
                version.major,
                version.minor,
                version.patch,
                new.description,
                content_json,
                content_hash,
                now.to_rfc3339(),
                scope.actor,
            ],
        )?;

        tx.execute(
            &format!(
                "INSERT INTO {} (entity_id, content, content_hash, updated_by, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                K::WORKING_COPY_TABLE
            ),
            params![
                entity_id,
                content_json,
                content_hash,
                scope.actor,
                now.to_rfc3339()
            ],
        )?;

        tx.execute(
            &format!(
                "UPDATE {} SET current_release_id = ?1 WHERE id = ?2",
                K::ENTITY_TABLE
            ),
            params![release_id, entity_id],
        )?;

        tx.commit()?;

        Ok(EntityWithRelease {
            entity: VersionedEntity {
                id: entity_id.clone(),
                org_id: scope.org_id.clone(),
                agent_id: new.agent_id,
                name: new.name,
                slug,
                current_release_id: Some(release_id.clone()),
                created_by: scope.actor.clone(),
                updated_by: scope.actor.clone(),
                created_at: now,
                updated_at: now,
            },
            release: Release {
                id: release_id,
                entity_id,
                version,
                description: new.description,
                content: new.content,
                content_hash,
                published_at: now,
                created_by: scope.actor.clone(),
            },
        })
    }

    /// Merge a caller-supplied patch into the working copy and save it.
    ///
    /// The patch is applied by the domain service's merge closure, so
    /// fields the caller omitted keep their current values. Saving
    /// identical content twice yields the same content hash; only
    /// `updated_by`/`updated_at` move.
    pub fn save_working_copy<K, F>(
        &mut self,
        scope: &Scope,
        entity_id: &str,
        apply: F,
    ) -> Result<DraftSaved>
    where
        K: VersionedKind,
        F: FnOnce(K::Content) -> K::Content,
    {
        let now = Utc::now();

        let tx = self.conn.transaction()?;
        fetch_entity::<K>(&tx, scope, entity_id)?;
        let working = fetch_working_copy::<K>(&tx, entity_id)?;

        let content = apply(working.content);
        let content_hash = K::content_hash(&content);
        let content_json = serde_json::to_string(&content)?;

        tx.execute(
            &format!(
                "INSERT INTO {} (entity_id, content, content_hash, updated_by, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(entity_id) DO UPDATE SET \
                 content = excluded.content, content_hash = excluded.content_hash, \
                 updated_by = excluded.updated_by, updated_at = excluded.updated_at",
                K::WORKING_COPY_TABLE
            ),
            params![
                entity_id,
                content_json,
                content_hash,
                scope.actor,
                now.to_rfc3339()
            ],
        )?;

        tx.execute(
            &format!(
                "UPDATE {} SET updated_by = ?1, updated_at = ?2 WHERE id = ?3",
                K::ENTITY_TABLE
            ),
            params![scope.actor, now.to_rfc3339(), entity_id],
        )?;

        tx.commit()?;

        Ok(DraftSaved {
            entity_id: entity_id.to_string(),
            content_hash,
        })
    }

    /// Cut a new release from the working copy and move the pointer to it.
    ///
    /// The latest-version read and the release insert share one
    /// transaction; a concurrent deploy of the same number surfaces as
    /// [`Error::DuplicateVersion`] from the uniqueness constraint, and the
    /// caller may retry with a fresh bump.
    pub fn deploy<K: VersionedKind>(
        &mut self,
        scope: &Scope,
        entity_id: &str,
        opts: DeployOptions,
    ) -> Result<Release<K::Content>> {
        if opts.version.is_some() && opts.bump.is_some() {
            return Err(Error::BadRequest(
                "Specify either an explicit version or a bump part, not both".to_string(),
            ));
        }
        let explicit = opts
            .version
            .as_deref()
            .map(str::parse::<Version>)
            .transpose()?;

        let now = Utc::now();

        let tx = self.conn.transaction()?;
        fetch_entity::<K>(&tx, scope, entity_id)?;
        let working = fetch_working_copy::<K>(&tx, entity_id)?;

        let version = match explicit {
            Some(v) => v,
            None => {
                let latest = latest_version::<K>(&tx, entity_id)?;
                Version::bump(latest, opts.bump.unwrap_or(BumpPart::Patch))
            }
        };

        let release_id = generate_id("rel", &format!("{}:{}", entity_id, version));
        let content_json = serde_json::to_string(&working.content)?;

        let inserted = tx.execute(
            &format!(
                "INSERT INTO {} (id, entity_id, version, major, minor, patch, description, \
                 content, content_hash, published_at, created_by) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                K::RELEASE_TABLE
            ),
            params![
                release_id,
                entity_id,
                version.to_string(),
                version.major,
                version.minor,
                version.patch,
                opts.description,
                content_json,
                working.content_hash,
                now.to_rfc3339(),
                scope.actor,
            ],
        );
        if let Err(err) = inserted {
            // The only constraint on this insert is version uniqueness
            if is_constraint_violation(&err) {
                return Err(Error::DuplicateVersion(version.to_string()));
            }
            return Err(err.into());
        }

        tx.execute(
            &format!(
                "UPDATE {} SET current_release_id = ?1, updated_by = ?2, updated_at = ?3 \
                 WHERE id = ?4",
                K::ENTITY_TABLE
            ),
            params![release_id, scope.actor, now.to_rfc3339(), entity_id],
        )?;

        // Content unchanged; the draft is merely marked as touched
        tx.execute(
            &format!(
                "UPDATE {} SET updated_at = ?1 WHERE entity_id = ?2",
                K::WORKING_COPY_TABLE
            ),
            params![now.to_rfc3339(), entity_id],
        )?;

        tx.commit()?;

        Ok(Release {
            id: release_id,
            entity_id: entity_id.to_string(),
            version,
            description: opts.description,
            content: working.content,
            content_hash: working.content_hash,
            published_at: now,
            created_by: scope.actor.clone(),
        })
    }

    /// Repoint the entity's current release without touching any content.
    pub fn adopt<K: VersionedKind>(
        &mut self,
        scope: &Scope,
        entity_id: &str,
        release_id: &str,
    ) -> Result<Release<K::Content>> {
        fetch_entity::<K>(&self.conn, scope, entity_id)?;
        let release = fetch_release::<K>(&self.conn, scope, entity_id, release_id)?;

        self.conn.execute(
            &format!(
                "UPDATE {} SET current_release_id = ?1, updated_by = ?2, updated_at = ?3 \
                 WHERE id = ?4",
                K::ENTITY_TABLE
            ),
            params![
                release.id,
                scope.actor,
                Utc::now().to_rfc3339(),
                entity_id
            ],
        )?;

        Ok(release)
    }

    /// Overwrite the working copy from a past release.
    ///
    /// Discards any unsaved draft edits; callers confirm before invoking.
    pub fn checkout<K: VersionedKind>(
        &mut self,
        scope: &Scope,
        entity_id: &str,
        release_id: &str,
    ) -> Result<Checkout> {
        fetch_entity::<K>(&self.conn, scope, entity_id)?;
        let release = fetch_release::<K>(&self.conn, scope, entity_id, release_id)?;

        let content_json = serde_json::to_string(&release.content)?;
        self.conn.execute(
            &format!(
                "INSERT INTO {} (entity_id, content, content_hash, updated_by, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(entity_id) DO UPDATE SET \
                 content = excluded.content, content_hash = excluded.content_hash, \
                 updated_by = excluded.updated_by, updated_at = excluded.updated_at",
                K::WORKING_COPY_TABLE
            ),
            params![
                entity_id,
                content_json,
                release.content_hash,
                scope.actor,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(Checkout {
            entity_id: entity_id.to_string(),
            release_id: release.id,
        })
    }

    /// List an entity's releases, newest version first.
    pub fn list_releases<K: VersionedKind>(
        &self,
        scope: &Scope,
        entity_id: &str,
    ) -> Result<Vec<Release<K::Content>>> {
        fetch_entity::<K>(&self.conn, scope, entity_id)?;

        let sql = format!(
            "SELECT {} FROM {} WHERE entity_id = ?1 \
             ORDER BY major DESC, minor DESC, patch DESC, published_at DESC",
            RELEASE_COLS,
            K::RELEASE_TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let releases = stmt
            .query_map([entity_id], release_from_row::<K::Content>)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(releases)
    }

    /// Get an entity by ID within the caller's organization.
    pub fn get_entity<K: VersionedKind>(
        &self,
        scope: &Scope,
        entity_id: &str,
    ) -> Result<VersionedEntity> {
        fetch_entity::<K>(&self.conn, scope, entity_id)
    }

    /// Get an entity by slug within the caller's organization.
    pub fn find_by_slug<K: VersionedKind>(
        &self,
        scope: &Scope,
        slug: &str,
    ) -> Result<VersionedEntity> {
        let sql = format!(
            "SELECT {} FROM {} WHERE slug = ?1 AND org_id = ?2",
            ENTITY_COLS,
            K::ENTITY_TABLE
        );
        self.conn
            .query_row(&sql, params![slug, scope.org_id], entity_from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("{} not found: {}", K::KIND, slug)))
    }

    /// Get one release of an entity.
    pub fn get_release<K: VersionedKind>(
        &self,
        scope: &Scope,
        entity_id: &str,
        release_id: &str,
    ) -> Result<Release<K::Content>> {
        fetch_release::<K>(&self.conn, scope, entity_id, release_id)
    }

    /// Get an entity's working copy.
    pub fn get_working_copy<K: VersionedKind>(
        &self,
        scope: &Scope,
        entity_id: &str,
    ) -> Result<WorkingCopy<K::Content>> {
        fetch_entity::<K>(&self.conn, scope, entity_id)?;
        fetch_working_copy::<K>(&self.conn, entity_id)
    }

    /// List all entities of a kind in the caller's organization.
    pub fn list_entities<K: VersionedKind>(&self, scope: &Scope) -> Result<Vec<VersionedEntity>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE org_id = ?1 ORDER BY created_at DESC",
            ENTITY_COLS,
            K::ENTITY_TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let entities = stmt
            .query_map([&scope.org_id], entity_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entities)
    }

    /// Delete an entity; releases and the working copy cascade.
    pub fn delete_entity<K: VersionedKind>(&mut self, scope: &Scope, entity_id: &str) -> Result<()> {
        fetch_entity::<K>(&self.conn, scope, entity_id)?;
        self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", K::ENTITY_TABLE),
            [entity_id],
        )?;
        Ok(())
    }

    /// Resolve the effective release for a version mode.
    ///
    /// `Current` follows the entity's pointer at call time; `Fixed` uses
    /// the pinned release id captured at reference time.
    pub fn resolve_release<K: VersionedKind>(
        &self,
        scope: &Scope,
        entity_id: &str,
        mode: VersionMode,
        pinned_release_id: Option<&str>,
    ) -> Result<Release<K::Content>> {
        let entity = fetch_entity::<K>(&self.conn, scope, entity_id)?;
        let release_id = match mode {
            VersionMode::Current => entity.current_release_id.ok_or_else(|| {
                Error::NotFound(format!("{} has no current release: {}", K::KIND, entity_id))
            })?,
            VersionMode::Fixed => pinned_release_id
                .ok_or_else(|| {
                    Error::BadRequest(
                        "Fixed version mode requires a pinned release id".to_string(),
                    )
                })?
                .to_string(),
        };
        fetch_release::<K>(&self.conn, scope, entity_id, &release_id)
    }
}

// === Row mapping and scoped fetch helpers ===

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn json_col<C: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<C> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn entity_from_row(row: &Row<'_>) -> rusqlite::Result<VersionedEntity> {
    Ok(VersionedEntity {
        id: row.get(0)?,
        org_id: row.get(1)?,
        agent_id: row.get(2)?,
        name: row.get(3)?,
        slug: row.get(4)?,
        current_release_id: row.get(5)?,
        created_by: row.get(6)?,
        updated_by: row.get(7)?,
        created_at: ts_col(row, 8)?,
        updated_at: ts_col(row, 9)?,
    })
}

fn release_from_row<C: DeserializeOwned>(row: &Row<'_>) -> rusqlite::Result<Release<C>> {
    Ok(Release {
        id: row.get(0)?,
        entity_id: row.get(1)?,
        version: Version {
            major: row.get(2)?,
            minor: row.get(3)?,
            patch: row.get(4)?,
        },
        description: row.get(5)?,
        content: json_col(row, 6)?,
        content_hash: row.get(7)?,
        published_at: ts_col(row, 8)?,
        created_by: row.get(9)?,
    })
}

fn working_copy_from_row<C: DeserializeOwned>(row: &Row<'_>) -> rusqlite::Result<WorkingCopy<C>> {
    Ok(WorkingCopy {
        entity_id: row.get(0)?,
        content: json_col(row, 1)?,
        content_hash: row.get(2)?,
        updated_by: row.get(3)?,
        updated_at: ts_col(row, 4)?,
    })
}

fn fetch_entity<K: VersionedKind>(
    conn: &Connection,
    scope: &Scope,
    entity_id: &str,
) -> Result<VersionedEntity> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1 AND org_id = ?2",
        ENTITY_COLS,
        K::ENTITY_TABLE
    );
    conn.query_row(&sql, params![entity_id, scope.org_id], entity_from_row)
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("{} not found: {}", K::KIND, entity_id)))
}

fn fetch_release<K: VersionedKind>(
    conn: &Connection,
    scope: &Scope,
    entity_id: &str,
    release_id: &str,
) -> Result<Release<K::Content>> {
    let cols: String = RELEASE_COLS
        .split(", ")
        .map(|c| format!("r.{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {} FROM {} r JOIN {} e ON e.id = r.entity_id \
         WHERE r.id = ?1 AND r.entity_id = ?2 AND e.org_id = ?3",
        cols,
        K::RELEASE_TABLE,
        K::ENTITY_TABLE
    );
    conn.query_row(
        &sql,
        params![release_id, entity_id, scope.org_id],
        release_from_row::<K::Content>,
    )
    .optional()?
    .ok_or_else(|| {
        Error::NotFound(format!(
            "Release not found for {} {}: {}",
            K::KIND,
            entity_id,
            release_id
        ))
    })
}

fn fetch_working_copy<K: VersionedKind>(
    conn: &Connection,
    entity_id: &str,
) -> Result<WorkingCopy<K::Content>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE entity_id = ?1",
        WORKING_COPY_COLS,
        K::WORKING_COPY_TABLE
    );
    conn.query_row(&sql, [entity_id], working_copy_from_row::<K::Content>)
        .optional()?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "Working copy missing for {}: {}",
                K::KIND,
                entity_id
            ))
        })
}

fn latest_version<K: VersionedKind>(
    conn: &Connection,
    entity_id: &str,
) -> Result<Option<Version>> {
    let sql = format!(
        "SELECT major, minor, patch FROM {} WHERE entity_id = ?1 \
         ORDER BY major DESC, minor DESC, patch DESC LIMIT 1",
        K::RELEASE_TABLE
    );
    let latest = conn
        .query_row(&sql, [entity_id], |row| {
            Ok(Version {
                major: row.get(0)?,
                minor: row.get(1)?,
                patch: row.get(2)?,
            })
        })
        .optional()?;
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::prompt::{PromptContent, PromptKind};
    use crate::test_utils::TestEnv;

    fn new_prompt(name: &str) -> NewEntity<PromptContent> {
        NewEntity {
            agent_id: "agt-1".to_string(),
            name: name.to_string(),
            slug: None,
            version: None,
            description: None,
            content: PromptContent {
                content: "Hello".to_string(),
                ..Default::default()
            },
        }
    }

    fn deploy_version(version: &str) -> DeployOptions {
        DeployOptions {
            version: Some(version.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_deploy_rejects_version_and_bump_together() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();

        let created = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap();
        let before = storage
            .list_releases::<PromptKind>(&scope, &created.entity.id)
            .unwrap();

        let err = storage
            .deploy::<PromptKind>(
                &scope,
                &created.entity.id,
                DeployOptions {
                    version: Some("0.1.0".to_string()),
                    bump: Some(BumpPart::Patch),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));

        // Nothing touched storage
        let after = storage
            .list_releases::<PromptKind>(&scope, &created.entity.id)
            .unwrap();
        assert_eq!(before.len(), after.len());
    }

    #[test]
    fn test_duplicate_version_fails_and_pointer_unchanged() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();

        let created = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap();
        let second = storage
            .deploy::<PromptKind>(&scope, &created.entity.id, deploy_version("0.1.0"))
            .unwrap();

        let err = storage
            .deploy::<PromptKind>(&scope, &created.entity.id, deploy_version("0.1.0"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateVersion(v) if v == "0.1.0"));

        // Failed deploy left no release and did not move the pointer
        let entity = storage.get_entity::<PromptKind>(&scope, &created.entity.id).unwrap();
        assert_eq!(entity.current_release_id.as_deref(), Some(second.id.as_str()));
        let releases = storage
            .list_releases::<PromptKind>(&scope, &created.entity.id)
            .unwrap();
        assert_eq!(releases.len(), 2);
    }

    #[test]
    fn test_duplicate_in_string_form_only() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();

        let created = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap();
        // 0.0.1 already exists from create
        let err = storage
            .deploy::<PromptKind>(&scope, &created.entity.id, deploy_version("0.0.1"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateVersion(_)));
    }

    #[test]
    fn test_default_deploy_is_patch_bump_of_latest() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();

        let created = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap();
        storage
            .deploy::<PromptKind>(&scope, &created.entity.id, deploy_version("2.0.0"))
            .unwrap();

        // Latest is by version order, not publish order
        let release = storage
            .deploy::<PromptKind>(&scope, &created.entity.id, DeployOptions::default())
            .unwrap();
        assert_eq!(release.version.to_string(), "2.0.1");
    }

    #[test]
    fn test_idempotent_save_keeps_hash() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();

        let created = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap();

        let patch = |c: PromptContent| PromptContent {
            content: "Same text".to_string(),
            ..c
        };
        let first = storage
            .save_working_copy::<PromptKind, _>(&scope, &created.entity.id, patch)
            .unwrap();
        let second = storage
            .save_working_copy::<PromptKind, _>(&scope, &created.entity.id, patch)
            .unwrap();
        assert_eq!(first.content_hash, second.content_hash);
    }

    #[test]
    fn test_adopt_moves_pointer_without_touching_draft() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();

        let created = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap();
        let first_release = created.release;
        storage
            .deploy::<PromptKind>(&scope, &created.entity.id, deploy_version("0.1.0"))
            .unwrap();

        // Unsaved-style draft edit
        storage
            .save_working_copy::<PromptKind, _>(&scope, &created.entity.id, |c| PromptContent {
                content: "Draft in progress".to_string(),
                ..c
            })
            .unwrap();

        let adopted = storage
            .adopt::<PromptKind>(&scope, &created.entity.id, &first_release.id)
            .unwrap();
        assert_eq!(adopted.id, first_release.id);

        let entity = storage.get_entity::<PromptKind>(&scope, &created.entity.id).unwrap();
        assert_eq!(entity.current_release_id.as_deref(), Some(first_release.id.as_str()));

        // No new release, draft untouched
        let releases = storage
            .list_releases::<PromptKind>(&scope, &created.entity.id)
            .unwrap();
        assert_eq!(releases.len(), 2);
        let working = storage
            .get_working_copy::<PromptKind>(&scope, &created.entity.id)
            .unwrap();
        assert_eq!(working.content.content, "Draft in progress");
    }

    #[test]
    fn test_checkout_overwrites_draft_from_release() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();

        let created = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap();
        storage
            .save_working_copy::<PromptKind, _>(&scope, &created.entity.id, |c| PromptContent {
                content: "Discard me".to_string(),
                ..c
            })
            .unwrap();

        let result = storage
            .checkout::<PromptKind>(&scope, &created.entity.id, &created.release.id)
            .unwrap();
        assert_eq!(result.release_id, created.release.id);

        let working = storage
            .get_working_copy::<PromptKind>(&scope, &created.entity.id)
            .unwrap();
        assert_eq!(working.content, created.release.content);
        assert_eq!(working.content_hash, created.release.content_hash);
    }

    #[test]
    fn test_list_releases_ordered_by_version_desc() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();

        let created = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap();
        // Published out of version order
        storage
            .deploy::<PromptKind>(&scope, &created.entity.id, deploy_version("1.0.0"))
            .unwrap();
        storage
            .deploy::<PromptKind>(&scope, &created.entity.id, deploy_version("0.2.0"))
            .unwrap();

        let releases = storage
            .list_releases::<PromptKind>(&scope, &created.entity.id)
            .unwrap();
        let versions: Vec<String> = releases.iter().map(|r| r.version.to_string()).collect();
        assert_eq!(versions, vec!["1.0.0", "0.2.0", "0.0.1"]);
    }

    #[test]
    fn test_org_scope_isolation() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();
        let other = env.other_scope();

        let created = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap();

        assert!(matches!(
            storage.get_entity::<PromptKind>(&other, &created.entity.id),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            storage.deploy::<PromptKind>(&other, &created.entity.id, DeployOptions::default()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            storage.adopt::<PromptKind>(&other, &created.entity.id, &created.release.id),
            Err(Error::NotFound(_))
        ));

        // Same slug is free in the other organization
        storage
            .create_entity::<PromptKind>(&other, new_prompt("Welcome"))
            .unwrap();
    }

    #[test]
    fn test_release_from_other_entity_not_adoptable() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();

        let a = storage
            .create_entity::<PromptKind>(&scope, new_prompt("First"))
            .unwrap();
        let b = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Second"))
            .unwrap();

        assert!(matches!(
            storage.adopt::<PromptKind>(&scope, &a.entity.id, &b.release.id),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            storage.checkout::<PromptKind>(&scope, &a.entity.id, &b.release.id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_slug_collision_within_org() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();

        storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap();
        let err = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));

        // The failed create left no entity behind
        assert_eq!(storage.list_entities::<PromptKind>(&scope).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_cascades_to_releases_and_working_copy() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();

        let created = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap();
        storage
            .deploy::<PromptKind>(&scope, &created.entity.id, DeployOptions::default())
            .unwrap();

        storage
            .delete_entity::<PromptKind>(&scope, &created.entity.id)
            .unwrap();

        assert!(matches!(
            storage.get_entity::<PromptKind>(&scope, &created.entity.id),
            Err(Error::NotFound(_))
        ));

        // Orphan rows are gone
        let releases: i64 = storage
            .conn
            .query_row(
                "SELECT COUNT(*) FROM prompt_releases WHERE entity_id = ?1",
                [&created.entity.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(releases, 0);
        let drafts: i64 = storage
            .conn
            .query_row(
                "SELECT COUNT(*) FROM prompt_working_copies WHERE entity_id = ?1",
                [&created.entity.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(drafts, 0);
    }

    #[test]
    fn test_deploy_uses_draft_hash() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let scope = env.scope();

        let created = storage
            .create_entity::<PromptKind>(&scope, new_prompt("Welcome"))
            .unwrap();
        let saved = storage
            .save_working_copy::<PromptKind, _>(&scope, &created.entity.id, |c| PromptContent {
                content: "Edited".to_string(),
                ..c
            })
            .unwrap();

        let release = storage
            .deploy::<PromptKind>(&scope, &created.entity.id, DeployOptions::default())
            .unwrap();
        assert_eq!(release.content_hash, saved.content_hash);
        assert_ne!(release.content_hash, created.release.content_hash);
    }
}
