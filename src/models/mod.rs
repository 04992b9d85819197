//! Data models for Capstan entities.
//!
//! This module defines the core data structures:
//! - `Version` / `BumpPart` - semantic version numbering for releases
//! - `SchemaValue` - typed schema documents with canonical hashing form
//! - `ContentDigest` - content fingerprinting
//! - `VersionedEntity` / `Release` / `WorkingCopy` - the git-like trio of
//!   record, immutable history, and mutable draft

pub mod hash;
pub mod schema;
pub mod version;

pub use hash::ContentDigest;
pub use schema::SchemaValue;
pub use version::{BumpPart, Version};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-request caller scope.
///
/// Every storage operation is filtered to one organization and attributed
/// to one acting user. Callers construct the scope once per request and
/// pass it down; there is no ambient principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Owning organization; all reads and writes are confined to it
    pub org_id: String,
    /// Acting user recorded in audit fields
    pub actor: String,
}

impl Scope {
    pub fn new(org_id: impl Into<String>, actor: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            actor: actor.into(),
        }
    }
}

/// How a reference to a versioned entity resolves at execution time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionMode {
    /// Always the entity's current release at the moment of execution
    #[default]
    Current,
    /// Pinned to one specific release captured at reference time
    Fixed,
}

/// A versioned entity record (a Prompt or a Trigger).
///
/// The entity row itself carries identity and the current-release pointer;
/// content lives in the release history and the working copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedEntity {
    /// Unique identifier (e.g., "pmt-1a2b3c4d")
    pub id: String,

    /// Owning organization
    pub org_id: String,

    /// The agent this entity belongs to
    pub agent_id: String,

    /// Human-readable name
    pub name: String,

    /// Organization-unique URL slug
    pub slug: String,

    /// Pointer to the current release. `None` only transiently while the
    /// creation transaction is in flight; never observable as `None`
    /// through the public API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_release_id: Option<String>,

    /// User who created the entity
    pub created_by: String,

    /// User who last touched the entity
    pub updated_by: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// An immutable, versioned snapshot of an entity's content.
///
/// Releases are append-only: the engine has no update or delete path for
/// them, and they are removed only when the owning entity is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release<C> {
    /// Unique identifier (e.g., "rel-1a2b3c4d")
    pub id: String,

    /// Owning entity
    pub entity_id: String,

    /// Semantic version, unique per entity
    pub version: Version,

    /// Free-text release description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Full content snapshot at publish time
    pub content: C,

    /// Canonical digest of `content`
    pub content_hash: String,

    /// Publish timestamp
    pub published_at: DateTime<Utc>,

    /// User who cut the release
    pub created_by: String,
}

/// The mutable draft content of an entity.
///
/// Exactly one working copy exists per entity, created with it and kept
/// for its whole lifetime. Saves are last-writer-wins upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingCopy<C> {
    /// Owning entity (also the storage key)
    pub entity_id: String,

    /// Draft content
    pub content: C,

    /// Canonical digest of `content`
    pub content_hash: String,

    /// User who last saved the draft
    pub updated_by: String,

    /// Last save timestamp
    pub updated_at: DateTime<Utc>,
}

/// An entity joined with its current release, the return shape of create
/// and the convenience read path for callers that want both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityWithRelease<C> {
    #[serde(flatten)]
    pub entity: VersionedEntity,
    pub release: Release<C>,
}

/// Parameters for creating an entity.
#[derive(Debug, Clone)]
pub struct NewEntity<C> {
    /// The agent the entity belongs to
    pub agent_id: String,
    /// Human-readable name
    pub name: String,
    /// Explicit slug; derived from the name when omitted
    pub slug: Option<String>,
    /// Explicit initial version; defaults to 0.0.1
    pub version: Option<String>,
    /// Description recorded on the first release
    pub description: Option<String>,
    /// Initial content, shared by the first release and the working copy
    pub content: C,
}

/// Parameters for cutting a release from the working copy.
///
/// At most one of `version` and `bump` may be set; with neither, the
/// engine patch-bumps the latest release.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub version: Option<String>,
    pub bump: Option<BumpPart>,
    pub description: Option<String>,
}

/// Result of a working-copy save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSaved {
    pub entity_id: String,
    pub content_hash: String,
}

/// Result of a checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkout {
    pub entity_id: String,
    pub release_id: String,
}
