//! Prompt configurations: versioned template or script content.

use crate::models::{
    Checkout, ContentDigest, DeployOptions, DraftSaved, EntityWithRelease, NewEntity, Release,
    SchemaValue, Scope, VersionMode, VersionedEntity, WorkingCopy,
};
use crate::storage::{Storage, VersionedKind};
use crate::Result;
use serde::{Deserialize, Serialize};

/// How a prompt produces its text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// Static template text with placeholder substitution
    #[default]
    Template,
    /// Script that computes the prompt text
    Script,
}

impl PromptMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptMode::Template => "template",
            PromptMode::Script => "script",
        }
    }
}

/// The content fields of a prompt, shared by releases and working copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptContent {
    #[serde(default)]
    pub mode: PromptMode,

    /// Template text; blank is permitted
    #[serde(default)]
    pub content: String,

    /// Script body for script mode
    #[serde(default)]
    pub script: String,

    /// Schema of the inputs the prompt accepts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<SchemaValue>,
}

/// Partial update to a prompt's working copy. Omitted fields keep their
/// current values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptPatch {
    pub mode: Option<PromptMode>,
    pub content: Option<String>,
    pub script: Option<String>,
    pub input_schema: Option<SchemaValue>,
}

impl PromptPatch {
    /// Merge this patch over existing content.
    pub fn apply(self, mut base: PromptContent) -> PromptContent {
        if let Some(mode) = self.mode {
            base.mode = mode;
        }
        if let Some(content) = self.content {
            base.content = content;
        }
        if let Some(script) = self.script {
            base.script = script;
        }
        if let Some(schema) = self.input_schema {
            base.input_schema = Some(schema);
        }
        base
    }
}

/// Marker type binding prompts to the engine.
pub struct PromptKind;

impl VersionedKind for PromptKind {
    const KIND: &'static str = "prompt";
    const ID_PREFIX: &'static str = "pmt";
    const ENTITY_TABLE: &'static str = "prompts";
    const RELEASE_TABLE: &'static str = "prompt_releases";
    const WORKING_COPY_TABLE: &'static str = "prompt_working_copies";

    type Content = PromptContent;

    fn content_hash(content: &Self::Content) -> String {
        ContentDigest::new(Self::KIND)
            .text(content.mode.as_str())
            .text(&content.content)
            .text(&content.script)
            .schema(content.input_schema.as_ref())
            .finish()
    }
}

/// Prompt operations. Thin instantiation of the engine; prompts have no
/// content preconditions on deploy (blank templates are allowed).
pub struct PromptService;

impl PromptService {
    pub fn create(
        storage: &mut Storage,
        scope: &Scope,
        new: NewEntity<PromptContent>,
    ) -> Result<EntityWithRelease<PromptContent>> {
        storage.create_entity::<PromptKind>(scope, new)
    }

    pub fn save(
        storage: &mut Storage,
        scope: &Scope,
        prompt_id: &str,
        patch: PromptPatch,
    ) -> Result<DraftSaved> {
        storage.save_working_copy::<PromptKind, _>(scope, prompt_id, |base| patch.apply(base))
    }

    pub fn deploy(
        storage: &mut Storage,
        scope: &Scope,
        prompt_id: &str,
        opts: DeployOptions,
    ) -> Result<Release<PromptContent>> {
        storage.deploy::<PromptKind>(scope, prompt_id, opts)
    }

    pub fn adopt(
        storage: &mut Storage,
        scope: &Scope,
        prompt_id: &str,
        release_id: &str,
    ) -> Result<Release<PromptContent>> {
        storage.adopt::<PromptKind>(scope, prompt_id, release_id)
    }

    pub fn checkout(
        storage: &mut Storage,
        scope: &Scope,
        prompt_id: &str,
        release_id: &str,
    ) -> Result<Checkout> {
        storage.checkout::<PromptKind>(scope, prompt_id, release_id)
    }

    pub fn list_releases(
        storage: &Storage,
        scope: &Scope,
        prompt_id: &str,
    ) -> Result<Vec<Release<PromptContent>>> {
        storage.list_releases::<PromptKind>(scope, prompt_id)
    }

    pub fn get(storage: &Storage, scope: &Scope, prompt_id: &str) -> Result<VersionedEntity> {
        storage.get_entity::<PromptKind>(scope, prompt_id)
    }

    pub fn find_by_slug(storage: &Storage, scope: &Scope, slug: &str) -> Result<VersionedEntity> {
        storage.find_by_slug::<PromptKind>(scope, slug)
    }

    pub fn working_copy(
        storage: &Storage,
        scope: &Scope,
        prompt_id: &str,
    ) -> Result<WorkingCopy<PromptContent>> {
        storage.get_working_copy::<PromptKind>(scope, prompt_id)
    }

    pub fn list(storage: &Storage, scope: &Scope) -> Result<Vec<VersionedEntity>> {
        storage.list_entities::<PromptKind>(scope)
    }

    pub fn delete(storage: &mut Storage, scope: &Scope, prompt_id: &str) -> Result<()> {
        storage.delete_entity::<PromptKind>(scope, prompt_id)
    }

    /// Resolve the effective release for a version mode: `current` follows
    /// the prompt's pointer at call time, `fixed` pins one release.
    pub fn resolve(
        storage: &Storage,
        scope: &Scope,
        prompt_id: &str,
        mode: VersionMode,
        pinned_release_id: Option<&str>,
    ) -> Result<Release<PromptContent>> {
        storage.resolve_release::<PromptKind>(scope, prompt_id, mode, pinned_release_id)
    }
}
