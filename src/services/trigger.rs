//! Trigger configurations: versioned schedule/webhook definitions that
//! launch agent runs, optionally through a referenced prompt.

use crate::models::{
    Checkout, ContentDigest, DeployOptions, DraftSaved, EntityWithRelease, NewEntity, Release,
    SchemaValue, Scope, VersionMode, VersionedEntity, WorkingCopy,
};
use crate::services::prompt::{PromptContent, PromptKind};
use crate::storage::{Storage, VersionedKind};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Where a trigger's run content comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Run a referenced prompt
    #[default]
    Prompt,
    /// Inline template text
    Template,
    /// Inline script
    Script,
}

impl TriggerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerMode::Prompt => "prompt",
            TriggerMode::Template => "template",
            TriggerMode::Script => "script",
        }
    }
}

/// What fires the trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Cron schedule
    #[default]
    Cron,
    /// Inbound webhook call
    Webhook,
    /// Event from a connected app account
    AppEvent,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::Cron => "cron",
            TriggerType::Webhook => "webhook",
            TriggerType::AppEvent => "app_event",
        }
    }
}

/// The content fields of a trigger, shared by releases and working copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerContent {
    #[serde(default)]
    pub mode: TriggerMode,

    /// Inline template text for template mode
    #[serde(default)]
    pub template: String,

    /// Inline script body for script mode
    #[serde(default)]
    pub script: String,

    /// Schema of the payload the trigger passes to the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_schema: Option<SchemaValue>,

    #[serde(default, rename = "type")]
    pub trigger_type: TriggerType,

    /// Cron expression for cron triggers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,

    /// IANA timezone for the cron schedule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Referenced prompt for prompt mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<String>,

    /// Pinned prompt release for fixed prompt version mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_release_id: Option<String>,

    #[serde(default)]
    pub prompt_version_mode: VersionMode,

    /// Pinned agent release for fixed agent version mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_release_id: Option<String>,

    #[serde(default)]
    pub agent_version_mode: VersionMode,

    /// Connected app account for app-event triggers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_account_id: Option<String>,

    /// App events the trigger subscribes to, order-significant
    #[serde(default)]
    pub app_events: Vec<String>,
}

/// Partial update to a trigger's working copy. Omitted fields keep their
/// current values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerPatch {
    pub mode: Option<TriggerMode>,
    pub template: Option<String>,
    pub script: Option<String>,
    pub payload_schema: Option<SchemaValue>,
    pub trigger_type: Option<TriggerType>,
    pub cron: Option<String>,
    pub timezone: Option<String>,
    pub prompt_id: Option<String>,
    pub prompt_release_id: Option<String>,
    pub prompt_version_mode: Option<VersionMode>,
    pub agent_release_id: Option<String>,
    pub agent_version_mode: Option<VersionMode>,
    pub app_account_id: Option<String>,
    pub app_events: Option<Vec<String>>,
}

impl TriggerPatch {
    /// Merge this patch over existing content.
    pub fn apply(self, mut base: TriggerContent) -> TriggerContent {
        if let Some(mode) = self.mode {
            base.mode = mode;
        }
        if let Some(template) = self.template {
            base.template = template;
        }
        if let Some(script) = self.script {
            base.script = script;
        }
        if let Some(schema) = self.payload_schema {
            base.payload_schema = Some(schema);
        }
        if let Some(trigger_type) = self.trigger_type {
            base.trigger_type = trigger_type;
        }
        if let Some(cron) = self.cron {
            base.cron = Some(cron);
        }
        if let Some(timezone) = self.timezone {
            base.timezone = Some(timezone);
        }
        if let Some(prompt_id) = self.prompt_id {
            base.prompt_id = Some(prompt_id);
        }
        if let Some(prompt_release_id) = self.prompt_release_id {
            base.prompt_release_id = Some(prompt_release_id);
        }
        if let Some(mode) = self.prompt_version_mode {
            base.prompt_version_mode = mode;
        }
        if let Some(agent_release_id) = self.agent_release_id {
            base.agent_release_id = Some(agent_release_id);
        }
        if let Some(mode) = self.agent_version_mode {
            base.agent_version_mode = mode;
        }
        if let Some(app_account_id) = self.app_account_id {
            base.app_account_id = Some(app_account_id);
        }
        if let Some(app_events) = self.app_events {
            base.app_events = app_events;
        }
        base
    }
}

/// Marker type binding triggers to the engine.
pub struct TriggerKind;

impl VersionedKind for TriggerKind {
    const KIND: &'static str = "trigger";
    const ID_PREFIX: &'static str = "trg";
    const ENTITY_TABLE: &'static str = "triggers";
    const RELEASE_TABLE: &'static str = "trigger_releases";
    const WORKING_COPY_TABLE: &'static str = "trigger_working_copies";

    type Content = TriggerContent;

    fn content_hash(content: &Self::Content) -> String {
        ContentDigest::new(Self::KIND)
            .text(content.mode.as_str())
            .text(&content.template)
            .text(&content.script)
            .schema(content.payload_schema.as_ref())
            .text(content.trigger_type.as_str())
            .opt_text(content.cron.as_deref())
            .opt_text(content.timezone.as_deref())
            .opt_text(content.prompt_id.as_deref())
            .opt_text(content.prompt_release_id.as_deref())
            .text(match content.prompt_version_mode {
                VersionMode::Current => "current",
                VersionMode::Fixed => "fixed",
            })
            .opt_text(content.agent_release_id.as_deref())
            .text(match content.agent_version_mode {
                VersionMode::Current => "current",
                VersionMode::Fixed => "fixed",
            })
            .opt_text(content.app_account_id.as_deref())
            .text_list(&content.app_events)
            .finish()
    }
}

/// Trigger operations: the engine instantiation plus the trigger-specific
/// deploy preconditions.
pub struct TriggerService;

impl TriggerService {
    pub fn create(
        storage: &mut Storage,
        scope: &Scope,
        new: NewEntity<TriggerContent>,
    ) -> Result<EntityWithRelease<TriggerContent>> {
        storage.create_entity::<TriggerKind>(scope, new)
    }

    pub fn save(
        storage: &mut Storage,
        scope: &Scope,
        trigger_id: &str,
        patch: TriggerPatch,
    ) -> Result<DraftSaved> {
        storage.save_working_copy::<TriggerKind, _>(scope, trigger_id, |base| patch.apply(base))
    }

    /// Validate the working copy and cut a release from it.
    pub fn deploy(
        storage: &mut Storage,
        scope: &Scope,
        trigger_id: &str,
        opts: DeployOptions,
    ) -> Result<Release<TriggerContent>> {
        let trigger = storage.get_entity::<TriggerKind>(scope, trigger_id)?;
        let working = storage.get_working_copy::<TriggerKind>(scope, trigger_id)?;
        Self::validate_for_deploy(storage, scope, &trigger, &working.content)?;
        storage.deploy::<TriggerKind>(scope, trigger_id, opts)
    }

    pub fn adopt(
        storage: &mut Storage,
        scope: &Scope,
        trigger_id: &str,
        release_id: &str,
    ) -> Result<Release<TriggerContent>> {
        storage.adopt::<TriggerKind>(scope, trigger_id, release_id)
    }

    pub fn checkout(
        storage: &mut Storage,
        scope: &Scope,
        trigger_id: &str,
        release_id: &str,
    ) -> Result<Checkout> {
        storage.checkout::<TriggerKind>(scope, trigger_id, release_id)
    }

    pub fn list_releases(
        storage: &Storage,
        scope: &Scope,
        trigger_id: &str,
    ) -> Result<Vec<Release<TriggerContent>>> {
        storage.list_releases::<TriggerKind>(scope, trigger_id)
    }

    pub fn get(storage: &Storage, scope: &Scope, trigger_id: &str) -> Result<VersionedEntity> {
        storage.get_entity::<TriggerKind>(scope, trigger_id)
    }

    pub fn find_by_slug(storage: &Storage, scope: &Scope, slug: &str) -> Result<VersionedEntity> {
        storage.find_by_slug::<TriggerKind>(scope, slug)
    }

    pub fn working_copy(
        storage: &Storage,
        scope: &Scope,
        trigger_id: &str,
    ) -> Result<WorkingCopy<TriggerContent>> {
        storage.get_working_copy::<TriggerKind>(scope, trigger_id)
    }

    pub fn list(storage: &Storage, scope: &Scope) -> Result<Vec<VersionedEntity>> {
        storage.list_entities::<TriggerKind>(scope)
    }

    pub fn delete(storage: &mut Storage, scope: &Scope, trigger_id: &str) -> Result<()> {
        storage.delete_entity::<TriggerKind>(scope, trigger_id)
    }

    /// Resolve the effective release of this trigger for a version mode.
    pub fn resolve(
        storage: &Storage,
        scope: &Scope,
        trigger_id: &str,
        mode: VersionMode,
        pinned_release_id: Option<&str>,
    ) -> Result<Release<TriggerContent>> {
        storage.resolve_release::<TriggerKind>(scope, trigger_id, mode, pinned_release_id)
    }

    /// Resolve the prompt release the trigger's current release will run:
    /// `current` follows the prompt's pointer at execution time, `fixed`
    /// uses the release pinned when the reference was made.
    pub fn resolve_prompt(
        storage: &Storage,
        scope: &Scope,
        trigger_id: &str,
    ) -> Result<Release<PromptContent>> {
        let release =
            storage.resolve_release::<TriggerKind>(scope, trigger_id, VersionMode::Current, None)?;
        let content = release.content;
        let prompt_id = content.prompt_id.as_deref().ok_or_else(|| {
            Error::BadRequest(format!(
                "Trigger does not reference a prompt: {}",
                trigger_id
            ))
        })?;
        storage.resolve_release::<PromptKind>(
            scope,
            prompt_id,
            content.prompt_version_mode,
            content.prompt_release_id.as_deref(),
        )
    }

    /// Deploy preconditions for a trigger's draft content.
    fn validate_for_deploy(
        storage: &Storage,
        scope: &Scope,
        trigger: &VersionedEntity,
        content: &TriggerContent,
    ) -> Result<()> {
        match content.mode {
            TriggerMode::Prompt => {
                if content.prompt_id.is_none() {
                    return Err(Error::Validation(
                        "Prompt mode requires a selected prompt".to_string(),
                    ));
                }
            }
            TriggerMode::Template => {
                if content.template.trim().is_empty() {
                    return Err(Error::Validation(
                        "Template mode requires a non-empty template".to_string(),
                    ));
                }
            }
            TriggerMode::Script => {
                if content.script.trim().is_empty() {
                    return Err(Error::Validation(
                        "Script mode requires a non-empty script".to_string(),
                    ));
                }
            }
        }

        if let Some(prompt_id) = content.prompt_id.as_deref() {
            let prompt = storage.get_entity::<PromptKind>(scope, prompt_id)?;
            if prompt.agent_id != trigger.agent_id {
                return Err(Error::Validation(format!(
                    "Prompt {} belongs to a different agent than trigger {}",
                    prompt_id, trigger.id
                )));
            }

            if content.prompt_version_mode == VersionMode::Fixed {
                let Some(release_id) = content.prompt_release_id.as_deref() else {
                    return Err(Error::Validation(
                        "Fixed prompt version mode requires a pinned release".to_string(),
                    ));
                };
                // A broken pin must not be publishable
                storage.get_release::<PromptKind>(scope, prompt_id, release_id)?;
            }
        }

        Ok(())
    }
}
