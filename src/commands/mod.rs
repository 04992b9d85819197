//! Command implementations for the Capstan CLI.
//!
//! Each handler validates and converts CLI input, invokes the prompt or
//! trigger service, and returns an [`Output`] that renders as JSON (the
//! default) or human-readable text (`-H`).

use crate::cli::{Commands, PromptCommands, SystemCommands, TriggerCommands};
use crate::models::{
    BumpPart, DeployOptions, NewEntity, Release, SchemaValue, Scope, VersionMode, VersionedEntity,
};
use crate::services::{
    PromptContent, PromptMode, PromptPatch, PromptService, TriggerContent, TriggerMode,
    TriggerPatch, TriggerService, TriggerType,
};
use crate::storage::Storage;
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;

/// A command result, renderable as JSON or human text.
pub struct Output {
    json: serde_json::Value,
    human: String,
}

impl Output {
    fn new<T: Serialize>(value: &T, human: String) -> Result<Self> {
        Ok(Self {
            json: serde_json::to_value(value)?,
            human,
        })
    }

    /// Print to stdout in the requested format.
    pub fn print(&self, human: bool) {
        if human {
            println!("{}", self.human);
        } else {
            println!("{}", self.json);
        }
    }
}

/// Dispatch a parsed command.
pub fn run(command: Commands, data_dir: &Path, scope: &Scope) -> Result<Output> {
    match command {
        Commands::System { command } => system(command, data_dir),
        Commands::Prompt { command } => {
            let mut storage = Storage::open(data_dir)?;
            prompt(&mut storage, scope, command)
        }
        Commands::Trigger { command } => {
            let mut storage = Storage::open(data_dir)?;
            trigger(&mut storage, scope, command)
        }
    }
}

fn system(command: SystemCommands, data_dir: &Path) -> Result<Output> {
    match command {
        SystemCommands::Init => {
            Storage::init(data_dir)?;
            Output::new(
                &serde_json::json!({ "initialized": true, "data_dir": data_dir }),
                format!("Initialized console database at {}", data_dir.display()),
            )
        }
        SystemCommands::Info => {
            let initialized = Storage::exists(data_dir);
            Output::new(
                &serde_json::json!({
                    "data_dir": data_dir,
                    "initialized": initialized,
                    "build_timestamp": env!("CAP_BUILD_TIMESTAMP"),
                    "git_commit": env!("CAP_GIT_COMMIT"),
                }),
                format!(
                    "Data dir: {}\nInitialized: {}\nBuild: {} ({})",
                    data_dir.display(),
                    initialized,
                    env!("CAP_BUILD_TIMESTAMP"),
                    env!("CAP_GIT_COMMIT"),
                ),
            )
        }
    }
}

fn prompt(storage: &mut Storage, scope: &Scope, command: PromptCommands) -> Result<Output> {
    match command {
        PromptCommands::Create {
            name,
            agent,
            slug,
            version,
            description,
            mode,
            content,
            script,
            input_schema,
        } => {
            let created = PromptService::create(
                storage,
                scope,
                NewEntity {
                    agent_id: agent,
                    name,
                    slug,
                    version,
                    description,
                    content: PromptContent {
                        mode: mode.as_deref().map(parse_prompt_mode).transpose()?.unwrap_or_default(),
                        content: content.unwrap_or_default(),
                        script: script.unwrap_or_default(),
                        input_schema: input_schema.as_deref().map(parse_schema).transpose()?,
                    },
                },
            )?;
            let human = format!(
                "Created prompt {} ({}) at version {}",
                created.entity.id, created.entity.slug, created.release.version
            );
            Output::new(&created, human)
        }

        PromptCommands::Save {
            id,
            mode,
            content,
            script,
            input_schema,
        } => {
            let patch = PromptPatch {
                mode: mode.as_deref().map(parse_prompt_mode).transpose()?,
                content,
                script,
                input_schema: input_schema.as_deref().map(parse_schema).transpose()?,
            };
            let saved = PromptService::save(storage, scope, &id, patch)?;
            let human = format!(
                "Saved working copy of {} (hash {})",
                saved.entity_id,
                &saved.content_hash[..12]
            );
            Output::new(&saved, human)
        }

        PromptCommands::Deploy {
            id,
            version,
            bump,
            description,
        } => {
            let release =
                PromptService::deploy(storage, scope, &id, deploy_options(version, bump, description)?)?;
            let human = format!("Deployed {} version {} ({})", id, release.version, release.id);
            Output::new(&release, human)
        }

        PromptCommands::Adopt { id, release_id } => {
            let release = PromptService::adopt(storage, scope, &id, &release_id)?;
            let human = format!("{} now points at release {} ({})", id, release.id, release.version);
            Output::new(&release, human)
        }

        PromptCommands::Checkout { id, release_id } => {
            let result = PromptService::checkout(storage, scope, &id, &release_id)?;
            let human = format!(
                "Checked out release {} into the working copy of {}",
                result.release_id, result.entity_id
            );
            Output::new(&result, human)
        }

        PromptCommands::Releases { id } => {
            let releases = PromptService::list_releases(storage, scope, &id)?;
            let human = render_releases(&releases);
            Output::new(&releases, human)
        }

        PromptCommands::Show { id } => {
            let entity = resolve_prompt_ref(storage, scope, &id)?;
            let working = PromptService::working_copy(storage, scope, &entity.id)?;
            let human = format!(
                "{} ({})\n  name: {}\n  agent: {}\n  current release: {}\n  draft hash: {}",
                entity.id,
                entity.slug,
                entity.name,
                entity.agent_id,
                entity.current_release_id.as_deref().unwrap_or("-"),
                &working.content_hash[..12],
            );
            Output::new(
                &serde_json::json!({ "entity": entity, "working_copy": working }),
                human,
            )
        }

        PromptCommands::List => {
            let entities = PromptService::list(storage, scope)?;
            let human = render_entities(&entities);
            Output::new(&entities, human)
        }

        PromptCommands::Rm { id } => {
            PromptService::delete(storage, scope, &id)?;
            Output::new(
                &serde_json::json!({ "deleted": id }),
                format!("Deleted prompt {}", id),
            )
        }

        PromptCommands::Resolve { id, mode, release } => {
            let release = PromptService::resolve(
                storage,
                scope,
                &id,
                parse_version_mode(&mode)?,
                release.as_deref(),
            )?;
            let human = format!("{} resolves to {} ({})", id, release.version, release.id);
            Output::new(&release, human)
        }
    }
}

fn trigger(storage: &mut Storage, scope: &Scope, command: TriggerCommands) -> Result<Output> {
    match command {
        TriggerCommands::Create {
            name,
            agent,
            slug,
            version,
            description,
            mode,
            template,
            script,
            payload_schema,
            trigger_type,
            cron,
            timezone,
            prompt,
            prompt_release,
            prompt_version_mode,
            agent_release,
            agent_version_mode,
            app_account,
            app_events,
        } => {
            let created = TriggerService::create(
                storage,
                scope,
                NewEntity {
                    agent_id: agent,
                    name,
                    slug,
                    version,
                    description,
                    content: TriggerContent {
                        mode: mode.as_deref().map(parse_trigger_mode).transpose()?.unwrap_or_default(),
                        template: template.unwrap_or_default(),
                        script: script.unwrap_or_default(),
                        payload_schema: payload_schema.as_deref().map(parse_schema).transpose()?,
                        trigger_type: trigger_type
                            .as_deref()
                            .map(parse_trigger_type)
                            .transpose()?
                            .unwrap_or_default(),
                        cron,
                        timezone,
                        prompt_id: prompt,
                        prompt_release_id: prompt_release,
                        prompt_version_mode: prompt_version_mode
                            .as_deref()
                            .map(parse_version_mode)
                            .transpose()?
                            .unwrap_or_default(),
                        agent_release_id: agent_release,
                        agent_version_mode: agent_version_mode
                            .as_deref()
                            .map(parse_version_mode)
                            .transpose()?
                            .unwrap_or_default(),
                        app_account_id: app_account,
                        app_events,
                    },
                },
            )?;
            let human = format!(
                "Created trigger {} ({}) at version {}",
                created.entity.id, created.entity.slug, created.release.version
            );
            Output::new(&created, human)
        }

        TriggerCommands::Save {
            id,
            mode,
            template,
            script,
            payload_schema,
            trigger_type,
            cron,
            timezone,
            prompt,
            prompt_release,
            prompt_version_mode,
            agent_release,
            agent_version_mode,
            app_account,
            app_events,
        } => {
            let patch = TriggerPatch {
                mode: mode.as_deref().map(parse_trigger_mode).transpose()?,
                template,
                script,
                payload_schema: payload_schema.as_deref().map(parse_schema).transpose()?,
                trigger_type: trigger_type.as_deref().map(parse_trigger_type).transpose()?,
                cron,
                timezone,
                prompt_id: prompt,
                prompt_release_id: prompt_release,
                prompt_version_mode: prompt_version_mode
                    .as_deref()
                    .map(parse_version_mode)
                    .transpose()?,
                agent_release_id: agent_release,
                agent_version_mode: agent_version_mode
                    .as_deref()
                    .map(parse_version_mode)
                    .transpose()?,
                app_account_id: app_account,
                app_events: if app_events.is_empty() {
                    None
                } else {
                    Some(app_events)
                },
            };
            let saved = TriggerService::save(storage, scope, &id, patch)?;
            let human = format!(
                "Saved working copy of {} (hash {})",
                saved.entity_id,
                &saved.content_hash[..12]
            );
            Output::new(&saved, human)
        }

        TriggerCommands::Deploy {
            id,
            version,
            bump,
            description,
        } => {
            let release =
                TriggerService::deploy(storage, scope, &id, deploy_options(version, bump, description)?)?;
            let human = format!("Deployed {} version {} ({})", id, release.version, release.id);
            Output::new(&release, human)
        }

        TriggerCommands::Adopt { id, release_id } => {
            let release = TriggerService::adopt(storage, scope, &id, &release_id)?;
            let human = format!("{} now points at release {} ({})", id, release.id, release.version);
            Output::new(&release, human)
        }

        TriggerCommands::Checkout { id, release_id } => {
            let result = TriggerService::checkout(storage, scope, &id, &release_id)?;
            let human = format!(
                "Checked out release {} into the working copy of {}",
                result.release_id, result.entity_id
            );
            Output::new(&result, human)
        }

        TriggerCommands::Releases { id } => {
            let releases = TriggerService::list_releases(storage, scope, &id)?;
            let human = render_releases(&releases);
            Output::new(&releases, human)
        }

        TriggerCommands::Show { id } => {
            let entity = resolve_trigger_ref(storage, scope, &id)?;
            let working = TriggerService::working_copy(storage, scope, &entity.id)?;
            let human = format!(
                "{} ({})\n  name: {}\n  agent: {}\n  current release: {}\n  draft hash: {}",
                entity.id,
                entity.slug,
                entity.name,
                entity.agent_id,
                entity.current_release_id.as_deref().unwrap_or("-"),
                &working.content_hash[..12],
            );
            Output::new(
                &serde_json::json!({ "entity": entity, "working_copy": working }),
                human,
            )
        }

        TriggerCommands::List => {
            let entities = TriggerService::list(storage, scope)?;
            let human = render_entities(&entities);
            Output::new(&entities, human)
        }

        TriggerCommands::Rm { id } => {
            TriggerService::delete(storage, scope, &id)?;
            Output::new(
                &serde_json::json!({ "deleted": id }),
                format!("Deleted trigger {}", id),
            )
        }

        TriggerCommands::Resolve { id, mode, release } => {
            let release = TriggerService::resolve(
                storage,
                scope,
                &id,
                parse_version_mode(&mode)?,
                release.as_deref(),
            )?;
            let human = format!("{} resolves to {} ({})", id, release.version, release.id);
            Output::new(&release, human)
        }

        TriggerCommands::ResolvePrompt { id } => {
            let release = TriggerService::resolve_prompt(storage, scope, &id)?;
            let human = format!(
                "{} runs prompt release {} ({})",
                id, release.id, release.version
            );
            Output::new(&release, human)
        }
    }
}

/// Resolve a prompt reference: ID first, slug as fallback.
fn resolve_prompt_ref(storage: &Storage, scope: &Scope, id: &str) -> Result<VersionedEntity> {
    match PromptService::get(storage, scope, id) {
        Err(Error::NotFound(_)) => PromptService::find_by_slug(storage, scope, id),
        other => other,
    }
}

/// Resolve a trigger reference: ID first, slug as fallback.
fn resolve_trigger_ref(storage: &Storage, scope: &Scope, id: &str) -> Result<VersionedEntity> {
    match TriggerService::get(storage, scope, id) {
        Err(Error::NotFound(_)) => TriggerService::find_by_slug(storage, scope, id),
        other => other,
    }
}

fn deploy_options(
    version: Option<String>,
    bump: Option<String>,
    description: Option<String>,
) -> Result<DeployOptions> {
    Ok(DeployOptions {
        version,
        bump: bump.as_deref().map(str::parse::<BumpPart>).transpose()?,
        description,
    })
}

fn parse_prompt_mode(s: &str) -> Result<PromptMode> {
    match s.to_lowercase().as_str() {
        "template" => Ok(PromptMode::Template),
        "script" => Ok(PromptMode::Script),
        _ => Err(Error::BadRequest(format!(
            "Invalid prompt mode: {} (expected template or script)",
            s
        ))),
    }
}

fn parse_trigger_mode(s: &str) -> Result<TriggerMode> {
    match s.to_lowercase().as_str() {
        "prompt" => Ok(TriggerMode::Prompt),
        "template" => Ok(TriggerMode::Template),
        "script" => Ok(TriggerMode::Script),
        _ => Err(Error::BadRequest(format!(
            "Invalid trigger mode: {} (expected prompt, template, or script)",
            s
        ))),
    }
}

fn parse_trigger_type(s: &str) -> Result<TriggerType> {
    match s.to_lowercase().as_str() {
        "cron" => Ok(TriggerType::Cron),
        "webhook" => Ok(TriggerType::Webhook),
        "app_event" | "app-event" => Ok(TriggerType::AppEvent),
        _ => Err(Error::BadRequest(format!(
            "Invalid trigger type: {} (expected cron, webhook, or app_event)",
            s
        ))),
    }
}

fn parse_version_mode(s: &str) -> Result<VersionMode> {
    match s.to_lowercase().as_str() {
        "current" => Ok(VersionMode::Current),
        "fixed" => Ok(VersionMode::Fixed),
        _ => Err(Error::BadRequest(format!(
            "Invalid version mode: {} (expected current or fixed)",
            s
        ))),
    }
}

fn parse_schema(s: &str) -> Result<SchemaValue> {
    let value: serde_json::Value = serde_json::from_str(s)?;
    Ok(SchemaValue::from(value))
}

fn render_releases<C: Serialize>(releases: &[Release<C>]) -> String {
    if releases.is_empty() {
        return "No releases".to_string();
    }
    releases
        .iter()
        .map(|r| {
            format!(
                "{:<10} {}  {}  {}{}",
                r.version.to_string(),
                r.id,
                r.published_at.format("%Y-%m-%d %H:%M"),
                r.created_by,
                r.description
                    .as_deref()
                    .map(|d| format!("  {}", d))
                    .unwrap_or_default(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_entities(entities: &[VersionedEntity]) -> String {
    if entities.is_empty() {
        return "No entities".to_string();
    }
    entities
        .iter()
        .map(|e| format!("{}  {:<24} {}", e.id, e.slug, e.name))
        .collect::<Vec<_>>()
        .join("\n")
}
