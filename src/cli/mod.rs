//! CLI argument definitions for Capstan.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Capstan - versioned prompt and trigger configurations for AI agents.
///
/// Every entity has one mutable working copy and an immutable release
/// history. Edit the working copy with `save`, publish it with `deploy`,
/// switch the live version with `adopt`, and roll the draft back with
/// `checkout`.
#[derive(Parser, Debug)]
#[command(name = "cap")]
#[command(author, version, about = "Versioned agent configuration releases", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Organization scope for every operation.
    /// Can also be set via the CAP_ORG environment variable.
    #[arg(long = "org", global = true, env = "CAP_ORG", default_value = "default")]
    pub org: String,

    /// Acting user recorded in audit fields.
    /// Can also be set via the CAP_ACTOR environment variable.
    #[arg(long = "actor", global = true, env = "CAP_ACTOR", default_value = "operator")]
    pub actor: String,

    /// Data directory holding the console database.
    /// Can also be set via the CAP_DATA_DIR environment variable.
    #[arg(long = "data-dir", global = true, env = "CAP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// System management commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Prompt configuration commands
    Prompt {
        #[command(subcommand)]
        command: PromptCommands,
    },

    /// Trigger configuration commands
    Trigger {
        #[command(subcommand)]
        command: TriggerCommands,
    },
}

/// System management commands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Initialize the console database
    Init,

    /// Show storage and build information
    Info,
}

/// Prompt commands
#[derive(Subcommand, Debug)]
pub enum PromptCommands {
    /// Create a prompt with its first release and working copy
    Create {
        /// Human-readable name
        name: String,

        /// Agent the prompt belongs to
        #[arg(long)]
        agent: String,

        /// Explicit slug (derived from the name when omitted)
        #[arg(long)]
        slug: Option<String>,

        /// Initial version (defaults to 0.0.1)
        #[arg(long)]
        version: Option<String>,

        /// Description recorded on the first release
        #[arg(short = 'd', long)]
        description: Option<String>,

        /// Prompt mode: template or script
        #[arg(long)]
        mode: Option<String>,

        /// Template text
        #[arg(long)]
        content: Option<String>,

        /// Script body
        #[arg(long)]
        script: Option<String>,

        /// Input schema as a JSON document
        #[arg(long = "input-schema")]
        input_schema: Option<String>,
    },

    /// Save changes to the working copy (omitted fields are kept)
    Save {
        /// Prompt ID (e.g., pmt-1a2b3c4d)
        id: String,

        /// Prompt mode: template or script
        #[arg(long)]
        mode: Option<String>,

        /// Template text
        #[arg(long)]
        content: Option<String>,

        /// Script body
        #[arg(long)]
        script: Option<String>,

        /// Input schema as a JSON document
        #[arg(long = "input-schema")]
        input_schema: Option<String>,
    },

    /// Cut a release from the working copy and make it current
    Deploy {
        /// Prompt ID
        id: String,

        /// Explicit version (conflicts with --bump)
        #[arg(long)]
        version: Option<String>,

        /// Version part to bump: major, minor, or patch (default patch)
        #[arg(long)]
        bump: Option<String>,

        /// Release description
        #[arg(short = 'd', long)]
        description: Option<String>,
    },

    /// Repoint the current release without touching content
    Adopt {
        /// Prompt ID
        id: String,

        /// Release ID to adopt
        release_id: String,
    },

    /// Overwrite the working copy from a past release (discards draft edits)
    Checkout {
        /// Prompt ID
        id: String,

        /// Release ID to check out
        release_id: String,
    },

    /// List releases, newest version first
    Releases {
        /// Prompt ID
        id: String,
    },

    /// Show a prompt with its working copy
    Show {
        /// Prompt ID or slug
        id: String,
    },

    /// List prompts in the organization
    List,

    /// Delete a prompt and its entire release history
    Rm {
        /// Prompt ID
        id: String,
    },

    /// Resolve the effective release for a version mode
    Resolve {
        /// Prompt ID
        id: String,

        /// Version mode: current or fixed
        #[arg(long, default_value = "current")]
        mode: String,

        /// Pinned release ID for fixed mode
        #[arg(long)]
        release: Option<String>,
    },
}

/// Trigger commands
#[derive(Subcommand, Debug)]
pub enum TriggerCommands {
    /// Create a trigger with its first release and working copy
    Create {
        /// Human-readable name
        name: String,

        /// Agent the trigger belongs to
        #[arg(long)]
        agent: String,

        /// Explicit slug (derived from the name when omitted)
        #[arg(long)]
        slug: Option<String>,

        /// Initial version (defaults to 0.0.1)
        #[arg(long)]
        version: Option<String>,

        /// Description recorded on the first release
        #[arg(short = 'd', long)]
        description: Option<String>,

        /// Trigger mode: prompt, template, or script
        #[arg(long)]
        mode: Option<String>,

        /// Inline template text
        #[arg(long)]
        template: Option<String>,

        /// Inline script body
        #[arg(long)]
        script: Option<String>,

        /// Payload schema as a JSON document
        #[arg(long = "payload-schema")]
        payload_schema: Option<String>,

        /// Trigger type: cron, webhook, or app_event
        #[arg(long = "type")]
        trigger_type: Option<String>,

        /// Cron expression
        #[arg(long)]
        cron: Option<String>,

        /// IANA timezone for the cron schedule
        #[arg(long)]
        timezone: Option<String>,

        /// Referenced prompt ID
        #[arg(long)]
        prompt: Option<String>,

        /// Pinned prompt release ID
        #[arg(long = "prompt-release")]
        prompt_release: Option<String>,

        /// Prompt version mode: current or fixed
        #[arg(long = "prompt-version-mode")]
        prompt_version_mode: Option<String>,

        /// Pinned agent release ID
        #[arg(long = "agent-release")]
        agent_release: Option<String>,

        /// Agent version mode: current or fixed
        #[arg(long = "agent-version-mode")]
        agent_version_mode: Option<String>,

        /// Connected app account ID
        #[arg(long = "app-account")]
        app_account: Option<String>,

        /// App event to subscribe to (repeatable, order-significant)
        #[arg(long = "app-event")]
        app_events: Vec<String>,
    },

    /// Save changes to the working copy (omitted fields are kept)
    Save {
        /// Trigger ID (e.g., trg-1a2b3c4d)
        id: String,

        /// Trigger mode: prompt, template, or script
        #[arg(long)]
        mode: Option<String>,

        /// Inline template text
        #[arg(long)]
        template: Option<String>,

        /// Inline script body
        #[arg(long)]
        script: Option<String>,

        /// Payload schema as a JSON document
        #[arg(long = "payload-schema")]
        payload_schema: Option<String>,

        /// Trigger type: cron, webhook, or app_event
        #[arg(long = "type")]
        trigger_type: Option<String>,

        /// Cron expression
        #[arg(long)]
        cron: Option<String>,

        /// IANA timezone for the cron schedule
        #[arg(long)]
        timezone: Option<String>,

        /// Referenced prompt ID
        #[arg(long)]
        prompt: Option<String>,

        /// Pinned prompt release ID
        #[arg(long = "prompt-release")]
        prompt_release: Option<String>,

        /// Prompt version mode: current or fixed
        #[arg(long = "prompt-version-mode")]
        prompt_version_mode: Option<String>,

        /// Pinned agent release ID
        #[arg(long = "agent-release")]
        agent_release: Option<String>,

        /// Agent version mode: current or fixed
        #[arg(long = "agent-version-mode")]
        agent_version_mode: Option<String>,

        /// Connected app account ID
        #[arg(long = "app-account")]
        app_account: Option<String>,

        /// Replace the app event subscriptions (repeatable)
        #[arg(long = "app-event")]
        app_events: Vec<String>,
    },

    /// Cut a release from the working copy and make it current
    Deploy {
        /// Trigger ID
        id: String,

        /// Explicit version (conflicts with --bump)
        #[arg(long)]
        version: Option<String>,

        /// Version part to bump: major, minor, or patch (default patch)
        #[arg(long)]
        bump: Option<String>,

        /// Release description
        #[arg(short = 'd', long)]
        description: Option<String>,
    },

    /// Repoint the current release without touching content
    Adopt {
        /// Trigger ID
        id: String,

        /// Release ID to adopt
        release_id: String,
    },

    /// Overwrite the working copy from a past release (discards draft edits)
    Checkout {
        /// Trigger ID
        id: String,

        /// Release ID to check out
        release_id: String,
    },

    /// List releases, newest version first
    Releases {
        /// Trigger ID
        id: String,
    },

    /// Show a trigger with its working copy
    Show {
        /// Trigger ID or slug
        id: String,
    },

    /// List triggers in the organization
    List,

    /// Delete a trigger and its entire release history
    Rm {
        /// Trigger ID
        id: String,
    },

    /// Resolve the effective release for a version mode
    Resolve {
        /// Trigger ID
        id: String,

        /// Version mode: current or fixed
        #[arg(long, default_value = "current")]
        mode: String,

        /// Pinned release ID for fixed mode
        #[arg(long)]
        release: Option<String>,
    },

    /// Resolve the prompt release the trigger's current release will run
    ResolvePrompt {
        /// Trigger ID
        id: String,
    },
}
